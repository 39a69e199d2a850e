use crate::api::Replay;

const PP_WEIGHT_DECAY: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Judgements {
    pub n300: u32,
    pub n100: u32,
    pub n50: u32,
    pub misses: u32,
}

impl Judgements {
    pub fn total(self) -> u32 {
        self.n300 + self.n100 + self.n50 + self.misses
    }

    /// osu!standard accuracy as a percentage in `0.0..=100.0`.
    pub fn accuracy(self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted = f64::from(self.n300) * 300.0
            + f64::from(self.n100) * 100.0
            + f64::from(self.n50) * 50.0;
        weighted / (f64::from(total) * 300.0) * 100.0
    }

    /// Letter grade for a full osu!standard play. Returns `None` when the
    /// judgement count does not cover every object of the map.
    pub fn grade(self, total_objects: u32) -> Option<&'static str> {
        if total_objects == 0 || self.total() != total_objects {
            return None;
        }
        let objects = f64::from(total_objects);
        let ratio_300 = f64::from(self.n300) / objects;
        let ratio_50 = f64::from(self.n50) / objects;
        let no_miss = self.misses == 0;

        let grade = if self.n300 == total_objects {
            "SS"
        } else if ratio_300 > 0.9 && ratio_50 < 0.01 && no_miss {
            "S"
        } else if (ratio_300 > 0.8 && no_miss) || ratio_300 > 0.9 {
            "A"
        } else if (ratio_300 > 0.7 && no_miss) || ratio_300 > 0.8 {
            "B"
        } else if ratio_300 > 0.6 {
            "C"
        } else {
            "D"
        };
        Some(grade)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateStats {
    pub total_pp: f64,
    pub play_count: usize,
    pub top_play_pp: f64,
    pub mean_accuracy: f64,
}

/// Weighted PP total (best play at 100%, each following play at 95% of the
/// previous weight), play count, best play and mean accuracy.
pub fn aggregate_stats(replays: &[Replay]) -> AggregateStats {
    if replays.is_empty() {
        return AggregateStats::default();
    }

    let mut pp_plays: Vec<f64> = replays
        .iter()
        .filter_map(|replay| replay.pp)
        .filter(|pp| *pp > 0.0)
        .collect();
    pp_plays.sort_by(|a, b| b.total_cmp(a));

    let total_pp = pp_plays
        .iter()
        .enumerate()
        .map(|(idx, pp)| pp * PP_WEIGHT_DECAY.powi(idx as i32))
        .sum::<f64>();
    let accuracy_sum = replays.iter().map(Replay::accuracy).sum::<f64>();

    AggregateStats {
        total_pp: round2(total_pp),
        play_count: replays.len(),
        top_play_pp: round2(pp_plays.first().copied().unwrap_or(0.0)),
        mean_accuracy: accuracy_sum / replays.len() as f64,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
