use crate::api::Replay;
use crate::mods::SCORE_V2;
use crate::stats::group_thousands;

/// Pass/fail thresholds for one session step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Goal {
    pub min_accuracy: Option<f64>,
    pub max_misses: Option<u32>,
    pub use_score_v2: bool,
    pub min_score: Option<u64>,
}

impl Goal {
    /// A score threshold only exists for ScoreV2 goals; it is dropped
    /// otherwise.
    pub fn new(
        min_accuracy: Option<f64>,
        max_misses: Option<u32>,
        use_score_v2: bool,
        min_score: Option<u64>,
    ) -> Self {
        Self {
            min_accuracy,
            max_misses,
            use_score_v2,
            min_score: min_score.filter(|_| use_score_v2),
        }
    }

    pub fn is_active(&self) -> bool {
        self.min_accuracy.is_some() || self.max_misses.is_some() || self.min_score.is_some()
    }

    /// `Acc: 96% | Misses: ≤5 | Score: ≥500,000`
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(acc) = self.min_accuracy {
            parts.push(format!("Acc: {acc}%"));
        }
        if let Some(misses) = self.max_misses {
            parts.push(format!("Misses: ≤{misses}"));
        }
        if let (true, Some(score)) = (self.use_score_v2, self.min_score) {
            parts.push(format!("Score: ≥{}", group_thousands(score)));
        }
        if parts.is_empty() {
            "No specific goals".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub reasons: Vec<String>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn message(&self) -> String {
        if self.passed() {
            "Goal Passed!".to_string()
        } else {
            format!("Goal Failed: {}", self.reasons.join(", "))
        }
    }
}

/// Checks every threshold independently and collects one reason per miss.
pub fn evaluate_play(replay: &Replay, goal: &Goal) -> Verdict {
    let mut reasons = Vec::new();

    if let Some(needed) = goal.min_accuracy {
        let accuracy = replay.accuracy();
        if accuracy < needed {
            reasons.push(format!("Accuracy was {accuracy:.2}% (needed {needed}%)"));
        }
    }

    if let (true, Some(needed)) = (goal.use_score_v2, goal.min_score) {
        if replay.mods_used & SCORE_V2 == 0 {
            reasons.push("Play was not on ScoreV2 (score goal requires V2)".to_string());
        } else if replay.total_score < needed {
            reasons.push(format!(
                "Score was {} (needed {})",
                group_thousands(replay.total_score),
                group_thousands(needed)
            ));
        }
    }

    if let Some(allowed) = goal.max_misses
        && replay.num_misses > allowed
    {
        reasons.push(format!(
            "Misses were {} (max allowed {allowed})",
            replay.num_misses
        ));
    }

    Verdict { reasons }
}
