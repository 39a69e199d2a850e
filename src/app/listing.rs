use std::cmp::Ordering;

use chrono::{DateTime, Local, NaiveDateTime};

use crate::api::{Beatmap, BeatmapInfo, Replay};
use crate::stats::group_thousands;

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

fn song_title(artist: Option<&str>, title: Option<&str>) -> String {
    format!(
        "{} - {}",
        artist.filter(|s| !s.is_empty()).unwrap_or("Unknown Artist"),
        title.filter(|s| !s.is_empty()).unwrap_or("Unknown Title")
    )
}

fn difficulty_line(difficulty: Option<&str>, creator: Option<&str>) -> String {
    format!(
        "[{}] by {}",
        difficulty.filter(|s| !s.is_empty()).unwrap_or("?"),
        creator.filter(|s| !s.is_empty()).unwrap_or("Unknown Mapper")
    )
}

pub(crate) fn beatmap_title(beatmap: &Beatmap) -> String {
    song_title(beatmap.artist.as_deref(), beatmap.title.as_deref())
}

pub(crate) fn beatmap_difficulty(beatmap: &Beatmap) -> String {
    difficulty_line(beatmap.difficulty.as_deref(), beatmap.creator.as_deref())
}

pub(crate) fn replay_title(replay: &Replay) -> String {
    match replay.beatmap.as_ref() {
        Some(info) => song_title(info.artist.as_deref(), info.title.as_deref()),
        None => song_title(None, None),
    }
}

pub(crate) fn replay_difficulty(info: Option<&BeatmapInfo>) -> String {
    difficulty_line(
        info.and_then(|b| b.difficulty.as_deref()),
        info.and_then(|b| b.creator.as_deref()),
    )
}

/// `160-200 (180) BPM` for maps with a real BPM range, `180 BPM` otherwise.
pub(crate) fn bpm_text(beatmap: &Beatmap) -> String {
    let rounded = |v: Option<f64>| v.filter(|v| *v > 0.0).map(|v| v.round() as i64);
    let Some(main) = rounded(beatmap.bpm) else {
        return "N/A".to_string();
    };
    match (rounded(beatmap.bpm_min), rounded(beatmap.bpm_max)) {
        (Some(min), Some(max)) if max - min > 1 => format!("{min}-{max} ({main}) BPM"),
        _ => format!("{main} BPM"),
    }
}

pub(crate) fn stat_text(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn stars_text(stars: Option<f64>) -> String {
    stars
        .filter(|s| *s > 0.0)
        .map(|s| format!("★ {s:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}

pub(crate) fn pp_text(pp: Option<f64>) -> String {
    pp.filter(|pp| *pp > 0.0)
        .map(|pp| format!("{pp:.2}pp"))
        .unwrap_or_else(|| "N/A".to_string())
}

pub(crate) fn judgements_text(replay: &Replay) -> String {
    format!(
        "300:{} 100:{} 50:{} X:{}",
        replay.num_300s, replay.num_100s, replay.num_50s, replay.num_misses
    )
}

pub(crate) fn score_text(score: u64) -> String {
    group_thousands(score)
}

/// Backend timestamps come as RFC 3339 or as bare SQLite datetimes.
pub(crate) fn format_played_at(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return "Unknown".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    raw.to_string()
}

pub(crate) fn total_pages(total: Option<u64>, limit: u32) -> Option<u64> {
    let total = total?;
    let limit = u64::from(limit.max(1));
    Some(total.div_ceil(limit).max(1))
}

pub(crate) fn sort_by_pp_desc(replays: &mut [Replay]) {
    replays.sort_by(|a, b| {
        b.pp.unwrap_or(0.0)
            .partial_cmp(&a.pp.unwrap_or(0.0))
            .unwrap_or(Ordering::Equal)
    });
}

pub(crate) fn sort_beatmaps(beatmaps: &mut [Beatmap]) {
    let key = |b: &Beatmap| {
        (
            b.artist.as_deref().unwrap_or_default().to_lowercase(),
            b.title.as_deref().unwrap_or_default().to_lowercase(),
        )
    };
    beatmaps.sort_by_key(key);
}
