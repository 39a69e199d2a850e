use serde::{Deserialize, Deserializer, Serialize};

use crate::stats::Judgements;

// The tracker stores rows straight from SQLite, so counters may be `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BeatmapInfo {
    pub md5_hash: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub creator: Option<String>,
    pub folder_name: Option<String>,
    pub audio_file: Option<String>,
    pub background_file: Option<String>,
    pub num_hitcircles: Option<u32>,
    pub num_sliders: Option<u32>,
    pub num_spinners: Option<u32>,
    pub last_played_date: Option<String>,
}

impl BeatmapInfo {
    pub fn total_objects(&self) -> Option<u32> {
        Some(self.num_hitcircles? + self.num_sliders? + self.num_spinners?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Replay {
    pub id: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub game_mode: u8,
    #[serde(deserialize_with = "null_as_default")]
    pub beatmap_md5: String,
    #[serde(deserialize_with = "null_as_default")]
    pub player_name: String,
    pub replay_md5: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub num_300s: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_100s: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_50s: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_gekis: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_katus: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_misses: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub total_score: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_combo: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub mods_used: u32,
    pub pp: Option<f64>,
    pub stars: Option<f64>,
    pub map_max_combo: Option<u32>,
    pub played_at: Option<String>,
    pub rank: Option<String>,
    pub beatmap: Option<BeatmapInfo>,
}

impl Replay {
    pub fn judgements(&self) -> Judgements {
        Judgements {
            n300: self.num_300s,
            n100: self.num_100s,
            n50: self.num_50s,
            misses: self.num_misses,
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.judgements().accuracy()
    }

    /// Server-provided rank, or a locally computed grade for osu!standard.
    pub fn display_rank(&self) -> String {
        if let Some(rank) = self.rank.as_deref().filter(|rank| !rank.is_empty()) {
            return rank.to_string();
        }
        self.beatmap
            .as_ref()
            .filter(|_| self.game_mode == 0)
            .and_then(BeatmapInfo::total_objects)
            .and_then(|objects| self.judgements().grade(objects))
            .unwrap_or("N/A")
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Beatmap {
    pub md5_hash: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub difficulty: Option<String>,
    pub creator: Option<String>,
    pub stars: Option<f64>,
    pub cs: Option<f64>,
    pub ar: Option<f64>,
    pub od: Option<f64>,
    pub hp: Option<f64>,
    pub bpm: Option<f64>,
    pub bpm_min: Option<f64>,
    pub bpm_max: Option<f64>,
    pub folder_name: Option<String>,
    pub audio_file: Option<String>,
    pub background_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReplayPage {
    pub replays: Vec<Replay>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BeatmapPage {
    pub beatmaps: Vec<Beatmap>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub total_pp: f64,
    pub play_count: u64,
    pub top_play_pp: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SrSuggestion {
    pub suggested_sr: f64,
    #[serde(default)]
    pub plays_considered: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub osu_folder: String,
    pub default_player: String,
}

/// Fields to change; `None` leaves the server value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osu_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_player: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskProgress {
    pub status: TaskStatus,
    pub current: u64,
    pub total: u64,
    pub message: String,
    pub batches_done: Option<u64>,
}

impl TaskProgress {
    /// `message (current/total)` with `?` for an unknown total.
    pub fn summary(&self) -> String {
        let total = if self.total == 0 {
            "?".to_string()
        } else {
            self.total.to_string()
        };
        format!("{} ({}/{})", self.message, self.current, total)
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressStatus {
    pub sync: TaskProgress,
    pub scan: TaskProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    Scan,
    Sync,
}

impl Task {
    pub fn label(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Sync => "sync",
        }
    }
}

impl ProgressStatus {
    pub fn task(&self, task: Task) -> &TaskProgress {
        match task {
            Task::Scan => &self.scan,
            Task::Sync => &self.sync,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskAccepted {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkillFocus {
    #[default]
    Balanced,
    Jumps,
    Flow,
    Speed,
    Stamina,
}

impl SkillFocus {
    pub const ALL: [SkillFocus; 5] = [
        Self::Balanced,
        Self::Jumps,
        Self::Flow,
        Self::Speed,
        Self::Stamina,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Jumps => "jumps",
            Self::Flow => "flow",
            Self::Speed => "speed",
            Self::Stamina => "stamina",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::str::FromStr for SkillFocus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|focus| focus.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                format!("unknown skill focus '{raw}' (balanced, jumps, flow, speed, stamina)")
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendQuery {
    pub star_rating: f64,
    pub max_bpm: f64,
    pub mods: u32,
    pub exclude: Vec<String>,
    pub focus: SkillFocus,
}

impl RecommendQuery {
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("sr".to_string(), format!("{:.2}", self.star_rating)),
            ("bpm".to_string(), format!("{}", self.max_bpm.round() as i64)),
            ("mods".to_string(), self.mods.to_string()),
            ("focus".to_string(), self.focus.as_str().to_string()),
        ];
        if !self.exclude.is_empty() {
            pairs.push(("exclude".to_string(), self.exclude.join(",")));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub player_name: Option<String>,
}

impl ListQuery {
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.max(1).to_string()),
            ("limit".to_string(), self.limit.max(1).to_string()),
        ];
        if let Some(player) = self.player_name.as_deref().filter(|p| !p.is_empty()) {
            pairs.push(("player_name".to_string(), player.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs
    }
}
