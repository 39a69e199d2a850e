mod models;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::http::{HttpError, HttpOptions, Method, send_with_retries};

pub use models::*;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status {
                status,
                body,
                attempts,
            } => {
                let mut message = server_message(&body);
                if attempts > 1 {
                    message.push_str(&format!(" (after {attempts} attempts)"));
                }
                Self::Status { status, message }
            }
            HttpError::Transport { detail, attempts } => {
                Self::Transport(format!("{detail} (after {attempts} attempt(s))"))
            }
            HttpError::Body(detail) => Self::Transport(detail),
        }
    }
}

/// Prefers the tracker's `{"error": ...}` / `{"message": ...}` payloads over
/// the raw body.
fn server_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "status"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(240).collect()
    }
}

/// The backend calls the training controller depends on.
pub trait TrackerBackend {
    fn recommend(&self, query: &RecommendQuery) -> ApiResult<Option<Beatmap>>;
    fn latest_replay(&self, player_name: &str) -> ApiResult<Option<Replay>>;
    fn start_scan(&self) -> ApiResult<TaskAccepted>;
    fn progress_status(&self) -> ApiResult<ProgressStatus>;
    fn suggest_sr(
        &self,
        player_name: &str,
        mods: u32,
        focus: SkillFocus,
    ) -> ApiResult<Option<SrSuggestion>>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    options: HttpOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayListBody {
    Bare(Vec<Replay>),
    Page(ReplayPage),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BeatmapListBody {
    Bare(Vec<Beatmap>),
    Page(BeatmapPage),
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_options(base_url, HttpOptions::default())
    }

    pub(crate) fn with_options(base_url: &str, options: HttpOptions) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> ApiResult<T> {
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        options: &HttpOptions,
    ) -> ApiResult<T> {
        let response = send_with_retries(Method::Get, &self.endpoint(path), query, None, options)?;
        Self::decode(path, &response.body)
    }

    /// GET where 404 means "nothing there yet" rather than a failure.
    fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ApiResult<Option<T>> {
        match self.get(path, query, &self.options) {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Status { status: 404, .. }) => {
                debug!(path, "empty result (404)");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: Option<&str>) -> ApiResult<T> {
        let response =
            send_with_retries(Method::Post, &self.endpoint(path), &[], body, &self.options)?;
        Self::decode(path, &response.body)
    }

    pub fn replays(&self, query: &ListQuery) -> ApiResult<ReplayPage> {
        let body: ReplayListBody = self.get("/replays", &query.query_pairs(), &self.options)?;
        Ok(match body {
            ReplayListBody::Bare(replays) => ReplayPage {
                total: Some(replays.len() as u64),
                replays,
            },
            ReplayListBody::Page(page) => page,
        })
    }

    pub fn beatmaps(&self, query: &ListQuery) -> ApiResult<BeatmapPage> {
        let body: BeatmapListBody = self.get("/beatmaps", &query.query_pairs(), &self.options)?;
        Ok(match body {
            BeatmapListBody::Bare(beatmaps) => BeatmapPage {
                total: Some(beatmaps.len() as u64),
                beatmaps,
            },
            BeatmapListBody::Page(page) => page,
        })
    }

    pub fn players(&self) -> ApiResult<Vec<String>> {
        self.get("/players", &[], &self.options)
    }

    pub fn player_stats(&self, player_name: &str) -> ApiResult<PlayerStats> {
        let path = format!("/players/{}/stats", encode_path_segment(player_name));
        self.get(&path, &[], &self.options)
    }

    pub fn start_sync(&self) -> ApiResult<TaskAccepted> {
        self.post("/sync-beatmaps", None)
    }

    pub fn config(&self) -> ApiResult<ServerConfig> {
        self.get("/config", &[], &self.options)
    }

    pub fn save_config(&self, update: &ConfigUpdate) -> ApiResult<String> {
        let body = serde_json::to_string(update).map_err(|source| ApiError::Decode {
            endpoint: "/config".to_string(),
            source,
        })?;
        let value: Value = self.post("/config", Some(&body))?;
        Ok(value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Configuration saved.")
            .to_string())
    }

    pub fn song_file_url(&self, folder_name: &str, file_name: &str) -> Option<String> {
        if folder_name.is_empty() || file_name.is_empty() {
            return None;
        }
        Some(self.endpoint(&format!(
            "/songs/{}/{}",
            encode_path_segment(folder_name),
            encode_path_segment(file_name)
        )))
    }
}

impl TrackerBackend for ApiClient {
    fn recommend(&self, query: &RecommendQuery) -> ApiResult<Option<Beatmap>> {
        self.get_optional("/recommend", &query.query_pairs())
    }

    fn latest_replay(&self, player_name: &str) -> ApiResult<Option<Replay>> {
        let query = vec![("player_name".to_string(), player_name.to_string())];
        self.get_optional("/replays/latest", &query)
    }

    fn start_scan(&self) -> ApiResult<TaskAccepted> {
        self.post("/scan", None)
    }

    // Poll ticks never retry; a failed tick stops the poller instead.
    fn progress_status(&self) -> ApiResult<ProgressStatus> {
        self.get("/progress-status", &[], &self.options.single_attempt())
    }

    fn suggest_sr(
        &self,
        player_name: &str,
        mods: u32,
        focus: SkillFocus,
    ) -> ApiResult<Option<SrSuggestion>> {
        let path = format!("/players/{}/suggest-sr", encode_path_segment(player_name));
        let query = vec![
            ("mods".to_string(), mods.to_string()),
            ("focus".to_string(), focus.as_str().to_string()),
        ];
        self.get_optional(&path, &query)
    }
}

pub(crate) fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
