use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::api::{
    ApiError, ApiResult, Beatmap, ProgressStatus, RecommendQuery, Replay, SkillFocus,
    SrSuggestion, TaskAccepted, TrackerBackend,
};

/// Scripted backend: each call pops the next queued response. Empty queues
/// answer with an empty result.
#[derive(Default)]
pub(crate) struct FakeBackend {
    recommendations: RefCell<VecDeque<ApiResult<Option<Beatmap>>>>,
    latest: RefCell<VecDeque<ApiResult<Option<Replay>>>>,
    scans: RefCell<VecDeque<ApiResult<TaskAccepted>>>,
    progress: RefCell<VecDeque<ApiResult<ProgressStatus>>>,
    suggestions: RefCell<VecDeque<ApiResult<Option<SrSuggestion>>>>,
    recommend_queries: RefCell<Vec<RecommendQuery>>,
    latest_players: RefCell<Vec<String>>,
    scan_calls: Cell<usize>,
    progress_calls: Cell<usize>,
}

fn scripted_error(message: String) -> ApiError {
    ApiError::Transport(message)
}

impl FakeBackend {
    pub(crate) fn push_recommendation(&self, result: Result<Option<Beatmap>, String>) {
        self.recommendations
            .borrow_mut()
            .push_back(result.map_err(scripted_error));
    }

    pub(crate) fn push_latest(&self, result: Result<Option<Replay>, String>) {
        self.latest
            .borrow_mut()
            .push_back(result.map_err(scripted_error));
    }

    pub(crate) fn push_scan(&self, result: Result<TaskAccepted, String>) {
        self.scans
            .borrow_mut()
            .push_back(result.map_err(scripted_error));
    }

    pub(crate) fn push_progress(&self, result: Result<ProgressStatus, String>) {
        self.progress
            .borrow_mut()
            .push_back(result.map_err(scripted_error));
    }

    pub(crate) fn push_suggestion(&self, result: Result<Option<SrSuggestion>, String>) {
        self.suggestions
            .borrow_mut()
            .push_back(result.map_err(scripted_error));
    }

    pub(crate) fn recommend_queries(&self) -> Vec<RecommendQuery> {
        self.recommend_queries.borrow().clone()
    }

    pub(crate) fn latest_players(&self) -> Vec<String> {
        self.latest_players.borrow().clone()
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.scan_calls.get()
    }

    pub(crate) fn progress_calls(&self) -> usize {
        self.progress_calls.get()
    }
}

impl TrackerBackend for FakeBackend {
    fn recommend(&self, query: &RecommendQuery) -> ApiResult<Option<Beatmap>> {
        self.recommend_queries.borrow_mut().push(query.clone());
        self.recommendations
            .borrow_mut()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    fn latest_replay(&self, player_name: &str) -> ApiResult<Option<Replay>> {
        self.latest_players
            .borrow_mut()
            .push(player_name.to_string());
        self.latest.borrow_mut().pop_front().unwrap_or(Ok(None))
    }

    fn start_scan(&self) -> ApiResult<TaskAccepted> {
        self.scan_calls.set(self.scan_calls.get() + 1);
        self.scans
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(TaskAccepted::default()))
    }

    fn progress_status(&self) -> ApiResult<ProgressStatus> {
        self.progress_calls.set(self.progress_calls.get() + 1);
        self.progress
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(ProgressStatus::default()))
    }

    fn suggest_sr(
        &self,
        _player_name: &str,
        _mods: u32,
        _focus: SkillFocus,
    ) -> ApiResult<Option<SrSuggestion>> {
        self.suggestions.borrow_mut().pop_front().unwrap_or(Ok(None))
    }
}
