use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::api::{Beatmap, Replay, SkillFocus, Task, TaskProgress, TaskStatus, TrackerBackend};
use crate::mods::{ModSet, core_mods_match};
use crate::stats::round1;

use super::finder::{FinderError, MapFinder, Recommendation, SearchKey};
use super::goal::{Goal, Verdict, evaluate_play};
use super::planner::{OutcomeEffect, OutcomeReport, PlannerError, SessionPlanner};
use super::poller::{DEFAULT_POLL_INTERVAL, PollOutcome, ProgressPoller};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Info(String),
    Error(String),
}

impl StatusLine {
    pub fn text(&self) -> &str {
        match self {
            Self::Info(text) | Self::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FindOutcome {
    Found(Beatmap),
    NotFound,
    Refused(FinderError),
    NotActive,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    NoRecommendation,
    NoPlay,
    WrongMap,
    ModMismatch,
    Evaluated {
        verdict: Verdict,
        report: Option<OutcomeReport>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPlay {
    pub replay: Replay,
    pub verdict: Verdict,
}

/// Drives one training session: planning, map search, play detection and
/// outcome bookkeeping. Backend failures never escape; they become the
/// status line and manual controls are re-enabled.
pub struct TrainingController<B: TrackerBackend> {
    backend: B,
    planner: SessionPlanner,
    finder: MapFinder,
    poller: ProgressPoller,
    poll_interval: Duration,
    recommendation: Option<Recommendation>,
    candidate: Option<Beatmap>,
    last_detection: Option<DetectedPlay>,
    scan_progress: Option<TaskProgress>,
    scan_player: Option<String>,
    player: Option<String>,
    focus: SkillFocus,
    controls_enabled: bool,
    status: StatusLine,
}

impl<B: TrackerBackend> TrainingController<B> {
    pub fn new(backend: B, target_star_rating: f64, target_max_bpm: f64) -> Self {
        Self {
            backend,
            planner: SessionPlanner::new(target_star_rating, target_max_bpm),
            finder: MapFinder::default(),
            poller: ProgressPoller::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            recommendation: None,
            candidate: None,
            last_detection: None,
            scan_progress: None,
            scan_player: None,
            player: None,
            focus: SkillFocus::default(),
            controls_enabled: true,
            status: StatusLine::Info(
                "Plan your session, then press s to start it.".to_string(),
            ),
        }
    }

    #[cfg(test)]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn planner(&self) -> &SessionPlanner {
        &self.planner
    }

    pub fn finder(&self) -> &MapFinder {
        &self.finder
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn candidate(&self) -> Option<&Beatmap> {
        self.candidate.as_ref()
    }

    pub fn last_detection(&self) -> Option<&DetectedPlay> {
        self.last_detection.as_ref()
    }

    pub fn scan_progress(&self) -> Option<&TaskProgress> {
        self.scan_progress.as_ref()
    }

    #[cfg(test)]
    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    pub fn focus(&self) -> SkillFocus {
        self.focus
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = StatusLine::Info(text.into());
    }

    fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(status = %text, "trainer error");
        self.status = StatusLine::Error(text);
    }

    pub fn set_player(&mut self, player: Option<String>) {
        self.player = player.filter(|name| !name.trim().is_empty());
    }

    pub fn set_focus(&mut self, focus: SkillFocus) {
        self.focus = focus;
    }

    pub fn set_target_star_rating(&mut self, value: f64) {
        self.planner.set_target_star_rating(round1(value));
    }

    pub fn set_target_max_bpm(&mut self, value: f64) {
        self.planner.set_target_max_bpm(value);
    }

    pub fn add_step(&mut self, count: u32, mods: ModSet, goal: Goal) -> bool {
        let label = mods.to_string();
        match self.planner.add_step(count, mods, goal) {
            Ok(()) => {
                self.info(format!("Added {count}x {label} to the plan."));
                true
            }
            Err(err) => {
                self.error(err.to_string());
                false
            }
        }
    }

    pub fn remove_step(&mut self, index: usize) -> bool {
        self.planner.remove_step(index)
    }

    pub fn start_session(&mut self) -> Result<(), PlannerError> {
        if let Err(err) = self.planner.start_session() {
            self.error(err.to_string());
            return Err(err);
        }
        self.reset_map_finder();
        self.last_detection = None;
        self.info("New step started! Find a map to begin.");
        Ok(())
    }

    pub fn end_session(&mut self) {
        self.planner.end_session();
        self.reset_map_finder();
        self.info("Session ended.");
    }

    /// Leaving the trainer view: no poller may outlive it.
    pub fn deactivate(&mut self) {
        self.stop_scan();
    }

    fn stop_scan(&mut self) {
        self.poller.stop();
        self.scan_progress = None;
        self.scan_player = None;
        self.controls_enabled = true;
    }

    fn reset_map_finder(&mut self) {
        self.finder.reset();
        self.recommendation = None;
        self.candidate = None;
        self.stop_scan();
    }

    pub fn find_button_label(&self) -> String {
        if self.recommendation.is_some() {
            format!("Reroll ({} left)", self.finder.rerolls_left())
        } else {
            "Find a map".to_string()
        }
    }

    pub fn find_map(&mut self) -> FindOutcome {
        let Some(step) = self.planner.current_step() else {
            self.error("Start a session before searching for maps.");
            return FindOutcome::NotActive;
        };
        let mods = step.mods().bits();
        let goal = step.goal().clone();
        let key = SearchKey {
            star_rating: self.planner.target_star_rating(),
            max_bpm: self.planner.target_max_bpm(),
            mods,
            focus: self.focus,
        };

        let query = match self.finder.prepare(key) {
            Ok(query) => query,
            Err(err) => {
                self.error(err.to_string());
                return FindOutcome::Refused(err);
            }
        };

        self.recommendation = None;
        self.candidate = None;
        self.last_detection = None;
        self.info(format!(
            "Searching for a {}-focused map...",
            self.focus.as_str()
        ));

        match self.backend.recommend(&query) {
            Ok(Some(beatmap)) => {
                self.finder.record_candidate(&beatmap.md5_hash);
                self.recommendation = Some(Recommendation {
                    beatmap_hash: beatmap.md5_hash.clone(),
                    mods,
                    goal,
                });
                self.candidate = Some(beatmap.clone());
                self.controls_enabled = true;
                info!(beatmap = %beatmap.md5_hash, rerolls = self.finder.reroll_count(), "candidate shown");
                self.info("Map found! Play it and report your result.");
                FindOutcome::Found(beatmap)
            }
            Ok(None) => {
                self.finder.record_no_candidate();
                self.info("No new map found. Try adjusting the values.");
                FindOutcome::NotFound
            }
            Err(err) => {
                self.controls_enabled = true;
                let message = err.to_string();
                self.error(format!("Error finding map: {message}"));
                FindOutcome::Failed(message)
            }
        }
    }

    /// Starts a replay scan and begins polling it. The detected play is
    /// evaluated from `poll` once the scan completes.
    pub fn check_for_new_play(&mut self, now: Instant) -> bool {
        if self.recommendation.is_none() {
            self.error("Find a map first, then check for your play.");
            return false;
        }
        let Some(player) = self.player.clone() else {
            self.error("Please select a player first.");
            return false;
        };

        self.controls_enabled = false;
        match self.backend.start_scan() {
            Ok(_) => {
                self.scan_player = Some(player);
                self.poller.start(&[Task::Scan], self.poll_interval, now);
                self.scan_progress = Some(TaskProgress {
                    status: TaskStatus::Running,
                    message: "Starting scan...".to_string(),
                    ..TaskProgress::default()
                });
                self.info("Scanning for your latest play...");
                true
            }
            Err(err) => {
                self.controls_enabled = true;
                self.error(format!("Error starting scan: {err}"));
                false
            }
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<Detection> {
        match self.poller.poll_if_due(&self.backend, now) {
            PollOutcome::Idle => None,
            PollOutcome::Failed(message) => {
                self.stop_scan();
                self.error(format!("Error: {message}"));
                None
            }
            PollOutcome::Tick(tick) => {
                let scan_finish = tick
                    .finished
                    .iter()
                    .find(|(task, _)| *task == Task::Scan)
                    .map(|(_, status)| *status);
                self.scan_progress = Some(tick.snapshot.scan);

                match scan_finish {
                    None => None,
                    Some(TaskStatus::Complete) => {
                        self.scan_progress = None;
                        self.info("Scan complete. Checking latest play...");
                        self.fetch_and_evaluate()
                    }
                    Some(_) => {
                        self.stop_scan();
                        self.error("Scan failed.");
                        None
                    }
                }
            }
        }
    }

    /// The play is looked up for the player who started the scan.
    fn fetch_and_evaluate(&mut self) -> Option<Detection> {
        let Some(player) = self.scan_player.take() else {
            self.controls_enabled = true;
            self.error("Scan finished without a player to check.");
            return None;
        };
        match self.backend.latest_replay(&player) {
            Ok(replay) => Some(self.evaluate_detected_play(replay)),
            Err(err) => {
                self.controls_enabled = true;
                self.error(format!("Error: {err}"));
                None
            }
        }
    }

    /// Checks a freshly scanned play against the in-flight recommendation and
    /// records the outcome when it is the recommended map with the same core
    /// difficulty mods.
    pub fn evaluate_detected_play(&mut self, replay: Option<Replay>) -> Detection {
        self.controls_enabled = true;
        let Some(recommendation) = self.recommendation.clone() else {
            self.error("No map recommended yet.");
            return Detection::NoRecommendation;
        };
        let Some(replay) = replay else {
            self.info("No new play found for the recommended map. Keep playing!");
            return Detection::NoPlay;
        };
        if replay.beatmap_md5 != recommendation.beatmap_hash {
            self.info("No new play found for the recommended map. Keep playing!");
            return Detection::WrongMap;
        }
        if !core_mods_match(recommendation.mods, replay.mods_used) {
            self.info("Play detected, but mods don't match. Keep playing!");
            return Detection::ModMismatch;
        }

        let verdict = evaluate_play(&replay, &recommendation.goal);
        info!(passed = verdict.passed(), reasons = ?verdict.reasons, "play evaluated");
        let report = self.apply_outcome(verdict.passed(), &verdict.message());
        self.last_detection = Some(DetectedPlay {
            replay,
            verdict: verdict.clone(),
        });
        Detection::Evaluated { verdict, report }
    }

    pub fn report_manual(&mut self, outcome: ManualOutcome) -> Option<OutcomeReport> {
        let (passed, message) = match outcome {
            ManualOutcome::Passed => (true, "Goal Passed!"),
            ManualOutcome::Failed => (false, "Goal Failed."),
            ManualOutcome::Skipped => (false, "Map skipped."),
        };
        self.last_detection = None;
        self.apply_outcome(passed, message)
    }

    fn apply_outcome(&mut self, passed: bool, message: &str) -> Option<OutcomeReport> {
        let Some(report) = self.planner.record_outcome(passed) else {
            self.error("No active session.");
            return None;
        };
        self.reset_map_finder();

        let sr = report.target_star_rating;
        match report.effect {
            OutcomeEffect::SessionComplete => self.info("Session Complete! Congratulations!"),
            OutcomeEffect::StepAdvanced { .. } => self.info(format!(
                "Step complete! SR is now {sr:.1}. New step started! Find a map to begin."
            )),
            OutcomeEffect::StepProgressed { .. } => {
                self.info(format!("{message} SR is now {sr:.1}. Find the next map."))
            }
        }
        Some(report)
    }

    pub fn suggest_sr(&mut self) -> Option<f64> {
        let Some(step) = self.planner.current_step() else {
            self.error("Start a session to get an SR suggestion.");
            return None;
        };
        let mods = step.mods().bits();
        let Some(player) = self.player.clone() else {
            self.error("Please select a player first.");
            return None;
        };
        let focus = self.focus;

        match self.backend.suggest_sr(&player, mods, focus) {
            Ok(Some(suggestion)) => {
                let sr = round1(suggestion.suggested_sr);
                self.planner.set_target_star_rating(sr);
                self.info(format!(
                    "Suggestion based on your last {} {}-focused plays: {:.2} ★",
                    suggestion.plays_considered,
                    focus.as_str(),
                    suggestion.suggested_sr
                ));
                Some(sr)
            }
            Ok(None) => {
                self.info("No plays found with this mod combination.");
                None
            }
            Err(err) => {
                self.error(format!("Error: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ProgressStatus, SrSuggestion};
    use crate::mods::{DOUBLE_TIME, HARD_ROCK, HIDDEN, Mod, SCORE_V2};
    use crate::session::test_support::FakeBackend;

    fn hidden() -> ModSet {
        let mut mods = ModSet::new();
        mods.insert(Mod::Hidden);
        mods
    }

    fn beatmap(hash: &str) -> Beatmap {
        Beatmap {
            md5_hash: hash.to_string(),
            title: Some("Song".to_string()),
            ..Beatmap::default()
        }
    }

    fn replay(hash: &str, n300: u32, n100: u32, mods: u32) -> Replay {
        Replay {
            beatmap_md5: hash.to_string(),
            player_name: "peppy".to_string(),
            num_300s: n300,
            num_100s: n100,
            mods_used: mods,
            ..Replay::default()
        }
    }

    fn scan_status(status: TaskStatus) -> ProgressStatus {
        ProgressStatus {
            scan: TaskProgress {
                status,
                ..TaskProgress::default()
            },
            ..ProgressStatus::default()
        }
    }

    fn active_controller(count: u32, goal: Goal) -> TrainingController<FakeBackend> {
        let mut controller =
            TrainingController::new(FakeBackend::default(), 5.0, 200.0).with_poll_interval(Duration::ZERO);
        controller.set_player(Some("peppy".to_string()));
        assert!(controller.add_step(count, hidden(), goal));
        controller.start_session().expect("session should start");
        controller
    }

    fn found(controller: &mut TrainingController<FakeBackend>, hash: &str) {
        controller
            .backend()
            .push_recommendation(Ok(Some(beatmap(hash))));
        assert!(matches!(controller.find_map(), FindOutcome::Found(_)));
    }

    #[test]
    fn scenario_pass_completes_single_step_session() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");

        // 94 x 300 + 6 x 100 = 96%
        let detection =
            controller.evaluate_detected_play(Some(replay("map-a", 94, 6, HIDDEN)));
        let Detection::Evaluated { verdict, report } = detection else {
            panic!("expected evaluation, got {detection:?}");
        };
        assert!(verdict.passed());
        let report = report.expect("outcome recorded");
        assert_eq!(report.effect, OutcomeEffect::SessionComplete);
        assert_eq!(report.target_star_rating, 5.1);
        assert!(!controller.planner().is_active());
        assert!(controller.status().text().starts_with("Session Complete"));
    }

    #[test]
    fn scenario_low_accuracy_fails_and_lowers_target() {
        let mut controller = active_controller(2, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");

        // 85 x 300 + 15 x 100 = 27000 / 30000 = 90%
        let detection =
            controller.evaluate_detected_play(Some(replay("map-a", 85, 15, HIDDEN)));
        let Detection::Evaluated { verdict, report } = detection else {
            panic!("expected evaluation");
        };
        assert!(!verdict.passed());
        assert!(
            verdict
                .message()
                .contains("Accuracy was 90.00% (needed 95%)")
        );
        assert_eq!(report.expect("recorded").target_star_rating, 4.9);
        assert!(controller.status().text().contains("Accuracy was 90.00% (needed 95%)"));
        assert!(controller.recommendation().is_none());
    }

    #[test]
    fn scenario_different_beatmap_records_nothing() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");

        let detection =
            controller.evaluate_detected_play(Some(replay("map-b", 100, 0, HIDDEN)));
        assert_eq!(detection, Detection::WrongMap);
        assert!(controller.planner().is_active());
        assert_eq!(controller.planner().progress().map(|p| p.completed), Some(0));
        assert_eq!(controller.planner().target_star_rating(), 5.0);
        assert!(controller.status().text().contains("Keep playing"));
        assert!(controller.recommendation().is_some());
    }

    #[test]
    fn cosmetic_mods_are_ignored_but_core_mods_must_match() {
        let mut controller = active_controller(3, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");

        assert_eq!(
            controller.evaluate_detected_play(Some(replay("map-a", 100, 0, HARD_ROCK))),
            Detection::ModMismatch
        );
        assert_eq!(
            controller.evaluate_detected_play(Some(replay("map-a", 100, 0, DOUBLE_TIME))),
            Detection::ModMismatch
        );
        // Recommended HD, played NM + V2: no core difference.
        assert!(matches!(
            controller.evaluate_detected_play(Some(replay("map-a", 100, 0, SCORE_V2))),
            Detection::Evaluated { .. }
        ));
    }

    #[test]
    fn scenario_reroll_cap_refuses_fourth_search_without_request() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        found(&mut controller, "map-b");
        found(&mut controller, "map-c");
        assert_eq!(controller.finder().reroll_count(), 2);
        assert_eq!(controller.find_button_label(), "Reroll (0 left)");

        assert_eq!(
            controller.find_map(),
            FindOutcome::Refused(FinderError::RerollLimit)
        );
        let queries = controller.backend().recommend_queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].exclude, vec!["map-a", "map-b"]);
        assert_eq!(controller.finder().reroll_count(), 3);
    }

    #[test]
    fn changing_focus_allows_searching_again() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        for hash in ["a", "b", "c"] {
            found(&mut controller, hash);
        }
        controller.set_focus(SkillFocus::Speed);
        found(&mut controller, "d");
        assert_eq!(controller.finder().reroll_count(), 0);
        assert_eq!(controller.backend().recommend_queries()[3].focus, SkillFocus::Speed);
    }

    #[test]
    fn recommend_error_keeps_controls_usable() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        controller
            .backend()
            .push_recommendation(Err("connection refused".to_string()));
        assert!(matches!(controller.find_map(), FindOutcome::Failed(_)));
        assert!(controller.controls_enabled());
        assert!(controller.status().is_error());
    }

    #[test]
    fn find_map_requires_active_session() {
        let mut controller = TrainingController::new(FakeBackend::default(), 5.0, 200.0);
        assert_eq!(controller.find_map(), FindOutcome::NotActive);
        assert!(controller.backend().recommend_queries().is_empty());
    }

    #[test]
    fn completed_scan_fetches_and_evaluates_latest_play() {
        let mut controller = active_controller(2, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");

        controller
            .backend()
            .push_progress(Ok(scan_status(TaskStatus::Running)));
        controller
            .backend()
            .push_progress(Ok(scan_status(TaskStatus::Complete)));
        controller
            .backend()
            .push_latest(Ok(Some(replay("map-a", 100, 0, HIDDEN))));

        let now = Instant::now();
        assert!(controller.check_for_new_play(now));
        assert!(!controller.controls_enabled());
        assert_eq!(controller.poll(now), None);
        assert!(controller.is_polling());

        let detection = controller.poll(now).expect("scan finished");
        assert!(matches!(detection, Detection::Evaluated { ref verdict, .. } if verdict.passed()));
        assert!(controller.controls_enabled());
        assert!(!controller.is_polling());
        assert_eq!(controller.backend().latest_players(), vec!["peppy"]);
        assert_eq!(controller.planner().progress().map(|p| p.completed), Some(1));
        assert!(controller.last_detection().is_some());
    }

    #[test]
    fn failed_scan_and_failed_poll_reenable_controls() {
        let mut controller = active_controller(2, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        let now = Instant::now();

        controller
            .backend()
            .push_progress(Ok(scan_status(TaskStatus::Error)));
        controller.check_for_new_play(now);
        assert_eq!(controller.poll(now), None);
        assert!(controller.controls_enabled());
        assert_eq!(controller.status().text(), "Scan failed.");

        controller
            .backend()
            .push_progress(Err("server went away".to_string()));
        controller.check_for_new_play(now);
        assert_eq!(controller.poll(now), None);
        assert!(controller.controls_enabled());
        assert!(controller.status().is_error());
        assert!(controller.status().text().contains("server went away"));
        assert!(!controller.is_polling());
        assert_eq!(controller.poll(now), None);
        assert_eq!(controller.backend().progress_calls(), 2);
    }

    #[test]
    fn scan_checks_the_player_who_started_it() {
        let mut controller = active_controller(2, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        controller
            .backend()
            .push_progress(Ok(scan_status(TaskStatus::Complete)));
        controller
            .backend()
            .push_latest(Ok(Some(replay("map-a", 100, 0, HIDDEN))));

        let now = Instant::now();
        assert!(controller.check_for_new_play(now));
        controller.set_player(Some("mrekk".to_string()));

        assert!(controller.poll(now).is_some());
        assert_eq!(controller.backend().latest_players(), vec!["peppy"]);
    }

    #[test]
    fn clearing_player_mid_scan_still_checks_scan_owner() {
        let mut controller = active_controller(2, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        controller
            .backend()
            .push_progress(Ok(scan_status(TaskStatus::Complete)));
        controller.backend().push_latest(Ok(None));

        let now = Instant::now();
        assert!(controller.check_for_new_play(now));
        controller.set_player(None);

        assert_eq!(controller.poll(now), Some(Detection::NoPlay));
        assert!(controller.controls_enabled());
        assert!(!controller.is_polling());
        assert_eq!(controller.backend().latest_players(), vec!["peppy"]);
        assert!(controller.status().text().contains("Keep playing"));
    }

    #[test]
    fn deactivate_stops_scan_and_restores_controls() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        let now = Instant::now();
        assert!(controller.check_for_new_play(now));
        assert!(controller.is_polling());
        assert!(controller.scan_progress().is_some());

        controller.deactivate();
        assert!(!controller.is_polling());
        assert!(controller.controls_enabled());
        assert!(controller.scan_progress().is_none());
        assert_eq!(controller.poll(now), None);
        assert_eq!(controller.backend().progress_calls(), 0);
        assert!(controller.planner().is_active());
    }

    #[test]
    fn scan_start_failure_is_surfaced() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        controller
            .backend()
            .push_scan(Err("Scan already in progress.".to_string()));

        assert!(!controller.check_for_new_play(Instant::now()));
        assert!(controller.controls_enabled());
        assert!(controller.status().text().contains("Scan already in progress."));
        assert!(!controller.is_polling());
    }

    #[test]
    fn check_for_play_requires_player() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        controller.set_player(None);
        assert!(!controller.check_for_new_play(Instant::now()));
        assert_eq!(controller.backend().scan_calls(), 0);
        assert_eq!(controller.status().text(), "Please select a player first.");
    }

    #[test]
    fn manual_outcomes_advance_steps() {
        let mut controller = TrainingController::new(FakeBackend::default(), 5.0, 200.0);
        controller.add_step(1, hidden(), Goal::new(Some(95.0), None, false, None));
        controller.add_step(1, ModSet::new(), Goal::new(None, Some(3), false, None));
        controller.start_session().unwrap();

        let report = controller
            .report_manual(ManualOutcome::Skipped)
            .expect("active");
        assert_eq!(report.effect, OutcomeEffect::StepAdvanced { next_index: 1 });
        assert!(controller.status().text().starts_with("Step complete! SR is now 4.9."));

        let report = controller
            .report_manual(ManualOutcome::Passed)
            .expect("active");
        assert_eq!(report.effect, OutcomeEffect::SessionComplete);
        assert_eq!(controller.report_manual(ManualOutcome::Passed), None);
    }

    #[test]
    fn end_session_stops_polling_and_clears_plan() {
        let mut controller = active_controller(3, Goal::new(Some(95.0), None, false, None));
        found(&mut controller, "map-a");
        controller.check_for_new_play(Instant::now());
        assert!(controller.is_polling());

        controller.end_session();
        assert!(!controller.is_polling());
        assert!(controller.planner().queue().is_empty());
        assert!(controller.recommendation().is_none());
        assert_eq!(controller.status().text(), "Session ended.");
    }

    #[test]
    fn suggestion_updates_target_star_rating() {
        let mut controller = active_controller(1, Goal::new(Some(95.0), None, false, None));
        controller.backend().push_suggestion(Ok(Some(SrSuggestion {
            suggested_sr: 6.26,
            plays_considered: 40,
        })));

        assert_eq!(controller.suggest_sr(), Some(6.3));
        assert_eq!(controller.planner().target_star_rating(), 6.3);
        assert_eq!(
            controller.status().text(),
            "Suggestion based on your last 40 balanced-focused plays: 6.26 ★"
        );
    }
}
