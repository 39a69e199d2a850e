mod actions;
mod render;
mod session;

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Task, TaskProgress, TrackerBackend};
use crate::db::{Database, Preferences};
use crate::mods::ModSet;
use crate::session::{Goal, MIN_TARGET_STAR_RATING, TrainingController};

pub(crate) use self::actions::{KeyOutcome, handle_key};
use self::render::draw_tui;
use self::session::TuiSession;

pub(crate) const STAR_RATING_NUDGE: f64 = 0.1;
pub(crate) const BPM_NUDGE: f64 = 5.0;
pub(crate) const MIN_BPM: f64 = 60.0;
const DEFAULT_STEP_COUNT: &str = "5";
const INPUT_POLL: Duration = Duration::from_millis(150);

/// In-process notifications, drained once per loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AppEvent {
    DataChanged,
    TaskStarted(Task),
    ProgressUpdated(TaskProgress),
    TargetsChanged,
    GoalChanged,
    PlayerChanged,
    ViewActivated,
    ViewDeactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormField {
    Count,
    Accuracy,
    Misses,
    Score,
}

impl FormField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Count => "Maps",
            Self::Accuracy => "Min Acc %",
            Self::Misses => "Max Misses",
            Self::Score => "Min Score",
        }
    }

    pub(crate) fn next(self) -> Self {
        match self {
            Self::Count => Self::Accuracy,
            Self::Accuracy => Self::Misses,
            Self::Misses => Self::Score,
            Self::Score => Self::Count,
        }
    }
}

/// The "add step" form of the planner screen. Text fields hold raw input;
/// parsing happens when the step is added.
#[derive(Debug, Clone)]
pub(crate) struct PlanForm {
    pub(crate) count: String,
    pub(crate) accuracy: String,
    pub(crate) misses: String,
    pub(crate) score: String,
    pub(crate) use_score_v2: bool,
    pub(crate) mods: ModSet,
    pub(crate) field: FormField,
}

impl PlanForm {
    pub(crate) fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            count: DEFAULT_STEP_COUNT.to_string(),
            accuracy: prefs.goal_accuracy.map(|v| v.to_string()).unwrap_or_default(),
            misses: prefs.goal_misses.map(|v| v.to_string()).unwrap_or_default(),
            score: prefs.goal_score.map(|v| v.to_string()).unwrap_or_default(),
            use_score_v2: prefs.goal_score.is_some(),
            mods: ModSet::new(),
            field: FormField::Count,
        }
    }

    pub(crate) fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Count => &self.count,
            FormField::Accuracy => &self.accuracy,
            FormField::Misses => &self.misses,
            FormField::Score => &self.score,
        }
    }

    fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Count => &mut self.count,
            FormField::Accuracy => &mut self.accuracy,
            FormField::Misses => &mut self.misses,
            FormField::Score => &mut self.score,
        }
    }

    /// Only the accuracy field takes a decimal point.
    pub(crate) fn push_char(&mut self, ch: char) {
        let field = self.field;
        let accepts = ch.is_ascii_digit() || (ch == '.' && field == FormField::Accuracy);
        let value = self.value_mut(field);
        if accepts && value.len() < 12 {
            value.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        let field = self.field;
        self.value_mut(field).pop();
    }

    pub(crate) fn step_count(&self) -> u32 {
        self.count.trim().parse().unwrap_or(0)
    }

    pub(crate) fn goal(&self) -> Goal {
        Goal::new(
            self.accuracy.trim().parse().ok(),
            self.misses.trim().parse().ok(),
            self.use_score_v2,
            self.score.trim().parse().ok(),
        )
    }
}

pub(crate) struct TrainerState<B: TrackerBackend> {
    pub(crate) controller: TrainingController<B>,
    pub(crate) form: PlanForm,
    pub(crate) players: Vec<String>,
    pub(crate) selected_step: Option<usize>,
    events: VecDeque<AppEvent>,
    last_targets: (f64, f64),
    last_progress: Option<TaskProgress>,
}

impl<B: TrackerBackend> TrainerState<B> {
    pub(crate) fn new(backend: B, prefs: &Preferences, players: Vec<String>) -> Self {
        let mut controller =
            TrainingController::new(backend, prefs.target_star_rating, prefs.target_max_bpm);
        let player = prefs
            .player_name
            .clone()
            .filter(|name| players.contains(name))
            .or_else(|| players.first().cloned());
        controller.set_player(player);
        Self {
            controller,
            form: PlanForm::from_preferences(prefs),
            players,
            selected_step: None,
            events: VecDeque::from([AppEvent::ViewActivated]),
            last_targets: (prefs.target_star_rating, prefs.target_max_bpm),
            last_progress: None,
        }
    }

    pub(crate) fn push_event(&mut self, event: AppEvent) {
        self.events.push_back(event);
    }

    pub(crate) fn take_events(&mut self) -> Vec<AppEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn nudge_star_rating(&mut self, delta: f64) {
        let current = self.controller.planner().target_star_rating();
        self.controller
            .set_target_star_rating((current + delta).max(MIN_TARGET_STAR_RATING));
    }

    pub(crate) fn nudge_max_bpm(&mut self, delta: f64) {
        let current = self.controller.planner().target_max_bpm();
        self.controller.set_target_max_bpm((current + delta).max(MIN_BPM));
    }

    pub(crate) fn cycle_focus(&mut self) {
        let next = self.controller.focus().next();
        self.controller.set_focus(next);
    }

    pub(crate) fn cycle_player(&mut self) {
        if self.players.is_empty() {
            return;
        }
        let next = match self
            .controller
            .player()
            .and_then(|name| self.players.iter().position(|p| p == name))
        {
            Some(idx) => (idx + 1) % self.players.len(),
            None => 0,
        };
        self.controller.set_player(Some(self.players[next].clone()));
        self.push_event(AppEvent::PlayerChanged);
    }

    pub(crate) fn add_step_from_form(&mut self) -> bool {
        let added = self.controller.add_step(
            self.form.step_count(),
            self.form.mods.clone(),
            self.form.goal(),
        );
        if added {
            self.form.mods = ModSet::new();
            self.selected_step = Some(self.controller.planner().queue().len() - 1);
            self.push_event(AppEvent::GoalChanged);
        }
        added
    }

    pub(crate) fn remove_selected_step(&mut self) -> bool {
        let Some(idx) = self.selected_step else {
            return false;
        };
        let removed = self.controller.remove_step(idx);
        if removed {
            let len = self.controller.planner().queue().len();
            self.selected_step = (len > 0).then(|| idx.min(len - 1));
        }
        removed
    }

    /// The controller reports a refusal on the status line.
    pub(crate) fn start_session(&mut self) -> bool {
        let started = self.controller.start_session().is_ok();
        if started {
            self.selected_step = None;
        }
        started
    }

    pub(crate) fn check_for_new_play(&mut self, now: Instant) {
        if self.controller.check_for_new_play(now) {
            self.push_event(AppEvent::TaskStarted(Task::Scan));
        }
    }

    /// One loop iteration of the background side: a due poll tick, if any,
    /// and change notifications for whatever it or the last key moved.
    pub(crate) fn tick(&mut self, now: Instant) {
        let detection = self.controller.poll(now);

        let progress = self.controller.scan_progress().cloned();
        if progress != self.last_progress {
            if let Some(progress) = progress.clone() {
                self.push_event(AppEvent::ProgressUpdated(progress));
            }
            self.last_progress = progress;
        }
        if detection.is_some() {
            self.push_event(AppEvent::DataChanged);
        }

        let planner = self.controller.planner();
        let targets = (planner.target_star_rating(), planner.target_max_bpm());
        if targets != self.last_targets {
            self.last_targets = targets;
            self.push_event(AppEvent::TargetsChanged);
        }
    }
}

impl TrainerState<ApiClient> {
    fn reload_players(&mut self) {
        match self.controller.backend().players() {
            Ok(players) => {
                self.players = players;
                if self
                    .controller
                    .player()
                    .is_none_or(|name| !self.players.iter().any(|p| p == name))
                {
                    self.controller.set_player(self.players.first().cloned());
                }
            }
            Err(err) => warn!(error = %err, "failed to reload players"),
        }
    }

    fn drain_events(&mut self, db: &Database) -> Result<()> {
        for event in self.take_events() {
            debug!(?event, "app event");
            match event {
                AppEvent::ViewActivated => info!(
                    players = self.players.len(),
                    player = self.controller.player().unwrap_or("-"),
                    star_rating = self.controller.planner().target_star_rating(),
                    "trainer opened"
                ),
                AppEvent::ViewDeactivated => self.controller.deactivate(),
                AppEvent::DataChanged => self.reload_players(),
                AppEvent::TaskStarted(task) => info!(
                    task = task.label(),
                    player = self.controller.player().unwrap_or("-"),
                    "task started from trainer"
                ),
                AppEvent::ProgressUpdated(progress) => {
                    debug!(status = ?progress.status, summary = %progress.summary(), "scan progress")
                }
                AppEvent::TargetsChanged => db.save_targets(
                    self.controller.planner().target_star_rating(),
                    self.controller.planner().target_max_bpm(),
                )?,
                AppEvent::GoalChanged => {
                    let goal = self.form.goal();
                    db.save_goal(goal.min_accuracy, goal.max_misses, goal.min_score)?
                }
                AppEvent::PlayerChanged => {
                    if let Some(player) = self.controller.player() {
                        db.save_player(player)?;
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn run_tui(client: ApiClient, db: &Database) -> Result<()> {
    let prefs = db.load_preferences()?;
    let players = match client.players() {
        Ok(players) => players,
        Err(err) => {
            warn!(error = %err, "failed to load players");
            Vec::new()
        }
    };
    let mut state = TrainerState::new(client, &prefs, players);

    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    loop {
        state.tick(Instant::now());
        state.drain_events(db)?;

        terminal.draw(|frame| draw_tui(frame, &state))?;

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if handle_key(&mut state, key.code, Instant::now()) == KeyOutcome::Quit {
            state.push_event(AppEvent::ViewDeactivated);
            state.drain_events(db)?;
            break;
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}
