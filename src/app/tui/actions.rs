use std::time::Instant;

use crossterm::event::KeyCode;

use crate::api::TrackerBackend;
use crate::mods::Mod;
use crate::session::ManualOutcome;

use super::{BPM_NUDGE, STAR_RATING_NUDGE, TrainerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyOutcome {
    Continue,
    Quit,
}

fn mod_for_key(ch: char) -> Option<Mod> {
    match ch {
        'e' => Some(Mod::Easy),
        'h' => Some(Mod::Hidden),
        'r' => Some(Mod::HardRock),
        'd' => Some(Mod::DoubleTime),
        't' => Some(Mod::HalfTime),
        'l' => Some(Mod::Flashlight),
        _ => None,
    }
}

pub(crate) fn handle_key<B: TrackerBackend>(
    state: &mut TrainerState<B>,
    code: KeyCode,
    now: Instant,
) -> KeyOutcome {
    if code == KeyCode::Char('q') || code == KeyCode::Esc {
        return KeyOutcome::Quit;
    }

    // Shared by both screens.
    match code {
        KeyCode::Char('+') | KeyCode::Char('=') => {
            state.nudge_star_rating(STAR_RATING_NUDGE);
            return KeyOutcome::Continue;
        }
        KeyCode::Char('-') => {
            state.nudge_star_rating(-STAR_RATING_NUDGE);
            return KeyOutcome::Continue;
        }
        KeyCode::Char(']') => {
            state.nudge_max_bpm(BPM_NUDGE);
            return KeyOutcome::Continue;
        }
        KeyCode::Char('[') => {
            state.nudge_max_bpm(-BPM_NUDGE);
            return KeyOutcome::Continue;
        }
        KeyCode::Char('o') => {
            state.cycle_focus();
            return KeyOutcome::Continue;
        }
        // The scan in flight belongs to the current player.
        KeyCode::Char('u') => {
            if state.controller.controls_enabled() {
                state.cycle_player();
            }
            return KeyOutcome::Continue;
        }
        _ => {}
    }

    if state.controller.planner().is_active() {
        handle_session_key(state, code, now);
    } else {
        handle_planning_key(state, code);
    }
    KeyOutcome::Continue
}

fn handle_planning_key<B: TrackerBackend>(state: &mut TrainerState<B>, code: KeyCode) {
    match code {
        KeyCode::Tab => state.form.field = state.form.field.next(),
        KeyCode::Backspace => state.form.backspace(),
        KeyCode::Char('v') => state.form.use_score_v2 = !state.form.use_score_v2,
        KeyCode::Char('a') | KeyCode::Enter => {
            state.add_step_from_form();
        }
        KeyCode::Char('x') | KeyCode::Delete => {
            state.remove_selected_step();
        }
        KeyCode::Char('s') => {
            state.start_session();
        }
        KeyCode::Up => {
            if let Some(selected) = state.selected_step {
                state.selected_step = Some(selected.saturating_sub(1));
            }
        }
        KeyCode::Down => {
            let len = state.controller.planner().queue().len();
            if len > 0 {
                let next = state.selected_step.map_or(0, |s| (s + 1).min(len - 1));
                state.selected_step = Some(next);
            }
        }
        KeyCode::Char(ch) => {
            if let Some(m) = mod_for_key(ch) {
                state.form.mods.toggle(m);
            } else {
                state.form.push_char(ch);
            }
        }
        _ => {}
    }
}

fn handle_session_key<B: TrackerBackend>(state: &mut TrainerState<B>, code: KeyCode, now: Instant) {
    // Manual actions wait while a scan is being evaluated.
    let controls = state.controller.controls_enabled();
    let has_map = controls && state.controller.recommendation().is_some();
    match code {
        KeyCode::Char('f') | KeyCode::Enter if controls => {
            state.controller.find_map();
        }
        KeyCode::Char('c') if controls => state.check_for_new_play(now),
        KeyCode::Char('y') if has_map => {
            state.controller.report_manual(ManualOutcome::Passed);
        }
        KeyCode::Char('n') if has_map => {
            state.controller.report_manual(ManualOutcome::Failed);
        }
        KeyCode::Char('k') if has_map => {
            state.controller.report_manual(ManualOutcome::Skipped);
        }
        KeyCode::Char('g') if controls => {
            state.controller.suggest_sr();
        }
        KeyCode::Char('e') => state.controller.end_session(),
        _ => {}
    }
}
