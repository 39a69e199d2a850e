use thiserror::Error;
use tracing::info;

use crate::mods::ModSet;
use crate::stats::round1;

use super::goal::Goal;

pub const STAR_RATING_STEP: f64 = 0.1;
pub const MIN_TARGET_STAR_RATING: f64 = 1.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Please enter a valid number of maps for the step.")]
    InvalidCount,
    #[error("Please define at least one goal (Accuracy, Misses, or Score).")]
    NoActiveGoal,
    #[error("The plan cannot be edited while a session is active.")]
    SessionActive,
    #[error("Add at least one step before starting a session.")]
    EmptyQueue,
}

/// One queued step. Fields are private so a queued step cannot be edited in
/// place; remove and re-add it instead.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStep {
    count: u32,
    mods: ModSet,
    goal: Goal,
}

impl SessionStep {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mods(&self) -> &ModSet {
        &self.mods
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepProgress {
    pub index: usize,
    pub completed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeEffect {
    StepProgressed { completed: u32, count: u32 },
    StepAdvanced { next_index: usize },
    SessionComplete,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeReport {
    pub passed: bool,
    pub target_star_rating: f64,
    pub effect: OutcomeEffect,
}

#[derive(Debug, Clone)]
pub struct SessionPlanner {
    queue: Vec<SessionStep>,
    progress: Option<StepProgress>,
    target_star_rating: f64,
    target_max_bpm: f64,
}

impl SessionPlanner {
    pub fn new(target_star_rating: f64, target_max_bpm: f64) -> Self {
        Self {
            queue: Vec::new(),
            progress: None,
            target_star_rating,
            target_max_bpm,
        }
    }

    pub fn queue(&self) -> &[SessionStep] {
        &self.queue
    }

    pub fn is_active(&self) -> bool {
        self.progress.is_some()
    }

    pub fn progress(&self) -> Option<StepProgress> {
        self.progress
    }

    pub fn current_step(&self) -> Option<&SessionStep> {
        self.progress.and_then(|p| self.queue.get(p.index))
    }

    pub fn target_star_rating(&self) -> f64 {
        self.target_star_rating
    }

    pub fn target_max_bpm(&self) -> f64 {
        self.target_max_bpm
    }

    pub fn set_target_star_rating(&mut self, value: f64) {
        self.target_star_rating = value;
    }

    pub fn set_target_max_bpm(&mut self, value: f64) {
        self.target_max_bpm = value;
    }

    pub fn add_step(&mut self, count: u32, mods: ModSet, goal: Goal) -> Result<(), PlannerError> {
        if self.is_active() {
            return Err(PlannerError::SessionActive);
        }
        if count < 1 {
            return Err(PlannerError::InvalidCount);
        }
        if !goal.is_active() {
            return Err(PlannerError::NoActiveGoal);
        }
        self.queue.push(SessionStep { count, mods, goal });
        Ok(())
    }

    /// No-op while a session is active or when `index` is out of range.
    pub fn remove_step(&mut self, index: usize) -> bool {
        if self.is_active() || index >= self.queue.len() {
            return false;
        }
        self.queue.remove(index);
        true
    }

    pub fn start_session(&mut self) -> Result<(), PlannerError> {
        if self.is_active() {
            return Err(PlannerError::SessionActive);
        }
        if self.queue.is_empty() {
            return Err(PlannerError::EmptyQueue);
        }
        self.progress = Some(StepProgress {
            index: 0,
            completed: 0,
        });
        info!(steps = self.queue.len(), "session started");
        Ok(())
    }

    /// Applies one finished map. Returns `None` when no session is active.
    pub fn record_outcome(&mut self, passed: bool) -> Option<OutcomeReport> {
        let mut progress = self.progress?;
        let count = self.queue.get(progress.index)?.count;

        let delta = if passed {
            STAR_RATING_STEP
        } else {
            -STAR_RATING_STEP
        };
        self.target_star_rating =
            round1(self.target_star_rating + delta).max(MIN_TARGET_STAR_RATING);

        progress.completed += 1;
        let effect = if progress.completed >= count {
            let next_index = progress.index + 1;
            if next_index >= self.queue.len() {
                self.end_session();
                OutcomeEffect::SessionComplete
            } else {
                self.progress = Some(StepProgress {
                    index: next_index,
                    completed: 0,
                });
                OutcomeEffect::StepAdvanced { next_index }
            }
        } else {
            self.progress = Some(progress);
            OutcomeEffect::StepProgressed {
                completed: progress.completed,
                count,
            }
        };

        info!(
            passed,
            target_star_rating = self.target_star_rating,
            ?effect,
            "outcome recorded"
        );
        Some(OutcomeReport {
            passed,
            target_star_rating: self.target_star_rating,
            effect,
        })
    }

    /// Drops all progress and the queue, whatever state the session is in.
    pub fn end_session(&mut self) {
        self.progress = None;
        self.queue.clear();
    }
}
