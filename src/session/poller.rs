use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::{ProgressStatus, Task, TaskStatus, TrackerBackend};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of one poll tick. `snapshot` is the single status response the
/// tick was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct PollTick {
    pub snapshot: ProgressStatus,
    pub finished: Vec<(Task, TaskStatus)>,
    pub stopped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Not polling, or the next tick is not due yet.
    Idle,
    Tick(PollTick),
    /// The status request failed. The poller has stopped itself.
    Failed(String),
}

/// Fixed-delay status poller for long-running server tasks. One instance
/// serves the whole process; starting it again replaces any earlier run.
#[derive(Debug, Clone)]
pub struct ProgressPoller {
    interval: Duration,
    next_due: Option<Instant>,
    last_status: BTreeMap<Task, TaskStatus>,
}

impl Default for ProgressPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            next_due: None,
            last_status: BTreeMap::new(),
        }
    }
}

impl ProgressPoller {
    /// Begins tracking `tasks`, which the caller has just started on the
    /// server. They are assumed to be running until a tick says otherwise.
    pub fn start(&mut self, tasks: &[Task], interval: Duration, now: Instant) {
        if self.is_active() {
            debug!("replacing active poller");
        }
        self.interval = interval;
        self.last_status = tasks
            .iter()
            .map(|task| (*task, TaskStatus::Running))
            .collect();
        self.next_due = (!self.last_status.is_empty()).then(|| now + interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
        self.last_status.clear();
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    #[cfg(test)]
    pub fn tracked(&self) -> impl Iterator<Item = Task> + '_ {
        self.last_status.keys().copied()
    }

    pub fn poll_if_due<B: TrackerBackend + ?Sized>(
        &mut self,
        backend: &B,
        now: Instant,
    ) -> PollOutcome {
        if !self.is_due(now) {
            return PollOutcome::Idle;
        }
        self.poll(backend, now)
    }

    /// Runs one tick immediately. Terminal transitions are reported once, on
    /// the tick where a task stops being `running`.
    pub fn poll<B: TrackerBackend + ?Sized>(&mut self, backend: &B, now: Instant) -> PollOutcome {
        if !self.is_active() {
            return PollOutcome::Idle;
        }

        let snapshot = match backend.progress_status() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "progress poll failed, stopping");
                self.stop();
                return PollOutcome::Failed(err.to_string());
            }
        };

        let mut finished = Vec::new();
        for (task, previous) in self.last_status.iter_mut() {
            let current = snapshot.task(*task).status;
            if previous.is_running() && !current.is_running() {
                info!(task = task.label(), status = current.label(), "task finished");
                finished.push((*task, current));
            }
            *previous = current;
        }

        let any_running = self.last_status.values().any(|status| status.is_running());
        if any_running {
            self.next_due = Some(now + self.interval);
        } else {
            self.stop();
        }

        PollOutcome::Tick(PollTick {
            snapshot,
            finished,
            stopped: !any_running,
        })
    }
}
