mod controller;
mod finder;
mod goal;
mod planner;
mod poller;
#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{ManualOutcome, StatusLine, TrainingController};
pub use goal::Goal;
pub use planner::MIN_TARGET_STAR_RATING;
pub use poller::{DEFAULT_POLL_INTERVAL, PollOutcome, ProgressPoller};
