//! Run orchestration and scheduling.
//!
//! A run walks every selected downloader in order, reseeds its candidates
//! one at a time and folds the results into the statistics store.

mod runner;
mod schedule;
mod types;

pub use runner::RunOrchestrator;
pub use schedule::{JobHandle, JobScheduler, Schedule, ScheduleError, RUN_ONCE_DELAY};
pub use types::{ClientRunResult, ClientSkipReason, OrchestratorError, RunSummary};
