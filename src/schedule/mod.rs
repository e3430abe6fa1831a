//! Running the scheduler and reading its answer.
//!
//! # Key Components
//!
//! - [`TherapyScheduler`]: build → solve → decode pipeline
//! - [`SchedulerConfig`]: budget, objective weights, caps, time anchor
//! - [`decode`]: truth assignment → [`Session`] records and totals
//! - [`audit`]: independent rule check of a list of sessions
//! - [`ScheduleReport`]: the output record

pub mod audit;

mod config;
mod decoder;
mod runner;
mod types;

pub use audit::Violation;
pub use config::SchedulerConfig;
pub use decoder::{decode, slot_time, DecodedSchedule};
pub use runner::TherapyScheduler;
pub use types::{ScheduleReport, ScheduleStatus, Session, TherapyTotals};
