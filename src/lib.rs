//! Therapy session scheduling on a 0/1 constraint model.
//!
//! Assigns therapy sessions to patients over a multi-day horizon: each
//! session gets a therapist, a therapy type, a day and a slot. The model
//! maximizes efficiency-weighted treatment minutes, with minutes that meet
//! a day's requirement weighted above extra minutes, subject to:
//!
//! - eligibility, therapist capability, duty hours and the lunch break
//! - one patient per therapist slot and one therapy per patient slot
//! - a daily cap of 150% of the required minutes
//! - continuity of care: one therapist per patient and therapy type
//! - gap-free treatment blocks on days with a requirement
//!
//! # Modules
//!
//! - **`problem`**: Input record and validation
//! - **`formulation`**: Decision grid, constraints and objective
//! - **`cp`**: Generic 0/1 modeling layer, solver trait, branch-and-bound
//! - **`schedule`**: Pipeline, configuration, decoding, audit, report
//!
//! # Architecture
//!
//! The `cp` layer knows nothing about therapy. Any engine implementing
//! [`cp::CpSolver`] can replace the built-in branch-and-bound; the rest of
//! the pipeline is unchanged.

pub mod cp;
pub mod error;
pub mod formulation;
pub mod problem;
pub mod schedule;

pub use error::{ScheduleError, ScheduleResult};
