use thiserror::Error;

use crate::cp::ModelError;
use crate::problem::ProblemError;

/// Failures of the scheduling pipeline.
///
/// "No schedule exists" and "ran out of time" are not errors: they come
/// back as a [`ScheduleStatus`](crate::schedule::ScheduleStatus) on a
/// normal report.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("malformed input: {0}")]
    Problem(#[from] ProblemError),

    #[error("invalid scheduler configuration: {0}")]
    Config(String),

    #[error("inconsistent model: {0}")]
    Model(#[from] ModelError),

    #[error("solver rejected the model as invalid")]
    SolverRejected,

    #[error("assignment covers {found} variables, model needs {expected}")]
    IncompleteAssignment { expected: usize, found: usize },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
