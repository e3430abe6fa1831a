//! Scheduling input: patients, therapists, therapy types, days and slots.
//!
//! [`RawProblem`] mirrors the serialized record produced by data loaders;
//! [`ProblemData`] is the validated, immutable form every other module
//! consumes. Validation happens once, before any model is built.

mod data;
mod error;
mod raw;

pub use data::{Dimensions, LunchPolicy, LunchWindow, ProblemData};
pub use error::{ProblemError, ProblemResult};
pub use raw::RawProblem;
