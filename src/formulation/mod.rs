//! The therapy scheduling constraint model.
//!
//! # Key Components
//!
//! - [`VariableSpace`]: the `X[p, k, t, d, s]` decision grid
//! - [`ModelBuilder`]: feasibility rules and the weighted-minutes objective
//! - [`contiguity`]: gap-free treatment blocks
//!
//! # Rules
//!
//! | Rule | Encoding |
//! |------|----------|
//! | eligibility, capability, duty, lunch | variable fixed to `false` |
//! | daily cap `min(1.5·R, day length)` | linear row over the day's slots |
//! | one patient per therapist slot | at-most-one |
//! | one therapy per patient slot | at-most-one |
//! | one therapist per patient and type | reified indicators + at-most-one |
//! | no gaps within a day's block | triple implications |

pub mod contiguity;

mod builder;
mod space;

pub use builder::{
    ContinuityLink, ModelBuilder, ModelStats, TherapyModel, BONUS_WEIGHT, OVERTREATMENT_FACTOR,
    REQUIRED_WEIGHT,
};
pub use space::{admits, SlotKey, VariableSpace};
