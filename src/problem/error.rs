use thiserror::Error;

/// Malformed scheduling input, detected before any model is built.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// An array's length disagrees with the declared counts.
    #[error("{field}: expected length {expected}, found {found}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// A 0/1 flag holds some other value.
    #[error("{field}: expected 0 or 1, found {value}")]
    NotBinary { field: String, value: u8 },

    /// Efficiency must be a finite, non-negative multiplier.
    #[error("efficiency of therapist {therapist} is {value}; must be finite and >= 0")]
    InvalidEfficiency { therapist: usize, value: f64 },

    /// Slots exist but have no length.
    #[error("slot_length is 0 while slots_per_day is {slots_per_day}")]
    ZeroSlotLength { slots_per_day: usize },

    /// Lunch window rejected under [`LunchPolicy::Strict`](super::LunchPolicy::Strict).
    #[error("lunch window [{start}, {end}] is not within 0..{slots_per_day}")]
    LunchWindow {
        start: i64,
        end: i64,
        slots_per_day: usize,
    },

    /// The decision grid would not fit the model's variable id space.
    #[error("problem needs {variables} decision variables; limit is {limit}")]
    TooLarge { variables: u128, limit: u128 },

    #[error("invalid problem JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ProblemResult<T> = Result<T, ProblemError>;
