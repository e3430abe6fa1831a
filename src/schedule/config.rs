//! Scheduler configuration.

use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::formulation::{BONUS_WEIGHT, OVERTREATMENT_FACTOR, REQUIRED_WEIGHT};
use crate::problem::LunchPolicy;

/// Configuration for a scheduling run.
///
/// Deserializes from partial records; missing fields take their defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_therapy::schedule::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_time_limit(Duration::from_secs(30))
///     .with_weights(5.0, 1.0)
///     .with_stop_after_first(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Solve budget in seconds.
    pub time_limit_secs: f64,

    /// Objective weight of minutes that meet a day's requirement.
    pub required_weight: f64,

    /// Objective weight of minutes beyond any requirement.
    pub bonus_weight: f64,

    /// Daily minutes of a type may reach at most this multiple of the
    /// requirement (and never more than a full day).
    pub overtreatment_factor: f64,

    /// Clock time of slot 0, used for session time strings.
    pub day_start: NaiveTime,

    /// Accept the first feasible schedule instead of searching on.
    pub stop_after_first: bool,

    /// Maximum number of search nodes. `None` = unbounded.
    pub node_limit: Option<u64>,

    /// Treatment of inverted or out-of-range lunch windows at load time.
    pub lunch_policy: LunchPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 300.0,
            required_weight: REQUIRED_WEIGHT,
            bonus_weight: BONUS_WEIGHT,
            overtreatment_factor: OVERTREATMENT_FACTOR,
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            stop_after_first: false,
            node_limit: None,
            lunch_policy: LunchPolicy::Lenient,
        }
    }
}

impl SchedulerConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs_f64();
        self
    }

    pub fn with_weights(mut self, required: f64, bonus: f64) -> Self {
        self.required_weight = required;
        self.bonus_weight = bonus;
        self
    }

    pub fn with_overtreatment_factor(mut self, factor: f64) -> Self {
        self.overtreatment_factor = factor;
        self
    }

    pub fn with_day_start(mut self, start: NaiveTime) -> Self {
        self.day_start = start;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn with_lunch_policy(mut self, policy: LunchPolicy) -> Self {
        self.lunch_policy = policy;
        self
    }

    /// Solve budget as a [`Duration`]. Call after [`validate`](Self::validate);
    /// budgets too long to represent saturate at [`Duration::MAX`].
    pub fn time_limit(&self) -> Duration {
        if self.time_limit_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.time_limit_secs).unwrap_or(Duration::MAX)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.time_limit_secs.is_finite() || self.time_limit_secs < 0.0 {
            return Err("time_limit_secs must be finite and >= 0".into());
        }
        if Duration::try_from_secs_f64(self.time_limit_secs).is_err() {
            return Err(format!(
                "time_limit_secs must be at most {}",
                Duration::MAX.as_secs_f64()
            ));
        }
        if !self.required_weight.is_finite() || self.required_weight < 0.0 {
            return Err("required_weight must be finite and >= 0".into());
        }
        if !self.bonus_weight.is_finite() || self.bonus_weight < 0.0 {
            return Err("bonus_weight must be finite and >= 0".into());
        }
        if !self.overtreatment_factor.is_finite() || self.overtreatment_factor < 0.0 {
            return Err("overtreatment_factor must be finite and >= 0".into());
        }
        Ok(())
    }
}
