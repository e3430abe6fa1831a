//! Output records of a scheduling run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cp::SolverStatus;

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    /// Best possible schedule.
    Optimal,
    /// Valid schedule; the budget ran out before optimality was proven.
    Feasible,
    /// No schedule satisfies every rule.
    Infeasible,
    /// The budget ran out before any schedule was found.
    TimeoutNoSolution,
}

impl ScheduleStatus {
    /// Whether the run produced a schedule.
    pub fn is_schedule_found(self) -> bool {
        matches!(self, ScheduleStatus::Optimal | ScheduleStatus::Feasible)
    }

    /// Maps a solver status. `ModelInvalid` has no schedule counterpart.
    pub fn from_solver(status: SolverStatus) -> Option<Self> {
        match status {
            SolverStatus::Optimal => Some(ScheduleStatus::Optimal),
            SolverStatus::Feasible => Some(ScheduleStatus::Feasible),
            SolverStatus::Infeasible => Some(ScheduleStatus::Infeasible),
            SolverStatus::Timeout => Some(ScheduleStatus::TimeoutNoSolution),
            SolverStatus::ModelInvalid => None,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScheduleStatus::Optimal => "OPTIMAL",
            ScheduleStatus::Feasible => "FEASIBLE",
            ScheduleStatus::Infeasible => "INFEASIBLE",
            ScheduleStatus::TimeoutNoSolution => "TIMEOUT_NO_SOLUTION",
        };
        f.write_str(name)
    }
}

/// One scheduled slot of therapy. All indices are 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub patient: usize,
    pub day: usize,
    pub slot: usize,
    pub therapist: usize,
    pub therapy: usize,
    /// `slot_length × efficiency[therapist]`.
    pub minutes: f64,
    /// Clock time of the slot start, `HH:MM`.
    pub time: String,
}

/// Sessions and totals for one therapy type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TherapyTotals {
    pub sessions: usize,
    pub minutes: f64,
}

/// Result of a scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub status: ScheduleStatus,
    /// Sum of session minutes.
    pub total_minutes: f64,
    /// `total_minutes / patients`; `None` when there are no patients.
    pub average_minutes_per_patient: Option<f64>,
    pub solve_time_seconds: f64,
    /// Sessions in `(patient, therapist, therapy, day, slot)` order.
    pub schedule: Vec<Session>,
}

impl ScheduleReport {
    /// Report for a run that ended without a schedule.
    pub fn without_schedule(status: ScheduleStatus, solve_time_seconds: f64) -> Self {
        Self {
            status,
            total_minutes: 0.0,
            average_minutes_per_patient: None,
            solve_time_seconds,
            schedule: Vec::new(),
        }
    }

    pub fn is_schedule_found(&self) -> bool {
        self.status.is_schedule_found()
    }

    /// Whether the schedule is proven best. `false` for feasible-only results.
    pub fn is_optimal(&self) -> bool {
        self.status == ScheduleStatus::Optimal
    }

    /// Sessions ordered by day, then patient, then slot.
    pub fn sessions_by_day(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.schedule.iter().collect();
        sessions.sort_by_key(|s| (s.day, s.patient, s.slot));
        sessions
    }

    /// Session count and minutes per therapy type.
    pub fn minutes_by_therapy(&self) -> BTreeMap<usize, TherapyTotals> {
        let mut totals: BTreeMap<usize, TherapyTotals> = BTreeMap::new();
        for session in &self.schedule {
            let entry = totals.entry(session.therapy).or_default();
            entry.sessions += 1;
            entry.minutes += session.minutes;
        }
        totals
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
