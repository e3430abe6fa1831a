//! Turns a solved assignment into session records.

use chrono::{Duration, NaiveTime};

use crate::error::{ScheduleError, ScheduleResult};
use crate::formulation::VariableSpace;
use crate::problem::ProblemData;

use super::types::Session;

/// Sessions plus aggregate minutes of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSchedule {
    /// Sessions in variable order `(patient, therapist, therapy, day, slot)`.
    pub sessions: Vec<Session>,
    pub total_minutes: f64,
    /// `None` when the problem has no patients.
    pub average_minutes_per_patient: Option<f64>,
}

/// Decodes the grid variables of `values`.
///
/// Every grid variable set to `true` becomes exactly one session; nothing
/// else does. `values` must cover the whole grid.
pub fn decode(
    data: &ProblemData,
    space: &VariableSpace,
    values: &[bool],
    day_start: NaiveTime,
) -> ScheduleResult<DecodedSchedule> {
    let needed = space
        .keys()
        .last()
        .map_or(0, |key| space.var(key).index() + 1);
    if values.len() < needed {
        return Err(ScheduleError::IncompleteAssignment {
            expected: needed,
            found: values.len(),
        });
    }

    let slot_length = data.slot_length();
    let sessions: Vec<Session> = space
        .keys()
        .filter(|&key| values[space.var(key).index()])
        .map(|key| Session {
            patient: key.patient,
            day: key.day,
            slot: key.slot,
            therapist: key.therapist,
            therapy: key.therapy,
            minutes: data.session_minutes(key.therapist),
            time: slot_time(day_start, key.slot, slot_length),
        })
        .collect();

    let total_minutes: f64 = sessions.iter().map(|s| s.minutes).sum();
    let patients = data.dims().patients;
    let average_minutes_per_patient = (patients > 0).then(|| total_minutes / patients as f64);

    Ok(DecodedSchedule {
        sessions,
        total_minutes,
        average_minutes_per_patient,
    })
}

/// `HH:MM` clock time of `slot`, counted from `day_start`. Wraps past midnight.
pub fn slot_time(day_start: NaiveTime, slot: usize, slot_length: u32) -> String {
    let offset = Duration::minutes(slot as i64 * slot_length as i64);
    let (time, _) = day_start.overflowing_add_signed(offset);
    time.format("%H:%M").to_string()
}
