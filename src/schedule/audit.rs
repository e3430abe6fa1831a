//! Independent re-check of a decoded schedule.
//!
//! Works from session records alone, so it can vet schedules from any
//! solver. Checks:
//! 1. Every session is admissible (in range, eligible, capable, on duty, not lunch)
//! 2. No therapist and no patient is booked twice in one slot
//! 3. Daily minutes per patient and type stay within the cap
//! 4. Each patient and type is served by a single therapist
//! 5. Each patient/therapist/type/day block is gap-free

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::formulation::{admits, contiguity, SlotKey};
use crate::problem::ProblemData;

use super::types::Session;

/// A broken scheduling rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("session {0:?} is outside the problem's index ranges")]
    OutOfRange(SlotKey),

    #[error("session {0:?} is not admissible")]
    Inadmissible(SlotKey),

    #[error("therapist {therapist} has {count} sessions on day {day} slot {slot}")]
    TherapistDoubleBooked {
        therapist: usize,
        day: usize,
        slot: usize,
        count: usize,
    },

    #[error("patient {patient} has {count} sessions on day {day} slot {slot}")]
    PatientDoubleBooked {
        patient: usize,
        day: usize,
        slot: usize,
        count: usize,
    },

    #[error("patient {patient} gets {minutes} min of type {therapy} on day {day}; cap is {cap}")]
    OverCap {
        patient: usize,
        therapy: usize,
        day: usize,
        minutes: i64,
        cap: i64,
    },

    #[error("patient {patient} sees therapists {therapists:?} for type {therapy}")]
    SplitCare {
        patient: usize,
        therapy: usize,
        therapists: Vec<usize>,
    },

    #[error("block of patient {patient}, therapist {therapist}, type {therapy} on day {day} has a gap")]
    Gap {
        patient: usize,
        therapist: usize,
        therapy: usize,
        day: usize,
    },
}

/// Checks `sessions` against every scheduling rule.
///
/// Returns all violations found, in the order listed in the module docs.
/// An empty result means the schedule is valid.
pub fn audit(data: &ProblemData, sessions: &[Session], overtreatment_factor: f64) -> Vec<Violation> {
    let dims = data.dims();
    let mut violations = Vec::new();

    let mut keys = Vec::with_capacity(sessions.len());
    for s in sessions {
        let key = SlotKey::new(s.patient, s.therapist, s.therapy, s.day, s.slot);
        let in_range = key.patient < dims.patients
            && key.therapist < dims.therapists
            && key.therapy < dims.therapy_types
            && key.day < dims.days
            && key.slot < dims.slots_per_day;
        if !in_range {
            violations.push(Violation::OutOfRange(key));
            continue;
        }
        if !admits(data, key) {
            violations.push(Violation::Inadmissible(key));
        }
        keys.push(key);
    }

    let mut by_therapist: BTreeMap<(usize, usize, usize), usize> = BTreeMap::new();
    let mut by_patient: BTreeMap<(usize, usize, usize), usize> = BTreeMap::new();
    for key in &keys {
        *by_therapist.entry((key.therapist, key.day, key.slot)).or_default() += 1;
        *by_patient.entry((key.patient, key.day, key.slot)).or_default() += 1;
    }
    for (&(therapist, day, slot), &count) in &by_therapist {
        if count > 1 {
            violations.push(Violation::TherapistDoubleBooked {
                therapist,
                day,
                slot,
                count,
            });
        }
    }
    for (&(patient, day, slot), &count) in &by_patient {
        if count > 1 {
            violations.push(Violation::PatientDoubleBooked {
                patient,
                day,
                slot,
                count,
            });
        }
    }

    let mut daily_slots: BTreeMap<(usize, usize, usize), i64> = BTreeMap::new();
    for key in &keys {
        *daily_slots.entry((key.patient, key.therapy, key.day)).or_default() += 1;
    }
    for (&(patient, therapy, day), &count) in &daily_slots {
        if let Some(cap) = data.treatment_cap(patient, therapy, day, overtreatment_factor) {
            let minutes = count * data.slot_length() as i64;
            if minutes > cap {
                violations.push(Violation::OverCap {
                    patient,
                    therapy,
                    day,
                    minutes,
                    cap,
                });
            }
        }
    }

    let mut carers: BTreeMap<(usize, usize), BTreeSet<usize>> = BTreeMap::new();
    for key in &keys {
        carers
            .entry((key.patient, key.therapy))
            .or_default()
            .insert(key.therapist);
    }
    for (&(patient, therapy), therapists) in &carers {
        if therapists.len() > 1 && data.is_eligible(patient, therapy) {
            violations.push(Violation::SplitCare {
                patient,
                therapy,
                therapists: therapists.iter().copied().collect(),
            });
        }
    }

    let mut blocks: BTreeMap<(usize, usize, usize, usize), Vec<usize>> = BTreeMap::new();
    for key in &keys {
        blocks
            .entry((key.patient, key.therapist, key.therapy, key.day))
            .or_default()
            .push(key.slot);
    }
    for (&(patient, therapist, therapy, day), slots) in &blocks {
        if data.has_requirement(patient, therapy, day) && !contiguity::is_gap_free(data, slots) {
            violations.push(Violation::Gap {
                patient,
                therapist,
                therapy,
                day,
            });
        }
    }

    violations
}
