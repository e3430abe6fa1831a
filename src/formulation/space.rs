//! The five-dimensional decision grid `X[patient, therapist, therapy, day, slot]`.

use crate::cp::{CpModel, VarId};
use crate::problem::{Dimensions, ProblemData};

/// Integer address of one decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub patient: usize,
    pub therapist: usize,
    pub therapy: usize,
    pub day: usize,
    pub slot: usize,
}

impl SlotKey {
    pub fn new(patient: usize, therapist: usize, therapy: usize, day: usize, slot: usize) -> Self {
        Self {
            patient,
            therapist,
            therapy,
            day,
            slot,
        }
    }
}

/// Whether `key` may ever be assigned: the patient needs the type, the
/// therapist delivers it and is on duty, and the slot is not lunch.
pub fn admits(data: &ProblemData, key: SlotKey) -> bool {
    data.is_eligible(key.patient, key.therapy)
        && data.is_capable(key.therapist, key.therapy)
        && data.is_available(key.therapist, key.day, key.slot)
        && !data.is_lunch(key.slot)
}

/// Dense block of decision variables, one per [`SlotKey`].
///
/// Variables are created in row-major `(p, k, t, d, s)` order, so a key
/// maps to its [`VarId`] arithmetically. Keys rejected by [`admits`] are
/// created fixed to `false`; the rest are "live".
#[derive(Debug, Clone)]
pub struct VariableSpace {
    dims: Dimensions,
    base: u32,
    live: Vec<bool>,
}

impl VariableSpace {
    /// Creates the full grid inside `model`.
    pub fn build(model: &mut CpModel, data: &ProblemData) -> Self {
        let dims = data.dims();
        let base = model.var_count() as u32;
        let mut live = Vec::with_capacity(dims.grid_size());

        for p in 0..dims.patients {
            for k in 0..dims.therapists {
                for t in 0..dims.therapy_types {
                    for d in 0..dims.days {
                        for s in 0..dims.slots_per_day {
                            let key = SlotKey::new(p, k, t, d, s);
                            let name = format!("X_p{p}_k{k}_t{t}_d{d}_s{s}");
                            let is_live = admits(data, key);
                            if is_live {
                                model.new_bool_var(name);
                            } else {
                                model.new_fixed_bool(name, false);
                            }
                            live.push(is_live);
                        }
                    }
                }
            }
        }

        Self { dims, base, live }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    fn offset(&self, key: SlotKey) -> usize {
        let Dimensions {
            therapists,
            therapy_types,
            days,
            slots_per_day,
            ..
        } = self.dims;
        (((key.patient * therapists + key.therapist) * therapy_types + key.therapy) * days + key.day)
            * slots_per_day
            + key.slot
    }

    /// Variable for `key`. The key must be within the grid.
    pub fn var(&self, key: SlotKey) -> VarId {
        VarId(self.base + self.offset(key) as u32)
    }

    /// Inverse of [`var`](Self::var); `None` for ids outside the grid.
    pub fn key_of(&self, var: VarId) -> Option<SlotKey> {
        let offset = var.0.checked_sub(self.base)? as usize;
        if offset >= self.live.len() {
            return None;
        }
        let Dimensions {
            therapists,
            therapy_types,
            days,
            slots_per_day,
            ..
        } = self.dims;
        let slot = offset % slots_per_day;
        let rest = offset / slots_per_day;
        let day = rest % days;
        let rest = rest / days;
        let therapy = rest % therapy_types;
        let rest = rest / therapy_types;
        let therapist = rest % therapists;
        let patient = rest / therapists;
        Some(SlotKey::new(patient, therapist, therapy, day, slot))
    }

    pub fn is_live(&self, key: SlotKey) -> bool {
        self.live[self.offset(key)]
    }

    /// Total number of decision variables.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&l| l).count()
    }

    /// Every key, in variable order.
    pub fn keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        (0..self.live.len() as u32).filter_map(move |i| self.key_of(VarId(self.base + i)))
    }

    /// Keys that are not forced to zero, in variable order.
    pub fn live_keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.keys().filter(move |&key| self.is_live(key))
    }
}
