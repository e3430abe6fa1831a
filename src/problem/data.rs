//! Validated, immutable scheduling input.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ProblemError, ProblemResult};
use super::raw::RawProblem;

/// Largest decision grid a model can address with 32-bit variable ids,
/// leaving headroom for auxiliary variables.
const MAX_GRID: u128 = (u32::MAX / 2) as u128;

/// Index ranges of the decision grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub patients: usize,
    pub therapy_types: usize,
    pub therapists: usize,
    pub days: usize,
    pub slots_per_day: usize,
}

impl Dimensions {
    /// `patients × therapists × types × days × slots`.
    pub fn grid_size(&self) -> usize {
        self.patients * self.therapists * self.therapy_types * self.days * self.slots_per_day
    }

    /// Whether any index range is empty.
    pub fn is_empty(&self) -> bool {
        self.grid_size() == 0
    }
}

/// How to treat a lunch window that is inverted or leaves the slot range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LunchPolicy {
    /// Clip the window to the slot range; an inverted window is empty.
    #[default]
    Lenient,
    /// Reject anything but `0 <= start <= end < slots_per_day`.
    Strict,
}

/// Inclusive range of lunch slots, already clipped to the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunchWindow {
    pub first: usize,
    pub last: usize,
}

impl LunchWindow {
    pub fn contains(&self, slot: usize) -> bool {
        (self.first..=self.last).contains(&slot)
    }

    /// Number of lunch slots.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    fn resolve(
        start: i64,
        end: i64,
        slots_per_day: usize,
        policy: LunchPolicy,
    ) -> ProblemResult<Option<Self>> {
        let in_range = 0 <= start && start <= end && (end as u128) < slots_per_day as u128;
        if in_range {
            return Ok(Some(Self {
                first: start as usize,
                last: end as usize,
            }));
        }
        if policy == LunchPolicy::Strict {
            return Err(ProblemError::LunchWindow {
                start,
                end,
                slots_per_day,
            });
        }

        let first = start.max(0);
        let last = end.min(slots_per_day as i64 - 1);
        if first > last {
            return Ok(None);
        }
        warn!(start, end, first, last, "lunch window clipped to the slot range");
        Ok(Some(Self {
            first: first as usize,
            last: last as usize,
        }))
    }
}

/// Scheduling input after validation.
///
/// Flat row-major storage; all accessors take indices in the order the
/// matrices are named in the data model (`R[d,p,t]`, `A[p,t]`,
/// `Capable[k,t]`, `C[k,d,s]`). Indices are assumed in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemData {
    dims: Dimensions,
    slot_length: u32,
    lunch: Option<LunchWindow>,
    requirements: Vec<u32>,
    eligible: Vec<bool>,
    capable: Vec<bool>,
    available: Vec<bool>,
    efficiency: Vec<f64>,
}

impl ProblemData {
    /// Validates a raw record.
    ///
    /// Every array must match the declared counts exactly; flags must be
    /// 0 or 1; efficiencies must be finite and non-negative. Storage is
    /// sized from the arrays actually present, never from declared counts.
    pub fn from_raw(raw: RawProblem, policy: LunchPolicy) -> ProblemResult<Self> {
        let dims = Dimensions {
            patients: raw.num_patients,
            therapy_types: raw.num_therapist_types,
            therapists: raw.num_therapists,
            days: raw.num_days,
            slots_per_day: raw.slots_per_day,
        };

        let grid = dims.patients as u128
            * dims.therapists as u128
            * dims.therapy_types as u128
            * dims.days as u128
            * dims.slots_per_day as u128;
        if grid > MAX_GRID {
            return Err(ProblemError::TooLarge {
                variables: grid,
                limit: MAX_GRID,
            });
        }

        if raw.slot_length == 0 && dims.slots_per_day > 0 {
            return Err(ProblemError::ZeroSlotLength {
                slots_per_day: dims.slots_per_day,
            });
        }

        expect_len("R", dims.days, raw.requirements.len())?;
        let mut requirements = Vec::new();
        for (d, per_patient) in raw.requirements.iter().enumerate() {
            expect_len(&format!("R[{d}]"), dims.patients, per_patient.len())?;
            for (p, per_type) in per_patient.iter().enumerate() {
                expect_len(&format!("R[{d}][{p}]"), dims.therapy_types, per_type.len())?;
                requirements.extend_from_slice(per_type);
            }
        }

        let eligible = flags_2d("A", &raw.eligibility, dims.patients, dims.therapy_types)?;
        let capable = flags_2d(
            "therapist_type",
            &raw.capability,
            dims.therapists,
            dims.therapy_types,
        )?;

        expect_len("C", dims.therapists, raw.availability.len())?;
        let mut available = Vec::new();
        for (k, per_day) in raw.availability.iter().enumerate() {
            expect_len(&format!("C[{k}]"), dims.days, per_day.len())?;
            for (d, per_slot) in per_day.iter().enumerate() {
                let field = format!("C[{k}][{d}]");
                expect_len(&field, dims.slots_per_day, per_slot.len())?;
                for &flag in per_slot {
                    available.push(binary(&field, flag)?);
                }
            }
        }

        expect_len("E", dims.therapists, raw.efficiency.len())?;
        if let Some((therapist, &value)) = raw
            .efficiency
            .iter()
            .enumerate()
            .find(|(_, e)| !e.is_finite() || **e < 0.0)
        {
            return Err(ProblemError::InvalidEfficiency { therapist, value });
        }

        let lunch = LunchWindow::resolve(raw.lunch_start, raw.lunch_end, dims.slots_per_day, policy)?;

        Ok(Self {
            dims,
            slot_length: raw.slot_length,
            lunch,
            requirements,
            eligible,
            capable,
            available,
            efficiency: raw.efficiency,
        })
    }

    /// Parses and validates a JSON input record.
    pub fn from_json(json: &str, policy: LunchPolicy) -> ProblemResult<Self> {
        let raw: RawProblem = serde_json::from_str(json)?;
        Self::from_raw(raw, policy)
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Minutes per slot.
    pub fn slot_length(&self) -> u32 {
        self.slot_length
    }

    pub fn lunch(&self) -> Option<LunchWindow> {
        self.lunch
    }

    pub fn is_lunch(&self, slot: usize) -> bool {
        self.lunch.is_some_and(|w| w.contains(slot))
    }

    /// `R[d,p,t]`.
    pub fn requirement(&self, day: usize, patient: usize, therapy: usize) -> u32 {
        let Dimensions {
            patients,
            therapy_types,
            ..
        } = self.dims;
        self.requirements[(day * patients + patient) * therapy_types + therapy]
    }

    /// `A[p,t]`.
    pub fn is_eligible(&self, patient: usize, therapy: usize) -> bool {
        self.eligible[patient * self.dims.therapy_types + therapy]
    }

    /// `Capable[k,t]`.
    pub fn is_capable(&self, therapist: usize, therapy: usize) -> bool {
        self.capable[therapist * self.dims.therapy_types + therapy]
    }

    /// `C[k,d,s]`.
    pub fn is_available(&self, therapist: usize, day: usize, slot: usize) -> bool {
        let Dimensions {
            days,
            slots_per_day,
            ..
        } = self.dims;
        self.available[(therapist * days + day) * slots_per_day + slot]
    }

    pub fn efficiency(&self, therapist: usize) -> f64 {
        self.efficiency[therapist]
    }

    /// Eligible for the type and a positive requirement on that day.
    pub fn has_requirement(&self, patient: usize, therapy: usize, day: usize) -> bool {
        self.is_eligible(patient, therapy) && self.requirement(day, patient, therapy) > 0
    }

    /// Most minutes of `therapy` patient may receive on `day`:
    /// `floor(min(factor · R, slots_per_day · slot_length))`.
    ///
    /// `None` when the day carries no requirement (no cap applies).
    pub fn treatment_cap(&self, patient: usize, therapy: usize, day: usize, factor: f64) -> Option<i64> {
        if !self.has_requirement(patient, therapy, day) {
            return None;
        }
        let required = self.requirement(day, patient, therapy) as f64;
        let day_minutes = self.dims.slots_per_day as f64 * self.slot_length as f64;
        Some((required * factor).min(day_minutes).floor() as i64)
    }

    /// Minutes a single slot with `therapist` is worth.
    pub fn session_minutes(&self, therapist: usize) -> f64 {
        self.slot_length as f64 * self.efficiency[therapist]
    }
}

impl TryFrom<RawProblem> for ProblemData {
    type Error = ProblemError;

    fn try_from(raw: RawProblem) -> ProblemResult<Self> {
        Self::from_raw(raw, LunchPolicy::Lenient)
    }
}

fn expect_len(field: &str, expected: usize, found: usize) -> ProblemResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ProblemError::DimensionMismatch {
            field: field.to_string(),
            expected,
            found,
        })
    }
}

fn binary(field: &str, value: u8) -> ProblemResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ProblemError::NotBinary {
            field: field.to_string(),
            value,
        }),
    }
}

fn flags_2d(name: &str, rows: &[Vec<u8>], n_rows: usize, n_cols: usize) -> ProblemResult<Vec<bool>> {
    expect_len(name, n_rows, rows.len())?;
    let mut out = Vec::with_capacity(rows.iter().map(Vec::len).sum());
    for (i, row) in rows.iter().enumerate() {
        let field = format!("{name}[{i}]");
        expect_len(&field, n_cols, row.len())?;
        for &flag in row {
            out.push(binary(&field, flag)?);
        }
    }
    Ok(out)
}
