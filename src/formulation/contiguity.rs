//! Gap-free treatment blocks.
//!
//! For one `(patient, therapist, therapy, day)` the assigned slots, with
//! lunch slots removed from the ordering, must form a single run. A subset
//! of a totally ordered set is an interval exactly when no ordered triple
//! `s1 < s2 < s3` has `s1` and `s3` in the subset but not `s2`, so the rule
//! is emitted as one clause per triple:
//!
//! ```text
//! X[s1] ∧ X[s3] ⇒ X[s2]
//! ```
//!
//! Triples whose outer slots are forced to zero are already satisfied and
//! are skipped. A middle slot forced to zero is kept: it forbids using
//! both sides of it.

use crate::cp::CpModel;
use crate::problem::ProblemData;

use super::space::{SlotKey, VariableSpace};

/// Emits the block rule for one quadruple. Returns the number of clauses.
pub fn enforce_block(
    model: &mut CpModel,
    space: &VariableSpace,
    data: &ProblemData,
    patient: usize,
    therapist: usize,
    therapy: usize,
    day: usize,
) -> usize {
    let keys: Vec<SlotKey> = working_slots(data)
        .map(|slot| SlotKey::new(patient, therapist, therapy, day, slot))
        .collect();

    let mut emitted = 0;
    for (i, &first) in keys.iter().enumerate() {
        if !space.is_live(first) {
            continue;
        }
        for (j, &last) in keys.iter().enumerate().skip(i + 2) {
            if !space.is_live(last) {
                continue;
            }
            let outer = [space.var(first).lit(), space.var(last).lit()];
            for &middle in &keys[i + 1..j] {
                model.add_implication(&outer, space.var(middle).lit());
                emitted += 1;
            }
        }
    }
    emitted
}

/// Slots of a day that take part in block ordering (lunch removed).
pub fn working_slots(data: &ProblemData) -> impl Iterator<Item = usize> + '_ {
    (0..data.dims().slots_per_day).filter(move |&s| !data.is_lunch(s))
}

/// Whether `slots` (any order, lunch slots ignored) form one run over the
/// working slots of a day. Empty and singleton sets are runs.
pub fn is_gap_free(data: &ProblemData, slots: &[usize]) -> bool {
    let order: Vec<usize> = working_slots(data).collect();
    let mut positions: Vec<usize> = slots
        .iter()
        .filter(|&&s| !data.is_lunch(s))
        .filter_map(|s| order.iter().position(|o| o == s))
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions.windows(2).all(|w| w[1] == w[0] + 1)
}
