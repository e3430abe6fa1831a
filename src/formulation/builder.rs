//! Translates [`ProblemData`] into a [`CpModel`].
//!
//! Emission order:
//! 1. Decision grid, with inadmissible entries fixed to zero
//! 2. Per-day treatment caps
//! 3. One patient per therapist slot, one therapy per patient slot
//! 4. Continuity of care (one therapist per patient and type)
//! 5. Gap-free blocks on days with a requirement
//!
//! Steps 2–5 iterate live variables only.

use serde::Serialize;
use tracing::{debug, info};

use crate::cp::{CpModel, Objective, VarId};
use crate::problem::ProblemData;

use super::contiguity;
use super::space::{SlotKey, VariableSpace};

/// Objective weight of minutes that meet a day's requirement.
pub const REQUIRED_WEIGHT: f64 = 5.0;
/// Objective weight of minutes beyond any requirement.
pub const BONUS_WEIGHT: f64 = 1.0;
/// Daily minutes may exceed the requirement by this factor at most.
pub const OVERTREATMENT_FACTOR: f64 = 1.5;

/// Size of a built model, per constraint family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub decision_vars: usize,
    pub live_vars: usize,
    pub auxiliary_vars: usize,
    pub cap_rows: usize,
    pub therapist_exclusions: usize,
    pub patient_exclusions: usize,
    pub continuity_groups: usize,
    pub contiguity_clauses: usize,
    pub constraints: usize,
}

/// Auxiliary "therapist treats this patient for this type" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityLink {
    pub patient: usize,
    pub therapy: usize,
    pub therapist: usize,
    pub indicator: VarId,
}

/// A built model together with the grid that addresses it.
#[derive(Debug, Clone)]
pub struct TherapyModel {
    pub model: CpModel,
    pub space: VariableSpace,
    pub continuity: Vec<ContinuityLink>,
    pub stats: ModelStats,
}

/// Builds the therapy scheduling model.
///
/// # Examples
///
/// ```
/// use u_therapy::formulation::ModelBuilder;
/// use u_therapy::problem::{ProblemData, RawProblem};
///
/// let mut raw = RawProblem::open(1, 1, 1, 1, 4, 30).with_lunch(2, 2);
/// raw.requirements[0][0][0] = 60;
/// let data = ProblemData::try_from(raw).unwrap();
///
/// let built = ModelBuilder::new(&data).build();
/// assert_eq!(built.stats.decision_vars, 4);
/// assert_eq!(built.stats.live_vars, 3);
/// assert!(built.model.validate().is_ok());
/// ```
pub struct ModelBuilder<'a> {
    data: &'a ProblemData,
    required_weight: f64,
    bonus_weight: f64,
    overtreatment_factor: f64,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(data: &'a ProblemData) -> Self {
        Self {
            data,
            required_weight: REQUIRED_WEIGHT,
            bonus_weight: BONUS_WEIGHT,
            overtreatment_factor: OVERTREATMENT_FACTOR,
        }
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

    /// Objective weight of a session of `therapy` for `patient` on `day`.
    pub fn weight(&self, patient: usize, therapy: usize, day: usize) -> f64 {
        if self.data.has_requirement(patient, therapy, day) {
            self.required_weight
        } else {
            self.bonus_weight
        }
    }

    pub fn build(&self) -> TherapyModel {
        let data = self.data;
        let mut model = CpModel::new("therapy-schedule");
        let space = VariableSpace::build(&mut model, data);

        let mut stats = ModelStats {
            decision_vars: space.len(),
            live_vars: space.live_count(),
            ..ModelStats::default()
        };

        self.emit_objective(&mut model, &space);
        stats.cap_rows = self.emit_caps(&mut model, &space);
        let (by_therapist, by_patient) = self.emit_exclusions(&mut model, &space);
        stats.therapist_exclusions = by_therapist;
        stats.patient_exclusions = by_patient;
        let continuity = self.emit_continuity(&mut model, &space);
        stats.auxiliary_vars = continuity.len();
        stats.continuity_groups = {
            let mut pairs: Vec<(usize, usize)> =
                continuity.iter().map(|l| (l.patient, l.therapy)).collect();
            pairs.dedup();
            pairs.len()
        };
        stats.contiguity_clauses = self.emit_contiguity(&mut model, &space);
        stats.constraints = model.constraint_count();

        info!(
            decision_vars = stats.decision_vars,
            live_vars = stats.live_vars,
            auxiliary_vars = stats.auxiliary_vars,
            constraints = stats.constraints,
            "therapy model built"
        );

        TherapyModel {
            model,
            space,
            continuity,
            stats,
        }
    }

    fn emit_objective(&self, model: &mut CpModel, space: &VariableSpace) {
        let terms: Vec<(VarId, f64)> = space
            .live_keys()
            .map(|key| {
                let coef = self.data.session_minutes(key.therapist)
                    * self.weight(key.patient, key.therapy, key.day);
                (space.var(key), coef)
            })
            .collect();
        model.set_objective(Objective::Maximize { terms });
    }

    fn emit_caps(&self, model: &mut CpModel, space: &VariableSpace) -> usize {
        let data = self.data;
        let dims = data.dims();
        let minutes = data.slot_length() as i64;
        let mut rows = 0;

        for p in 0..dims.patients {
            for t in 0..dims.therapy_types {
                for d in 0..dims.days {
                    let Some(cap) = data.treatment_cap(p, t, d, self.overtreatment_factor) else {
                        continue;
                    };
                    let terms: Vec<(VarId, i64)> = (0..dims.therapists)
                        .flat_map(|k| (0..dims.slots_per_day).map(move |s| SlotKey::new(p, k, t, d, s)))
                        .filter(|&key| space.is_live(key))
                        .map(|key| (space.var(key), minutes))
                        .collect();
                    if terms.is_empty() {
                        continue;
                    }
                    model.add_linear_le(terms, cap);
                    rows += 1;
                }
            }
        }
        debug!(rows, "treatment caps emitted");
        rows
    }

    fn emit_exclusions(&self, model: &mut CpModel, space: &VariableSpace) -> (usize, usize) {
        let dims = self.data.dims();
        let before = model.constraint_count();

        for k in 0..dims.therapists {
            for d in 0..dims.days {
                for s in 0..dims.slots_per_day {
                    let vars: Vec<VarId> = (0..dims.patients)
                        .flat_map(|p| (0..dims.therapy_types).map(move |t| SlotKey::new(p, k, t, d, s)))
                        .filter(|&key| space.is_live(key))
                        .map(|key| space.var(key))
                        .collect();
                    model.add_at_most_one(&vars);
                }
            }
        }
        let by_therapist = model.constraint_count() - before;

        let before = model.constraint_count();
        for p in 0..dims.patients {
            for d in 0..dims.days {
                for s in 0..dims.slots_per_day {
                    let vars: Vec<VarId> = (0..dims.therapists)
                        .flat_map(|k| (0..dims.therapy_types).map(move |t| SlotKey::new(p, k, t, d, s)))
                        .filter(|&key| space.is_live(key))
                        .map(|key| space.var(key))
                        .collect();
                    model.add_at_most_one(&vars);
                }
            }
        }
        let by_patient = model.constraint_count() - before;

        debug!(by_therapist, by_patient, "slot exclusions emitted");
        (by_therapist, by_patient)
    }

    fn emit_continuity(&self, model: &mut CpModel, space: &VariableSpace) -> Vec<ContinuityLink> {
        let data = self.data;
        let dims = data.dims();
        let mut links = Vec::new();

        for p in 0..dims.patients {
            for t in 0..dims.therapy_types {
                if !data.is_eligible(p, t) {
                    continue;
                }
                let mut indicators = Vec::new();
                for k in (0..dims.therapists).filter(|&k| data.is_capable(k, t)) {
                    let sessions: Vec<VarId> = (0..dims.days)
                        .flat_map(|d| (0..dims.slots_per_day).map(move |s| SlotKey::new(p, k, t, d, s)))
                        .filter(|&key| space.is_live(key))
                        .map(|key| space.var(key))
                        .collect();
                    let indicator = model.new_bool_var(format!("treats_p{p}_t{t}_k{k}"));
                    model.add_reified_any(indicator, &sessions);
                    indicators.push(indicator);
                    links.push(ContinuityLink {
                        patient: p,
                        therapy: t,
                        therapist: k,
                        indicator,
                    });
                }
                model.add_at_most_one(&indicators);
            }
        }
        debug!(indicators = links.len(), "continuity of care emitted");
        links
    }

    fn emit_contiguity(&self, model: &mut CpModel, space: &VariableSpace) -> usize {
        let data = self.data;
        let dims = data.dims();
        let mut clauses = 0;

        for p in 0..dims.patients {
            for t in 0..dims.therapy_types {
                for d in (0..dims.days).filter(|&d| data.has_requirement(p, t, d)) {
                    for k in (0..dims.therapists).filter(|&k| data.is_capable(k, t)) {
                        clauses += contiguity::enforce_block(model, space, data, p, k, t, d);
                    }
                }
            }
        }
        debug!(clauses, "block contiguity emitted");
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{BranchAndBoundSolver, Constraint, CpSolver, SolverConfig, SolverStatus};
    use crate::problem::RawProblem;

    fn single_patient() -> ProblemData {
        let mut raw = RawProblem::open(1, 1, 1, 1, 4, 30).with_lunch(2, 2);
        raw.requirements[0][0][0] = 60;
        ProblemData::try_from(raw).unwrap()
    }

    #[test]
    fn test_stats_single_patient() {
        let data = single_patient();
        let built = ModelBuilder::new(&data).build();
        let stats = &built.stats;
        assert_eq!(stats.decision_vars, 4);
        assert_eq!(stats.live_vars, 3);
        assert_eq!(stats.auxiliary_vars, 1);
        assert_eq!(stats.cap_rows, 1);
        // single live variable per slot → no exclusion rows
        assert_eq!(stats.therapist_exclusions, 0);
        assert_eq!(stats.patient_exclusions, 0);
        assert_eq!(stats.continuity_groups, 1);
        // working slots {0, 1, 3} → one triple
        assert_eq!(stats.contiguity_clauses, 1);
        assert_eq!(built.model.var_count(), 5);
        assert!(built.model.validate().is_ok());
    }

    #[test]
    fn test_cap_row_value() {
        let data = single_patient();
        let built = ModelBuilder::new(&data).build();
        let caps: Vec<i64> = built
            .model
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::Linear { terms, rhs } if terms.iter().all(|&(_, c)| c == 30) => Some(*rhs),
                _ => None,
            })
            .collect();
        assert_eq!(caps, vec![90]);
    }

    #[test]
    fn test_objective_weights() {
        let mut raw = RawProblem::open(1, 2, 1, 1, 2, 30);
        raw.requirements[0][0][0] = 30;
        raw.efficiency[0] = 0.5;
        let data = ProblemData::try_from(raw).unwrap();
        let builder = ModelBuilder::new(&data);
        assert_eq!(builder.weight(0, 0, 0), REQUIRED_WEIGHT);
        assert_eq!(builder.weight(0, 1, 0), BONUS_WEIGHT);

        let built = builder.build();
        let objective = built.model.objective.as_ref().unwrap();
        let coef = |t: usize| {
            let var = built.space.var(SlotKey::new(0, 0, t, 0, 0));
            objective.terms().iter().find(|(v, _)| *v == var).map(|(_, c)| *c)
        };
        assert_eq!(coef(0), Some(30.0 * 0.5 * 5.0));
        assert_eq!(coef(1), Some(30.0 * 0.5 * 1.0));
    }

    #[test]
    fn test_custom_weights_and_factor() {
        let data = single_patient();
        let builder = ModelBuilder::new(&data)
            .with_weights(10.0, 2.0)
            .with_overtreatment_factor(1.0);
        assert_eq!(builder.weight(0, 0, 0), 10.0);

        let built = builder.build();
        let has_cap_60 = built
            .model
            .constraints
            .iter()
            .any(|c| matches!(c, Constraint::Linear { rhs: 60, .. }));
        assert!(has_cap_60);
    }

    #[test]
    fn test_empty_problem_builds_trivial_model() {
        let data = ProblemData::try_from(RawProblem::open(0, 3, 2, 5, 8, 30)).unwrap();
        let built = ModelBuilder::new(&data).build();
        assert_eq!(built.model.var_count(), 0);
        assert_eq!(built.model.constraint_count(), 0);

        let solution = BranchAndBoundSolver::new().solve(&built.model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Optimal);
    }

    #[test]
    fn test_continuity_links_only_capable() {
        let mut raw = RawProblem::open(1, 1, 3, 1, 2, 30);
        raw.capability[1][0] = 0;
        let data = ProblemData::try_from(raw).unwrap();
        let built = ModelBuilder::new(&data).build();
        let therapists: Vec<usize> = built.continuity.iter().map(|l| l.therapist).collect();
        assert_eq!(therapists, vec![0, 2]);
    }

    #[test]
    fn test_no_contiguity_without_requirement() {
        let raw = RawProblem::open(1, 1, 1, 1, 6, 30);
        let data = ProblemData::try_from(raw).unwrap();
        let built = ModelBuilder::new(&data).build();
        assert_eq!(built.stats.contiguity_clauses, 0);
        assert_eq!(built.stats.cap_rows, 0);
    }

    #[test]
    fn test_single_patient_optimum() {
        let data = single_patient();
        let built = ModelBuilder::new(&data).build();
        let solution = BranchAndBoundSolver::new().solve(&built.model, &SolverConfig::default());
        assert_eq!(solution.status, SolverStatus::Optimal);
        // three working slots of 30 minutes, all within the 90-minute cap
        assert_eq!(solution.objective_value, Some(3.0 * 30.0 * 5.0));
        let lunch = built.space.var(SlotKey::new(0, 0, 0, 0, 2));
        assert_eq!(solution.value(lunch), Some(false));
    }
}
