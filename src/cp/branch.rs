//! Depth-first branch-and-bound over 0/1 models.
//!
//! # Algorithm
//!
//! 1. Fix pre-assigned variables and propagate every constraint once
//! 2. At each node:
//!    a. Propagate the latest assignments to a fixpoint (conflict → backtrack)
//!    b. Bound the objective; prune if it cannot beat the incumbent
//!    c. Branch on the free variable with the largest objective coefficient
//! 3. A node with no free variable is a new incumbent
//! 4. Stop when the tree is exhausted (optimal) or the budget runs out
//!
//! Propagation handles the two constraint shapes of [`CpModel`]:
//! linear `≤` rows via minimum activity, and clauses via unit propagation.
//! The bound sums, over a disjoint partition of the objective variables
//! into at-most-one groups, the best coefficient still reachable per group.
//!
//! # Reference
//!
//! Land & Doig (1960), "An Automatic Method of Solving Discrete Programming Problems"

use std::time::Instant;

use tracing::debug;

use super::model::{Constraint, CpModel};
use super::solver::{CpSolution, CpSolver, SolverConfig, SolverStatus};
use super::variables::VarId;

/// How often (in nodes) the wall clock is consulted.
const CLOCK_STRIDE: u64 = 64;

/// Exact solver for small and medium 0/1 models.
///
/// Deterministic: the same model and config always explore the same tree,
/// so a run that finishes within its budget always returns the same answer.
///
/// # Examples
///
/// ```
/// use u_therapy::cp::{BranchAndBoundSolver, CpModel, CpSolver, Objective, SolverConfig, SolverStatus};
///
/// let mut model = CpModel::new("pick-one");
/// let a = model.new_bool_var("a");
/// let b = model.new_bool_var("b");
/// model.add_at_most_one(&[a, b]);
/// model.set_objective(Objective::Maximize { terms: vec![(a, 1.0), (b, 2.0)] });
///
/// let solution = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.status, SolverStatus::Optimal);
/// assert_eq!(solution.value(b), Some(true));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();

        if let Err(err) = model.validate() {
            debug!(model = %model.name, error = %err, "rejecting invalid model");
            let mut solution = CpSolution::empty(SolverStatus::ModelInvalid);
            solution.solve_time = started.elapsed();
            return solution;
        }

        let index = SearchIndex::new(model);
        let mut state = SearchState::new(model.var_count());
        let exit = run(&index, &mut state, config, started);

        let status = match (exit, state.best.is_some()) {
            (Exit::Exhausted, true) => SolverStatus::Optimal,
            (Exit::Exhausted, false) => SolverStatus::Infeasible,
            (Exit::Stopped, true) => SolverStatus::Feasible,
            (Exit::Stopped, false) => SolverStatus::Timeout,
        };

        debug!(
            model = %model.name,
            ?status,
            nodes = state.nodes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "branch-and-bound finished"
        );

        let mut solution = CpSolution::empty(status);
        solution.nodes = state.nodes;
        if let Some((_, values)) = state.best.take() {
            solution.objective_value = model.objective.as_ref().map(|o| o.evaluate(&values));
            solution.values = values;
        }
        solution.solve_time = started.elapsed();
        solution
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Exhausted,
    Stopped,
}

/// Read-only structures derived from the model once per solve.
struct SearchIndex<'m> {
    model: &'m CpModel,
    /// Objective coefficient per variable, in maximize sense.
    gain: Vec<f64>,
    /// Constraints mentioning each variable.
    occurs: Vec<Vec<usize>>,
    /// Disjoint at-most-one groups covering every variable with nonzero gain.
    groups: Vec<Vec<VarId>>,
    /// Branching order: gain descending, id ascending.
    order: Vec<VarId>,
}

impl<'m> SearchIndex<'m> {
    fn new(model: &'m CpModel) -> Self {
        let n = model.var_count();

        let mut gain = vec![0.0; n];
        if let Some(objective) = &model.objective {
            let sign = if objective.is_maximize() { 1.0 } else { -1.0 };
            for &(var, coef) in objective.terms() {
                gain[var.index()] += sign * coef;
            }
        }

        let mut occurs = vec![Vec::new(); n];
        for (ci, constraint) in model.constraints.iter().enumerate() {
            for var in constraint.vars() {
                let list = &mut occurs[var.index()];
                if list.last() != Some(&ci) {
                    list.push(ci);
                }
            }
        }

        let mut covered = vec![false; n];
        let mut groups = Vec::new();
        for constraint in &model.constraints {
            let Constraint::Linear { terms, rhs } = constraint else {
                continue;
            };
            if *rhs > 1 || terms.iter().any(|&(_, c)| c != 1) {
                continue;
            }
            let mut group = Vec::new();
            for &(var, _) in terms {
                if !covered[var.index()] && gain[var.index()] != 0.0 {
                    covered[var.index()] = true;
                    group.push(var);
                }
            }
            if !group.is_empty() {
                groups.push(group);
            }
        }
        for (i, &g) in gain.iter().enumerate() {
            if !covered[i] && g != 0.0 {
                groups.push(vec![VarId(i as u32)]);
            }
        }

        let mut order: Vec<VarId> = (0..n as u32).map(VarId).collect();
        order.sort_by(|a, b| gain[b.index()].total_cmp(&gain[a.index()]).then(a.cmp(b)));

        Self {
            model,
            gain,
            occurs,
            groups,
            order,
        }
    }

    /// Upper bound on the objective of any completion of `values`.
    fn bound(&self, values: &[Option<bool>]) -> f64 {
        self.groups
            .iter()
            .map(|group| {
                let mut fixed_true = 0.0;
                let mut any_true = false;
                let mut best_free: f64 = 0.0;
                for &var in group {
                    match values[var.index()] {
                        Some(true) => {
                            any_true = true;
                            fixed_true += self.gain[var.index()];
                        }
                        None => best_free = best_free.max(self.gain[var.index()]),
                        Some(false) => {}
                    }
                }
                if any_true {
                    fixed_true
                } else {
                    best_free
                }
            })
            .sum()
    }

    fn value_of(&self, values: &[Option<bool>]) -> f64 {
        values
            .iter()
            .zip(&self.gain)
            .filter(|(v, _)| **v == Some(true))
            .map(|(_, g)| g)
            .sum()
    }
}

/// Mutable search state: partial assignment plus undo trail.
struct SearchState {
    values: Vec<Option<bool>>,
    trail: Vec<VarId>,
    queue: Vec<VarId>,
    best: Option<(f64, Vec<bool>)>,
    nodes: u64,
}

impl SearchState {
    fn new(n: usize) -> Self {
        Self {
            values: vec![None; n],
            trail: Vec::with_capacity(n),
            queue: Vec::new(),
            best: None,
            nodes: 0,
        }
    }

    fn assign(&mut self, var: VarId, value: bool) {
        self.values[var.index()] = Some(value);
        self.trail.push(var);
        self.queue.push(var);
    }

    fn undo_to(&mut self, len: usize) {
        while self.trail.len() > len {
            if let Some(var) = self.trail.pop() {
                self.values[var.index()] = None;
            }
        }
        self.queue.clear();
    }

    /// Runs queued assignments to a fixpoint. Returns `false` on conflict.
    fn propagate(&mut self, index: &SearchIndex<'_>) -> bool {
        while let Some(var) = self.queue.pop() {
            for &ci in &index.occurs[var.index()] {
                if !self.propagate_constraint(&index.model.constraints[ci]) {
                    self.queue.clear();
                    return false;
                }
            }
        }
        true
    }

    fn propagate_constraint(&mut self, constraint: &Constraint) -> bool {
        match constraint {
            Constraint::Linear { terms, rhs } => {
                let mut min_activity = 0i64;
                for &(var, coef) in terms {
                    match self.values[var.index()] {
                        Some(true) => min_activity += coef,
                        None if coef < 0 => min_activity += coef,
                        _ => {}
                    }
                }
                if min_activity > *rhs {
                    return false;
                }
                let slack = rhs - min_activity;
                for &(var, coef) in terms {
                    if self.values[var.index()].is_some() {
                        continue;
                    }
                    if coef > slack {
                        self.assign(var, false);
                    } else if -coef > slack {
                        self.assign(var, true);
                    }
                }
                true
            }
            Constraint::Clause { literals } => {
                let mut unit = None;
                let mut free = 0usize;
                for &lit in literals {
                    match self.values[lit.var.index()] {
                        Some(value) if lit.is_satisfied_by(value) => return true,
                        Some(_) => {}
                        None => {
                            free += 1;
                            unit = Some(lit);
                        }
                    }
                }
                match (free, unit) {
                    (0, _) => false,
                    (1, Some(lit)) => {
                        self.assign(lit.var, lit.satisfying_value());
                        true
                    }
                    _ => true,
                }
            }
        }
    }

    fn pick_branch(&self, index: &SearchIndex<'_>) -> Option<VarId> {
        index
            .order
            .iter()
            .copied()
            .find(|v| self.values[v.index()].is_none())
    }
}

struct Frame {
    trail_len: usize,
    var: VarId,
    alternative: bool,
    exhausted: bool,
}

fn run(index: &SearchIndex<'_>, state: &mut SearchState, config: &SolverConfig, started: Instant) -> Exit {
    for (i, var) in index.model.bool_vars.iter().enumerate() {
        if let Some(value) = var.fixed {
            state.assign(VarId(i as u32), value);
        }
    }
    for constraint in &index.model.constraints {
        if !state.propagate_constraint(constraint) {
            return Exit::Exhausted;
        }
    }
    if !state.propagate(index) {
        return Exit::Exhausted;
    }

    let mut stack: Vec<Frame> = Vec::new();

    loop {
        state.nodes += 1;
        if config.node_limit.is_some_and(|limit| state.nodes > limit) {
            return Exit::Stopped;
        }
        if state.nodes % CLOCK_STRIDE == 0 && started.elapsed() >= config.time_limit {
            return Exit::Stopped;
        }

        let incumbent = state.best.as_ref().map(|(v, _)| *v);
        let bound = index.bound(&state.values);
        let prune = incumbent.is_some_and(|best| bound <= best + 1e-9 * best.abs().max(1.0));

        if !prune {
            match state.pick_branch(index) {
                Some(var) => {
                    let first = index.gain[var.index()] > 0.0;
                    stack.push(Frame {
                        trail_len: state.trail.len(),
                        var,
                        alternative: !first,
                        exhausted: false,
                    });
                    state.assign(var, first);
                    if state.propagate(index) {
                        continue;
                    }
                }
                None => {
                    let value = index.value_of(&state.values);
                    let values = state.values.iter().map(|v| v.unwrap_or(false)).collect();
                    state.best = Some((value, values));
                    if config.stop_after_first {
                        return Exit::Stopped;
                    }
                }
            }
        }

        // Backtrack to the deepest frame with an untried alternative.
        loop {
            let Some(frame) = stack.last_mut() else {
                return Exit::Exhausted;
            };
            let trail_len = frame.trail_len;
            if frame.exhausted {
                stack.pop();
                state.undo_to(trail_len);
                continue;
            }
            frame.exhausted = true;
            let (var, alternative) = (frame.var, frame.alternative);
            state.undo_to(trail_len);
            state.assign(var, alternative);
            if state.propagate(index) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{Literal, Objective};
    use std::time::Duration;

    fn solve(model: &CpModel) -> CpSolution {
        BranchAndBoundSolver::new().solve(model, &SolverConfig::default())
    }

    #[test]
    fn test_empty_model_is_optimal() {
        let model = CpModel::new("empty");
        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_at_most_one_picks_best() {
        let mut model = CpModel::new("amo");
        let vars: Vec<VarId> = (0..4).map(|i| model.new_bool_var(format!("x{i}"))).collect();
        model.add_at_most_one(&vars);
        model.set_objective(Objective::Maximize {
            terms: vec![(vars[0], 1.0), (vars[1], 4.0), (vars[2], 3.0), (vars[3], 2.0)],
        });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.objective_value, Some(4.0));
        assert_eq!(solution.value(vars[1]), Some(true));
        assert!(model.is_satisfied_by(&solution.values));
    }

    #[test]
    fn test_knapsack_row() {
        // 3a + 4b + 5c <= 8, maximize 4a + 5b + 6c → a + c (10) beats b + c (infeasible, 9)
        let mut model = CpModel::new("knapsack");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        let c = model.new_bool_var("c");
        model.add_linear_le(vec![(a, 3), (b, 4), (c, 5)], 8);
        model.set_objective(Objective::Maximize {
            terms: vec![(a, 4.0), (b, 5.0), (c, 6.0)],
        });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.objective_value, Some(10.0));
        assert_eq!(solution.values, vec![true, false, true]);
    }

    #[test]
    fn test_negative_coefficient_forces_true() {
        // -x <= -1  ⇔  x = 1
        let mut model = CpModel::new("neg");
        let x = model.new_bool_var("x");
        model.add_linear_le(vec![(x, -1)], -1);
        model.set_objective(Objective::Minimize { terms: vec![(x, 1.0)] });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.value(x), Some(true));
    }

    #[test]
    fn test_fixed_false_respected() {
        let mut model = CpModel::new("fixed");
        let x = model.new_fixed_bool("x", false);
        let y = model.new_bool_var("y");
        model.set_objective(Objective::Maximize {
            terms: vec![(x, 10.0), (y, 1.0)],
        });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.values, vec![false, true]);
        assert_eq!(solution.objective_value, Some(1.0));
    }

    #[test]
    fn test_clause_conflict_is_infeasible() {
        let mut model = CpModel::new("unsat");
        let x = model.new_bool_var("x");
        model.add_clause(vec![Literal::pos(x)]);
        model.add_clause(vec![Literal::neg(x)]);

        assert_eq!(solve(&model).status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_empty_clause_is_infeasible() {
        let mut model = CpModel::new("unsat");
        model.new_bool_var("x");
        model.add_clause(Vec::new());

        assert_eq!(solve(&model).status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_implications_chain() {
        // a ∧ c ⇒ b with b forbidden: a and c cannot both hold
        let mut model = CpModel::new("gap");
        let a = model.new_bool_var("a");
        let b = model.new_fixed_bool("b", false);
        let c = model.new_bool_var("c");
        model.add_implication(&[a.lit(), c.lit()], b.lit());
        model.set_objective(Objective::Maximize {
            terms: vec![(a, 2.0), (c, 3.0)],
        });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.values, vec![false, false, true]);
    }

    #[test]
    fn test_reified_indicators_limit_choice() {
        // Two groups, each with an indicator; at most one group may be used.
        let mut model = CpModel::new("continuity");
        let g1: Vec<VarId> = (0..2).map(|i| model.new_bool_var(format!("a{i}"))).collect();
        let g2: Vec<VarId> = (0..3).map(|i| model.new_bool_var(format!("b{i}"))).collect();
        let i1 = model.new_bool_var("uses_a");
        let i2 = model.new_bool_var("uses_b");
        model.add_reified_any(i1, &g1);
        model.add_reified_any(i2, &g2);
        model.add_at_most_one(&[i1, i2]);
        let mut terms: Vec<(VarId, f64)> = g1.iter().map(|&v| (v, 2.0)).collect();
        terms.extend(g2.iter().map(|&v| (v, 1.0)));
        model.set_objective(Objective::Maximize { terms });

        let solution = solve(&model);
        assert_eq!(solution.status, SolverStatus::Optimal);
        assert_eq!(solution.objective_value, Some(4.0));
        assert!(model.is_satisfied_by(&solution.values));
    }

    #[test]
    fn test_stop_after_first_is_feasible() {
        let mut model = CpModel::new("first");
        let vars: Vec<VarId> = (0..6).map(|i| model.new_bool_var(format!("x{i}"))).collect();
        model.add_linear_le(vars.iter().map(|&v| (v, 1)).collect(), 3);
        model.set_objective(Objective::Maximize {
            terms: vars.iter().map(|&v| (v, 1.0)).collect(),
        });

        let config = SolverConfig::default().with_stop_after_first(true);
        let solution = BranchAndBoundSolver::new().solve(&model, &config);
        assert_eq!(solution.status, SolverStatus::Feasible);
        assert!(model.is_satisfied_by(&solution.values));
    }

    #[test]
    fn test_node_limit_without_solution_times_out() {
        let mut model = CpModel::new("budget");
        for i in 0..4 {
            model.new_bool_var(format!("x{i}"));
        }
        let config = SolverConfig::default().with_node_limit(0);
        let solution = BranchAndBoundSolver::new().solve(&model, &config);
        assert_eq!(solution.status, SolverStatus::Timeout);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_zero_time_limit_returns_promptly() {
        let mut model = CpModel::new("clock");
        let vars: Vec<VarId> = (0..20).map(|i| model.new_bool_var(format!("x{i}"))).collect();
        model.add_linear_le(vars.iter().map(|&v| (v, 2)).collect(), 19);
        model.set_objective(Objective::Maximize {
            terms: vars.iter().enumerate().map(|(i, &v)| (v, 1.0 + i as f64)).collect(),
        });

        let config = SolverConfig::default().with_time_limit(Duration::ZERO);
        let solution = BranchAndBoundSolver::new().solve(&model, &config);
        assert!(matches!(
            solution.status,
            SolverStatus::Feasible | SolverStatus::Timeout | SolverStatus::Optimal
        ));
        if solution.is_solution_found() {
            assert!(model.is_satisfied_by(&solution.values));
        }
    }

    #[test]
    fn test_invalid_model() {
        let mut model = CpModel::new("bad");
        model.add_linear_le(vec![(VarId(5), 1)], 0);
        assert_eq!(solve(&model).status, SolverStatus::ModelInvalid);
    }

    #[test]
    fn test_deterministic() {
        let mut model = CpModel::new("ties");
        let vars: Vec<VarId> = (0..5).map(|i| model.new_bool_var(format!("x{i}"))).collect();
        model.add_linear_le(vars.iter().map(|&v| (v, 1)).collect(), 2);
        model.set_objective(Objective::Maximize {
            terms: vars.iter().map(|&v| (v, 1.0)).collect(),
        });

        let first = solve(&model);
        let second = solve(&model);
        assert_eq!(first.values, second.values);
        assert_eq!(first.objective_value, Some(2.0));
    }
}
