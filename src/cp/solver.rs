//! CP solver interface.

use super::model::CpModel;
use super::variables::VarId;
use std::time::Duration;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Solver hit its time or node budget before finding any solution.
    Timeout,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective function value (if any).
    pub objective_value: Option<f64>,
    /// Value of every model variable, indexed by [`VarId`].
    ///
    /// Empty unless a solution was found.
    pub values: Vec<bool>,
    /// Wall-clock solve time.
    pub solve_time: Duration,
    /// Search nodes explored.
    pub nodes: u64,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
            solve_time: Duration::ZERO,
            nodes: 0,
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Value assigned to `var`, if a solution exists.
    pub fn value(&self, var: VarId) -> Option<bool> {
        self.values.get(var.index()).copied()
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum wall-clock solve time.
    pub time_limit: Duration,
    /// Maximum number of search nodes. `None` = unbounded.
    pub node_limit: Option<u64>,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            node_limit: None,
            stop_after_first: false,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }
}

/// Trait for CP solver implementations.
///
/// Implementors own the search: the model is read-only input, and every
/// call starts from scratch. A solver must enforce `config.time_limit`
/// itself and return its best result instead of blocking past it.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}
