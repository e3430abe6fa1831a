//! Constraint Programming (CP) framework for 0/1 models.
//!
//! Provides a domain-agnostic model for expressing constrained optimization
//! problems over boolean variables, and a solver interface.
//!
//! # Key Components
//!
//! - **Variables**: [`BoolVar`], addressed by dense [`VarId`]s; [`Literal`]s
//! - **Constraints**: [`Constraint`]: linear `≤` rows and clauses
//! - **Model**: [`CpModel`]: container for variables, constraints, objective
//! - **Solver**: [`CpSolver`] trait: interface for solver implementations
//! - **Built-in solver**: [`BranchAndBoundSolver`]
//!
//! # Design
//!
//! The [`CpSolver`] trait allows plugging in external engines (CP-SAT, MILP
//! backends) in place of the built-in branch-and-bound. Models are built
//! once, solved once and dropped; solvers keep no state between calls.
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod branch;
mod model;
mod solver;
mod variables;

pub use branch::BranchAndBoundSolver;
pub use model::{Constraint, CpModel, ModelError, Objective};
pub use solver::{CpSolution, CpSolver, SolverConfig, SolverStatus};
pub use variables::{BoolVar, Literal, VarId};
