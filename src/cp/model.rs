//! CP model definition.

use super::variables::{BoolVar, Literal, VarId};
use thiserror::Error;

/// Structural problems found by [`CpModel::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A constraint mentions a variable id the model never created.
    #[error("constraint #{constraint} references undefined variable {var}")]
    UndefinedVariable { constraint: usize, var: VarId },

    /// The objective mentions a variable id the model never created.
    #[error("objective references undefined variable {var}")]
    UndefinedObjectiveVariable { var: VarId },

    /// An objective coefficient is NaN or infinite.
    #[error("objective coefficient for {var} is not finite")]
    NonFiniteCoefficient { var: VarId },
}

/// A constraint over boolean variables.
///
/// Two shapes cover every rule a 0/1 assignment model needs: weighted sums
/// with an upper bound, and disjunctions of literals. Implications,
/// at-most-one groups and reified "any" links are expressed through the
/// convenience builders on [`CpModel`].
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `Σ coef · x ≤ rhs`.
    Linear {
        /// (variable, coefficient) pairs.
        terms: Vec<(VarId, i64)>,
        /// Upper bound of the weighted sum.
        rhs: i64,
    },

    /// At least one literal must hold.
    Clause {
        /// Disjuncts.
        literals: Vec<Literal>,
    },
}

impl Constraint {
    /// Variables mentioned by this constraint, in order, with repeats.
    pub fn vars(&self) -> Box<dyn Iterator<Item = VarId> + '_> {
        match self {
            Constraint::Linear { terms, .. } => Box::new(terms.iter().map(|&(v, _)| v)),
            Constraint::Clause { literals } => Box::new(literals.iter().map(|l| l.var)),
        }
    }

    /// Checks the constraint against a complete assignment.
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        match self {
            Constraint::Linear { terms, rhs } => {
                let activity: i64 = terms
                    .iter()
                    .filter(|&&(v, _)| values[v.index()])
                    .map(|&(_, c)| c)
                    .sum();
                activity <= *rhs
            }
            Constraint::Clause { literals } => literals
                .iter()
                .any(|l| l.is_satisfied_by(values[l.var.index()])),
        }
    }
}

/// Objective function for the CP model.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize a linear combination of boolean variables.
    Minimize {
        /// (variable, coefficient) pairs.
        terms: Vec<(VarId, f64)>,
    },

    /// Maximize a linear combination of boolean variables.
    Maximize {
        /// (variable, coefficient) pairs.
        terms: Vec<(VarId, f64)>,
    },
}

impl Objective {
    /// The objective's terms, regardless of sense.
    pub fn terms(&self) -> &[(VarId, f64)] {
        match self {
            Objective::Minimize { terms } | Objective::Maximize { terms } => terms,
        }
    }

    /// Whether larger values are better.
    pub fn is_maximize(&self) -> bool {
        matches!(self, Objective::Maximize { .. })
    }

    /// Objective value of a complete assignment.
    pub fn evaluate(&self, values: &[bool]) -> f64 {
        self.terms()
            .iter()
            .filter(|&&(v, _)| values[v.index()])
            .map(|&(_, c)| c)
            .sum()
    }
}

/// A constraint programming model over boolean variables.
///
/// Variables are identified by dense [`VarId`]s; names are kept only for
/// diagnostics.
///
/// # Examples
///
/// ```
/// use u_therapy::cp::{CpModel, Objective};
///
/// let mut model = CpModel::new("example");
/// let a = model.new_bool_var("a");
/// let b = model.new_bool_var("b");
/// model.add_at_most_one(&[a, b]);
/// model.set_objective(Objective::Maximize { terms: vec![(a, 2.0), (b, 3.0)] });
/// assert!(model.validate().is_ok());
/// assert_eq!(model.var_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Boolean variables, indexed by [`VarId`].
    pub bool_vars: Vec<BoolVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bool_vars: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds a boolean variable and returns its id.
    pub fn add_bool_var(&mut self, var: BoolVar) -> VarId {
        let id = VarId(self.bool_vars.len() as u32);
        self.bool_vars.push(var);
        id
    }

    /// Convenience: add a free boolean variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.add_bool_var(BoolVar::new(name))
    }

    /// Convenience: add a boolean variable fixed to `value`.
    pub fn new_fixed_bool(&mut self, name: impl Into<String>, value: bool) -> VarId {
        self.add_bool_var(BoolVar::fixed(name, value))
    }

    /// Returns the variable behind `id`, if it exists.
    pub fn var(&self, id: VarId) -> Option<&BoolVar> {
        self.bool_vars.get(id.index())
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add `Σ coef · x ≤ rhs`.
    pub fn add_linear_le(&mut self, terms: Vec<(VarId, i64)>, rhs: i64) {
        self.constraints.push(Constraint::Linear { terms, rhs });
    }

    /// Convenience: at most one of `vars` is true.
    ///
    /// Groups of fewer than two variables are trivially satisfied and skipped.
    pub fn add_at_most_one(&mut self, vars: &[VarId]) {
        if vars.len() < 2 {
            return;
        }
        let terms = vars.iter().map(|&v| (v, 1)).collect();
        self.add_linear_le(terms, 1);
    }

    /// Convenience: add a clause.
    pub fn add_clause(&mut self, literals: Vec<Literal>) {
        self.constraints.push(Constraint::Clause { literals });
    }

    /// Convenience: `a₁ ∧ … ∧ aₙ ⇒ consequent`.
    pub fn add_implication(&mut self, antecedents: &[Literal], consequent: Literal) {
        let mut literals: Vec<Literal> = antecedents.iter().map(|&l| !l).collect();
        literals.push(consequent);
        self.add_clause(literals);
    }

    /// Convenience: `indicator ⇔ (x₁ ∨ … ∨ xₙ)`.
    ///
    /// With an empty `vars` the indicator is forced false.
    pub fn add_reified_any(&mut self, indicator: VarId, vars: &[VarId]) {
        let mut forward = Vec::with_capacity(vars.len() + 1);
        forward.push(Literal::neg(indicator));
        forward.extend(vars.iter().map(|&v| Literal::pos(v)));
        self.add_clause(forward);

        for &v in vars {
            self.add_implication(&[Literal::pos(v)], Literal::pos(indicator));
        }
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Validates the model for consistency.
    ///
    /// Checks that every referenced variable exists and that objective
    /// coefficients are finite.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.bool_vars.len();
        for (index, constraint) in self.constraints.iter().enumerate() {
            if let Some(var) = constraint.vars().find(|v| v.index() >= n) {
                return Err(ModelError::UndefinedVariable {
                    constraint: index,
                    var,
                });
            }
        }
        if let Some(objective) = &self.objective {
            for &(var, coef) in objective.terms() {
                if var.index() >= n {
                    return Err(ModelError::UndefinedObjectiveVariable { var });
                }
                if !coef.is_finite() {
                    return Err(ModelError::NonFiniteCoefficient { var });
                }
            }
        }
        Ok(())
    }

    /// Checks every constraint and every fixed value against `values`.
    pub fn is_satisfied_by(&self, values: &[bool]) -> bool {
        values.len() == self.bool_vars.len()
            && self
                .bool_vars
                .iter()
                .zip(values)
                .all(|(var, &value)| var.fixed.map_or(true, |f| f == value))
            && self.constraints.iter().all(|c| c.is_satisfied(values))
    }

    /// Returns the number of boolean variables.
    pub fn var_count(&self) -> usize {
        self.bool_vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
