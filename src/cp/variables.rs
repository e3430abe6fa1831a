//! CP variable types.

use std::fmt;
use std::ops::Not;

/// Dense identifier of a boolean variable within a [`CpModel`](super::CpModel).
///
/// Ids are handed out in creation order starting at zero, so solvers can
/// keep per-variable state in plain vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    /// Position of this variable in model-ordered vectors.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The positive literal of this variable.
    #[inline]
    pub fn lit(self) -> Literal {
        Literal::pos(self)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A boolean variable (true/false decision).
#[derive(Debug, Clone)]
pub struct BoolVar {
    /// Variable name, used only in diagnostics.
    pub name: String,
    /// Fixed value, if any.
    pub fixed: Option<bool>,
}

impl BoolVar {
    /// Creates a new boolean variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed: None,
        }
    }

    /// Creates a fixed boolean variable.
    pub fn fixed(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            fixed: Some(value),
        }
    }

    /// Whether the variable is fixed to `false` before solving.
    pub fn is_forced_false(&self) -> bool {
        self.fixed == Some(false)
    }
}

/// A variable or its negation, as used in clauses.
///
/// # Examples
///
/// ```
/// use u_therapy::cp::{Literal, VarId};
///
/// let x = VarId(3).lit();
/// assert!(x.is_satisfied_by(true));
/// assert!((!x).is_satisfied_by(false));
/// assert_eq!(!!x, x);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    /// Underlying variable.
    pub var: VarId,
    /// `true` for `¬var`.
    pub negated: bool,
}

impl Literal {
    /// Positive literal `var`.
    pub fn pos(var: VarId) -> Self {
        Self {
            var,
            negated: false,
        }
    }

    /// Negative literal `¬var`.
    pub fn neg(var: VarId) -> Self {
        Self { var, negated: true }
    }

    /// Whether the literal holds when its variable takes `value`.
    #[inline]
    pub fn is_satisfied_by(self, value: bool) -> bool {
        value != self.negated
    }

    /// The variable value that makes this literal true.
    #[inline]
    pub fn satisfying_value(self) -> bool {
        !self.negated
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "¬{}", self.var)
        } else {
            write!(f, "{}", self.var)
        }
    }
}
