//! Solver-agnostic problem description.
//!
//! The optimisation task declares variables, a single objective and a set of
//! linear constraints against this structure; an adapter translates it for
//! whatever solver backend is available. Variables are addressed by opaque
//! handles, so nothing about the backend leaks into problem assembly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle of a declared decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Bounds of a declared variable; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Linear expression over declared variables plus a constant offset.
///
/// The same variable may appear in several terms; coefficients accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn term(mut self, var: VarId, coefficient: f64) -> Self {
        self.push(var, coefficient);
        self
    }

    pub fn push(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    /// Evaluate against a dense per-handle value assignment.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(var, coefficient)| coefficient * values[var.0])
                .sum::<f64>()
    }
}

/// Comparison relating a constraint's left-hand side to its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::LessEq => write!(f, "<="),
            Relation::GreaterEq => write!(f, ">="),
            Relation::Equal => write!(f, "=="),
        }
    }
}

/// One linear constraint `expr <relation> rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

/// The full problem handed across the solver boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemSpec {
    variables: Vec<VariableSpec>,
    objective: LinearExpr,
    constraints: Vec<ConstraintSpec>,
}

impl ProblemSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, spec: VariableSpec) -> VarId {
        self.variables.push(spec);
        VarId(self.variables.len() - 1)
    }

    /// Declare a variable unbounded on both sides.
    pub fn add_free_variable(&mut self) -> VarId {
        self.add_variable(VariableSpec::default())
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn add_constraint(&mut self, expr: LinearExpr, relation: Relation, rhs: f64) {
        self.constraints.push(ConstraintSpec {
            expr,
            relation,
            rhs,
        });
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn constraints(&self) -> &[ConstraintSpec] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}
