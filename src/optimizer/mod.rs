//! Optimisation problem assembly and the external solver boundary.

pub mod problem;
pub mod solution;
pub mod solver;
pub mod task;

pub use problem::{ConstraintSpec, LinearExpr, ProblemSpec, Relation, VarId, VariableSpec};
pub use solution::{OptimisationSolution, SolverSolution};
pub use solver::{ClarabelSolver, NlpSolver};
pub use task::{OptimisationTask, TaskStatus};
