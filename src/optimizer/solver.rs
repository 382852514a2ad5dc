//! The external solver boundary.
//!
//! The core never inspects solver internals: it hands over a declared
//! variable set, one objective and a constraint set, and reads values back
//! by handle. Whatever backend sits behind the trait only has to converge
//! to an optimum or report infeasibility.

use good_lp::{
    clarabel, constraint, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::optimizer::problem::{LinearExpr, ProblemSpec, Relation};
use crate::optimizer::solution::SolverSolution;

/// Narrow contract to the external solver. The call blocks until the solver
/// returns; there is no timeout or cancellation.
pub trait NlpSolver {
    fn solve(&self, problem: &ProblemSpec) -> Result<SolverSolution>;
}

/// Adapter over `good_lp`'s pure-Rust Clarabel backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelSolver;

impl NlpSolver for ClarabelSolver {
    fn solve(&self, problem: &ProblemSpec) -> Result<SolverSolution> {
        let mut declared = ProblemVariables::new();
        let handles: Vec<Variable> = problem
            .variables()
            .iter()
            .map(|spec| {
                let mut definition = variable();
                if let Some(lower) = spec.lower {
                    definition = definition.min(lower);
                }
                if let Some(upper) = spec.upper {
                    definition = definition.max(upper);
                }
                declared.add(definition)
            })
            .collect();

        debug!(
            variables = handles.len(),
            constraints = problem.num_constraints(),
            "handing problem to clarabel"
        );

        // A constant objective offset does not move the optimum; the
        // reported objective value is evaluated from the problem spec below.
        let mut model = declared
            .minimise(to_expression(problem.objective(), &handles))
            .using(clarabel);
        for spec in problem.constraints() {
            let lhs = to_expression(&spec.expr, &handles);
            let rhs = spec.rhs - spec.expr.constant();
            let constraint = match spec.relation {
                Relation::LessEq => constraint::leq(lhs, rhs),
                Relation::GreaterEq => constraint::geq(lhs, rhs),
                Relation::Equal => constraint::eq(lhs, rhs),
            };
            model = model.with(constraint);
        }

        let solved = model.solve().map_err(|err| {
            warn!(%err, "solver reported failure");
            match err {
                ResolutionError::Infeasible => {
                    Error::SolverInfeasible("the problem is infeasible".to_string())
                }
                ResolutionError::Unbounded => {
                    Error::SolverInfeasible("the problem is unbounded".to_string())
                }
                other => Error::SolverInfeasible(other.to_string()),
            }
        })?;

        let values: Vec<f64> = handles.iter().map(|&handle| solved.value(handle)).collect();
        let objective = problem.objective().eval(&values);
        Ok(SolverSolution::new(values, objective))
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut acc = Expression::default();
    for &(var, coefficient) in expr.terms() {
        acc += handles[var.index()] * coefficient;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::problem::VariableSpec;

    #[test]
    fn solves_a_bounded_minimum() {
        let mut problem = ProblemSpec::new();
        let x = problem.add_variable(VariableSpec {
            lower: Some(3.0),
            upper: None,
        });
        problem.set_objective(LinearExpr::new().term(x, 1.0));

        let solution = ClarabelSolver.solve(&problem).unwrap();
        assert!((solution.value(x) - 3.0).abs() < 1e-6);
        assert!((solution.objective() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn solves_equality_system() {
        let mut problem = ProblemSpec::new();
        let x = problem.add_free_variable();
        let y = problem.add_free_variable();
        problem.set_objective(LinearExpr::new().term(x, 1.0).term(y, 1.0));
        problem.add_constraint(
            LinearExpr::new().term(x, 1.0).term(y, 1.0),
            Relation::Equal,
            4.0,
        );
        problem.add_constraint(
            LinearExpr::new().term(x, 1.0).term(y, -1.0),
            Relation::Equal,
            0.0,
        );

        let solution = ClarabelSolver.solve(&problem).unwrap();
        assert!((solution.value(x) - 2.0).abs() < 1e-6);
        assert!((solution.value(y) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reports_infeasibility() {
        let mut problem = ProblemSpec::new();
        let x = problem.add_free_variable();
        problem.set_objective(LinearExpr::new().term(x, 1.0));
        problem.add_constraint(LinearExpr::new().term(x, 1.0), Relation::GreaterEq, 2.0);
        problem.add_constraint(LinearExpr::new().term(x, 1.0), Relation::LessEq, 1.0);

        let err = ClarabelSolver.solve(&problem).unwrap_err();
        assert!(matches!(err, Error::SolverInfeasible(_)));
    }
}
