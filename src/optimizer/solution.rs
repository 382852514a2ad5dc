//! Solved results: raw solver assignments and the extracted planning optimum.

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::optimizer::problem::VarId;

/// Per-variable optimal assignment returned by a solver, addressed by the
/// same handles used to declare the problem.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSolution {
    values: Vec<f64>,
    objective: f64,
}

impl SolverSolution {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// The planning optimum read back from the solver: one directed flow matrix
/// per snapshot plus the panel-area vector shared across snapshots.
///
/// Values are left exactly as the solver returned them; rounding is the
/// caller's choice.
#[derive(Debug, Clone, Serialize)]
pub struct OptimisationSolution {
    flows: Vec<Array2<f64>>,
    panel_areas: Array1<f64>,
    objective: f64,
}

impl OptimisationSolution {
    pub(crate) fn new(flows: Vec<Array2<f64>>, panel_areas: Array1<f64>, objective: f64) -> Self {
        Self {
            flows,
            panel_areas,
            objective,
        }
    }

    /// Directed flow matrices, one per snapshot. Entry `[i, j]` is the flow
    /// from bus index `i` to bus index `j`; the diagonal holds local panel
    /// generation, and the generator's own diagonal entry its net injection.
    pub fn flows(&self) -> &[Array2<f64>] {
        &self.flows
    }

    pub fn flow(&self, snapshot: usize) -> Option<&Array2<f64>> {
        self.flows.get(snapshot)
    }

    /// Optimal panel area per non-generator bus, in grid bus order.
    pub fn panel_areas(&self) -> &Array1<f64> {
        &self.panel_areas
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solver_solution_reads_by_handle() {
        let solution = SolverSolution::new(vec![1.0, 2.0, 3.0], 42.0);
        assert_eq!(solution.value(VarId(1)), 2.0);
        assert_eq!(solution.objective(), 42.0);
    }

    #[test]
    fn optimum_exposes_per_snapshot_flows() {
        let flows = vec![array![[0.0, 1.0], [0.0, 0.0]]];
        let optimum = OptimisationSolution::new(flows, array![10.0], 5.0);
        assert_eq!(optimum.flow(0).unwrap()[[0, 1]], 1.0);
        assert!(optimum.flow(1).is_none());
        assert_eq!(optimum.panel_areas()[0], 10.0);
    }
}
