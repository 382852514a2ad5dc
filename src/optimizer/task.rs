//! Assembly of the panel-allocation and power-flow problem.
//!
//! The task consumes the grid's derived matrices plus the snapshot list and
//! per-building demand, declares one `(N+1)×(N+1)` flow matrix per snapshot
//! and a shared N-vector of panel areas, and walks the lifecycle
//! `Uninitialised → VariablesDeclared → ObjectiveSet → ConstraintsAdded →
//! Solved | Failed`. Constraint families can be added in any order and each
//! is a no-op the second time.

use std::fmt;

use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ModelParams;
use crate::error::{Error, Result};
use crate::optimizer::problem::{LinearExpr, ProblemSpec, Relation, VarId};
use crate::optimizer::solution::OptimisationSolution;
use crate::optimizer::solver::NlpSolver;
use crate::solar;

/// Lifecycle of one optimisation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Uninitialised,
    VariablesDeclared,
    ObjectiveSet,
    ConstraintsAdded,
    Solved,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Uninitialised => "uninitialised",
            TaskStatus::VariablesDeclared => "variables declared",
            TaskStatus::ObjectiveSet => "objective set",
            TaskStatus::ConstraintsAdded => "constraints added",
            TaskStatus::Solved => "solved",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ConstraintFamilies {
    panel_budget: bool,
    panel_output: bool,
    roof_limit: bool,
    line_rating: bool,
    demand_balance: bool,
    generator_balance: bool,
}

impl ConstraintFamilies {
    fn all(&self) -> bool {
        self.panel_budget
            && self.panel_output
            && self.roof_limit
            && self.line_rating
            && self.demand_balance
            && self.generator_balance
    }
}

/// Builds the decision variables, objective and constraint set from the
/// grid's derived matrices, delegates solving to an [`NlpSolver`] and holds
/// the write-once solution.
///
/// Bus indexing convention: buildings occupy indices `0..N` in grid order,
/// the generator/slack node sits at index `N`.
#[derive(Debug)]
pub struct OptimisationTask {
    line_length: Array2<f64>,
    line_rating: Array2<f64>,
    roof_areas: Array1<f64>,
    total_panel_size: f64,
    snapshots: Vec<f64>,
    demand: Vec<Vec<f64>>,
    params: ModelParams,
    problem: ProblemSpec,
    flow_vars: Vec<Vec<Vec<VarId>>>,
    area_vars: Vec<VarId>,
    objective_set: bool,
    families: ConstraintFamilies,
    failed: bool,
    solution: Option<OptimisationSolution>,
}

impl OptimisationTask {
    /// Validate the derived inputs and create an unassembled task.
    ///
    /// `roof_areas` carries one entry per bus, generator last; `demand` one
    /// row per building, each row as long as the snapshot list.
    pub fn new(
        line_length: Array2<f64>,
        line_rating: Array2<f64>,
        roof_areas: Array1<f64>,
        total_panel_size: f64,
        snapshots: Vec<f64>,
        demand: Vec<Vec<f64>>,
        params: ModelParams,
    ) -> Result<Self> {
        params.validate()?;

        let size = roof_areas.len();
        if size < 2 {
            return Err(Error::Topology(
                "the task needs at least one building plus the generator".to_string(),
            ));
        }
        check_square("length", &line_length, size)?;
        check_square("rating", &line_rating, size)?;
        check_symmetric("length", &line_length)?;
        check_symmetric("rating", &line_rating)?;
        for i in 0..size {
            if line_length[[i, i]] != 0.0 {
                return Err(Error::Topology(format!(
                    "length matrix diagonal must be zero, entry [{i}, {i}] is {}",
                    line_length[[i, i]]
                )));
            }
        }

        if !total_panel_size.is_finite() || total_panel_size < 0.0 {
            return Err(Error::Range(format!(
                "total panel size must be non-negative, got {total_panel_size}"
            )));
        }
        if snapshots.is_empty() {
            return Err(Error::Range("at least one snapshot is required".to_string()));
        }
        for &t in &snapshots {
            if !(0.0..=24.0).contains(&t) {
                return Err(Error::Range(format!(
                    "snapshots are times of day within 0..=24, got {t}"
                )));
            }
        }

        let buildings = size - 1;
        if demand.len() != buildings {
            return Err(Error::Topology(format!(
                "expected one demand series per building ({buildings}), got {}",
                demand.len()
            )));
        }
        for (i, series) in demand.iter().enumerate() {
            if series.len() != snapshots.len() {
                return Err(Error::Topology(format!(
                    "demand series of building {i} has {} entries for {} snapshots",
                    series.len(),
                    snapshots.len()
                )));
            }
        }

        Ok(Self {
            line_length,
            line_rating,
            roof_areas,
            total_panel_size,
            snapshots,
            demand,
            params,
            problem: ProblemSpec::new(),
            flow_vars: Vec::new(),
            area_vars: Vec::new(),
            objective_set: false,
            families: ConstraintFamilies::default(),
            failed: false,
            solution: None,
        })
    }

    /// Number of buildings, excluding the generator.
    pub fn building_count(&self) -> usize {
        self.roof_areas.len() - 1
    }

    fn generator_index(&self) -> usize {
        self.roof_areas.len() - 1
    }

    pub fn snapshots(&self) -> &[f64] {
        &self.snapshots
    }

    pub fn problem(&self) -> &ProblemSpec {
        &self.problem
    }

    pub fn solution(&self) -> Option<&OptimisationSolution> {
        self.solution.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        if self.failed {
            TaskStatus::Failed
        } else if self.solution.is_some() {
            TaskStatus::Solved
        } else if self.objective_set && self.families.all() {
            TaskStatus::ConstraintsAdded
        } else if self.objective_set {
            TaskStatus::ObjectiveSet
        } else if !self.flow_vars.is_empty() {
            TaskStatus::VariablesDeclared
        } else {
            TaskStatus::Uninitialised
        }
    }

    /// Declare the per-snapshot flow matrices and the shared area vector.
    /// No-op once declared.
    pub fn declare_variables(&mut self) {
        if !self.flow_vars.is_empty() {
            return;
        }
        let size = self.roof_areas.len();
        for _ in 0..self.snapshots.len() {
            let matrix: Vec<Vec<VarId>> = (0..size)
                .map(|_| (0..size).map(|_| self.problem.add_free_variable()).collect())
                .collect();
            self.flow_vars.push(matrix);
        }
        self.area_vars = (0..self.building_count())
            .map(|_| self.problem.add_free_variable())
            .collect();
    }

    /// Length-weighted flow penalty plus the small area regularizer plus the
    /// heavy generator-injection penalty, summed over all snapshots.
    pub fn set_objective(&mut self) {
        self.declare_variables();
        if self.objective_set {
            return;
        }
        let n = self.generator_index();
        let mut objective = LinearExpr::new();
        for t in 0..self.snapshots.len() {
            for i in 0..=n {
                for j in 0..=n {
                    if i == j && i < n {
                        objective.push(self.area_vars[i], self.params.area_cost_epsilon);
                    } else if i == j {
                        objective.push(self.flow_vars[t][n][n], self.params.generator_penalty);
                    } else {
                        objective.push(self.flow_vars[t][i][j], self.line_length[[i, j]]);
                    }
                }
            }
        }
        self.problem.set_objective(objective);
        self.objective_set = true;
    }

    /// Σᵢ aᵢ ≤ total panel budget.
    pub fn add_constraint_panel_budget(&mut self) {
        self.declare_variables();
        if self.families.panel_budget {
            return;
        }
        let mut expr = LinearExpr::new();
        for &var in &self.area_vars {
            expr.push(var, 1.0);
        }
        self.problem
            .add_constraint(expr, Relation::LessEq, self.total_panel_size);
        self.families.panel_budget = true;
    }

    /// x[t][i][i] == K · sun(t) · aᵢ, the yield floored so a night snapshot
    /// never pins generation to exactly zero.
    pub fn add_constraint_panel_output(&mut self) {
        self.declare_variables();
        if self.families.panel_output {
            return;
        }
        for (t, &snapshot) in self.snapshots.iter().enumerate() {
            let yield_factor =
                self.params.panel_output_per_sqm * solar::sun(snapshot).max(self.params.sun_floor);
            for i in 0..self.building_count() {
                let expr = LinearExpr::new()
                    .term(self.flow_vars[t][i][i], 1.0)
                    .term(self.area_vars[i], -yield_factor);
                self.problem.add_constraint(expr, Relation::Equal, 0.0);
            }
        }
        self.families.panel_output = true;
    }

    /// 0 ≤ aᵢ ≤ roofᵢ for every building.
    pub fn add_constraint_roof_limit(&mut self) {
        self.declare_variables();
        if self.families.roof_limit {
            return;
        }
        for (i, &var) in self.area_vars.iter().enumerate() {
            self.problem.add_constraint(
                LinearExpr::new().term(var, 1.0),
                Relation::LessEq,
                self.roof_areas[i],
            );
            self.problem
                .add_constraint(LinearExpr::new().term(var, 1.0), Relation::GreaterEq, 0.0);
        }
        self.families.roof_limit = true;
    }

    /// Directed flows are non-negative and bounded by the connecting line's
    /// rating. The generator's own self-term is exempt: it is net injection,
    /// not a physical line, and may go negative when the grid exports.
    pub fn add_constraint_line_rating(&mut self) {
        self.declare_variables();
        if self.families.line_rating {
            return;
        }
        let n = self.generator_index();
        for t in 0..self.snapshots.len() {
            for i in 0..=n {
                for j in 0..=n {
                    if i == n && j == n {
                        continue;
                    }
                    let var = self.flow_vars[t][i][j];
                    if i != j {
                        self.problem.add_constraint(
                            LinearExpr::new().term(var, 1.0),
                            Relation::LessEq,
                            self.line_rating[[i, j]],
                        );
                    }
                    self.problem.add_constraint(
                        LinearExpr::new().term(var, 1.0),
                        Relation::GreaterEq,
                        0.0,
                    );
                }
            }
        }
        self.families.line_rating = true;
    }

    /// Per-building power balance: net outgoing flow plus local generation
    /// equals the building's demand at each snapshot.
    pub fn add_constraint_demand_balance(&mut self) {
        self.declare_variables();
        if self.families.demand_balance {
            return;
        }
        let n = self.generator_index();
        for t in 0..self.snapshots.len() {
            for i in 0..self.building_count() {
                let mut expr = LinearExpr::new();
                for j in 0..=n {
                    expr.push(self.flow_vars[t][i][j], 1.0);
                    expr.push(self.flow_vars[t][j][i], -1.0);
                }
                expr.push(self.flow_vars[t][i][i], 1.0);
                self.problem
                    .add_constraint(expr, Relation::Equal, self.demand[i][t]);
            }
        }
        self.families.demand_balance = true;
    }

    /// The generator's bookkeeping injection must match what its incident
    /// lines actually carry into and out of it.
    pub fn add_constraint_generator_balance(&mut self) {
        self.declare_variables();
        if self.families.generator_balance {
            return;
        }
        let n = self.generator_index();
        for t in 0..self.snapshots.len() {
            let mut expr = LinearExpr::new().term(self.flow_vars[t][n][n], 1.0);
            for j in 0..self.building_count() {
                expr.push(self.flow_vars[t][j][n], -1.0);
                expr.push(self.flow_vars[t][n][j], 1.0);
            }
            self.problem.add_constraint(expr, Relation::Equal, 0.0);
        }
        self.families.generator_balance = true;
    }

    /// Declare variables, set the objective and add every constraint family.
    pub fn assemble(&mut self) {
        self.declare_variables();
        self.set_objective();
        self.add_constraint_panel_budget();
        self.add_constraint_panel_output();
        self.add_constraint_roof_limit();
        self.add_constraint_line_rating();
        self.add_constraint_demand_balance();
        self.add_constraint_generator_balance();
        debug!(
            buildings = self.building_count(),
            snapshots = self.snapshots.len(),
            variables = self.problem.num_variables(),
            constraints = self.problem.num_constraints(),
            "optimisation problem assembled"
        );
    }

    /// Hand the assembled problem to the solver and read the optimum back.
    ///
    /// The solution slot is written exactly once; a second solve on a solved
    /// task is an immutability violation, and a failed task stays failed.
    pub fn optimise(&mut self, solver: &dyn NlpSolver) -> Result<&OptimisationSolution> {
        if self.solution.is_some() {
            return Err(Error::Immutability(
                "the optimisation solution is settable only once".to_string(),
            ));
        }
        if self.failed {
            return Err(Error::SolverInfeasible(
                "the task already failed; rebuild it with adjusted inputs".to_string(),
            ));
        }
        if self.status() != TaskStatus::ConstraintsAdded {
            return Err(Error::Topology(format!(
                "the task must be fully assembled before solving, status is {}",
                self.status()
            )));
        }

        let solved = match solver.solve(&self.problem) {
            Ok(solved) => solved,
            Err(err) => {
                self.failed = true;
                return Err(err);
            }
        };

        let size = self.roof_areas.len();
        let flows = self
            .flow_vars
            .iter()
            .map(|matrix| Array2::from_shape_fn((size, size), |(i, j)| solved.value(matrix[i][j])))
            .collect();
        let areas =
            Array1::from_iter(self.area_vars.iter().map(|&var| solved.value(var)));
        info!(objective = solved.objective(), "optimisation solved");
        Ok(&*self
            .solution
            .insert(OptimisationSolution::new(flows, areas, solved.objective())))
    }
}

fn check_square(name: &str, matrix: &Array2<f64>, size: usize) -> Result<()> {
    if matrix.nrows() != size || matrix.ncols() != size {
        return Err(Error::Topology(format!(
            "{name} matrix must be {size}x{size}, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

fn check_symmetric(name: &str, matrix: &Array2<f64>) -> Result<()> {
    for i in 0..matrix.nrows() {
        for j in (i + 1)..matrix.ncols() {
            if matrix[[i, j]] != matrix[[j, i]] {
                return Err(Error::Topology(format!(
                    "{name} matrix must be symmetric, entries [{i}, {j}] and [{j}, {i}] differ"
                )));
            }
        }
    }
    Ok(())
}
