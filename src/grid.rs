//! The grid aggregate: validated topology, derived matrices and the
//! optimisation lifecycle.
//!
//! A grid ingests its buses and lines as one batch and is topologically
//! write-once: the only mutation after construction is the panel build-out.
//! Matrices are pure derivations recomputed from current state on every
//! call.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ndarray::{Array1, Array2};
use petgraph::algo::all_simple_paths;
use petgraph::graph::{NodeIndex, UnGraph};
use tracing::{debug, info};

use crate::config::ModelParams;
use crate::domain::ids::{BusId, GridId, IdAllocator};
use crate::domain::{Bus, Line, Panel, Path};
use crate::error::{Error, Result};
use crate::optimizer::{ClarabelSolver, NlpSolver, OptimisationSolution, OptimisationTask};

/// Hairline constraint violations at this relative scale are solver
/// feasibility tolerance, not modeling bugs; anything larger fails loudly.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// A complete low-voltage grid: buses, lines, one designated slack/generator
/// node, the snapshot list and the total panel-area budget.
///
/// Every derived structure indexes buses the same way: non-slack buses in
/// batch order first, the slack node last.
#[derive(Debug)]
pub struct Grid {
    id: GridId,
    buses: Vec<Bus>,
    lines: Vec<Line>,
    slack_bus: BusId,
    snapshots: Vec<f64>,
    total_panel_size: f64,
    params: ModelParams,
    order: Vec<BusId>,
    index: HashMap<BusId, usize>,
    adjacency: BTreeMap<BusId, BTreeSet<BusId>>,
    task: Option<OptimisationTask>,
}

impl Grid {
    /// Validate and assemble a grid with default model parameters.
    pub fn new(
        ids: &IdAllocator,
        buses: Vec<Bus>,
        lines: Vec<Line>,
        slack_bus: BusId,
        snapshots: Vec<f64>,
        total_panel_size: f64,
    ) -> Result<Self> {
        Self::with_params(
            ids,
            buses,
            lines,
            slack_bus,
            snapshots,
            total_panel_size,
            ModelParams::default(),
        )
    }

    pub fn with_params(
        ids: &IdAllocator,
        buses: Vec<Bus>,
        lines: Vec<Line>,
        slack_bus: BusId,
        snapshots: Vec<f64>,
        total_panel_size: f64,
        params: ModelParams,
    ) -> Result<Self> {
        params.validate()?;

        if buses.is_empty() {
            return Err(Error::Topology("a grid needs at least one bus".to_string()));
        }
        let mut members = HashSet::new();
        for bus in &buses {
            if !members.insert(bus.id()) {
                return Err(Error::Topology(format!(
                    "duplicate bus {} in the grid batch",
                    bus.id()
                )));
            }
        }

        if !members.contains(&slack_bus) {
            return Err(Error::Topology(format!(
                "slack bus {slack_bus} is not part of the bus batch"
            )));
        }
        let slack = buses
            .iter()
            .find(|bus| bus.id() == slack_bus)
            .ok_or_else(|| Error::Topology(format!("slack bus {slack_bus} not found")))?;
        if !slack.is_generator_eligible() {
            return Err(Error::Topology(format!(
                "slack bus {slack_bus} carries a demand series and cannot act as generator"
            )));
        }

        let mut line_ids = HashSet::new();
        for line in &lines {
            if !line_ids.insert(line.id()) {
                return Err(Error::Topology(format!(
                    "duplicate line {} in the grid batch",
                    line.id()
                )));
            }
            for end in [line.bus0(), line.bus1()] {
                if !members.contains(&end) {
                    return Err(Error::Topology(format!(
                        "line {} connects bus {end} which is not part of the grid",
                        line.id()
                    )));
                }
            }
        }

        if snapshots.is_empty() {
            return Err(Error::Range("the snapshot list must not be empty".to_string()));
        }
        for &t in &snapshots {
            if !(0.0..=24.0).contains(&t) {
                return Err(Error::Range(format!(
                    "snapshots are times of day within 0..=24, got {t}"
                )));
            }
        }
        if !total_panel_size.is_finite() || total_panel_size < 0.0 {
            return Err(Error::Range(format!(
                "total panel size must be non-negative, got {total_panel_size}"
            )));
        }

        let mut order: Vec<BusId> = buses
            .iter()
            .map(Bus::id)
            .filter(|&id| id != slack_bus)
            .collect();
        order.push(slack_bus);
        let index: HashMap<BusId, usize> = order
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();

        let mut adjacency: BTreeMap<BusId, BTreeSet<BusId>> = buses
            .iter()
            .map(|bus| (bus.id(), BTreeSet::new()))
            .collect();
        for line in &lines {
            adjacency
                .entry(line.bus0())
                .or_default()
                .insert(line.bus1());
            adjacency
                .entry(line.bus1())
                .or_default()
                .insert(line.bus0());
        }

        debug!(
            buses = buses.len(),
            lines = lines.len(),
            snapshots = snapshots.len(),
            "grid assembled"
        );

        Ok(Self {
            id: ids.next_grid(),
            buses,
            lines,
            slack_bus,
            snapshots,
            total_panel_size,
            params,
            order,
            index,
            adjacency,
            task: None,
        })
    }

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn slack_bus(&self) -> BusId {
        self.slack_bus
    }

    pub fn snapshots(&self) -> &[f64] {
        &self.snapshots
    }

    pub fn total_panel_size(&self) -> f64 {
        self.total_panel_size
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.iter().find(|bus| bus.id() == id)
    }

    fn bus_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        self.buses.iter_mut().find(|bus| bus.id() == id)
    }

    /// Bus ids in derivation order: non-slack in batch order, slack last.
    pub fn bus_order(&self) -> &[BusId] {
        &self.order
    }

    /// Buses directly connected to `bus` by at least one line.
    pub fn connected_buses(&self, bus: BusId) -> Result<&BTreeSet<BusId>> {
        self.adjacency
            .get(&bus)
            .ok_or_else(|| Error::Topology(format!("bus {bus} is not part of this grid")))
    }

    /// One panel per bus; duplicates would mean corrupted ownership and are
    /// rejected.
    pub fn panels(&self) -> Result<Vec<&Panel>> {
        let mut seen = HashSet::new();
        let mut panels = Vec::with_capacity(self.buses.len());
        for bus in &self.buses {
            let panel = bus.panel();
            if !seen.insert(panel.id()) {
                return Err(Error::Topology(format!(
                    "panel {} appears on more than one bus",
                    panel.id()
                )));
            }
            panels.push(panel);
        }
        Ok(panels)
    }

    /// Sum of the currently installed panel areas.
    pub fn installed_panel_size(&self) -> f64 {
        self.buses.iter().map(|bus| bus.panel().size()).sum()
    }

    /// Symmetric bus-to-bus distance matrix with zero diagonal. Unconnected
    /// pairs carry the configured sentinel distance; its role is purely to
    /// make the objective punish implausible direct flows, nothing enforces
    /// it as a hard constraint.
    pub fn length_matrix(&self) -> Array2<f64> {
        let n = self.order.len();
        let mut matrix = Array2::from_elem((n, n), self.params.unconnected_length);
        for i in 0..n {
            matrix[[i, i]] = 0.0;
        }
        for line in &self.lines {
            let i = self.index[&line.bus0()];
            let j = self.index[&line.bus1()];
            matrix[[i, j]] = line.length();
            matrix[[j, i]] = line.length();
        }
        matrix
    }

    /// Symmetric rating matrix: line-type rating off the diagonal (zero when
    /// unconnected), maximum local solar output on the diagonal.
    pub fn rating_matrix(&self) -> Array2<f64> {
        let n = self.order.len();
        let mut matrix = Array2::zeros((n, n));
        for line in &self.lines {
            let i = self.index[&line.bus0()];
            let j = self.index[&line.bus1()];
            matrix[[i, j]] = line.rating();
            matrix[[j, i]] = line.rating();
        }
        for (position, &id) in self.order.iter().enumerate() {
            if let Some(bus) = self.bus(id) {
                matrix[[position, position]] =
                    bus.roof_size() * self.params.panel_output_per_sqm;
            }
        }
        matrix
    }

    /// Roof area per bus in derivation order, slack last.
    pub fn area_vector(&self) -> Array1<f64> {
        Array1::from_iter(self.order.iter().map(|&id| {
            self.bus(id).map(Bus::roof_size).unwrap_or_default()
        }))
    }

    /// Enumerate every simple path between two distinct member buses. When
    /// parallel lines join a pair, the one ingested last represents the pair,
    /// consistent with the matrix derivations.
    pub fn paths_between(&self, ids: &IdAllocator, from: BusId, to: BusId) -> Result<Vec<Path>> {
        if from == to {
            return Err(Error::Topology(format!(
                "a path connects two distinct buses, got {from} twice"
            )));
        }
        for end in [from, to] {
            if !self.index.contains_key(&end) {
                return Err(Error::Topology(format!(
                    "bus {end} is not part of this grid"
                )));
            }
        }

        let mut graph: UnGraph<BusId, ()> = UnGraph::default();
        let mut nodes: HashMap<BusId, NodeIndex> = HashMap::new();
        for &id in &self.order {
            nodes.insert(id, graph.add_node(id));
        }
        let mut pair_lines: HashMap<(BusId, BusId), &Line> = HashMap::new();
        for line in &self.lines {
            graph.add_edge(nodes[&line.bus0()], nodes[&line.bus1()], ());
            let key = ordered_pair(line.bus0(), line.bus1());
            pair_lines.insert(key, line);
        }

        let mut paths = Vec::new();
        for node_path in
            all_simple_paths::<Vec<NodeIndex>, _>(&graph, nodes[&from], nodes[&to], 0, None)
        {
            let mut lines = Vec::with_capacity(node_path.len().saturating_sub(1));
            for window in node_path.windows(2) {
                let a = graph[window[0]];
                let b = graph[window[1]];
                let line = pair_lines.get(&ordered_pair(a, b)).ok_or_else(|| {
                    Error::Topology(format!("no line joins buses {a} and {b}"))
                })?;
                lines.push((*line).clone());
            }
            paths.push(Path::new(ids, lines)?);
        }
        Ok(paths)
    }

    /// Build the optimisation task from the current topology and demand.
    /// Settable once; re-creating it is an immutability violation.
    pub fn create_optimisation_task(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(Error::Immutability(format!(
                "the optimisation task of grid {} is settable only once",
                self.id
            )));
        }

        let mut demand = Vec::with_capacity(self.order.len() - 1);
        for &id in self.order.iter().take(self.order.len() - 1) {
            let bus = self
                .bus(id)
                .ok_or_else(|| Error::Topology(format!("bus {id} is not part of this grid")))?;
            let series = bus.power_draw().ok_or_else(|| {
                Error::Topology(format!(
                    "bus {id} has no demand series and is not the slack bus"
                ))
            })?;
            if series.len() != self.snapshots.len() {
                return Err(Error::Topology(format!(
                    "demand series of bus {id} has {} entries for {} snapshots",
                    series.len(),
                    self.snapshots.len()
                )));
            }
            demand.push(series.to_vec());
        }

        let mut task = OptimisationTask::new(
            self.length_matrix(),
            self.rating_matrix(),
            self.area_vector(),
            self.total_panel_size,
            self.snapshots.clone(),
            demand,
            self.params.clone(),
        )?;
        task.assemble();
        info!(grid = %self.id, "optimisation task created");
        self.task = Some(task);
        Ok(())
    }

    pub fn optimisation_task(&self) -> Option<&OptimisationTask> {
        self.task.as_ref()
    }

    /// Solve with the default solver backend.
    pub fn optimise(&mut self) -> Result<OptimisationSolution> {
        self.optimise_with(&ClarabelSolver)
    }

    /// Solve with a caller-provided solver. Blocks until the solver returns.
    pub fn optimise_with(&mut self, solver: &dyn NlpSolver) -> Result<OptimisationSolution> {
        let task = self.task.as_mut().ok_or_else(|| {
            Error::Topology("create the optimisation task before solving".to_string())
        })?;
        Ok(task.optimise(solver)?.clone())
    }

    /// Apply the solved panel areas onto the buses' panels, in derivation
    /// order. The panels re-check their roof bounds: an area genuinely above
    /// a roof is a modeling bug and fails instead of being clamped.
    pub fn create_build_out(&mut self) -> Result<()> {
        let solution = self
            .task
            .as_ref()
            .and_then(OptimisationTask::solution)
            .ok_or_else(|| {
                Error::Topology("no solved optimisation task to build out from".to_string())
            })?;
        let areas = solution.panel_areas().clone();

        let building_ids: Vec<BusId> = self
            .order
            .iter()
            .take(self.order.len() - 1)
            .copied()
            .collect();
        for (position, id) in building_ids.into_iter().enumerate() {
            let bus = self
                .bus_mut(id)
                .ok_or_else(|| Error::Topology(format!("bus {id} is not part of this grid")))?;
            let area = snap_to_bounds(areas[position], bus.roof_size());
            bus.set_panel_size(area)?;
        }
        info!(grid = %self.id, installed = self.installed_panel_size(), "build-out applied");
        Ok(())
    }
}

fn ordered_pair(a: BusId, b: BusId) -> (BusId, BusId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn snap_to_bounds(value: f64, upper: f64) -> f64 {
    let tolerance = FEASIBILITY_TOLERANCE * upper.max(1.0);
    if value < 0.0 && value >= -tolerance {
        0.0
    } else if value > upper && value <= upper + tolerance {
        upper
    } else {
        value
    }
}
