//! Rooftop solar allocation and directed power-flow planning for
//! low-voltage distribution grids.
//!
//! The crate models a network of buildings ("buses") joined by power lines,
//! each building carrying a rooftop panel, and computes the optimal panel
//! area per building under a total-area budget together with the resulting
//! directed flow on every line, per snapshot. The model is a linear-cost,
//! capacity-bounded flow abstraction, not an AC power flow.
//!
//! Assemble the topology from [`domain`] entities, wrap it in a
//! [`grid::Grid`], create the optimisation task and solve:
//!
//! ```no_run
//! use solar_grid_planner::{Bus, Grid, IdAllocator, Line, LineType};
//!
//! # fn main() -> solar_grid_planner::Result<()> {
//! let ids = IdAllocator::new();
//! let house = Bus::new(&ids, 100.0, Some(vec![50.0]), 0.0)?;
//! let generator = Bus::new(&ids, 0.0, None, 0.0)?;
//! let cable = LineType::new(&ids, "TypeA", 100.0)?;
//! let feeder = Line::new(&ids, house.id(), generator.id(), 10.0, cable)?;
//!
//! let slack = generator.id();
//! let mut grid = Grid::new(&ids, vec![house, generator], vec![feeder], slack, vec![12.0], 800.0)?;
//! grid.create_optimisation_task()?;
//! let solution = grid.optimise()?;
//! grid.create_build_out()?;
//! println!("installed: {:?}", solution.panel_areas());
//! # Ok(())
//! # }
//! ```
//!
//! Solving is delegated to an external solver through the narrow
//! [`optimizer::NlpSolver`] contract; the default backend is Clarabel via
//! `good_lp`.

pub mod config;
pub mod domain;
pub mod error;
pub mod grid;
pub mod optimizer;
pub mod solar;

pub use config::ModelParams;
pub use domain::ids::{BusId, GridId, IdAllocator, LineId, LineTypeId, PanelId, PathId};
pub use domain::{Bus, Line, LineType, Panel, Path};
pub use error::{Error, Result};
pub use grid::Grid;
pub use optimizer::{
    ClarabelSolver, NlpSolver, OptimisationSolution, OptimisationTask, TaskStatus,
};
