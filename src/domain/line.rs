use serde::{Deserialize, Serialize};

use crate::domain::ids::{BusId, IdAllocator, LineId};
use crate::domain::line_type::LineType;
use crate::error::{Error, Result};

/// An undirected physical connection between two distinct buses.
///
/// Endpoints, length and type are all fixed at construction; the topology a
/// line describes never changes for the line's lifetime. Adjacency between
/// buses is a derived index maintained by the grid that ingests the line,
/// not state on the line or the buses themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    id: LineId,
    bus0: BusId,
    bus1: BusId,
    length: f64,
    line_type: LineType,
}

impl Line {
    pub fn new(
        ids: &IdAllocator,
        bus0: BusId,
        bus1: BusId,
        length: f64,
        line_type: LineType,
    ) -> Result<Self> {
        if bus0 == bus1 {
            return Err(Error::Topology(format!(
                "a line must connect two distinct buses, got {bus0} on both ends"
            )));
        }
        if !length.is_finite() || length < 0.0 {
            return Err(Error::Range(format!(
                "line length must be non-negative, got {length}"
            )));
        }
        Ok(Self {
            id: ids.next_line(),
            bus0,
            bus1,
            length,
            line_type,
        })
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn bus0(&self) -> BusId {
        self.bus0
    }

    pub fn bus1(&self) -> BusId {
        self.bus1
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn line_type(&self) -> &LineType {
        &self.line_type
    }

    /// Rating carried over from the line's type.
    pub fn rating(&self) -> f64 {
        self.line_type.rating()
    }

    /// Whether `bus` is one of the two endpoints.
    pub fn touches(&self, bus: BusId) -> bool {
        self.bus0 == bus || self.bus1 == bus
    }

    /// The endpoint opposite to `bus`, if `bus` is an endpoint at all.
    pub fn other_end(&self, bus: BusId) -> Option<BusId> {
        if bus == self.bus0 {
            Some(self.bus1)
        } else if bus == self.bus1 {
            Some(self.bus0)
        } else {
            None
        }
    }

    /// Whether this line joins the unordered pair `{a, b}`.
    pub fn connects(&self, a: BusId, b: BusId) -> bool {
        (self.bus0 == a && self.bus1 == b) || (self.bus0 == b && self.bus1 == a)
    }
}
