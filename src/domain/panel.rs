use serde::{Deserialize, Serialize};

use crate::domain::ids::{BusId, PanelId};
use crate::error::{Error, Result};

/// Rooftop solar installation bound permanently to one bus.
///
/// A panel is created together with its bus and never moves to another one;
/// the back-reference is a plain id, not ownership. Size is the only mutable
/// field in the whole topology and every write re-checks the roof bound, so
/// `0 <= size <= roof_size` holds after any sequence of mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    id: PanelId,
    bus: BusId,
    size: f64,
}

impl Panel {
    pub(crate) fn new(id: PanelId, bus: BusId, size: f64, roof_size: f64) -> Result<Self> {
        let mut panel = Self { id, bus, size: 0.0 };
        panel.resize(size, roof_size)?;
        Ok(panel)
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    /// The bus this panel sits on.
    pub fn bus(&self) -> BusId {
        self.bus
    }

    /// Installed area in square meters.
    pub fn size(&self) -> f64 {
        self.size
    }

    pub(crate) fn resize(&mut self, size: f64, roof_size: f64) -> Result<()> {
        if !size.is_finite() || size < 0.0 {
            return Err(Error::Range(format!(
                "panel size must be non-negative, got {size}"
            )));
        }
        if size > roof_size {
            return Err(Error::Range(format!(
                "panel size {size} exceeds roof size {roof_size} on bus {}",
                self.bus
            )));
        }
        self.size = size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::IdAllocator;

    fn panel(size: f64, roof: f64) -> Result<Panel> {
        let ids = IdAllocator::new();
        Panel::new(ids.next_panel(), ids.next_bus(), size, roof)
    }

    #[test]
    fn sanity() {
        let p = panel(1.0, 70.0).unwrap();
        assert_eq!(p.size(), 1.0);
    }

    #[test]
    fn resize_within_roof() {
        let mut p = panel(1.0, 70.0).unwrap();
        p.resize(20.1, 70.0).unwrap();
        assert_eq!(p.size(), 20.1);
        p.resize(20.0, 70.0).unwrap();
        assert_eq!(p.size(), 20.0);
    }

    #[test]
    fn rejects_size_beyond_roof() {
        let mut p = panel(0.0, 70.0).unwrap();
        let err = p.resize(70.5, 70.0).unwrap_err();
        assert!(matches!(err, Error::Range(_)));
        // Failed write leaves the previous value intact.
        assert_eq!(p.size(), 0.0);
    }

    #[test]
    fn rejects_negative_size() {
        assert!(panel(-1.0, 70.0).is_err());
    }
}
