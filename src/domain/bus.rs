use serde::{Deserialize, Serialize};

use crate::domain::ids::{BusId, IdAllocator};
use crate::domain::panel::Panel;
use crate::error::{Error, Result};

/// A network node: a building, or the generator/slack node.
///
/// Every bus owns exactly one panel, created with the bus and never
/// replaceable. The power draw is an ordered series with one entry per
/// snapshot; it is settable exactly once, and a bus without one is eligible
/// to serve as the grid's generator. The series length is checked against
/// the snapshot count when the optimisation problem is built, since a bus
/// may exist before the snapshots are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    id: BusId,
    roof_size: f64,
    power_draw: Option<Vec<f64>>,
    panel: Panel,
}

impl Bus {
    /// Build a bus with the given roof area, optional demand series, and
    /// initial panel size (checked against the roof).
    pub fn new(
        ids: &IdAllocator,
        roof_size: f64,
        power_draw: Option<Vec<f64>>,
        panel_size: f64,
    ) -> Result<Self> {
        check_roof(roof_size)?;
        if let Some(draw) = &power_draw {
            check_draw(draw)?;
        }
        let id = ids.next_bus();
        let panel = Panel::new(ids.next_panel(), id, panel_size, roof_size)?;
        Ok(Self {
            id,
            roof_size,
            power_draw,
            panel,
        })
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn roof_size(&self) -> f64 {
        self.roof_size
    }

    pub fn power_draw(&self) -> Option<&[f64]> {
        self.power_draw.as_deref()
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    /// A bus with no fixed demand can balance the grid as its generator.
    pub fn is_generator_eligible(&self) -> bool {
        self.power_draw.is_none()
    }

    /// Change the roof area. Shrinking below the currently installed panel
    /// would break the panel bound and is rejected.
    pub fn set_roof_size(&mut self, roof_size: f64) -> Result<()> {
        check_roof(roof_size)?;
        if roof_size < self.panel.size() {
            return Err(Error::Range(format!(
                "roof size {roof_size} on bus {} is below the installed panel size {}",
                self.id,
                self.panel.size()
            )));
        }
        self.roof_size = roof_size;
        Ok(())
    }

    /// Attach the demand series. Allowed at most once.
    pub fn set_power_draw(&mut self, draw: Vec<f64>) -> Result<()> {
        if self.power_draw.is_some() {
            return Err(Error::Immutability(format!(
                "power draw on bus {} can be set only once",
                self.id
            )));
        }
        check_draw(&draw)?;
        self.power_draw = Some(draw);
        Ok(())
    }

    /// Set the panel to an absolute size, bounded by the roof.
    pub fn set_panel_size(&mut self, size: f64) -> Result<()> {
        self.panel.resize(size, self.roof_size)
    }

    /// Adjust the panel by a signed delta: new size = old size + delta,
    /// under the same bound checks as an absolute write.
    pub fn change_panel_size(&mut self, delta: f64) -> Result<()> {
        self.panel.resize(self.panel.size() + delta, self.roof_size)
    }
}

fn check_roof(roof_size: f64) -> Result<()> {
    if !roof_size.is_finite() || roof_size < 0.0 {
        return Err(Error::Range(format!(
            "roof size must be non-negative, got {roof_size}"
        )));
    }
    Ok(())
}

fn check_draw(draw: &[f64]) -> Result<()> {
    for (i, &value) in draw.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Range(format!(
                "power draw entries must be non-negative, entry {i} is {value}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn sanity() {
        let ids = IdAllocator::new();
        let bus = Bus::new(&ids, 70.0, None, 1.0).unwrap();
        assert_eq!(bus.roof_size(), 70.0);
        assert!(bus.power_draw().is_none());
        assert!(bus.is_generator_eligible());
        assert_eq!(bus.panel().size(), 1.0);
        assert_eq!(bus.panel().bus(), bus.id());
    }

    #[test]
    fn roof_size_is_mutable() {
        let ids = IdAllocator::new();
        let mut bus = Bus::new(&ids, 70.0, None, 1.0).unwrap();
        bus.set_roof_size(50.0).unwrap();
        assert_eq!(bus.roof_size(), 50.0);
    }

    #[test]
    fn roof_cannot_shrink_under_panel() {
        let ids = IdAllocator::new();
        let mut bus = Bus::new(&ids, 70.0, None, 30.0).unwrap();
        assert!(matches!(bus.set_roof_size(20.0), Err(Error::Range(_))));
        assert_eq!(bus.roof_size(), 70.0);
    }

    #[test]
    fn power_draw_set_only_once() {
        let ids = IdAllocator::new();
        let mut bus = Bus::new(&ids, 70.0, None, 0.0).unwrap();
        bus.set_power_draw(vec![400.0, 800.0]).unwrap();
        assert!(!bus.is_generator_eligible());
        let err = bus.set_power_draw(vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::Immutability(_)));
        assert_eq!(bus.power_draw().unwrap(), &[400.0, 800.0]);
    }

    #[rstest]
    #[case(vec![-1.0])]
    #[case(vec![400.0, f64::NAN])]
    #[case(vec![f64::INFINITY])]
    fn rejects_bad_draw_entries(#[case] draw: Vec<f64>) {
        let ids = IdAllocator::new();
        assert!(Bus::new(&ids, 70.0, Some(draw), 0.0).is_err());
    }

    #[test]
    fn rejects_negative_roof() {
        let ids = IdAllocator::new();
        assert!(Bus::new(&ids, -0.1, None, 0.0).is_err());
    }

    #[test]
    fn panel_adjustments_respect_roof() {
        let ids = IdAllocator::new();
        let mut bus = Bus::new(&ids, 70.0, None, 1.0).unwrap();
        bus.change_panel_size(19.0).unwrap();
        assert_eq!(bus.panel().size(), 20.0);
        bus.change_panel_size(-5.0).unwrap();
        assert_eq!(bus.panel().size(), 15.0);
        assert!(bus.change_panel_size(100.0).is_err());
        assert!(bus.change_panel_size(-16.0).is_err());
        assert_eq!(bus.panel().size(), 15.0);
    }
}
