use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result as CrateResult};

/// Tunable model parameters for problem assembly.
///
/// The defaults reproduce the reference planning model. Two of them deserve
/// a caveat: `unconnected_length` and `generator_penalty` shape the objective
/// so that flows over nonexistent lines and generator imports are driven to
/// zero at the optimum. They are soft penalties, not hard constraints: a
/// penalty too small relative to the other cost terms can leave a feasible
/// nonzero flow across a nonexistent line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Instantaneous panel output per square meter of installed panel, at
    /// full solar yield (kW/m²).
    pub panel_output_per_sqm: f64,

    /// Regularization weight on allocated panel area, breaking ties among
    /// equally valid allocations.
    pub area_cost_epsilon: f64,

    /// Objective coefficient on the generator's net injection.
    pub generator_penalty: f64,

    /// Sentinel distance for bus pairs with no connecting line. Must exceed
    /// any realistic sum of real line lengths.
    pub unconnected_length: f64,

    /// Lower floor on the solar-yield factor inside the panel-output
    /// constraint, keeping night snapshots from pinning generation to zero.
    pub sun_floor: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            panel_output_per_sqm: 1.0,
            area_cost_epsilon: 1e-4,
            generator_penalty: 1e9,
            unconnected_length: 1e7,
            sun_floor: 0.01,
        }
    }
}

impl ModelParams {
    /// Load parameters from `config/planner.toml` overlaid with
    /// `SGP_`-prefixed environment variables. Missing file or keys fall
    /// back to the defaults.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/planner.toml"))
            .merge(Env::prefixed("SGP_"));
        let params: Self = figment.extract()?;
        params.validate()?;
        Ok(params)
    }

    /// Check that every parameter is finite and positive.
    pub fn validate(&self) -> CrateResult<()> {
        let fields = [
            ("panel_output_per_sqm", self.panel_output_per_sqm),
            ("area_cost_epsilon", self.area_cost_epsilon),
            ("generator_penalty", self.generator_penalty),
            ("unconnected_length", self.unconnected_length),
            ("sun_floor", self.sun_floor),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Range(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ModelParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.panel_output_per_sqm, 1.0);
        assert_eq!(params.sun_floor, 0.01);
    }

    #[test]
    fn rejects_non_positive_penalty() {
        let params = ModelParams {
            generator_penalty: 0.0,
            ..ModelParams::default()
        };
        assert!(matches!(params.validate(), Err(Error::Range(_))));
    }

    #[test]
    fn rejects_nan_sentinel() {
        let params = ModelParams {
            unconnected_length: f64::NAN,
            ..ModelParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn round_trips_through_serde() {
        let params = ModelParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: ModelParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
