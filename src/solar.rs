//! Deterministic daily curves: solar yield and synthetic building demand.
//!
//! Both are piecewise functions of the time of day in hours (0..=24) with a
//! daylight window ending at hour 16. The shapes are empirical; callers that
//! need different coefficients scale the results.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Hour of day at which the daylight window ends.
pub const DAYLIGHT_END: f64 = 16.0;

/// Relative solar yield at time `t` (hours), in 0..=1.
///
/// Zero outside the daylight window (including negative times), a smoothed
/// unimodal curve inside it. The floor applied inside the panel-output
/// constraint is deliberately not applied here.
pub fn sun(t: f64) -> f64 {
    if !(0.0..DAYLIGHT_END).contains(&t) {
        return 0.0;
    }
    let s = (2.0 * PI / 48.0 * (t - 8.5) - 0.8 * PI).sin().powi(4);
    s.max(0.0)
}

/// Synthetic demand of one building at time `t`: a squared-sine day profile
/// between `c_min` and `c_max + c_min`, flat `c_min` overnight.
pub fn demand_at(c_max: f64, c_min: f64, t: f64) -> Result<f64> {
    if !(0.0..=24.0).contains(&t) {
        return Err(Error::Range(format!(
            "time of day must be within 0..=24, got {t}"
        )));
    }
    if t < DAYLIGHT_END {
        Ok(c_max * (2.0 * PI / 16.0 * t).sin().powi(2) + c_min)
    } else {
        Ok(c_min)
    }
}

/// Demand of every building at time `t`, from per-building peak and base
/// levels. The two slices must have equal length.
pub fn demand_profile(t: f64, c_max: &[f64], c_min: &[f64]) -> Result<Vec<f64>> {
    if c_max.len() != c_min.len() {
        return Err(Error::Range(format!(
            "peak and base demand lists differ in length: {} vs {}",
            c_max.len(),
            c_min.len()
        )));
    }
    c_max
        .iter()
        .zip(c_min)
        .map(|(&hi, &lo)| demand_at(hi, lo, t))
        .collect()
}
