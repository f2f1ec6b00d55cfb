use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::meteo::PRESSURE_VALIDITY_CEILING_M;

/// Integration step [m].
pub const CALCULATION_RESOLUTION_M: f64 = 100.0;

/// Highest altitude the simulator integrates to [m].
pub const CALCULATIONS_MAX_HEIGHT_M: f64 = 10_000.0;

pub const THERMAL_INITIAL_IMPULSE: f64 = 1.8;

/// Lapse rate at which a thermal neither gains nor loses impulse [°C/100 m].
pub const THERMAL_STAGNANT_GRADIENT: f64 = -0.39;

pub const THERMAL_IMPULSE_TANGENT_RATIO: f64 = 1.0;

/// Impulse lost per 100 m of ascent inside cloud.
pub const CONDENSATION_COMPENSATION: f64 = 0.8;

/// Loss multiplier applied through stable and inversion layers.
pub const INVERSION_COMPENSATION: f64 = 2.5;

/// Immutable tunables consumed by the ascent simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub calculation_resolution: f64,
    pub calculations_max_height: f64,
    pub thermal_initial_impulse: f64,
    pub thermal_stagnant_gradient: f64,
    pub thermal_impulse_tangent_ratio: f64,
    pub condensation_compensation: f64,
    pub inversion_compensation: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            calculation_resolution: CALCULATION_RESOLUTION_M,
            calculations_max_height: CALCULATIONS_MAX_HEIGHT_M,
            thermal_initial_impulse: THERMAL_INITIAL_IMPULSE,
            thermal_stagnant_gradient: THERMAL_STAGNANT_GRADIENT,
            thermal_impulse_tangent_ratio: THERMAL_IMPULSE_TANGENT_RATIO,
            condensation_compensation: CONDENSATION_COMPENSATION,
            inversion_compensation: INVERSION_COMPENSATION,
        }
    }
}

impl SimulationConfig {
    /// Reject tunables the simulator cannot integrate with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.calculation_resolution.is_finite() && self.calculation_resolution > 0.0,
            "calculation_resolution must be positive, got {}",
            self.calculation_resolution
        );
        ensure!(
            self.calculations_max_height <= PRESSURE_VALIDITY_CEILING_M,
            "calculations_max_height {} exceeds the {} m validity ceiling",
            self.calculations_max_height,
            PRESSURE_VALIDITY_CEILING_M
        );
        ensure!(
            self.calculations_max_height >= self.calculation_resolution,
            "calculations_max_height {} is below one integration step of {}",
            self.calculations_max_height,
            self.calculation_resolution
        );
        for (name, value) in [
            ("thermal_initial_impulse", self.thermal_initial_impulse),
            ("thermal_stagnant_gradient", self.thermal_stagnant_gradient),
            (
                "thermal_impulse_tangent_ratio",
                self.thermal_impulse_tangent_ratio,
            ),
            ("condensation_compensation", self.condensation_compensation),
            ("inversion_compensation", self.inversion_compensation),
        ] {
            ensure!(value.is_finite(), "{} must be finite, got {}", name, value);
        }
        Ok(())
    }

    /// Number of integration steps between the surface and the ceiling.
    pub fn step_count(&self) -> usize {
        (self.calculations_max_height / self.calculation_resolution).floor() as usize
    }
}

/// Values used when a sample has to be invented rather than interpolated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDefaults {
    pub ground_temperature: f64,
    pub ceiling_temperature: f64,
    pub wind: f64,
    pub humidity: f64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            ground_temperature: 25.0,
            ceiling_temperature: -20.0,
            wind: 0.0,
            humidity: 0.0,
        }
    }
}

/// Surface parameters for a single run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConditions {
    /// Absolute humidity carried up by the thermal [g/m³].
    pub absolute_humidity: f64,
    /// Surface pressure [Pa].
    pub pressure: f64,
    /// Insolation in `[0, 1]`.
    pub solar_strength: f64,
}

impl Default for GroundConditions {
    fn default() -> Self {
        Self {
            absolute_humidity: 10.0,
            pressure: 101_325.0,
            solar_strength: 0.8,
        }
    }
}

impl GroundConditions {
    /// Reject surface parameters no run can start from.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.solar_strength),
            "solar strength must lie in [0, 1], got {}",
            self.solar_strength
        );
        ensure!(
            self.absolute_humidity.is_finite() && self.absolute_humidity >= 0.0,
            "ground absolute humidity must be non-negative, got {}",
            self.absolute_humidity
        );
        ensure!(
            self.pressure.is_finite() && self.pressure > 0.0,
            "ground pressure must be positive, got {}",
            self.pressure
        );
        Ok(())
    }
}
