//! Stepwise integration of a thermal's impulse up through a [`Profile`].
//!
//! The thermal starts with an impulse set by the insolation and gains or loses
//! impulse every step according to how far the local lapse rate departs from
//! [`SimulationConfig::thermal_stagnant_gradient`]. Stable layers amplify the loss,
//! and once the carried ground moisture saturates every further step pays a fixed
//! condensation toll. The first step that leaves the impulse negative is the
//! thermal top.

use serde::Serialize;

use crate::cause::{Event, EventCode};
use crate::config::{GroundConditions, SimulationConfig};
use crate::error::ProfileError;
use crate::meteo;
use crate::profile::{Field, Profile};

const SOLAR_IMPULSE_GAIN: f64 = 1.2;
const SOLAR_IMPULSE_BIAS: f64 = 0.1;

/// Impulse of the thermal after the step ending at `altitude`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StrengthPoint {
    pub altitude: f64,
    pub impulse: f64,
}

/// Outcome of one ascent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThermalRun {
    /// Condensation level, or the simulation ceiling when the air never saturates.
    pub cloud_base: f64,
    pub has_cloud: bool,
    /// Pressure at the cloud base, in the unit of the ground pressure.
    pub cloud_base_pressure: Option<f64>,
    /// Altitude of the first step with negative impulse, or the ceiling.
    pub thermal_top: f64,
    /// One entry per integration step up to and including the thermal top.
    pub strength: Vec<StrengthPoint>,
    pub events: Vec<Event>,
}

impl ThermalRun {
    pub fn cloud(&self) -> Option<f64> {
        self.has_cloud.then_some(self.cloud_base)
    }

    /// Step with the largest impulse.
    pub fn peak(&self) -> Option<&StrengthPoint> {
        self.strength
            .iter()
            .max_by(|a, b| a.impulse.total_cmp(&b.impulse))
    }
}

/// Parcel state at the end of the previous step.
#[derive(Clone, Copy, Debug)]
struct Level {
    altitude: f64,
    temperature: f64,
    relative_humidity: f64,
}

/// Impulse a thermal starts with under the given insolation.
pub fn initial_impulse(solar_strength: f64, config: &SimulationConfig) -> f64 {
    (solar_strength * SOLAR_IMPULSE_GAIN - SOLAR_IMPULSE_BIAS) * config.thermal_initial_impulse
}

/// Run a thermal from the surface to the simulation ceiling.
///
/// The profile must span `[0, calculations_max_height]`; a gap surfaces as
/// [`ProfileError::OutOfRange`]. The thermal keeps the ground absolute humidity all
/// the way up instead of mixing with the column's humidity.
pub fn simulate(
    profile: &Profile,
    ground: &GroundConditions,
    config: &SimulationConfig,
) -> Result<ThermalRun, ProfileError> {
    let resolution = config.calculation_resolution;
    let ceiling = config.calculations_max_height;
    let condensation_offset = resolution * (config.condensation_compensation / 100.0);

    let ground_temperature = profile.query(0.0, Field::Temperature)?;
    let mut prev = Level {
        altitude: 0.0,
        temperature: ground_temperature,
        relative_humidity: meteo::relative_humidity(ground.absolute_humidity, ground_temperature),
    };

    let mut impulse = initial_impulse(ground.solar_strength, config);
    let mut cloud_base = None;
    let mut thermal_top = None;
    let mut in_inversion = false;
    let mut strength = Vec::with_capacity(config.step_count());
    let mut events = Vec::new();

    for step in 1..=config.step_count() {
        let altitude = resolution * step as f64;
        let temperature = profile.query(altitude, Field::Temperature)?;
        let relative_humidity = meteo::relative_humidity(ground.absolute_humidity, temperature);
        // °C per 100 m over this step.
        let gradient = (temperature - prev.temperature) * (resolution / 100.0);

        if cloud_base.is_none() && relative_humidity >= 1.0 {
            let base = condensation_altitude(&prev, altitude, relative_humidity);
            events.push(Event::new(
                base,
                EventCode::CloudBase,
                Some(format!(
                    "relative humidity {:.3} -> {:.3}",
                    prev.relative_humidity, relative_humidity
                )),
            ));
            cloud_base = Some(base);
        }

        let compensation_offset = if cloud_base.is_some() {
            condensation_offset
        } else {
            0.0
        };
        let stable = gradient >= 0.0 || gradient.is_nan();
        let compensation_multi = if stable {
            config.inversion_compensation
        } else {
            1.0
        };
        if stable && !in_inversion {
            events.push(Event::new(
                altitude,
                EventCode::Inversion,
                Some(format!("gradient {:+.2} °C/100 m", gradient)),
            ));
        }
        in_inversion = stable;

        impulse += (config.thermal_stagnant_gradient - gradient)
            * config.thermal_impulse_tangent_ratio
            * compensation_multi
            - compensation_offset;
        strength.push(StrengthPoint { altitude, impulse });

        if impulse < 0.0 {
            events.push(Event::new(
                altitude,
                EventCode::ThermalTop,
                Some(format!("impulse {:.3}", impulse)),
            ));
            thermal_top = Some(altitude);
            break;
        }

        prev = Level {
            altitude,
            temperature,
            relative_humidity,
        };
    }

    let thermal_top = match thermal_top {
        Some(top) => top,
        None => {
            events.push(Event::new(ceiling, EventCode::CeilingReached, None));
            ceiling
        }
    };

    let cloud_base_pressure = match cloud_base {
        Some(base) if base.is_finite() => {
            let temperature = profile.query(base, Field::Temperature)?;
            Some(meteo::pressure_at_altitude(ground.pressure, base, temperature))
        }
        _ => None,
    };

    Ok(ThermalRun {
        cloud_base: cloud_base.unwrap_or(ceiling),
        has_cloud: cloud_base.is_some(),
        cloud_base_pressure,
        thermal_top,
        strength,
        events,
    })
}

/// Altitude inside the step ending at `altitude` where relative humidity reaches 1.0.
fn condensation_altitude(prev: &Level, altitude: f64, relative_humidity: f64) -> f64 {
    if prev.relative_humidity >= 1.0 {
        // Already saturated at the previous level.
        return prev.altitude;
    }
    let fraction = (1.0 - prev.relative_humidity) / (relative_humidity - prev.relative_humidity);
    prev.altitude + fraction * (altitude - prev.altitude)
}
