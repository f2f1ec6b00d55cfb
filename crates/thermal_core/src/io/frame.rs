use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::ascent::ThermalRun;
use crate::cause::Event;
use crate::config::GroundConditions;

/// One serialized run, written as a single NDJSON line.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub t: u64,
    pub revision: u64,
    pub ground: GroundConditions,
    pub cloud_base: f64,
    pub has_cloud: bool,
    pub cloud_base_pressure: Option<f64>,
    pub thermal_top: f64,
    /// `[altitude, impulse]` of the strongest step.
    pub peak: Option<[f64; 2]>,
    /// `[altitude, impulse]` pairs in ascending altitude.
    pub strength: Vec<[f64; 2]>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub chronicle: Vec<String>,
}

pub fn make_frame(
    t: u64,
    revision: u64,
    ground: &GroundConditions,
    run: ThermalRun,
    chronicle: Vec<String>,
) -> Frame {
    let peak = run.peak().map(|point| [point.altitude, point.impulse]);
    let strength = run
        .strength
        .iter()
        .map(|point| [point.altitude, point.impulse])
        .collect();

    Frame {
        t,
        revision,
        ground: ground.clone(),
        cloud_base: run.cloud_base,
        has_cloud: run.has_cloud,
        cloud_base_pressure: run.cloud_base_pressure,
        thermal_top: run.thermal_top,
        peak,
        strength,
        events: run.events,
        chronicle,
    }
}

impl Frame {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}
