use std::fmt;

use serde::Serialize;

/// Notable transitions recorded while a thermal is integrated.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventCode {
    CloudBase,
    Inversion,
    ThermalTop,
    CeilingReached,
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CloudBase => "cloud_base",
            Self::Inversion => "inversion",
            Self::ThermalTop => "thermal_top",
            Self::CeilingReached => "ceiling_reached",
        };
        f.write_str(label)
    }
}

/// Structured event entry used for diagnostics.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Event {
    pub altitude: f64,
    pub code: EventCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Event {
    pub fn new(altitude: f64, code: EventCode, note: Option<String>) -> Self {
        Self {
            altitude,
            code,
            note,
        }
    }
}
