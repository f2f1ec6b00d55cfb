use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::column::Column;
use crate::config::{GroundConditions, ProfileDefaults, SimulationConfig};
use crate::profile::{Profile, Sample};

/// Parsed sounding document describing the initial column.
#[derive(Clone, Debug, Deserialize)]
pub struct Sounding {
    pub name: String,
    #[serde(default)]
    pub ground: GroundConditions,
    #[serde(default)]
    pub config: SimulationConfig,
    #[serde(default)]
    pub defaults: ProfileDefaults,
    pub samples: Vec<SampleEntry>,
}

/// One observed level; the dew point is always derived.
#[derive(Clone, Debug, Deserialize)]
pub struct SampleEntry {
    pub altitude: f64,
    pub temperature: f64,
    #[serde(default)]
    pub wind: f64,
    #[serde(default)]
    pub humidity: f64,
}

impl Sounding {
    /// Load a sounding JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open sounding file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize a sounding document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("invalid sounding json")
    }
}

/// Realise a [`Column`] from the given sounding.
pub fn build_column(sounding: &Sounding) -> Result<Column> {
    let samples = sounding
        .samples
        .iter()
        .map(|entry| Sample::new(entry.altitude, entry.temperature, entry.wind, entry.humidity))
        .collect();
    let profile = Profile::from_samples(samples)
        .with_context(|| format!("sounding {:?} has invalid samples", sounding.name))?;
    Column::from_profile(
        profile,
        sounding.config.clone(),
        sounding.defaults.clone(),
        sounding.ground.clone(),
    )
    .with_context(|| format!("sounding {:?} does not describe a usable column", sounding.name))
}
