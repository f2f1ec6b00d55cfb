use anyhow::{ensure, Result};

use crate::ascent::{self, ThermalRun};
use crate::config::{GroundConditions, ProfileDefaults, SimulationConfig};
use crate::error::ProfileError;
use crate::profile::{Field, Profile};

/// Column state owned by a host: the profile plus everything a run needs.
///
/// Every accepted mutation bumps [`Column::revision`] so consumers can tell stale
/// runs apart.
#[derive(Clone, Debug)]
pub struct Column {
    revision: u64,
    profile: Profile,
    conditions: GroundConditions,
    config: SimulationConfig,
    defaults: ProfileDefaults,
}

impl Column {
    /// Column seeded with a ground sample and a sample at the simulation ceiling.
    pub fn new(
        config: SimulationConfig,
        defaults: ProfileDefaults,
        conditions: GroundConditions,
    ) -> Result<Self> {
        config.validate()?;
        conditions.validate()?;
        let profile = Profile::seeded(config.calculations_max_height, &defaults)?;
        Ok(Self {
            revision: 0,
            profile,
            conditions,
            config,
            defaults,
        })
    }

    /// Wrap an existing profile, topping it up to the simulation ceiling.
    pub fn from_profile(
        mut profile: Profile,
        config: SimulationConfig,
        defaults: ProfileDefaults,
        conditions: GroundConditions,
    ) -> Result<Self> {
        config.validate()?;
        conditions.validate()?;
        let (bottom, _) = profile.bounds()?;
        ensure!(
            bottom == 0.0,
            "profile must start at the ground, lowest sample is at {} m",
            bottom
        );
        profile.ensure_ceiling(config.calculations_max_height, &defaults)?;
        Ok(Self {
            revision: 0,
            profile,
            conditions,
            config,
            defaults,
        })
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn conditions(&self) -> &GroundConditions {
        &self.conditions
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn update(
        &mut self,
        altitude: f64,
        field: Field,
        value: f64,
    ) -> Result<bool, ProfileError> {
        let inserted = self.profile.update(altitude, field, value)?;
        self.revision += 1;
        Ok(inserted)
    }

    pub fn set_conditions(&mut self, conditions: GroundConditions) -> Result<()> {
        conditions.validate()?;
        self.conditions = conditions;
        self.revision += 1;
        Ok(())
    }

    /// Extend the known atmosphere up to `altitude` using the profile defaults.
    pub fn raise_ceiling(&mut self, altitude: f64) -> Result<bool, ProfileError> {
        let extended = self.profile.ensure_ceiling(altitude, &self.defaults)?;
        if extended {
            self.revision += 1;
        }
        Ok(extended)
    }

    pub fn simulate(&self) -> Result<ThermalRun, ProfileError> {
        ascent::simulate(&self.profile, &self.conditions, &self.config)
    }
}
