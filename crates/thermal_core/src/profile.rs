//! Altitude-ordered atmosphere samples with linear interpolation between them.
//!
//! A [`Profile`] is the single mutable record of the column. Reads between two
//! samples interpolate; writes at an altitude without a sample synthesize one from
//! its neighbours and insert it, so profiles only ever grow.

use serde::{Deserialize, Serialize};

use crate::config::ProfileDefaults;
use crate::error::ProfileError;
use crate::meteo;

/// Stored quantity of a [`Sample`] addressable through [`Profile::query`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Wind,
    Humidity,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Temperature, Field::Wind, Field::Humidity];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Wind => "wind",
            Self::Humidity => "humidity",
        }
    }
}

/// One point of the column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Metres above ground.
    pub altitude: f64,
    /// °C
    pub temperature: f64,
    /// m/s, sign gives the horizontal direction.
    pub wind: f64,
    /// Absolute humidity [g/m³].
    pub humidity: f64,
    /// Derived from temperature and humidity; may be NaN.
    pub dew_point: f64,
}

impl Sample {
    pub fn new(altitude: f64, temperature: f64, wind: f64, humidity: f64) -> Self {
        Self {
            altitude,
            temperature,
            wind,
            humidity,
            dew_point: meteo::dew_point_from_absolute(temperature, humidity),
        }
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Temperature => self.temperature,
            Field::Wind => self.wind,
            Field::Humidity => self.humidity,
        }
    }

    /// Overwrite one field and refresh the dew point.
    pub fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Temperature => self.temperature = value,
            Field::Wind => self.wind = value,
            Field::Humidity => self.humidity = value,
        }
        self.dew_point = meteo::dew_point_from_absolute(self.temperature, self.humidity);
    }

    /// Dew point, or `None` where the approximation breaks down.
    pub fn meaningful_dew_point(&self) -> Option<f64> {
        self.dew_point.is_finite().then_some(self.dew_point)
    }
}

/// Samples strictly increasing by altitude.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Profile {
    samples: Vec<Sample>,
}

impl Profile {
    /// Fresh profile holding a ground sample and a ceiling sample.
    pub fn seeded(ceiling: f64, defaults: &ProfileDefaults) -> Result<Self, ProfileError> {
        Self::from_samples(vec![
            Sample::new(
                0.0,
                defaults.ground_temperature,
                defaults.wind,
                defaults.humidity,
            ),
            Sample::new(
                ceiling,
                defaults.ceiling_temperature,
                defaults.wind,
                defaults.humidity,
            ),
        ])
    }

    /// Build a profile from samples in any order.
    pub fn from_samples(mut samples: Vec<Sample>) -> Result<Self, ProfileError> {
        for sample in &samples {
            check_altitude(sample.altitude)?;
        }
        samples.sort_by(|a, b| a.altitude.total_cmp(&b.altitude));
        if let Some(pair) = samples
            .windows(2)
            .find(|pair| pair[0].altitude == pair[1].altitude)
        {
            return Err(ProfileError::DuplicateAltitude {
                altitude: pair[0].altitude,
            });
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Lowest and highest sampled altitude.
    pub fn bounds(&self) -> Result<(f64, f64), ProfileError> {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => Ok((first.altitude, last.altitude)),
            _ => Err(ProfileError::Empty),
        }
    }

    pub fn sample_at(&self, altitude: f64) -> Option<&Sample> {
        let index = self.lower_bound(altitude);
        self.samples
            .get(index)
            .filter(|sample| sample.altitude == altitude)
    }

    /// Value of `field` at `altitude`, interpolated between the neighbouring samples.
    pub fn query(&self, altitude: f64, field: Field) -> Result<f64, ProfileError> {
        match self.locate(altitude)? {
            Located::Exact(index) => Ok(self.samples[index].get(field)),
            Located::Between(lo, hi) => {
                let (lo, hi) = (&self.samples[lo], &self.samples[hi]);
                Ok(lerp(lo, hi, altitude, lo.get(field), hi.get(field)))
            }
        }
    }

    /// Full sample at `altitude`: stored if present, else interpolated with a
    /// freshly derived dew point.
    pub fn interpolate(&self, altitude: f64) -> Result<Sample, ProfileError> {
        match self.locate(altitude)? {
            Located::Exact(index) => Ok(self.samples[index].clone()),
            Located::Between(lo, hi) => {
                let (lo, hi) = (&self.samples[lo], &self.samples[hi]);
                Ok(Sample::new(
                    altitude,
                    lerp(lo, hi, altitude, lo.temperature, hi.temperature),
                    lerp(lo, hi, altitude, lo.wind, hi.wind),
                    lerp(lo, hi, altitude, lo.humidity, hi.humidity),
                ))
            }
        }
    }

    pub fn dew_point_at(&self, altitude: f64) -> Result<f64, ProfileError> {
        Ok(self.interpolate(altitude)?.dew_point)
    }

    /// Set `field` at `altitude`, inserting a synthesized sample if none exists there.
    ///
    /// Returns `true` when a new sample was inserted.
    pub fn update(
        &mut self,
        altitude: f64,
        field: Field,
        value: f64,
    ) -> Result<bool, ProfileError> {
        match self.locate(altitude)? {
            Located::Exact(index) => {
                self.samples[index].set(field, value);
                Ok(false)
            }
            Located::Between(_, hi) => {
                let mut sample = self.interpolate(altitude)?;
                sample.set(field, value);
                self.samples.insert(hi, sample);
                Ok(true)
            }
        }
    }

    /// Append a sample built from `defaults` when the top sample sits below `altitude`.
    ///
    /// Returns `true` when the profile was extended.
    pub fn ensure_ceiling(
        &mut self,
        altitude: f64,
        defaults: &ProfileDefaults,
    ) -> Result<bool, ProfileError> {
        check_altitude(altitude)?;
        let (_, top) = self.bounds()?;
        if top >= altitude {
            return Ok(false);
        }
        self.samples.push(Sample::new(
            altitude,
            defaults.ceiling_temperature,
            defaults.wind,
            defaults.humidity,
        ));
        Ok(true)
    }

    fn lower_bound(&self, altitude: f64) -> usize {
        self.samples
            .partition_point(|sample| sample.altitude < altitude)
    }

    fn locate(&self, altitude: f64) -> Result<Located, ProfileError> {
        let (min, max) = self.bounds()?;
        if !(min..=max).contains(&altitude) {
            return Err(ProfileError::OutOfRange { altitude, min, max });
        }
        let index = self.lower_bound(altitude);
        if self.samples[index].altitude == altitude {
            Ok(Located::Exact(index))
        } else {
            Ok(Located::Between(index - 1, index))
        }
    }
}

enum Located {
    Exact(usize),
    Between(usize, usize),
}

fn lerp(lo: &Sample, hi: &Sample, altitude: f64, lo_value: f64, hi_value: f64) -> f64 {
    lo_value + (altitude - lo.altitude) / (hi.altitude - lo.altitude) * (hi_value - lo_value)
}

fn check_altitude(altitude: f64) -> Result<(), ProfileError> {
    if altitude.is_finite() && altitude >= 0.0 {
        Ok(())
    } else {
        Err(ProfileError::InvalidAltitude { altitude })
    }
}
