//! Proptest strategies for building well-formed profiles.

use proptest::collection::vec;
use proptest::prelude::*;

use crate::profile::{Profile, Sample};

/// Between two and `max_samples` samples, starting at the ground.
pub fn profile_with(max_samples: usize) -> impl Strategy<Value = Profile> {
    let layer = (10.0f64..2_000.0, -40.0f64..35.0, -20.0f64..20.0, 0.0f64..25.0);
    (
        (-10.0f64..35.0, -20.0f64..20.0, 0.0f64..25.0),
        vec(layer, 1..max_samples.max(2)),
    )
        .prop_map(|((temperature, wind, humidity), layers)| {
            let mut samples = vec![Sample::new(0.0, temperature, wind, humidity)];
            let mut altitude = 0.0;
            for (thickness, temperature, wind, humidity) in layers {
                altitude += thickness.round();
                samples.push(Sample::new(altitude, temperature, wind, humidity));
            }
            Profile::from_samples(samples).expect("strictly increasing altitudes")
        })
}

pub fn profile() -> impl Strategy<Value = Profile> {
    profile_with(12)
}
