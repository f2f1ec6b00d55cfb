use thiserror::Error;

/// Failures raised by [`Profile`](crate::profile::Profile) operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProfileError {
    #[error("altitude {altitude} m lies outside the profile range [{min}, {max}] m")]
    OutOfRange { altitude: f64, min: f64, max: f64 },
    #[error("profile has no samples")]
    Empty,
    #[error("altitude {altitude} m is not a valid sample altitude")]
    InvalidAltitude { altitude: f64 },
    #[error("more than one sample at altitude {altitude} m")]
    DuplicateAltitude { altitude: f64 },
}
