//! Empirical meteorological relations used by the profile and the ascent simulator.
//!
//! These are approximations tuned to reproduce historical outputs. They are not
//! guarded against their known bad regions: very low relative humidity or very
//! cold air makes [`dew_point`] and [`saturated_vapor_density`] return garbage or
//! non-finite values, and callers are expected to live with that.

/// Altitude above which [`pressure_at_altitude`] is no longer meaningful [m].
pub const PRESSURE_VALIDITY_CEILING_M: f64 = 10_000.0;

/// Standard temperature lapse rate used by the hypsometric approximation [K/m].
const HYPSOMETRIC_LAPSE: f64 = 0.0065;

const HYPSOMETRIC_EXPONENT: f64 = 5.257;

const KELVIN_OFFSET: f64 = 273.15;

const MAGNUS_A: f64 = 17.62;
const MAGNUS_B: f64 = 243.12;
const LOG10_E: f64 = 0.4343;

/// Pressure at `altitude` given the surface pressure and the temperature there.
///
/// Only valid below [`PRESSURE_VALIDITY_CEILING_M`]; the result is returned in the
/// same unit as `ground_pressure`.
#[inline]
pub fn pressure_at_altitude(ground_pressure: f64, altitude: f64, temperature_c: f64) -> f64 {
    let lapse = HYPSOMETRIC_LAPSE * altitude;
    let ratio = 1.0 - lapse / (temperature_c + lapse + KELVIN_OFFSET);
    ground_pressure * ratio.powf(HYPSOMETRIC_EXPONENT)
}

/// Maximum absolute humidity [g/m³] air can hold at `temperature_c`.
///
/// Cubic fit; turns negative well below freezing.
#[inline]
pub fn saturated_vapor_density(temperature_c: f64) -> f64 {
    let t = temperature_c;
    5.018 + 0.32321 * t + 8.1847e-3 * t * t + 3.1243e-4 * t * t * t
}

/// Relative humidity as a fraction (1.0 = saturated).
///
/// Pressure and altitude do not enter the relation.
#[inline]
pub fn relative_humidity(absolute_humidity: f64, temperature_c: f64) -> f64 {
    absolute_humidity / saturated_vapor_density(temperature_c)
}

/// Magnus-type dew point [°C] from temperature and relative humidity fraction.
///
/// A fraction of zero or below yields NaN; `h` close to 17.62 blows up. Neither is
/// clamped.
#[inline]
pub fn dew_point(temperature_c: f64, relative_humidity: f64) -> f64 {
    let h = ((relative_humidity * 100.0).log10() - 2.0) / LOG10_E
        + MAGNUS_A * temperature_c / (MAGNUS_B + temperature_c);
    MAGNUS_B * h / (MAGNUS_A - h)
}

/// Dew point [°C] of air at `temperature_c` carrying `absolute_humidity` g/m³.
#[inline]
pub fn dew_point_from_absolute(temperature_c: f64, absolute_humidity: f64) -> f64 {
    dew_point(temperature_c, relative_humidity(absolute_humidity, temperature_c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pressure_at_ground_is_ground_pressure() {
        assert_eq!(pressure_at_altitude(101_325.0, 0.0, 15.0), 101_325.0);
    }

    #[test]
    fn pressure_drops_with_altitude() {
        let low = pressure_at_altitude(101_325.0, 1_000.0, 8.5);
        let high = pressure_at_altitude(101_325.0, 3_000.0, -4.5);
        assert!(low < 101_325.0);
        assert!(high < low);
        // Roughly 898 hPa at 1 km in a standard atmosphere.
        assert!((low - 89_875.0).abs() < 500.0, "got {}", low);
    }

    #[test]
    fn saturated_density_matches_fit_coefficients() {
        assert_eq!(saturated_vapor_density(0.0), 5.018);
        let t = 20.0;
        let expected = 5.018 + 0.32321 * t + 8.1847e-3 * t * t + 3.1243e-4 * t * t * t;
        assert_eq!(saturated_vapor_density(20.0), expected);
        // ~17.3 g/m³ at 20 °C in reference tables.
        assert!((saturated_vapor_density(20.0) - 17.3).abs() < 0.3);
    }

    #[test]
    fn relative_humidity_is_unity_at_saturation() {
        let saturated = saturated_vapor_density(12.0);
        assert_eq!(relative_humidity(saturated, 12.0), 1.0);
        assert!((relative_humidity(saturated / 2.0, 12.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dew_point_equals_temperature_when_saturated() {
        let dp = dew_point(18.0, 1.0);
        assert!((dp - 18.0).abs() < 0.05, "got {}", dp);
    }

    #[test]
    fn dew_point_is_nan_for_dry_air() {
        assert!(dew_point(20.0, 0.0).is_nan());
        assert!(dew_point(20.0, -0.2).is_nan());
        assert!(dew_point_from_absolute(20.0, 0.0).is_nan());
    }

    proptest! {
        #[test]
        fn dew_point_never_exceeds_temperature_below_saturation(
            temperature in -10.0f64..35.0,
            fraction in 0.05f64..1.0,
        ) {
            let dp = dew_point(temperature, fraction);
            prop_assert!(dp.is_finite());
            prop_assert!(dp <= temperature + 1e-6);
        }
    }
}
