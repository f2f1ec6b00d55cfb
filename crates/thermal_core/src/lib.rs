pub mod ascent;
pub mod cause;
pub mod column;
pub mod config;
pub mod error;
pub mod io;
pub mod meteo;
pub mod profile;
#[cfg(any(test, feature = "proptest-support"))]
pub mod strategies;

use anyhow::Result;
use ascent::ThermalRun;
use column::Column;

pub use error::ProfileError;

/// Run the thermal for the column's current state.
///
/// Returns the run together with chronicle notes summarising it for humans.
pub fn run_once(column: &Column) -> Result<(ThermalRun, Vec<String>)> {
    let run = column.simulate()?;
    let chronicle = chronicle_for(&run);
    Ok((run, chronicle))
}

/// Human-readable notes describing a run.
pub fn chronicle_for(run: &ThermalRun) -> Vec<String> {
    let mut chronicle = Vec::new();
    match run.cloud() {
        Some(base) => chronicle.push(format!("Cloud base forms at {:.0} m.", base)),
        None => chronicle.push("The thermal stays dry.".to_string()),
    }
    if let Some(peak) = run.peak() {
        chronicle.push(format!(
            "Strongest lift {:.2} at {:.0} m.",
            peak.impulse, peak.altitude
        ));
    }
    if run.has_cloud && run.thermal_top < run.cloud_base {
        chronicle.push(format!(
            "Thermal tops out at {:.0} m below the condensation level.",
            run.thermal_top
        ));
    } else {
        chronicle.push(format!("Thermal tops out at {:.0} m.", run.thermal_top));
    }
    chronicle
}
