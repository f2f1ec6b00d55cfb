use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use thermal_core::column::Column;
use thermal_core::config::GroundConditions;
use thermal_core::io::frame::{make_frame, Frame};
use thermal_core::io::sounding::{build_column, Sounding};
use thermal_core::run_once;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "thermalstep",
    about = "Batch runner writing thermal ascent frames as NDJSON"
)]
struct Args {
    /// Path to the sounding JSON document.
    #[arg(long, value_name = "PATH")]
    sounding: PathBuf,

    /// Output NDJSON file path.
    #[arg(long)]
    out: PathBuf,

    /// Override the sounding's solar strength (0..1).
    #[arg(long = "solar-strength", value_name = "FRACTION")]
    solar_strength: Option<f64>,

    /// Override the sounding's ground absolute humidity [g/m³].
    #[arg(long = "ground-humidity", value_name = "G_PER_M3")]
    ground_humidity: Option<f64>,

    /// Override the sounding's ground pressure [Pa].
    #[arg(long = "ground-pressure", value_name = "PA")]
    ground_pressure: Option<f64>,

    /// Sweep solar strength from zero up to the chosen value over this many runs.
    #[arg(long, value_name = "RUNS", value_parser = clap::value_parser!(u64).range(2..))]
    sweep: Option<u64>,
}

fn ground_from_args(args: &Args, base: &GroundConditions) -> GroundConditions {
    GroundConditions {
        absolute_humidity: args.ground_humidity.unwrap_or(base.absolute_humidity),
        pressure: args.ground_pressure.unwrap_or(base.pressure),
        solar_strength: args.solar_strength.unwrap_or(base.solar_strength),
    }
}

/// Solar strengths to run, in order.
fn solar_schedule(target: f64, sweep: Option<u64>) -> Vec<f64> {
    match sweep {
        Some(runs) => {
            let last = (runs - 1) as f64;
            (0..runs).map(|i| target * i as f64 / last).collect()
        }
        None => vec![target],
    }
}

fn run_frames(
    column: &mut Column,
    ground: GroundConditions,
    sweep: Option<u64>,
) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for (t, solar_strength) in solar_schedule(ground.solar_strength, sweep)
        .into_iter()
        .enumerate()
    {
        column.set_conditions(GroundConditions {
            solar_strength,
            ..ground.clone()
        })?;
        let (run, chronicle) = run_once(column)
            .with_context(|| format!("run {} at solar strength {} failed", t, solar_strength))?;
        info!(
            t,
            solar_strength,
            cloud_base = run.cloud_base,
            thermal_top = run.thermal_top,
            "run complete"
        );
        frames.push(make_frame(
            t as u64,
            column.revision(),
            column.conditions(),
            run,
            chronicle,
        ));
    }
    Ok(frames)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sounding = Sounding::load_from_path(&args.sounding)
        .with_context(|| format!("failed to read sounding {:?}", args.sounding))?;
    let mut column = build_column(&sounding)?;
    let ground = ground_from_args(&args, &sounding.ground);
    ground.validate()?;

    let frames = run_frames(&mut column, ground, args.sweep)?;

    let frame_file =
        File::create(&args.out).with_context(|| format!("failed to create {:?}", args.out))?;
    let mut frame_writer = BufWriter::new(frame_file);
    for frame in &frames {
        let line = frame.to_ndjson()?;
        frame_writer.write_all(line.as_bytes())?;
    }
    frame_writer.flush()?;

    info!(sounding = %sounding.name, frames = frames.len(), out = ?args.out, "wrote frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ground_from_args, run_frames, solar_schedule, Args};
    use clap::{error::ErrorKind, Parser};
    use thermal_core::config::GroundConditions;
    use thermal_core::io::sounding::{build_column, Sounding};

    const SOUNDING: &str = r#"{
        "name": "determinism",
        "ground": {"absolute_humidity": 9.0, "pressure": 100000.0, "solar_strength": 0.9},
        "samples": [
            {"altitude": 0, "temperature": 24.0, "wind": 1.0, "humidity": 9.0},
            {"altitude": 2000, "temperature": 10.0, "wind": 4.0, "humidity": 6.0},
            {"altitude": 2400, "temperature": 11.5, "wind": 5.0, "humidity": 3.0},
            {"altitude": 9000, "temperature": -38.0, "wind": 18.0, "humidity": 0.5}
        ]
    }"#;

    #[test]
    fn requires_sounding() {
        let err = Args::try_parse_from(["thermalstep", "--out", "out.ndjson"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_single_run_sweep() {
        let err = Args::try_parse_from([
            "thermalstep",
            "--sounding",
            "sounding.json",
            "--out",
            "out.ndjson",
            "--sweep",
            "1",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn overridden_ground_is_validated() {
        let args = Args::try_parse_from([
            "thermalstep",
            "--sounding",
            "sounding.json",
            "--out",
            "out.ndjson",
            "--solar-strength",
            "1.5",
        ])
        .expect("args parse");
        let ground = ground_from_args(&args, &GroundConditions::default());
        assert_eq!(ground.solar_strength, 1.5);
        assert!(ground.validate().is_err());
    }

    #[test]
    fn sweep_spans_zero_to_target() {
        let schedule = solar_schedule(0.8, Some(5));
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule[0], 0.0);
        assert!((schedule[4] - 0.8).abs() < 1e-12);
        assert_eq!(solar_schedule(0.6, None), vec![0.6]);
    }

    #[test]
    fn paired_sweeps_are_deterministic() {
        let sounding = Sounding::from_reader(SOUNDING.as_bytes()).expect("sounding parses");

        let run_once = || {
            let mut column = build_column(&sounding).expect("column builds");
            let ground = sounding.ground.clone();
            run_frames(&mut column, ground, Some(11))
                .expect("sweep succeeds")
                .iter()
                .map(|frame| frame.to_ndjson().expect("frame serializes"))
                .collect::<Vec<_>>()
        };

        let first = run_once();
        let second = run_once();
        assert_eq!(first.len(), 11);
        assert_eq!(first, second);
    }

    #[test]
    fn stronger_sun_never_lowers_the_top() {
        let sounding = Sounding::from_reader(SOUNDING.as_bytes()).expect("sounding parses");
        let mut column = build_column(&sounding).expect("column builds");
        let frames = run_frames(&mut column, sounding.ground.clone(), Some(6)).expect("sweep");
        assert!(frames
            .windows(2)
            .all(|pair| pair[0].thermal_top <= pair[1].thermal_top));
    }
}
