//! Command-line front end: replay a directory of eye-camera frames through
//! the tracking engine and log per-frame telemetry.

use std::path::PathBuf;

use clap::Parser;
use eyetrack::{
    Engine, EngineParams, EngineState, FitModelKind, FpsExtractor, FrameRecorder,
    ImageSequenceSource, JsonLogExtractor,
};
use log::LevelFilter;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "eyetrack")]
#[command(about = "Track the pupil and two corneal reflections in a sequence of frames")]
#[command(version)]
struct Cli {
    /// Directory of frames (png, jpg, bmp, tif), replayed in file-name order.
    input: PathBuf,

    /// Engine configuration (JSON). Command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pupil shape model: circular or elliptical.
    #[arg(long)]
    model: Option<FitModelKind>,

    /// Stored blink calibration (flat JSON array of 300 frame means).
    #[arg(long)]
    blink: Option<PathBuf>,

    /// Stored binarization parameters (JSON); disables automatic thresholds.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory for output.json, parameter and calibration files.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Record timestamps only, without tracking.
    #[arg(long)]
    record_only: bool,

    /// Save every processed frame as PNG under `<output-dir>/frames`.
    #[arg(long, requires = "output_dir")]
    save_frames: bool,

    /// Initial pupil center as `x,y`.
    #[arg(long, value_parser = parse_point)]
    pupil_center: Option<Point2<f64>>,

    /// Initial corneal-reflection center as `x,y`; repeat for the second.
    #[arg(long = "cr-center", value_parser = parse_point)]
    cr_centers: Vec<Point2<f64>>,

    /// Rotate every frame by this many degrees.
    #[arg(long)]
    rotate: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Emit `tracing` spans instead of plain log lines (filter via RUST_LOG).
    #[cfg(feature = "tracing")]
    #[arg(long)]
    tracing: bool,
}

fn parse_point(s: &str) -> Result<Point2<f64>, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{v}': {e}"))
    };
    Ok(Point2::new(parse(x)?, parse(y)?))
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        if cli.tracing {
            let _ = LogTracer::init();
            eyetrack::core::init_tracing(false);
            return Ok(());
        }
    }
    eyetrack::core::init_with_level(cli.log_level)?;
    Ok(())
}

fn engine_params(cli: &Cli) -> CliResult<EngineParams> {
    let mut params = match &cli.config {
        Some(path) => EngineParams::load_json(path)?,
        None => EngineParams::default(),
    };
    if let Some(model) = cli.model {
        params.pupil.model = model;
    }
    if cli.record_only {
        params.state = EngineState::Record;
    }
    if cli.output_dir.is_some() {
        params.output_dir = cli.output_dir.clone();
    }
    if cli.max_frames.is_some() {
        params.max_frames = cli.max_frames;
    }
    Ok(params)
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if cli.cr_centers.len() > eyetrack::engine::CORNEAL_REFLECTIONS {
        return Err(format!(
            "at most {} corneal-reflection centers are supported",
            eyetrack::engine::CORNEAL_REFLECTIONS
        )
        .into());
    }

    let params = engine_params(&cli)?;
    if let Some(dir) = &params.output_dir {
        std::fs::create_dir_all(dir)?;
    }
    let output_dir = params.output_dir.clone();
    let mut engine = Engine::new(params);

    if let Some(path) = &cli.blink {
        engine.load_blink_calibration_file(path)?;
    }
    if let Some(path) = &cli.params {
        engine.load_tracking_params(path)?;
    }
    if let Some(center) = cli.pupil_center {
        engine.pupil_mut().set_center(center);
    }
    for (i, center) in cli.cr_centers.iter().enumerate() {
        if let Some(cr) = engine.corneal_reflection_mut(i) {
            cr.set_center(*center);
        }
    }
    if let Some(deg) = cli.rotate {
        engine.rotate_by(deg);
    }

    engine.add_extractor(Box::new(FpsExtractor::default()));
    if let Some(dir) = &output_dir {
        engine.add_extractor(Box::new(JsonLogExtractor::in_dir(dir)));
        if cli.save_frames {
            engine.add_extractor(Box::new(FrameRecorder::new(dir.join("frames"))));
        }
    }

    let mut source = ImageSequenceSource::open(&cli.input)?;
    let frames = engine.run(&mut source)?;
    println!("processed {frames} frames");
    Ok(())
}
