//! ALP projector pattern runner
//!
//! Allocates the projector, renders a test pattern sized to its DMD, uploads
//! it, switches the LED on and projects continuously while printing LED
//! current and junction temperature once per second. Stops on Ctrl+C or when
//! the LED gets too hot, then halts and frees the device.
//!
//! The vendor library is not linked; the projector here is the in-memory
//! [`SimulatedDevice`], which follows the same call sequence. Use
//! `--export-dir` to look at the rendered frames.
//!
//! ## Usage
//! ```sh
//! alp-projector --pattern grid --spacing 16 --line-width 4 --brightness 60
//! alp-projector --pattern moving-square --frames 20 --export-dir out/
//! ```

use alp_projector::device::{LedType, SimulatedDevice};
use alp_projector::export::save_sequence_png;
use alp_projector::projector::Projector;
use alp_projector::{Axis, Pattern, ProjectorConfig, setup_signal_handler};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Test patterns selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PatternKind {
    MovingSquare,
    CenteredSquare,
    VerticalLines,
    HorizontalLines,
    Grid,
    Checkerboard,
}

/// Project a test pattern on an ALP DMD and watch the LED
#[derive(Parser)]
#[command(name = "alp-projector")]
#[command(about = "Project test patterns on an ALP DMD with LED monitoring")]
#[command(version)]
struct Args {
    /// Pattern to project
    #[arg(long, value_enum, default_value_t = PatternKind::MovingSquare)]
    pattern: PatternKind,

    /// Number of frames (defaults to 10 for the moving square, 1 otherwise)
    #[arg(long)]
    frames: Option<usize>,

    /// Offset of the first line or tile, in pixels
    #[arg(long, default_value = "0")]
    padding: usize,

    /// Gap between lines, in pixels
    #[arg(long, default_value = "4")]
    spacing: usize,

    /// Line thickness, in pixels
    #[arg(long, default_value = "4")]
    line_width: usize,

    /// Side of the centered square or checkerboard tile, in pixels
    #[arg(long, default_value = "64")]
    square_size: usize,

    /// Display time per frame, in microseconds
    #[arg(long, default_value = "200000", value_parser = clap::value_parser!(u64).range(1..))]
    picture_time_us: u64,

    /// LED brightness in percent (capped at 100)
    #[arg(long, default_value = "75")]
    brightness: u8,

    /// LED module fitted to the driver
    #[arg(long, value_enum, default_value_t = LedType::Pt120Blue)]
    led_type: LedType,

    /// Milliseconds between LED telemetry reads
    #[arg(long, default_value = "1000")]
    poll_ms: u64,

    /// Junction temperature at which projection stops, in °C
    #[arg(long, default_value = "100")]
    max_temp: f64,

    /// Width of the simulated DMD
    #[arg(long, default_value = "1024")]
    width: usize,

    /// Height of the simulated DMD
    #[arg(long, default_value = "768")]
    height: usize,

    /// Also write every frame to this directory as PNG
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print each telemetry sample to stdout as a JSON line
    #[arg(long)]
    json: bool,
}

impl Args {
    fn pattern(&self) -> Pattern {
        match self.pattern {
            PatternKind::MovingSquare => Pattern::MovingSquare,
            PatternKind::CenteredSquare => Pattern::CenteredSquare {
                size: self.square_size,
            },
            PatternKind::VerticalLines => Pattern::Stripes {
                axis: Axis::Vertical,
                padding: self.padding,
                spacing: self.spacing,
                line_width: self.line_width,
            },
            PatternKind::HorizontalLines => Pattern::Stripes {
                axis: Axis::Horizontal,
                padding: self.padding,
                spacing: self.spacing,
                line_width: self.line_width,
            },
            PatternKind::Grid => Pattern::Grid {
                padding: self.padding,
                spacing: self.spacing,
                line_width: self.line_width,
            },
            PatternKind::Checkerboard => Pattern::Checkerboard {
                padding: self.padding,
                square_size: self.square_size,
            },
        }
    }

    fn frame_count(&self) -> usize {
        match (self.frames, self.pattern) {
            (Some(frames), _) => frames,
            (None, PatternKind::MovingSquare) => 10,
            (None, _) => 1,
        }
    }

    fn config(&self) -> ProjectorConfig {
        ProjectorConfig {
            picture_time: Duration::from_micros(self.picture_time_us),
            brightness: self.brightness,
            led_type: self.led_type,
            poll_interval: Duration::from_millis(self.poll_ms),
            overheat_celsius: self.max_temp,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = args.config();
    let pattern = args.pattern();
    let running = setup_signal_handler()?;

    tracing::info!("ALP projector v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Pattern: {}; {:.1} Hz; LED {} at {}%",
        pattern.name(),
        config.frame_rate(),
        config.led_type,
        config.effective_brightness()
    );

    let device = SimulatedDevice::new(args.width, args.height);
    let mut projector = Projector::open(device)?;

    let (width, height) = projector.dimensions();
    let frames = pattern.render(args.frame_count(), width, height)?;

    if let Some(dir) = &args.export_dir {
        save_sequence_png(&frames, dir, "frame")?;
    }

    projector.upload(&frames, config.picture_time)?;
    projector.switch_led_on(config.led_type, config.brightness)?;
    projector.start()?;

    let json = args.json;
    let reason = projector.monitor(&running, &config, |sample| {
        if !json {
            return;
        }
        match serde_json::to_string(sample) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Could not serialize telemetry: {}", e),
        }
    })?;
    tracing::info!("Projection stopped: {:?}", reason);

    projector.shutdown()?;
    tracing::info!("Finished.");
    Ok(())
}
