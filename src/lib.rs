//! Pattern generation and projection for DMD projectors driven through the
//! ALP API with an integrated LED driver.
//!
//! This crate provides:
//! - [`FrameBuffer`], a bounds-checked byte raster in the projector's upload layout
//! - Test patterns (moving square, stripes, grid, checkerboard) in [`patterns`]
//! - The [`device::AlpDevice`] boundary and an in-memory simulation of it
//! - A [`projector::Projector`] session that uploads, lights and monitors
//! - Projection settings and Ctrl+C handling shared by the binary

pub mod device;
pub mod error;
pub mod export;
pub mod frames;
pub mod patterns;
pub mod projector;

pub use error::{DeviceError, FrameError};
pub use frames::{FrameBuffer, Rect};
pub use patterns::{Axis, Pattern};

use device::LedType;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Highest LED brightness this application drives, in percent. The driver
/// itself allows overdriving.
pub const MAX_BRIGHTNESS: u8 = 100;

// ── Projection settings ────────────────────────────────────────────

/// How a sequence is shown and how the LED is driven and watched.
///
/// # Rust concept: struct update syntax
/// `ProjectorConfig { brightness: 50, ..ProjectorConfig::default() }`
/// overrides one field and keeps the defaults for the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectorConfig {
    /// How long each frame is displayed
    pub picture_time: Duration,
    /// LED brightness in percent (capped at [`MAX_BRIGHTNESS`])
    pub brightness: u8,
    /// The LED module fitted to the driver
    pub led_type: LedType,
    /// Time between telemetry reads
    pub poll_interval: Duration,
    /// Junction temperature at which projection stops
    pub overheat_celsius: f64,
}

impl ProjectorConfig {
    /// Brightness actually sent to the driver.
    pub fn effective_brightness(&self) -> u8 {
        self.brightness.min(MAX_BRIGHTNESS)
    }

    /// Frames shown per second at the configured picture time.
    pub fn frame_rate(&self) -> f64 {
        1.0 / self.picture_time.as_secs_f64()
    }
}

impl Default for ProjectorConfig {
    /// 200 ms per frame (5 Hz), 75 % brightness on a blue LED, one reading
    /// per second, stop at 100 °C.
    fn default() -> Self {
        Self {
            picture_time: Duration::from_millis(200),
            brightness: 75,
            led_type: LedType::Pt120Blue,
            poll_interval: Duration::from_secs(1),
            overheat_celsius: 100.0,
        }
    }
}

// ── Shutdown signalling ────────────────────────────────────────────

/// Install a Ctrl+C handler and return the flag it clears.
///
/// # Rust concept: Arc and AtomicBool
/// The handler runs on another thread, so the flag is shared through an
/// `Arc` and read without locking.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();

    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// True until the Ctrl+C handler has fired.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
