//! Projection session: owns an [`AlpDevice`] from allocation to release.
//!
//! The order of vendor calls is fixed: allocate the device, inquire its size,
//! upload a sequence and set its timing, switch the LED on, start continuous
//! projection, poll LED telemetry, then halt and free. Dropping a
//! [`Projector`] without calling [`Projector::shutdown`] still halts and
//! frees the device, so an early `?` return never leaves the LED burning.
//!
//! ## Rust concepts
//! - `Drop` for guaranteed cleanup on every exit path
//! - Generic structs over a trait (`Projector<D: AlpDevice>`)
//! - `FnMut` callbacks for reporting from inside a loop
//! - `Result::inspect` / `inspect_err` for logging without consuming

use crate::device::{AlpDevice, LedId, LedType, SequenceId};
use crate::error::DeviceError;
use crate::frames::FrameBuffer;
use crate::{MAX_BRIGHTNESS, ProjectorConfig, is_running};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

/// Gated synch output wired to the LED enable line on single-LED devices.
const LED_ENABLE_SYNCH_GATE: u8 = 3;

/// Driver temperature readings are in 1/256 °C.
const TEMPERATURE_SCALE: f64 = 256.0;

// ── Telemetry ────────────────────────────────────────────────────────

/// One LED current and temperature reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LedTelemetry {
    /// Measured LED current in mA
    pub current_ma: i32,
    /// Junction temperature in the driver's raw unit (1/256 °C)
    pub junction_temp_raw: i32,
    /// Measured LED current in A
    pub current_amps: f64,
    /// Junction temperature in °C
    pub junction_temp_celsius: f64,
}

impl LedTelemetry {
    pub fn from_raw(current_ma: i32, junction_temp_raw: i32) -> Self {
        Self {
            current_ma,
            junction_temp_raw,
            current_amps: current_ma as f64 / 1000.0,
            junction_temp_celsius: junction_temp_raw as f64 / TEMPERATURE_SCALE,
        }
    }

    /// An unplugged thermistor reads far below zero.
    pub fn thermistor_disconnected(&self) -> bool {
        self.junction_temp_raw < 0
    }

    pub fn is_overheated(&self, limit_celsius: f64) -> bool {
        self.junction_temp_raw as f64 > limit_celsius * TEMPERATURE_SCALE
    }
}

/// Why [`Projector::monitor`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The running flag was cleared (Ctrl+C).
    Interrupted,
    /// The junction temperature passed the configured limit.
    Overheated,
}

// ── Session ──────────────────────────────────────────────────────────

/// Log the outcome of one vendor call.
fn verify<T>(call: &'static str, result: Result<T, DeviceError>) -> Result<T, DeviceError> {
    result
        .inspect(|_| tracing::debug!("{call}: ok"))
        .inspect_err(|e| tracing::error!("{call}: {e}"))
}

/// An allocated projector and the handles allocated on it.
pub struct Projector<D: AlpDevice> {
    device: D,
    width: usize,
    height: usize,
    sequence: Option<SequenceId>,
    led: Option<LedId>,
    allocated: bool,
}

impl<D: AlpDevice> Projector<D> {
    /// Allocate the device and read its display size.
    pub fn open(mut device: D) -> Result<Self, DeviceError> {
        verify("AlpDevAlloc", device.allocate())?;

        // From here on, Drop frees the device if anything fails.
        let mut projector = Self {
            device,
            width: 0,
            height: 0,
            sequence: None,
            led: None,
            allocated: true,
        };

        let (width, height) = verify("AlpDevInquire", projector.device.display_size())?;
        projector.width = width;
        projector.height = height;
        tracing::info!("DMD size: {} x {} pixels", width, height);

        Ok(projector)
    }

    /// DMD width and height in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn sequence(&self) -> Option<SequenceId> {
        self.sequence
    }

    pub fn led(&self) -> Option<LedId> {
        self.led
    }

    /// Upload every frame of `frames` as a 1-bit sequence shown for
    /// `picture_time` per frame.
    pub fn upload(
        &mut self,
        frames: &FrameBuffer,
        picture_time: Duration,
    ) -> Result<SequenceId, DeviceError> {
        if (frames.width(), frames.height()) != self.dimensions() {
            return Err(DeviceError::invalid_parameter(format!(
                "frames are {}x{}, DMD is {}x{}",
                frames.width(),
                frames.height(),
                self.width,
                self.height
            )));
        }

        let count = frames.frame_count();
        let sequence = verify("AlpSeqAlloc", self.device.alloc_sequence(1, count))?;
        verify(
            "AlpSeqPut",
            self.device.put_sequence(sequence, 0, count, frames.as_bytes()),
        )?;
        verify(
            "AlpSeqTiming",
            self.device.set_picture_time(sequence, picture_time),
        )?;
        self.sequence = Some(sequence);

        tracing::info!(
            "Uploaded {} frame(s), {} µs per frame",
            count,
            picture_time.as_micros()
        );
        Ok(sequence)
    }

    /// Allocate the LED driver and switch the LED on at `brightness` percent.
    ///
    /// The driver would accept overdrive; brightness is capped at 100 %.
    pub fn switch_led_on(
        &mut self,
        led_type: LedType,
        brightness: u8,
    ) -> Result<LedId, DeviceError> {
        let led = verify("AlpLedAlloc", self.device.alloc_led(led_type))?;
        self.led = Some(led);

        let rated = verify(
            "AlpLedInquire",
            self.device.led_continuous_current_ma(led),
        )?;
        tracing::info!(
            "{} LED: continuous current {:.1} A",
            led_type,
            rated as f64 / 1000.0
        );

        verify(
            "AlpDevControlEx",
            self.device.enable_synch_gate(LED_ENABLE_SYNCH_GATE),
        )?;

        let percent = brightness.min(MAX_BRIGHTNESS);
        if percent != brightness {
            tracing::warn!("Brightness {}% capped to {}%", brightness, percent);
        }
        verify("AlpLedControl", self.device.set_led_brightness(led, percent))?;
        tracing::info!("LED on at {}%", percent);

        Ok(led)
    }

    /// Start showing the uploaded sequence in an endless loop.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        let sequence = self
            .sequence
            .ok_or_else(|| DeviceError::invalid_parameter("no sequence uploaded"))?;
        verify("AlpProjStartCont", self.device.start_continuous(sequence))?;
        tracing::info!("Continuous projection started");
        Ok(())
    }

    /// Read LED current and junction temperature once.
    pub fn poll(&mut self) -> Result<LedTelemetry, DeviceError> {
        let led = self
            .led
            .ok_or_else(|| DeviceError::invalid_parameter("LED not allocated"))?;
        let current = verify("AlpLedInquire", self.device.measured_current_ma(led))?;
        let temperature = verify("AlpLedInquire", self.device.junction_temperature(led))?;
        Ok(LedTelemetry::from_raw(current, temperature))
    }

    /// Poll telemetry every `config.poll_interval` until `running` clears or
    /// the LED passes `config.overheat_celsius`.
    ///
    /// Each sample is logged and handed to `on_sample` before the
    /// temperature checks run.
    pub fn monitor<F>(
        &mut self,
        running: &AtomicBool,
        config: &ProjectorConfig,
        mut on_sample: F,
    ) -> Result<StopReason, DeviceError>
    where
        F: FnMut(&LedTelemetry),
    {
        tracing::info!("Monitoring LED; press Ctrl+C to stop projection");

        while is_running(running) {
            thread::sleep(config.poll_interval);

            let sample = self.poll()?;
            tracing::info!(
                "LED current={:.1} A; junction temperature={:.1} °C",
                sample.current_amps,
                sample.junction_temp_celsius
            );
            on_sample(&sample);

            if sample.thermistor_disconnected() {
                tracing::warn!("Thermistor cable does not seem to be connected");
            }
            if sample.is_overheated(config.overheat_celsius) {
                tracing::warn!(
                    "LED is above {:.0} °C, stopping",
                    config.overheat_celsius
                );
                return Ok(StopReason::Overheated);
            }
        }

        Ok(StopReason::Interrupted)
    }

    /// Halt projection and free the device, switching the LED off.
    pub fn shutdown(mut self) -> Result<(), DeviceError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if !self.allocated {
            return Ok(());
        }
        self.allocated = false;

        // Free even if halting fails.
        let halted = verify("AlpDevHalt", self.device.halt());
        let freed = verify("AlpDevFree", self.device.free());
        tracing::info!("Projector released");
        halted.and(freed)
    }
}

impl<D: AlpDevice> Drop for Projector<D> {
    fn drop(&mut self) {
        if self.allocated {
            tracing::warn!("Projector dropped without shutdown, releasing device");
            // Failures are already logged by `verify`.
            let _ = self.release();
        }
    }
}
