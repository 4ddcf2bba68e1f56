//! The projector hardware as seen by this crate.
//!
//! All of the real work (frame buffering, mirror timing, LED driver
//! communication) happens inside the vendor's ALP library behind opaque
//! handles. [`AlpDevice`] is the seam: one method per vendor call we use.
//! [`SimulatedDevice`] implements it in memory so the full pipeline runs and
//! can be tested without a projector attached.
//!
//! ## Rust concepts
//! - Traits as a boundary between our code and a foreign library
//! - Newtype handles (`SequenceId`, `LedId`) that cannot be mixed up
//! - `Arc<Mutex<T>>` so tests can inspect state the device owns

use crate::error::DeviceError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Handle of a sequence allocated in device memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SequenceId(pub u32);

/// Handle of an allocated LED driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LedId(pub u32);

/// LED modules the integrated driver supports.
///
/// The type cannot be detected automatically. It matters: it sets the
/// allowed continuous forward current and the junction temperature
/// calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LedType {
    Pt120Red,
    Pt120Green,
    Pt120Blue,
    Cbt120Uv,
}

impl fmt::Display for LedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedType::Pt120Red => "PT-120 red",
            LedType::Pt120Green => "PT-120 green",
            LedType::Pt120Blue => "PT-120 blue",
            LedType::Cbt120Uv => "CBT-120 UV",
        };
        f.write_str(name)
    }
}

/// One method per vendor API call.
///
/// Temperatures are in the driver's native unit of 1/256 °C; currents are
/// in mA.
pub trait AlpDevice {
    /// Allocate the device (`AlpDevAlloc`).
    fn allocate(&mut self) -> Result<(), DeviceError>;

    /// DMD width and height in pixels (`AlpDevInquire`).
    fn display_size(&self) -> Result<(usize, usize), DeviceError>;

    /// Reserve device memory for `frame_count` frames (`AlpSeqAlloc`).
    fn alloc_sequence(
        &mut self,
        bit_planes: u32,
        frame_count: usize,
    ) -> Result<SequenceId, DeviceError>;

    /// Copy frame data into a sequence starting at `first_frame` (`AlpSeqPut`).
    fn put_sequence(
        &mut self,
        sequence: SequenceId,
        first_frame: usize,
        frame_count: usize,
        data: &[u8],
    ) -> Result<(), DeviceError>;

    /// How long each frame is displayed (`AlpSeqTiming`).
    fn set_picture_time(
        &mut self,
        sequence: SequenceId,
        picture_time: Duration,
    ) -> Result<(), DeviceError>;

    /// Allocate the LED driver for an LED module (`AlpLedAlloc`).
    fn alloc_led(&mut self, led_type: LedType) -> Result<LedId, DeviceError>;

    /// Allowed continuous forward current of the LED (`AlpLedInquire`).
    fn led_continuous_current_ma(&self, led: LedId) -> Result<u32, DeviceError>;

    /// Drive the LED at `percent` of its continuous current (`AlpLedControl`).
    fn set_led_brightness(&mut self, led: LedId, percent: u8) -> Result<(), DeviceError>;

    /// Permanently assert a gated synch output (`AlpDevControlEx`).
    fn enable_synch_gate(&mut self, gate: u8) -> Result<(), DeviceError>;

    /// Display a sequence in an endless loop (`AlpProjStartCont`).
    fn start_continuous(&mut self, sequence: SequenceId) -> Result<(), DeviceError>;

    /// Measured LED current (`AlpLedInquire`).
    fn measured_current_ma(&mut self, led: LedId) -> Result<i32, DeviceError>;

    /// LED junction temperature in 1/256 °C (`AlpLedInquire`).
    fn junction_temperature(&mut self, led: LedId) -> Result<i32, DeviceError>;

    /// Stop projection (`AlpDevHalt`).
    fn halt(&mut self) -> Result<(), DeviceError>;

    /// Release the device; this also switches the LED off (`AlpDevFree`).
    fn free(&mut self) -> Result<(), DeviceError>;
}

// ── Simulation ───────────────────────────────────────────────────────

/// A sequence as stored by the simulated device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedSequence {
    pub id: SequenceId,
    pub bit_planes: u32,
    pub frame_count: usize,
    pub data: Vec<u8>,
    pub picture_time: Option<Duration>,
}

/// An LED as driven by the simulated device.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedLed {
    pub id: LedId,
    pub led_type: LedType,
    pub brightness: u8,
    /// Junction temperature in °C.
    pub junction_celsius: f64,
}

/// Everything the simulated device has been told so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulatedState {
    pub allocated: bool,
    pub sequences: Vec<SimulatedSequence>,
    pub led: Option<SimulatedLed>,
    pub synch_gates: Vec<u8>,
    pub projecting: Option<SequenceId>,
    pub halted: bool,
    pub freed: bool,
    pub temperature_reads: u32,
}

impl SimulatedState {
    pub fn sequence(&self, id: SequenceId) -> Option<&SimulatedSequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    fn sequence_mut(&mut self, id: SequenceId) -> Result<&mut SimulatedSequence, DeviceError> {
        self.sequences
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DeviceError::invalid_parameter(format!("unknown sequence {}", id.0)))
    }

    fn led_mut(&mut self, id: LedId) -> Result<&mut SimulatedLed, DeviceError> {
        self.led
            .as_mut()
            .filter(|led| led.id == id)
            .ok_or_else(|| DeviceError::invalid_parameter(format!("unknown LED {}", id.0)))
    }
}

/// Sentinel reading of a junction sensor with its cable unplugged.
const DISCONNECTED_THERMISTOR_CELSIUS: f64 = -273.0;

/// In-memory stand-in for an ALP device with an attached LED driver.
///
/// The LED draws `rated current * brightness / 100` while the device is
/// projecting. Its junction temperature moves halfway towards
/// `ambient + rise_per_percent * brightness` on every temperature read.
pub struct SimulatedDevice {
    width: usize,
    height: usize,
    ambient_celsius: f64,
    rise_per_percent: f64,
    thermistor_connected: bool,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedDevice {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ambient_celsius: 25.0,
            rise_per_percent: 0.5,
            thermistor_connected: true,
            state: Arc::new(Mutex::new(SimulatedState::default())),
        }
    }

    /// Degrees of steady-state junction heating per percent of brightness.
    pub fn with_thermal_rise(mut self, rise_per_percent: f64) -> Self {
        self.rise_per_percent = rise_per_percent;
        self
    }

    /// Report temperatures as if the thermistor cable were unplugged.
    pub fn with_disconnected_thermistor(mut self) -> Self {
        self.thermistor_connected = false;
        self
    }

    /// Shared handle to the device state, still readable after the device
    /// itself has been moved or dropped.
    pub fn state(&self) -> Arc<Mutex<SimulatedState>> {
        self.state.clone()
    }

    /// Nominal continuous current of each LED module in the simulation.
    pub fn rated_current_ma(led_type: LedType) -> u32 {
        match led_type {
            LedType::Pt120Red => 12_000,
            LedType::Pt120Green | LedType::Pt120Blue => 18_000,
            LedType::Cbt120Uv => 13_500,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, failing unless the device is allocated.
    fn allocated(&self) -> Result<MutexGuard<'_, SimulatedState>, DeviceError> {
        let state = self.lock();
        if state.allocated {
            Ok(state)
        } else {
            Err(DeviceError::NotAllocated)
        }
    }
}

impl Default for SimulatedDevice {
    /// An XGA (1024 x 768) DMD.
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

impl AlpDevice for SimulatedDevice {
    fn allocate(&mut self) -> Result<(), DeviceError> {
        let mut state = self.lock();
        if state.allocated {
            return Err(DeviceError::call("AlpDevAlloc", "device already allocated"));
        }
        *state = SimulatedState {
            allocated: true,
            ..SimulatedState::default()
        };
        Ok(())
    }

    fn display_size(&self) -> Result<(usize, usize), DeviceError> {
        self.allocated()?;
        Ok((self.width, self.height))
    }

    fn alloc_sequence(
        &mut self,
        bit_planes: u32,
        frame_count: usize,
    ) -> Result<SequenceId, DeviceError> {
        let mut state = self.allocated()?;
        if !(1..=8).contains(&bit_planes) {
            return Err(DeviceError::invalid_parameter(format!(
                "bit planes must be 1-8, got {bit_planes}"
            )));
        }
        if frame_count == 0 {
            return Err(DeviceError::invalid_parameter("sequence needs at least one frame"));
        }

        let len = frame_count
            .checked_mul(self.width)
            .and_then(|n| n.checked_mul(self.height))
            .ok_or_else(|| {
                DeviceError::invalid_parameter(format!(
                    "{frame_count} frames do not fit in device memory"
                ))
            })?;

        let id = SequenceId(state.sequences.len() as u32 + 1);
        state.sequences.push(SimulatedSequence {
            id,
            bit_planes,
            frame_count,
            data: vec![0; len],
            picture_time: None,
        });
        Ok(id)
    }

    fn put_sequence(
        &mut self,
        sequence: SequenceId,
        first_frame: usize,
        frame_count: usize,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        let frame_len = self.width.saturating_mul(self.height);
        let mut state = self.allocated()?;
        let seq = state.sequence_mut(sequence)?;

        let end = first_frame
            .checked_add(frame_count)
            .filter(|&end| end <= seq.frame_count)
            .ok_or_else(|| {
                DeviceError::invalid_parameter(format!(
                    "{frame_count} frame(s) from frame {first_frame} exceed sequence of {}",
                    seq.frame_count
                ))
            })?;
        // Within the sequence, so the byte counts fit its allocation.
        let expected = (end - first_frame) * frame_len;
        if data.len() != expected {
            return Err(DeviceError::call(
                "AlpSeqPut",
                format!(
                    "expected {expected} bytes for {frame_count} frame(s), got {}",
                    data.len()
                ),
            ));
        }

        let start = first_frame * frame_len;
        seq.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn set_picture_time(
        &mut self,
        sequence: SequenceId,
        picture_time: Duration,
    ) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        if picture_time.is_zero() {
            return Err(DeviceError::invalid_parameter("picture time must be positive"));
        }
        state.sequence_mut(sequence)?.picture_time = Some(picture_time);
        Ok(())
    }

    fn alloc_led(&mut self, led_type: LedType) -> Result<LedId, DeviceError> {
        let mut state = self.allocated()?;
        if state.led.is_some() {
            return Err(DeviceError::call("AlpLedAlloc", "LED driver already allocated"));
        }
        let id = LedId(1);
        state.led = Some(SimulatedLed {
            id,
            led_type,
            brightness: 0,
            junction_celsius: self.ambient_celsius,
        });
        Ok(id)
    }

    fn led_continuous_current_ma(&self, led: LedId) -> Result<u32, DeviceError> {
        let mut state = self.allocated()?;
        let led = state.led_mut(led)?;
        Ok(Self::rated_current_ma(led.led_type))
    }

    fn set_led_brightness(&mut self, led: LedId, percent: u8) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        state.led_mut(led)?.brightness = percent;
        Ok(())
    }

    fn enable_synch_gate(&mut self, gate: u8) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        if !(1..=3).contains(&gate) {
            return Err(DeviceError::invalid_parameter(format!(
                "no gated synch output {gate}"
            )));
        }
        if !state.synch_gates.contains(&gate) {
            state.synch_gates.push(gate);
        }
        Ok(())
    }

    fn start_continuous(&mut self, sequence: SequenceId) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        let timed = state.sequence_mut(sequence)?.picture_time.is_some();
        if !timed {
            return Err(DeviceError::call("AlpProjStartCont", "sequence timing not set"));
        }
        state.projecting = Some(sequence);
        state.halted = false;
        Ok(())
    }

    fn measured_current_ma(&mut self, led: LedId) -> Result<i32, DeviceError> {
        let mut state = self.allocated()?;
        let projecting = state.projecting.is_some();
        let led = state.led_mut(led)?;
        if !projecting {
            return Ok(0);
        }
        let rated = Self::rated_current_ma(led.led_type) as u64;
        Ok((rated * led.brightness as u64 / 100) as i32)
    }

    fn junction_temperature(&mut self, led: LedId) -> Result<i32, DeviceError> {
        let mut state = self.allocated()?;
        state.temperature_reads += 1;
        let projecting = state.projecting.is_some();
        let led = state.led_mut(led)?;

        let target = if projecting {
            self.ambient_celsius + self.rise_per_percent * led.brightness as f64
        } else {
            self.ambient_celsius
        };
        led.junction_celsius += (target - led.junction_celsius) / 2.0;

        let celsius = if self.thermistor_connected {
            led.junction_celsius
        } else {
            DISCONNECTED_THERMISTOR_CELSIUS
        };
        Ok((celsius * 256.0).round() as i32)
    }

    fn halt(&mut self) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        state.projecting = None;
        state.halted = true;
        Ok(())
    }

    fn free(&mut self) -> Result<(), DeviceError> {
        let mut state = self.allocated()?;
        state.projecting = None;
        if let Some(led) = state.led.as_mut() {
            led.brightness = 0;
        }
        state.allocated = false;
        state.freed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn allocated(width: usize, height: usize) -> SimulatedDevice {
        let mut dev = SimulatedDevice::new(width, height);
        dev.allocate().unwrap();
        dev
    }

    #[test]
    fn calls_before_allocation_fail() {
        let mut dev = SimulatedDevice::new(4, 4);
        assert_eq!(dev.display_size(), Err(DeviceError::NotAllocated));
        assert_eq!(dev.alloc_sequence(1, 1), Err(DeviceError::NotAllocated));
        assert_eq!(dev.halt(), Err(DeviceError::NotAllocated));
    }

    #[test]
    fn default_device_is_xga() {
        let dev = allocated(1024, 768);
        assert_eq!(dev.display_size().unwrap(), (1024, 768));
        let mut dev = SimulatedDevice::default();
        dev.allocate().unwrap();
        assert_eq!(dev.display_size().unwrap(), (1024, 768));
    }

    #[test]
    fn double_allocation_is_an_error() {
        let mut dev = allocated(4, 4);
        assert!(matches!(
            dev.allocate(),
            Err(DeviceError::Call {
                call: "AlpDevAlloc",
                ..
            })
        ));
    }

    #[test]
    fn put_sequence_stores_data_at_frame_offset() {
        let mut dev = allocated(2, 2);
        let seq = dev.alloc_sequence(1, 3).unwrap();
        dev.put_sequence(seq, 1, 2, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let state = dev.state();
        let state = state.lock().unwrap();
        assert_eq!(
            state.sequence(seq).unwrap().data,
            vec![0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[rstest]
    #[case(0, 1, 3)]
    #[case(0, 2, 4)]
    #[case(1, 2, 8)]
    #[case(usize::MAX, 1, 4)]
    #[case(1, usize::MAX, 4)]
    #[case(0, usize::MAX, 0)]
    fn put_sequence_rejects_mismatched_data(
        #[case] first: usize,
        #[case] count: usize,
        #[case] len: usize,
    ) {
        let mut dev = allocated(2, 2);
        let seq = dev.alloc_sequence(1, 2).unwrap();
        assert!(dev.put_sequence(seq, first, count, &vec![0; len]).is_err());
    }

    #[rstest]
    #[case(1024, 768, usize::MAX / 4)]
    #[case(2, 2, usize::MAX)]
    fn alloc_sequence_rejects_oversized_sequences(
        #[case] width: usize,
        #[case] height: usize,
        #[case] frames: usize,
    ) {
        let mut dev = allocated(width, height);
        let err = dev.alloc_sequence(1, frames).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidParameter(_)));
        assert!(dev.state().lock().unwrap().sequences.is_empty());
    }

    #[test]
    fn start_requires_timing() {
        let mut dev = allocated(2, 2);
        let seq = dev.alloc_sequence(1, 1).unwrap();
        assert!(dev.start_continuous(seq).is_err());

        dev.set_picture_time(seq, Duration::from_millis(200)).unwrap();
        dev.start_continuous(seq).unwrap();
        assert_eq!(dev.state().lock().unwrap().projecting, Some(seq));
    }

    #[test]
    fn led_current_follows_brightness_while_projecting() {
        let mut dev = allocated(2, 2);
        let seq = dev.alloc_sequence(1, 1).unwrap();
        dev.set_picture_time(seq, Duration::from_millis(1)).unwrap();
        let led = dev.alloc_led(LedType::Pt120Blue).unwrap();
        dev.set_led_brightness(led, 50).unwrap();

        assert_eq!(dev.measured_current_ma(led).unwrap(), 0);
        dev.start_continuous(seq).unwrap();
        assert_eq!(dev.measured_current_ma(led).unwrap(), 9_000);
    }

    #[test]
    fn junction_temperature_approaches_steady_state() {
        let mut dev = allocated(2, 2).with_thermal_rise(1.0);
        let seq = dev.alloc_sequence(1, 1).unwrap();
        dev.set_picture_time(seq, Duration::from_millis(1)).unwrap();
        let led = dev.alloc_led(LedType::Pt120Red).unwrap();
        dev.set_led_brightness(led, 100).unwrap();
        dev.start_continuous(seq).unwrap();

        // 25 °C towards 125 °C: 75, 100, 112.5
        assert_eq!(dev.junction_temperature(led).unwrap(), 75 * 256);
        assert_eq!(dev.junction_temperature(led).unwrap(), 100 * 256);
        assert_eq!(dev.junction_temperature(led).unwrap(), 112 * 256 + 128);
    }

    #[test]
    fn disconnected_thermistor_reads_far_below_zero() {
        let mut dev = SimulatedDevice::new(2, 2).with_disconnected_thermistor();
        dev.allocate().unwrap();
        let led = dev.alloc_led(LedType::Pt120Green).unwrap();
        assert!(dev.junction_temperature(led).unwrap() < -200 * 256);
    }

    #[test]
    fn free_switches_led_off_and_releases_device() {
        let mut dev = allocated(2, 2);
        let led = dev.alloc_led(LedType::Pt120Blue).unwrap();
        dev.set_led_brightness(led, 80).unwrap();
        dev.free().unwrap();

        let state = dev.state();
        let state = state.lock().unwrap();
        assert!(state.freed);
        assert!(!state.allocated);
        assert_eq!(state.led.as_ref().unwrap().brightness, 0);
        drop(state);
        assert_eq!(dev.free(), Err(DeviceError::NotAllocated));
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let mut dev = allocated(2, 2);
        assert!(dev.set_picture_time(SequenceId(9), Duration::from_millis(1)).is_err());
        assert!(dev.set_led_brightness(LedId(9), 10).is_err());
    }
}
