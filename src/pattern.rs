//! Output generators driven by the scan cycle.
//!
//! An [`OutputGenerator`] computes the next output image from the cycle index
//! and, when available, the latest input snapshot. Any
//! `FnMut(u64, Option<&InputImage>) -> OutputImage` closure is a generator.
//!
//! The built-in generators reproduce the demo output of the I/O rack:
//!
//! - [`KnightRider`] walks a single lit discrete output back and forth
//! - [`SineWave`] drives AO.0 with a sine and AO.1 with a cosine, 0-100%
//! - [`DemoPattern`] combines both into one image

use std::f64::consts::TAU;

use crate::image::{InputImage, OutputImage, ANALOG_OUTPUT_COUNT, DISCRETE_OUTPUT_COUNT};
use crate::units::percent_to_raw;
use crate::utils::BITS_PER_WORD;

/// Cycles per full sine period in [`SineWave`].
pub const DEFAULT_SINE_PERIOD: u32 = 10;

/// Computes the output image for one scan cycle.
pub trait OutputGenerator {
    /// Returns the outputs to write in cycle `cycle`.
    ///
    /// `inputs` is the input image read back in the previous cycle, or `None`
    /// if none has been read yet or the read failed.
    fn next_outputs(&mut self, cycle: u64, inputs: Option<&InputImage>) -> OutputImage;
}

impl<F> OutputGenerator for F
where
    F: FnMut(u64, Option<&InputImage>) -> OutputImage,
{
    fn next_outputs(&mut self, cycle: u64, inputs: Option<&InputImage>) -> OutputImage {
        self(cycle, inputs)
    }
}

/// Returns the lit position of a triangular scan over `positions` channels.
///
/// The sequence runs forward `0..positions` and back down to 1, so it has
/// period `2 * positions - 2` and never repeats an endpoint. With eight
/// positions: `0 1 2 3 4 5 6 7 6 5 4 3 2 1 0 1 ...`.
///
/// Fewer than two positions always yield 0.
///
/// # Example
///
/// ```
/// use wago_io::scan_position;
///
/// let walk: Vec<usize> = (0..16).map(|i| scan_position(i, 8)).collect();
/// assert_eq!(walk, [0, 1, 2, 3, 4, 5, 6, 7, 6, 5, 4, 3, 2, 1, 0, 1]);
/// ```
pub fn scan_position(cycle: u64, positions: usize) -> usize {
    if positions < 2 {
        return 0;
    }
    let last = positions as u64 - 1;
    let phase = cycle % (2 * last);
    let position = if phase <= last { phase } else { 2 * last - phase };
    position as usize
}

/// Single lit discrete output scanning back and forth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnightRider {
    width: usize,
}

impl KnightRider {
    /// Creates a scanner over the first `width` discrete outputs.
    ///
    /// `width` is capped at the packed word width.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.min(BITS_PER_WORD),
        }
    }

    /// Returns the discrete flags for `cycle`.
    pub fn flags(&self, cycle: u64) -> Vec<bool> {
        let lit = scan_position(cycle, self.width);
        (0..self.width).map(|i| i == lit).collect()
    }
}

impl Default for KnightRider {
    fn default() -> Self {
        Self::new(DISCRETE_OUTPUT_COUNT)
    }
}

impl OutputGenerator for KnightRider {
    fn next_outputs(&mut self, cycle: u64, _inputs: Option<&InputImage>) -> OutputImage {
        let mut image = OutputImage::safe();
        image.discrete[..self.width].copy_from_slice(&self.flags(cycle));
        image
    }
}

/// Sine on AO.0 and cosine on AO.1, both swinging 0-100% of full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SineWave {
    period: u32,
}

impl SineWave {
    /// Creates a wave completing one period every `period` cycles.
    ///
    /// A zero period is treated as one.
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Returns the raw analog outputs for `cycle`.
    pub fn analog(&self, cycle: u64) -> [u16; ANALOG_OUTPUT_COUNT] {
        let phase = (cycle % u64::from(self.period)) as f64 * TAU / f64::from(self.period);
        [
            percent_to_raw(50.0 + 50.0 * phase.sin()),
            percent_to_raw(50.0 + 50.0 * phase.cos()),
        ]
    }
}

impl Default for SineWave {
    fn default() -> Self {
        Self::new(DEFAULT_SINE_PERIOD)
    }
}

impl OutputGenerator for SineWave {
    fn next_outputs(&mut self, cycle: u64, _inputs: Option<&InputImage>) -> OutputImage {
        OutputImage {
            analog: self.analog(cycle),
            ..OutputImage::safe()
        }
    }
}

/// The rack demo: [`KnightRider`] on the discrete outputs and [`SineWave`]
/// on the analog outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoPattern {
    /// Discrete output scanner.
    pub scanner: KnightRider,
    /// Analog output wave.
    pub wave: SineWave,
}

impl OutputGenerator for DemoPattern {
    fn next_outputs(&mut self, cycle: u64, inputs: Option<&InputImage>) -> OutputImage {
        let mut image = self.scanner.next_outputs(cycle, inputs);
        image.analog = self.wave.analog(cycle);
        image
    }
}
