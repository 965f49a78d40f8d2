//! Process image address map and codec.
//!
//! The bus coupler lays its I/O modules out as two flat register blocks:
//!
//! | Channel | Space | Offset | Count |
//! |---|---|---|---|
//! | Analog input 0-3 | Input registers | 0 | 4 |
//! | Temperature input 0-3 | Input registers | 4 | 4 |
//! | Discrete input 0-7 (packed) | Input registers | 8 | 1 word |
//! | Analog output 0-1 | Holding registers | 0 | 2 |
//! | Discrete output 0-7 (packed) | Holding registers | 2 | 1 word |
//! | Watchdog timeout (ms) | Holding registers | 0x1000 | 1 |
//!
//! The codec is integer-only: it splits and joins raw register words and
//! packs discrete flags LSB first. Unit conversion lives in
//! [`units`](crate::units) and is only applied through the accessors.
//!
//! # Example
//!
//! ```
//! use wago_io::image::{decode_outputs, encode_outputs};
//!
//! let words = encode_outputs(&[16383, 0], &[true, false, true]).unwrap();
//! assert_eq!(words, vec![16383, 0, 0b101]);
//!
//! let image = decode_outputs(&words).unwrap();
//! assert_eq!(&image.discrete[..3], &[true, false, true]);
//! ```

use crate::error::{Result, WagoError};
use crate::units::{raw_to_current_ma, raw_to_percent, raw_to_temperature_c};
use crate::utils::{flags_to_word, word_to_bits, BITS_PER_WORD};

/// Number of analog (4-20 mA) input channels.
pub const ANALOG_INPUT_COUNT: usize = 4;
/// Number of RTD temperature input channels.
pub const TEMPERATURE_INPUT_COUNT: usize = 4;
/// Number of discrete input channels fitted.
pub const DISCRETE_INPUT_COUNT: usize = 8;
/// Number of analog (4-20 mA) output channels.
pub const ANALOG_OUTPUT_COUNT: usize = 2;
/// Number of discrete output channels fitted.
pub const DISCRETE_OUTPUT_COUNT: usize = 8;

/// Input register offset of the first analog input.
pub const ANALOG_INPUT_OFFSET: u16 = 0;
/// Input register offset of the first temperature input.
pub const TEMPERATURE_INPUT_OFFSET: u16 = ANALOG_INPUT_OFFSET + ANALOG_INPUT_COUNT as u16;
/// Input register holding the packed discrete inputs.
pub const DISCRETE_INPUT_WORD: u16 = TEMPERATURE_INPUT_OFFSET + TEMPERATURE_INPUT_COUNT as u16;
/// Holding register offset of the first analog output.
pub const ANALOG_OUTPUT_OFFSET: u16 = 0;
/// Holding register holding the packed discrete outputs.
pub const DISCRETE_OUTPUT_WORD: u16 = ANALOG_OUTPUT_OFFSET + ANALOG_OUTPUT_COUNT as u16;
/// Holding register of the watchdog timeout in milliseconds (0 = disabled).
pub const WATCHDOG_REGISTER: u16 = 0x1000;

/// First input register of the input image.
pub const INPUT_IMAGE_START: u16 = ANALOG_INPUT_OFFSET;
/// Word count of the input image.
pub const TOTAL_INPUT_WORDS: usize = ANALOG_INPUT_COUNT + TEMPERATURE_INPUT_COUNT + 1;
/// First holding register of the output image.
pub const OUTPUT_IMAGE_START: u16 = ANALOG_OUTPUT_OFFSET;
/// Word count of the output image.
pub const TOTAL_OUTPUT_WORDS: usize = ANALOG_OUTPUT_COUNT + 1;

/// Snapshot of all device inputs, decoded from one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputImage {
    /// Raw analog input values.
    pub analog: [u16; ANALOG_INPUT_COUNT],
    /// Raw RTD values.
    pub temperature: [u16; TEMPERATURE_INPUT_COUNT],
    /// Discrete input flags, one per bit of the packed word.
    pub discrete: [bool; BITS_PER_WORD],
}

impl InputImage {
    /// Returns analog input `channel` as loop current, if the channel exists.
    pub fn analog_ma(&self, channel: usize) -> Option<f64> {
        self.analog.get(channel).copied().map(raw_to_current_ma)
    }

    /// Returns temperature input `channel` in °C, if the channel exists.
    pub fn temperature_c(&self, channel: usize) -> Option<f64> {
        self.temperature
            .get(channel)
            .copied()
            .map(raw_to_temperature_c)
    }

    /// Returns discrete input `channel`, if the channel exists.
    pub fn discrete(&self, channel: usize) -> Option<bool> {
        self.discrete.get(channel).copied()
    }

    /// Returns the discrete inputs wired on the rack.
    pub fn fitted_discrete(&self) -> &[bool] {
        &self.discrete[..DISCRETE_INPUT_COUNT]
    }
}

/// Snapshot of all device outputs, written or read as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputImage {
    /// Raw analog output values.
    pub analog: [u16; ANALOG_OUTPUT_COUNT],
    /// Discrete output flags, one per bit of the packed word.
    pub discrete: [bool; BITS_PER_WORD],
}

impl OutputImage {
    /// Builds an output image from raw analog values and discrete flags.
    ///
    /// Flags beyond the packed word width are ignored.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::InvalidParameter` if `analog` does not have exactly
    /// [`ANALOG_OUTPUT_COUNT`] values.
    pub fn new(analog: &[u16], discrete: &[bool]) -> Result<Self> {
        let analog: [u16; ANALOG_OUTPUT_COUNT] = analog.try_into().map_err(|_| {
            WagoError::invalid_parameter(
                "analog",
                format!(
                    "expected {} values, got {}",
                    ANALOG_OUTPUT_COUNT,
                    analog.len()
                ),
            )
        })?;
        Ok(Self {
            analog,
            discrete: word_to_bits(flags_to_word(discrete)),
        })
    }

    /// Returns the safe state: all analog outputs at raw 0, all discrete outputs off.
    pub fn safe() -> Self {
        Self::default()
    }

    /// Returns whether this image is the safe state.
    pub fn is_safe(&self) -> bool {
        *self == Self::safe()
    }

    /// Returns analog output `channel` as loop current, if the channel exists.
    pub fn analog_ma(&self, channel: usize) -> Option<f64> {
        self.analog.get(channel).copied().map(raw_to_current_ma)
    }

    /// Returns analog output `channel` as percent of full scale, if the channel exists.
    pub fn analog_percent(&self, channel: usize) -> Option<f64> {
        self.analog.get(channel).copied().map(raw_to_percent)
    }

    /// Returns discrete output `channel`, if the channel exists.
    pub fn discrete(&self, channel: usize) -> Option<bool> {
        self.discrete.get(channel).copied()
    }

    /// Returns the discrete outputs wired on the rack.
    pub fn fitted_discrete(&self) -> &[bool] {
        &self.discrete[..DISCRETE_OUTPUT_COUNT]
    }

    /// Encodes the image to the exact holding register sequence to write.
    pub fn to_words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(TOTAL_OUTPUT_WORDS);
        words.extend_from_slice(&self.analog);
        words.push(flags_to_word(&self.discrete));
        words
    }
}

/// Decodes the input image from the registers starting at [`INPUT_IMAGE_START`].
///
/// # Errors
///
/// Returns `WagoError::MalformedImage` unless exactly [`TOTAL_INPUT_WORDS`]
/// words are given.
pub fn decode_inputs(words: &[u16]) -> Result<InputImage> {
    if words.len() != TOTAL_INPUT_WORDS {
        return Err(WagoError::malformed_image(
            "input",
            TOTAL_INPUT_WORDS,
            words.len(),
        ));
    }

    let analog_at = usize::from(ANALOG_INPUT_OFFSET - INPUT_IMAGE_START);
    let temperature_at = usize::from(TEMPERATURE_INPUT_OFFSET - INPUT_IMAGE_START);
    let discrete_at = usize::from(DISCRETE_INPUT_WORD - INPUT_IMAGE_START);

    let mut image = InputImage::default();
    image
        .analog
        .copy_from_slice(&words[analog_at..analog_at + ANALOG_INPUT_COUNT]);
    image
        .temperature
        .copy_from_slice(&words[temperature_at..temperature_at + TEMPERATURE_INPUT_COUNT]);
    image.discrete = word_to_bits(words[discrete_at]);
    Ok(image)
}

/// Decodes the output image from the registers starting at [`OUTPUT_IMAGE_START`].
///
/// # Errors
///
/// Returns `WagoError::MalformedImage` unless exactly [`TOTAL_OUTPUT_WORDS`]
/// words are given.
pub fn decode_outputs(words: &[u16]) -> Result<OutputImage> {
    if words.len() != TOTAL_OUTPUT_WORDS {
        return Err(WagoError::malformed_image(
            "output",
            TOTAL_OUTPUT_WORDS,
            words.len(),
        ));
    }

    let analog_at = usize::from(ANALOG_OUTPUT_OFFSET - OUTPUT_IMAGE_START);
    let discrete_at = usize::from(DISCRETE_OUTPUT_WORD - OUTPUT_IMAGE_START);

    let mut image = OutputImage::default();
    image
        .analog
        .copy_from_slice(&words[analog_at..analog_at + ANALOG_OUTPUT_COUNT]);
    image.discrete = word_to_bits(words[discrete_at]);
    Ok(image)
}

/// Encodes raw analog values and discrete flags to the output register sequence.
///
/// Flags beyond the 16-bit packed word are ignored.
///
/// # Errors
///
/// Returns `WagoError::InvalidParameter` if `analog` does not have exactly
/// [`ANALOG_OUTPUT_COUNT`] values.
pub fn encode_outputs(analog: &[u16], discrete: &[bool]) -> Result<Vec<u16>> {
    Ok(OutputImage::new(analog, discrete)?.to_words())
}
