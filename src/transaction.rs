//! Whole-image transactions against the device.
//!
//! [`TransactionManager`] is the only component that turns process images
//! into device requests. Each image is moved in exactly one request so the
//! device never observes, and the caller never receives, a mix of old and new
//! fields:
//!
//! - the input image is one read of input registers 0..9
//! - the output image is one read or one write of holding registers 0..3
//!
//! Nothing is retried here; a failed exchange is returned to the caller, who
//! decides whether the next scan cycle is the retry.

use tracing::debug;

use crate::error::{Result, WagoError};
use crate::image::{
    decode_inputs, decode_outputs, InputImage, OutputImage, DISCRETE_INPUT_COUNT,
    DISCRETE_OUTPUT_COUNT, INPUT_IMAGE_START, OUTPUT_IMAGE_START, TOTAL_INPUT_WORDS,
    TOTAL_OUTPUT_WORDS, WATCHDOG_REGISTER,
};
use crate::space::RegisterSpace;
use crate::transport::DeviceTransport;
use crate::utils::{flags_to_word, format_binary};

/// Issues whole-image reads and writes through a [`DeviceTransport`].
#[derive(Debug)]
pub struct TransactionManager<T> {
    transport: T,
}

impl<T: DeviceTransport> TransactionManager<T> {
    /// Wraps a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the manager and returns the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Reads the complete input image in one request.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the failed exchange, or
    /// `WagoError::MalformedImage` if the device returned the wrong number of
    /// registers.
    pub fn read_inputs(&mut self) -> Result<InputImage> {
        let words = self.transport.read_words(
            RegisterSpace::InputRegister,
            INPUT_IMAGE_START,
            TOTAL_INPUT_WORDS as u16,
        )?;
        decode_inputs(&words)
    }

    /// Reads back the complete output image in one request.
    ///
    /// # Errors
    ///
    /// Same as [`read_inputs`](Self::read_inputs).
    pub fn read_outputs(&mut self) -> Result<OutputImage> {
        let words = self.transport.read_words(
            RegisterSpace::HoldingRegister,
            OUTPUT_IMAGE_START,
            TOTAL_OUTPUT_WORDS as u16,
        )?;
        decode_outputs(&words)
    }

    /// Writes the complete output image in one request.
    ///
    /// Analog and discrete fields travel in the same multi-register write.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the failed exchange. Nothing is written
    /// by this call in that case beyond what the device itself applied.
    pub fn write_outputs(&mut self, image: &OutputImage) -> Result<()> {
        let words = image.to_words();
        debug!(
            analog = ?image.analog,
            discrete = %format_binary(flags_to_word(&image.discrete)),
            "writing output image"
        );
        self.transport.write_words(OUTPUT_IMAGE_START, &words)
    }

    /// Reads the watchdog timeout in milliseconds (0 = disabled).
    pub fn read_watchdog(&mut self) -> Result<u16> {
        let words = self
            .transport
            .read_words(RegisterSpace::HoldingRegister, WATCHDOG_REGISTER, 1)?;
        words
            .first()
            .copied()
            .ok_or_else(|| WagoError::malformed_image("watchdog", 1, 0))
    }

    /// Writes the watchdog timeout in milliseconds; 0 disables it.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::InvalidParameter` if `milliseconds` does not fit a
    /// register, otherwise the transport error of the failed exchange.
    pub fn write_watchdog(&mut self, milliseconds: u32) -> Result<()> {
        let value = u16::try_from(milliseconds).map_err(|_| {
            WagoError::invalid_parameter(
                "milliseconds",
                format!("{} exceeds the register maximum of {}", milliseconds, u16::MAX),
            )
        })?;
        self.transport.write_word(WATCHDOG_REGISTER, value)
    }

    /// Reads the discrete inputs from the discrete-input bit space.
    pub fn read_discrete_inputs(&mut self) -> Result<Vec<bool>> {
        self.transport.read_bits(
            RegisterSpace::DiscreteInput,
            0,
            DISCRETE_INPUT_COUNT as u16,
        )
    }

    /// Reads the discrete output state from the coil space.
    pub fn read_coils(&mut self) -> Result<Vec<bool>> {
        self.transport
            .read_bits(RegisterSpace::Coil, 0, DISCRETE_OUTPUT_COUNT as u16)
    }

    /// Writes the discrete outputs through the coil space.
    pub fn write_coils(&mut self, values: &[bool]) -> Result<()> {
        self.transport.write_bits(0, values)
    }
}
