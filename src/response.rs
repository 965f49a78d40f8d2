//! Modbus TCP response parsing and validation.
//!
//! # Response Structure
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | MBAP header | 7 bytes | Echoed transaction id, protocol id, length, unit id |
//! | Function | 1 byte | Request function code, or it with 0x80 set on exception |
//! | Data | Variable | Byte count + payload for reads, echo for writes, exception code on error |
//!
//! # Example
//!
//! ```
//! use wago_io::ModbusResponse;
//!
//! // Read input registers response carrying 0x1234, 0x5678
//! let bytes = [
//!     0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, // MBAP header
//!     0x04, 0x04,                               // function, byte count
//!     0x12, 0x34, 0x56, 0x78,                   // data
//! ];
//!
//! let response = ModbusResponse::from_bytes(&bytes).unwrap();
//! assert!(!response.is_exception());
//! assert_eq!(response.to_words(2).unwrap(), vec![0x1234, 0x5678]);
//! ```

use crate::error::{Result, WagoError};
use crate::mbap::{MbapHeader, MBAP_HEADER_SIZE};
use crate::utils::unpack_bits_le;

/// Minimum response size: MBAP header (7) + function code (1) + one data byte.
pub const MIN_RESPONSE_SIZE: usize = MBAP_HEADER_SIZE + 2;

/// Flag set on the function code of an exception response.
const EXCEPTION_FLAG: u8 = 0x80;

/// Parsed Modbus TCP response.
#[derive(Debug, Clone)]
pub struct ModbusResponse {
    /// Response header.
    pub header: MbapHeader,
    /// Function code as received (exception flag included).
    pub function: u8,
    /// PDU bytes following the function code.
    pub data: Vec<u8>,
}

impl ModbusResponse {
    /// Parses a response from a complete application data unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is too short, the header is invalid, or
    /// the header length disagrees with the number of bytes received.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_RESPONSE_SIZE {
            return Err(WagoError::invalid_response(format!(
                "response too short: expected at least {} bytes, got {}",
                MIN_RESPONSE_SIZE,
                data.len()
            )));
        }

        let header = MbapHeader::from_bytes(&data[..MBAP_HEADER_SIZE])?;
        let pdu = &data[MBAP_HEADER_SIZE..];
        if pdu.len() != header.pdu_len() {
            return Err(WagoError::invalid_response(format!(
                "length field announces {} PDU bytes, got {}",
                header.pdu_len(),
                pdu.len()
            )));
        }

        Ok(Self {
            header,
            function: pdu[0],
            data: pdu[1..].to_vec(),
        })
    }

    /// Returns whether the device answered with an exception.
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// Validates the response against the request it answers.
    ///
    /// # Errors
    ///
    /// - `WagoError::TransactionMismatch` if the transaction id differs
    /// - `WagoError::InvalidResponse` if the function code differs, with or
    ///   without the exception flag
    /// - `WagoError::Exception` if the device rejected the request
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::{ModbusResponse, WagoError};
    ///
    /// // Exception 0x02 (illegal data address) for a read holding registers
    /// let bytes = [0x00, 0x05, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02];
    /// let response = ModbusResponse::from_bytes(&bytes).unwrap();
    ///
    /// match response.check(0x0005, 0x03) {
    ///     Err(WagoError::Exception { function, code }) => {
    ///         assert_eq!(function, 0x03);
    ///         assert_eq!(code, 0x02);
    ///     }
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn check(&self, transaction_id: u16, function: u8) -> Result<()> {
        if self.header.transaction_id != transaction_id {
            return Err(WagoError::transaction_mismatch(
                transaction_id,
                self.header.transaction_id,
            ));
        }
        if self.function & !EXCEPTION_FLAG != function {
            return Err(WagoError::invalid_response(format!(
                "function code mismatch: expected 0x{:02X}, received 0x{:02X}",
                function, self.function
            )));
        }
        if self.is_exception() {
            return Err(WagoError::exception(function, self.data[0]));
        }
        Ok(())
    }

    /// Returns the payload of a read response after validating its byte count.
    fn payload(&self, expected_bytes: usize) -> Result<&[u8]> {
        let byte_count = self.data[0] as usize;
        if byte_count != expected_bytes {
            return Err(WagoError::invalid_response(format!(
                "byte count mismatch: expected {}, got {}",
                expected_bytes, byte_count
            )));
        }
        if self.data.len() - 1 != byte_count {
            return Err(WagoError::invalid_response(format!(
                "byte count {} disagrees with {} payload bytes",
                byte_count,
                self.data.len() - 1
            )));
        }
        Ok(&self.data[1..])
    }

    /// Converts a register read payload to words (big-endian u16 values).
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not hold exactly `count` registers.
    pub fn to_words(&self, count: u16) -> Result<Vec<u16>> {
        let payload = self.payload(count as usize * 2)?;
        Ok(payload
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect())
    }

    /// Converts a coil/discrete-input read payload to `count` flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not `ceil(count / 8)` bytes long.
    pub fn to_bits(&self, count: u16) -> Result<Vec<bool>> {
        let payload = self.payload((count as usize).div_ceil(8))?;
        Ok(unpack_bits_le(payload, count as usize))
    }

    /// Validates the address/quantity echo of a write response.
    ///
    /// For a single register write the second field is the written value.
    pub fn check_echo(&self, address: u16, second: u16) -> Result<()> {
        if self.data.len() != 4 {
            return Err(WagoError::invalid_response(format!(
                "write echo must be 4 bytes, got {}",
                self.data.len()
            )));
        }
        let echoed_address = u16::from_be_bytes([self.data[0], self.data[1]]);
        let echoed_second = u16::from_be_bytes([self.data[2], self.data[3]]);
        if echoed_address != address || echoed_second != second {
            return Err(WagoError::invalid_response(format!(
                "write echo mismatch: expected {}/{}, got {}/{}",
                address, second, echoed_address, echoed_second
            )));
        }
        Ok(())
    }
}
