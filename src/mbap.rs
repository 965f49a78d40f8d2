//! Modbus TCP application protocol (MBAP) header.
//!
//! Every Modbus TCP request and response starts with a 7-byte MBAP header:
//!
//! | Byte | Field | Description |
//! |------|-------|-------------|
//! | 0-1 | Transaction ID | Echoed by the server, used to pair request and response |
//! | 2-3 | Protocol ID | Always 0x0000 for Modbus |
//! | 4-5 | Length | Number of bytes that follow (unit id + PDU) |
//! | 6 | Unit ID | Addressed unit behind a gateway (1 for a bus coupler) |
//!
//! All multi-byte fields are big-endian.
//!
//! # Example
//!
//! ```
//! use wago_io::MbapHeader;
//!
//! // Header for a 5-byte PDU sent to unit 1
//! let header = MbapHeader::new(0x0001, 1, 5);
//! assert_eq!(header.to_bytes(), [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01]);
//! ```

use crate::error::{Result, WagoError};

/// MBAP header size in bytes.
pub const MBAP_HEADER_SIZE: usize = 7;

/// Protocol identifier for Modbus.
pub const MODBUS_PROTOCOL_ID: u16 = 0x0000;

/// Maximum PDU size (function code + data).
pub const MAX_PDU_SIZE: usize = 253;

/// Modbus TCP application protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Transaction identifier.
    pub transaction_id: u16,
    /// Protocol identifier (0 for Modbus).
    pub protocol_id: u16,
    /// Byte count of unit id + PDU.
    pub length: u16,
    /// Unit identifier.
    pub unit_id: u8,
}

impl MbapHeader {
    /// Creates a header for a PDU of `pdu_len` bytes.
    pub fn new(transaction_id: u16, unit_id: u8, pdu_len: usize) -> Self {
        Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length: (pdu_len + 1) as u16,
            unit_id,
        }
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(self) -> [u8; MBAP_HEADER_SIZE] {
        let tid = self.transaction_id.to_be_bytes();
        let pid = self.protocol_id.to_be_bytes();
        let len = self.length.to_be_bytes();
        [tid[0], tid[1], pid[0], pid[1], len[0], len[1], self.unit_id]
    }

    /// Parses a header from bytes.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::InvalidResponse` if the slice is too short, the
    /// protocol id is not Modbus, or the length field is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::MbapHeader;
    ///
    /// let header = MbapHeader::from_bytes(&[0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01]).unwrap();
    /// assert_eq!(header.transaction_id, 7);
    /// assert_eq!(header.pdu_len(), 4);
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MBAP_HEADER_SIZE {
            return Err(WagoError::invalid_response(format!(
                "header too short: expected {} bytes, got {}",
                MBAP_HEADER_SIZE,
                data.len()
            )));
        }

        let header = Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            protocol_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            unit_id: data[6],
        };

        if header.protocol_id != MODBUS_PROTOCOL_ID {
            return Err(WagoError::invalid_response(format!(
                "unexpected protocol id 0x{:04X}",
                header.protocol_id
            )));
        }
        if header.length < 2 || header.length as usize > MAX_PDU_SIZE + 1 {
            return Err(WagoError::invalid_response(format!(
                "length field {} out of range",
                header.length
            )));
        }

        Ok(header)
    }

    /// Returns the number of PDU bytes announced by the length field.
    pub fn pdu_len(self) -> usize {
        (self.length as usize).saturating_sub(1)
    }
}
