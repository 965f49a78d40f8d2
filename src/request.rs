//! Modbus TCP request frames and serialization.
//!
//! Each request type validates its arguments on construction and serializes
//! itself to a complete application data unit (MBAP header + PDU) ready to be
//! written to the socket.
//!
//! # Request Types
//!
//! - [`ReadBitsRequest`] - Read coils (0x01) or discrete inputs (0x02)
//! - [`ReadWordsRequest`] - Read holding (0x03) or input (0x04) registers
//! - [`WriteRegisterRequest`] - Write a single holding register (0x06)
//! - [`WriteBitsRequest`] - Write multiple coils (0x0F)
//! - [`WriteWordsRequest`] - Write multiple holding registers (0x10)
//!
//! # Example
//!
//! ```
//! use wago_io::{ReadWordsRequest, RegisterSpace};
//!
//! // Read the 9-word input image of transaction 1 from unit 1
//! let req = ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0, 9).unwrap();
//! assert_eq!(
//!     req.to_bytes(),
//!     vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x09]
//! );
//! ```
//!
//! # Constants
//!
//! - [`MAX_READ_BITS`], [`MAX_READ_WORDS`], [`MAX_WRITE_BITS`], [`MAX_WRITE_WORDS`] -
//!   per-request quantity limits imposed by the 253-byte PDU

use crate::error::{Result, WagoError};
use crate::mbap::{MbapHeader, MBAP_HEADER_SIZE};
use crate::space::{
    RegisterSpace, FC_WRITE_MULTIPLE_COILS, FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_REGISTER,
};
use crate::utils::pack_bits_le;

/// Maximum number of coils or discrete inputs per read request.
pub const MAX_READ_BITS: u16 = 2000;
/// Maximum number of registers per read request.
pub const MAX_READ_WORDS: u16 = 125;
/// Maximum number of coils per write request.
pub const MAX_WRITE_BITS: u16 = 1968;
/// Maximum number of registers per write request.
pub const MAX_WRITE_WORDS: u16 = 123;

fn check_quantity(parameter: &str, count: usize, max: u16) -> Result<()> {
    if count == 0 {
        return Err(WagoError::invalid_parameter(
            parameter,
            "must be greater than 0",
        ));
    }
    if count > max as usize {
        return Err(WagoError::invalid_parameter(
            parameter,
            format!("must not exceed {}", max),
        ));
    }
    Ok(())
}

fn check_span(address: u16, count: usize) -> Result<()> {
    if address as usize + count > 0x1_0000 {
        return Err(WagoError::invalid_parameter(
            "address",
            format!("span {}+{} exceeds the 16-bit address range", address, count),
        ));
    }
    Ok(())
}

fn frame(header: MbapHeader, pdu: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MBAP_HEADER_SIZE + pdu.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(pdu);
    bytes
}

/// Request for reading coils or discrete inputs.
#[derive(Debug, Clone)]
pub struct ReadBitsRequest {
    transaction_id: u16,
    unit_id: u8,
    space: RegisterSpace,
    address: u16,
    count: u16,
}

impl ReadBitsRequest {
    /// Creates a new read bits request.
    ///
    /// # Errors
    ///
    /// Returns an error if `space` is a register space, or if count is 0,
    /// exceeds [`MAX_READ_BITS`], or runs past address 0xFFFF.
    pub fn new(
        transaction_id: u16,
        unit_id: u8,
        space: RegisterSpace,
        address: u16,
        count: u16,
    ) -> Result<Self> {
        if !space.is_bit() {
            return Err(WagoError::invalid_parameter(
                "space",
                format!("{} is not a bit space", space),
            ));
        }
        check_quantity("count", count as usize, MAX_READ_BITS)?;
        check_span(address, count as usize)?;

        Ok(Self {
            transaction_id,
            unit_id,
            space,
            address,
            count,
        })
    }

    /// Returns the transaction identifier.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Returns the function code of this request.
    pub fn function(&self) -> u8 {
        self.space.read_code()
    }

    /// Returns the number of bits requested.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Serializes the request to bytes for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let addr = self.address.to_be_bytes();
        let count = self.count.to_be_bytes();
        let pdu = [self.function(), addr[0], addr[1], count[0], count[1]];
        frame(
            MbapHeader::new(self.transaction_id, self.unit_id, pdu.len()),
            &pdu,
        )
    }
}

/// Request for reading holding or input registers.
#[derive(Debug, Clone)]
pub struct ReadWordsRequest {
    transaction_id: u16,
    unit_id: u8,
    space: RegisterSpace,
    address: u16,
    count: u16,
}

impl ReadWordsRequest {
    /// Creates a new read words request.
    ///
    /// # Errors
    ///
    /// Returns an error if `space` is a bit space, or if count is 0,
    /// exceeds [`MAX_READ_WORDS`], or runs past address 0xFFFF.
    pub fn new(
        transaction_id: u16,
        unit_id: u8,
        space: RegisterSpace,
        address: u16,
        count: u16,
    ) -> Result<Self> {
        if space.is_bit() {
            return Err(WagoError::invalid_parameter(
                "space",
                format!("{} is not a register space", space),
            ));
        }
        check_quantity("count", count as usize, MAX_READ_WORDS)?;
        check_span(address, count as usize)?;

        Ok(Self {
            transaction_id,
            unit_id,
            space,
            address,
            count,
        })
    }

    /// Returns the transaction identifier.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Returns the function code of this request.
    pub fn function(&self) -> u8 {
        self.space.read_code()
    }

    /// Returns the number of registers requested.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Serializes the request to bytes for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let addr = self.address.to_be_bytes();
        let count = self.count.to_be_bytes();
        let pdu = [self.function(), addr[0], addr[1], count[0], count[1]];
        frame(
            MbapHeader::new(self.transaction_id, self.unit_id, pdu.len()),
            &pdu,
        )
    }
}

/// Request for writing one holding register.
#[derive(Debug, Clone)]
pub struct WriteRegisterRequest {
    transaction_id: u16,
    unit_id: u8,
    address: u16,
    value: u16,
}

impl WriteRegisterRequest {
    /// Creates a new write single register request.
    pub fn new(transaction_id: u16, unit_id: u8, address: u16, value: u16) -> Self {
        Self {
            transaction_id,
            unit_id,
            address,
            value,
        }
    }

    /// Returns the transaction identifier.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Returns the function code of this request.
    pub fn function(&self) -> u8 {
        FC_WRITE_SINGLE_REGISTER
    }

    /// Serializes the request to bytes for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let addr = self.address.to_be_bytes();
        let value = self.value.to_be_bytes();
        let pdu = [self.function(), addr[0], addr[1], value[0], value[1]];
        frame(
            MbapHeader::new(self.transaction_id, self.unit_id, pdu.len()),
            &pdu,
        )
    }
}

/// Request for writing multiple coils.
#[derive(Debug, Clone)]
pub struct WriteBitsRequest {
    transaction_id: u16,
    unit_id: u8,
    address: u16,
    values: Vec<bool>,
}

impl WriteBitsRequest {
    /// Creates a new write multiple coils request.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty, exceeds [`MAX_WRITE_BITS`],
    /// or runs past address 0xFFFF.
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::WriteBitsRequest;
    ///
    /// let req = WriteBitsRequest::new(2, 1, 0, &[true, false, true]).unwrap();
    /// let bytes = req.to_bytes();
    /// assert_eq!(&bytes[7..], &[0x0F, 0x00, 0x00, 0x00, 0x03, 0x01, 0b0000_0101]);
    /// ```
    pub fn new(transaction_id: u16, unit_id: u8, address: u16, values: &[bool]) -> Result<Self> {
        check_quantity("values", values.len(), MAX_WRITE_BITS)?;
        check_span(address, values.len())?;

        Ok(Self {
            transaction_id,
            unit_id,
            address,
            values: values.to_vec(),
        })
    }

    /// Returns the transaction identifier.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Returns the function code of this request.
    pub fn function(&self) -> u8 {
        FC_WRITE_MULTIPLE_COILS
    }

    /// Serializes the request to bytes for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let packed = pack_bits_le(&self.values);
        let mut pdu = Vec::with_capacity(6 + packed.len());
        pdu.push(self.function());
        pdu.extend_from_slice(&self.address.to_be_bytes());
        pdu.extend_from_slice(&(self.values.len() as u16).to_be_bytes());
        pdu.push(packed.len() as u8);
        pdu.extend_from_slice(&packed);
        frame(
            MbapHeader::new(self.transaction_id, self.unit_id, pdu.len()),
            &pdu,
        )
    }
}

/// Request for writing multiple holding registers.
///
/// This is the request that carries a whole output image in one exchange.
#[derive(Debug, Clone)]
pub struct WriteWordsRequest {
    transaction_id: u16,
    unit_id: u8,
    address: u16,
    values: Vec<u16>,
}

impl WriteWordsRequest {
    /// Creates a new write multiple registers request.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty, exceeds [`MAX_WRITE_WORDS`],
    /// or runs past address 0xFFFF.
    pub fn new(transaction_id: u16, unit_id: u8, address: u16, values: &[u16]) -> Result<Self> {
        check_quantity("values", values.len(), MAX_WRITE_WORDS)?;
        check_span(address, values.len())?;

        Ok(Self {
            transaction_id,
            unit_id,
            address,
            values: values.to_vec(),
        })
    }

    /// Returns the transaction identifier.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Returns the function code of this request.
    pub fn function(&self) -> u8 {
        FC_WRITE_MULTIPLE_REGISTERS
    }

    /// Serializes the request to bytes for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pdu = Vec::with_capacity(6 + self.values.len() * 2);
        pdu.push(self.function());
        pdu.extend_from_slice(&self.address.to_be_bytes());
        pdu.extend_from_slice(&(self.values.len() as u16).to_be_bytes());
        pdu.push((self.values.len() * 2) as u8);
        for word in &self.values {
            pdu.extend_from_slice(&word.to_be_bytes());
        }
        frame(
            MbapHeader::new(self.transaction_id, self.unit_id, pdu.len()),
            &pdu,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_words_serialization() {
        let req = ReadWordsRequest::new(0x0102, 1, RegisterSpace::HoldingRegister, 0x1000, 1)
            .unwrap();
        assert_eq!(
            req.to_bytes(),
            hex::decode("010200000006010310000001").unwrap()
        );
    }

    #[test]
    fn test_read_words_rejects_bit_space() {
        let result = ReadWordsRequest::new(1, 1, RegisterSpace::Coil, 0, 8);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_words_count_limits() {
        assert!(ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0, 0).is_err());
        assert!(ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0, 125).is_ok());
        assert!(ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0, 126).is_err());
    }

    #[test]
    fn test_read_words_span_overflow() {
        assert!(ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0xFFFF, 1).is_ok());
        assert!(ReadWordsRequest::new(1, 1, RegisterSpace::InputRegister, 0xFFFF, 2).is_err());
    }

    #[test]
    fn test_read_bits_serialization() {
        let req = ReadBitsRequest::new(7, 1, RegisterSpace::DiscreteInput, 0, 8).unwrap();
        assert_eq!(req.to_bytes(), hex::decode("000700000006010200000008").unwrap());
        assert_eq!(req.count(), 8);
    }

    #[test]
    fn test_read_bits_rejects_register_space() {
        assert!(ReadBitsRequest::new(1, 1, RegisterSpace::HoldingRegister, 0, 8).is_err());
    }

    #[test]
    fn test_write_register_serialization() {
        let req = WriteRegisterRequest::new(3, 1, 0x1000, 5000);
        assert_eq!(req.to_bytes(), hex::decode("000300000006010610001388").unwrap());
    }

    #[test]
    fn test_write_bits_serialization() {
        let values = [true, false, true, false, true, false, true, false, true];
        let req = WriteBitsRequest::new(4, 1, 0, &values).unwrap();
        // 9 coils -> 2 data bytes
        assert_eq!(
            req.to_bytes(),
            hex::decode("000400000009010f00000009025501").unwrap()
        );
    }

    #[test]
    fn test_write_bits_empty() {
        assert!(WriteBitsRequest::new(1, 1, 0, &[]).is_err());
    }

    #[test]
    fn test_write_words_serialization() {
        let req = WriteWordsRequest::new(5, 1, 0, &[0x3FFF, 0x5FFF, 0x0081]).unwrap();
        assert_eq!(
            req.to_bytes(),
            hex::decode("00050000000d011000000003063fff5fff0081").unwrap()
        );
    }

    #[test]
    fn test_write_words_limits() {
        assert!(WriteWordsRequest::new(1, 1, 0, &[]).is_err());
        assert!(WriteWordsRequest::new(1, 1, 0, &[0; 123]).is_ok());
        assert!(WriteWordsRequest::new(1, 1, 0, &[0; 124]).is_err());
    }
}
