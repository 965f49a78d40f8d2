//! Modbus register spaces.
//!
//! This module defines the [`RegisterSpace`] enum which represents the four
//! data tables a Modbus device exposes. Each space has a fixed element width
//! and fixed access rights.
//!
//! # Register Spaces Overview
//!
//! | Space | Element | Read FC | Write FC | Client access |
//! |-------|---------|:-------:|:--------:|---------------|
//! | Coil | bit | 0x01 | 0x0F | read/write |
//! | DiscreteInput | bit | 0x02 | - | read-only |
//! | HoldingRegister | 16-bit word | 0x03 | 0x10 | read/write |
//! | InputRegister | 16-bit word | 0x04 | - | read-only |
//!
//! # Example
//!
//! ```
//! use wago_io::RegisterSpace;
//!
//! assert!(RegisterSpace::Coil.is_bit());
//! assert!(!RegisterSpace::InputRegister.is_writable());
//! assert_eq!(RegisterSpace::HoldingRegister.to_string(), "HR");
//! ```

/// Read Coils function code.
pub(crate) const FC_READ_COILS: u8 = 0x01;
/// Read Discrete Inputs function code.
pub(crate) const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
/// Read Holding Registers function code.
pub(crate) const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
/// Read Input Registers function code.
pub(crate) const FC_READ_INPUT_REGISTERS: u8 = 0x04;
/// Write Single Register function code.
pub(crate) const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
/// Write Multiple Coils function code.
pub(crate) const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
/// Write Multiple Registers function code.
pub(crate) const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Data tables available on a Modbus device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterSpace {
    /// Coils - single-bit outputs, read/write.
    Coil,
    /// Discrete inputs - single-bit inputs, read-only.
    DiscreteInput,
    /// Input registers - 16-bit inputs, read-only.
    InputRegister,
    /// Holding registers - 16-bit outputs and configuration, read/write.
    HoldingRegister,
}

impl RegisterSpace {
    /// Returns the function code used to read this space.
    pub(crate) fn read_code(self) -> u8 {
        match self {
            RegisterSpace::Coil => FC_READ_COILS,
            RegisterSpace::DiscreteInput => FC_READ_DISCRETE_INPUTS,
            RegisterSpace::HoldingRegister => FC_READ_HOLDING_REGISTERS,
            RegisterSpace::InputRegister => FC_READ_INPUT_REGISTERS,
        }
    }

    /// Returns whether elements of this space are single bits.
    pub fn is_bit(self) -> bool {
        matches!(self, RegisterSpace::Coil | RegisterSpace::DiscreteInput)
    }

    /// Returns whether the client may write to this space.
    pub fn is_writable(self) -> bool {
        matches!(self, RegisterSpace::Coil | RegisterSpace::HoldingRegister)
    }
}

impl std::fmt::Display for RegisterSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterSpace::Coil => write!(f, "COIL"),
            RegisterSpace::DiscreteInput => write!(f, "DI"),
            RegisterSpace::InputRegister => write!(f, "IR"),
            RegisterSpace::HoldingRegister => write!(f, "HR"),
        }
    }
}
