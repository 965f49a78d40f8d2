//! Error types for the WAGO I/O client.

use std::io;
use thiserror::Error;

/// Result type alias for WAGO I/O operations.
pub type Result<T> = std::result::Result<T, WagoError>;

/// Errors that can occur while talking to the device or handling its process image.
#[derive(Debug, Error)]
pub enum WagoError {
    /// The TCP connection to the device could not be established.
    #[error("Cannot connect to {addr}: {source}")]
    Connection {
        /// Address the connection was attempted to.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Modbus exception response returned by the device.
    #[error("Modbus exception on function 0x{function:02X}: code 0x{code:02X} ({})", exception_description(.code.to_owned()))]
    Exception {
        /// Function code of the rejected request (without the 0x80 flag).
        function: u8,
        /// Exception code from the response.
        code: u8,
    },

    /// Invalid response received from the device.
    #[error("Invalid response: {reason}")]
    InvalidResponse {
        /// Description of the response error.
        reason: String,
    },

    /// Transaction identifier mismatch between request and response.
    #[error("Transaction mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    TransactionMismatch {
        /// Transaction identifier sent with the request.
        expected: u16,
        /// Transaction identifier found in the response.
        received: u16,
    },

    /// Communication timeout.
    #[error("Communication timeout")]
    Timeout,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A request was issued while no connection is open.
    #[error("Not connected")]
    NotConnected,

    /// Register count of a process image does not match the address map.
    #[error("Malformed {image} image: expected {expected} words, got {actual}")]
    MalformedImage {
        /// Which image was being decoded ("input" or "output").
        image: &'static str,
        /// Word count required by the address map.
        expected: usize,
        /// Word count actually supplied.
        actual: usize,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Operation not accepted in the controller's current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// State the controller was in.
        state: String,
        /// Operation that was refused.
        operation: &'static str,
    },
}

impl WagoError {
    /// Creates a new `Connection` error.
    pub fn connection(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Connection {
            addr: addr.into(),
            source,
        }
    }

    /// Creates a new `Exception` error.
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::WagoError;
    ///
    /// let err = WagoError::exception(0x03, 0x02);
    /// assert!(err.is_transport());
    /// ```
    pub fn exception(function: u8, code: u8) -> Self {
        Self::Exception { function, code }
    }

    /// Creates a new `InvalidResponse` error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::WagoError;
    ///
    /// let err = WagoError::invalid_parameter("count", "must be greater than 0");
    /// assert!(!err.is_transport());
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `MalformedImage` error.
    pub fn malformed_image(image: &'static str, expected: usize, actual: usize) -> Self {
        Self::MalformedImage {
            image,
            expected,
            actual,
        }
    }

    /// Creates a new `TransactionMismatch` error.
    pub fn transaction_mismatch(expected: u16, received: u16) -> Self {
        Self::TransactionMismatch { expected, received }
    }

    /// Returns `true` when a single request/response exchange failed.
    ///
    /// These errors are recoverable by trying again on the next scan cycle;
    /// everything else is either a connection failure or a programming error.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Exception { .. }
                | Self::InvalidResponse { .. }
                | Self::TransactionMismatch { .. }
                | Self::Timeout
                | Self::Io(_)
                | Self::NotConnected
        )
    }
}

/// Returns a human-readable description of a Modbus exception code.
///
/// # Example
///
/// ```
/// use wago_io::exception_description;
///
/// assert_eq!(exception_description(0x02), "illegal data address");
/// assert_eq!(exception_description(0x7F), "unknown exception");
/// ```
pub fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "illegal function",
        0x02 => "illegal data address",
        0x03 => "illegal data value",
        0x04 => "server device failure",
        0x05 => "acknowledge",
        0x06 => "server device busy",
        0x08 => "memory parity error",
        0x0A => "gateway path unavailable",
        0x0B => "gateway target device failed to respond",
        _ => "unknown exception",
    }
}
