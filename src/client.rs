//! Modbus TCP client for the bus coupler.
//!
//! This module provides [`ModbusTcpClient`], the [`DeviceTransport`]
//! implementation that talks to a real device over TCP.
//!
//! # Overview
//!
//! The client handles:
//! - Request construction and serialization
//! - Request/response correlation via the MBAP transaction id, skipping late replies
//! - Response validation (exceptions, function code, byte counts, write echoes)
//!
//! Each call sends exactly one request and returns its one response. Late
//! replies to timed-out requests are skipped, never retried or cached. The
//! client does not reconnect on its own.
//!
//! # Example
//!
//! ```no_run
//! use wago_io::{ClientConfig, DeviceTransport, ModbusTcpClient, RegisterSpace};
//! use std::net::Ipv4Addr;
//!
//! let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
//! client.connect()?;
//!
//! // Read the analog inputs
//! let raw = client.read_words(RegisterSpace::InputRegister, 0, 4)?;
//!
//! // Write both analog outputs in one request
//! client.write_words(0, &[16383, 24575])?;
//!
//! client.close();
//! # Ok::<(), wago_io::WagoError>(())
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, WagoError};
use crate::request::{
    ReadBitsRequest, ReadWordsRequest, WriteBitsRequest, WriteRegisterRequest, WriteWordsRequest,
};
use crate::response::ModbusResponse;
use crate::space::RegisterSpace;
use crate::transport::{DeviceTransport, TcpTransport, DEFAULT_MODBUS_PORT, DEFAULT_TIMEOUT};

/// Default unit identifier of a bus coupler.
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Configuration for creating a Modbus TCP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Device address and port.
    pub addr: SocketAddr,
    /// Unit identifier placed in every request.
    pub unit_id: u8,
    /// Timeout for connect and for each request/response exchange.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the device at `ip` with default port,
    /// unit id and timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use wago_io::ClientConfig;
    /// use std::net::Ipv4Addr;
    ///
    /// let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());
    /// assert_eq!(config.addr.port(), 502);
    /// ```
    pub fn new(ip: IpAddr) -> Self {
        Self::from_addr(SocketAddr::new(ip, DEFAULT_MODBUS_PORT))
    }

    /// Creates a configuration for an already resolved socket address.
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            unit_id: DEFAULT_UNIT_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port (default is 502).
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Sets a custom timeout (default is 5 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a custom unit identifier (default is 1).
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }
}

/// Modbus TCP client for a single device.
///
/// Created disconnected; [`DeviceTransport::connect`] opens the TCP stream.
pub struct ModbusTcpClient {
    config: ClientConfig,
    transport: Option<TcpTransport>,
    transaction_counter: u16,
}

impl ModbusTcpClient {
    /// Creates a new, not yet connected, client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            transaction_counter: 0,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Generates the next transaction id.
    fn next_transaction_id(&mut self) -> u16 {
        self.transaction_counter = self.transaction_counter.wrapping_add(1);
        self.transaction_counter
    }

    /// Sends one frame and validates the response header and function code.
    ///
    /// Replies carrying another transaction id belong to earlier requests
    /// whose exchange already timed out. They are discarded until the
    /// matching reply arrives or the timeout elapses.
    fn exchange(&mut self, frame: &[u8], transaction_id: u16, function: u8) -> Result<ModbusResponse> {
        let transport = self.transport.as_mut().ok_or(WagoError::NotConnected)?;
        debug!(transaction_id, function, "modbus request");

        let deadline = Instant::now() + transport.timeout();
        transport.send(frame)?;
        loop {
            let response = ModbusResponse::from_bytes(&transport.receive(deadline)?)?;
            if response.header.transaction_id != transaction_id {
                debug!(
                    expected = transaction_id,
                    received = response.header.transaction_id,
                    "discarding stale reply"
                );
                continue;
            }
            response.check(transaction_id, function)?;
            return Ok(response);
        }
    }

    /// Writes a single holding register with function 0x06.
    ///
    /// # Errors
    ///
    /// Returns an error if communication fails, the device answers with an
    /// exception, or the echo does not match.
    pub fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let tid = self.next_transaction_id();
        let req = WriteRegisterRequest::new(tid, self.config.unit_id, address, value);

        let response = self.exchange(&req.to_bytes(), tid, req.function())?;
        response.check_echo(address, value)
    }
}

impl DeviceTransport for ModbusTcpClient {
    fn connect(&mut self) -> Result<()> {
        if self.transport.is_none() {
            self.transport = Some(TcpTransport::connect(self.config.addr, self.config.timeout)?);
            debug!(addr = %self.config.addr, "connected");
        }
        Ok(())
    }

    fn read_bits(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<bool>> {
        let tid = self.next_transaction_id();
        let req = ReadBitsRequest::new(tid, self.config.unit_id, space, address, count)?;

        let response = self.exchange(&req.to_bytes(), tid, req.function())?;
        response.to_bits(count)
    }

    fn read_words(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<u16>> {
        let tid = self.next_transaction_id();
        let req = ReadWordsRequest::new(tid, self.config.unit_id, space, address, count)?;

        let response = self.exchange(&req.to_bytes(), tid, req.function())?;
        response.to_words(count)
    }

    fn write_bits(&mut self, address: u16, values: &[bool]) -> Result<()> {
        let tid = self.next_transaction_id();
        let req = WriteBitsRequest::new(tid, self.config.unit_id, address, values)?;

        let response = self.exchange(&req.to_bytes(), tid, req.function())?;
        response.check_echo(address, values.len() as u16)
    }

    fn write_words(&mut self, address: u16, values: &[u16]) -> Result<()> {
        let tid = self.next_transaction_id();
        let req = WriteWordsRequest::new(tid, self.config.unit_id, address, values)?;

        let response = self.exchange(&req.to_bytes(), tid, req.function())?;
        response.check_echo(address, values.len() as u16)
    }

    fn write_word(&mut self, address: u16, value: u16) -> Result<()> {
        self.write_register(address, value)
    }

    fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.shutdown();
            debug!(addr = %self.config.addr, "connection closed");
        }
    }
}

impl std::fmt::Debug for ModbusTcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusTcpClient")
            .field("addr", &self.config.addr)
            .field("unit_id", &self.config.unit_id)
            .field("transport", &self.transport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 10).into());

        assert_eq!(config.addr.ip(), IpAddr::from(Ipv4Addr::new(192, 168, 1, 10)));
        assert_eq!(config.addr.port(), DEFAULT_MODBUS_PORT);
        assert_eq!(config.unit_id, DEFAULT_UNIT_ID);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::new(Ipv4Addr::LOCALHOST.into())
            .with_port(5020)
            .with_timeout(Duration::from_millis(250))
            .with_unit_id(7);

        assert_eq!(config.addr.port(), 5020);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.unit_id, 7);
    }

    #[test]
    fn test_client_starts_disconnected() {
        let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
        assert!(!client.is_connected());

        let result = client.read_words(RegisterSpace::InputRegister, 0, 9);
        assert!(matches!(result, Err(WagoError::NotConnected)));
    }

    #[test]
    fn test_close_when_disconnected_is_noop() {
        let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
        client.close();
        client.close();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_transaction_id_increments_and_wraps() {
        let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
        assert_eq!(client.next_transaction_id(), 1);
        assert_eq!(client.next_transaction_id(), 2);

        client.transaction_counter = u16::MAX;
        assert_eq!(client.next_transaction_id(), 0);
    }

    #[test]
    fn test_invalid_request_rejected_before_sending() {
        let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
        // Validation happens before the connection is consulted.
        let result = client.read_words(RegisterSpace::Coil, 0, 8);
        assert!(matches!(result, Err(WagoError::InvalidParameter { .. })));
    }

    #[test]
    fn test_client_debug() {
        let client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("ModbusTcpClient"));
        assert!(debug_str.contains("127.0.0.1:502"));
    }
}
