//! Transport layer: the device contract and the TCP byte pipe.
//!
//! This module holds two things that live on either side of the Modbus
//! protocol code:
//!
//! - [`DeviceTransport`] - the request/response contract the process-image
//!   layers depend on. [`ModbusTcpClient`](crate::ModbusTcpClient) is the real
//!   implementation; tests substitute an in-memory device.
//! - [`TcpTransport`] - a blocking TCP stream that sends one request frame and
//!   reads back exactly one MBAP-delimited response frame. It knows framing,
//!   not function codes.
//!
//! # Constants
//!
//! - [`DEFAULT_MODBUS_PORT`] - Default Modbus TCP port (502)
//! - [`DEFAULT_TIMEOUT`] - Default per-call timeout (5 seconds)
//!
//! # Example
//!
//! ```no_run
//! use wago_io::TcpTransport;
//! use std::time::{Duration, Instant};
//!
//! let mut transport = TcpTransport::connect(
//!     "127.0.0.1:502".parse().unwrap(),
//!     Duration::from_secs(2),
//! ).unwrap();
//!
//! // Read input registers 0..9 from unit 1 (transaction 1)
//! let request = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x00, 0x00, 0x09];
//! let response = transport.send_receive(&request).unwrap();
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Result, WagoError};
use crate::mbap::{MbapHeader, MBAP_HEADER_SIZE};
use crate::space::RegisterSpace;

/// Default Modbus TCP port.
pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// Default timeout for one request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request/response access to one Modbus device.
///
/// Every method performs exactly one exchange with the device and never
/// retries. Implementations are used from a single thread and are not
/// expected to support overlapping requests.
pub trait DeviceTransport {
    /// Opens the connection to the device.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::Connection` if the device cannot be reached.
    fn connect(&mut self) -> Result<()>;

    /// Reads `count` coils or discrete inputs starting at `address`.
    fn read_bits(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<bool>>;

    /// Reads `count` holding or input registers starting at `address`.
    fn read_words(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<u16>>;

    /// Writes consecutive coils starting at `address`.
    fn write_bits(&mut self, address: u16, values: &[bool]) -> Result<()>;

    /// Writes consecutive holding registers starting at `address`.
    fn write_words(&mut self, address: u16, values: &[u16]) -> Result<()>;

    /// Writes one holding register.
    ///
    /// The default issues a one-element multi-register write.
    fn write_word(&mut self, address: u16, value: u16) -> Result<()> {
        self.write_words(address, &[value])
    }

    /// Closes the connection. Closing twice is a no-op.
    fn close(&mut self);
}

/// Blocking TCP transport for Modbus TCP frames.
pub struct TcpTransport {
    stream: TcpStream,
    remote_addr: SocketAddr,
    timeout: Duration,
}

impl TcpTransport {
    /// Connects to the device at `addr`.
    ///
    /// `timeout` bounds the connect itself and every subsequent read/write.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::Connection` if the connection cannot be established
    /// or the socket cannot be configured.
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let configure = || -> io::Result<TcpStream> {
            let stream = TcpStream::connect_timeout(&addr, timeout)?;
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
            stream.set_nodelay(true)?;
            Ok(stream)
        };
        let stream = configure().map_err(|e| WagoError::connection(addr.to_string(), e))?;

        Ok(Self {
            stream,
            remote_addr: addr,
            timeout,
        })
    }

    /// Sends one request frame and receives one response frame.
    ///
    /// The response is delimited by the length field of its MBAP header, so
    /// exactly one frame is consumed from the stream.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::Timeout` if the device does not answer in time,
    /// `WagoError::InvalidResponse` if the header cannot be parsed, and
    /// `WagoError::Io` for other socket failures.
    pub fn send_receive(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.send(data)?;
        self.receive(Instant::now() + self.timeout)
    }

    /// Writes one request frame to the stream.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!(bytes = data.len(), "sending frame");
        self.stream.write_all(data).map_err(map_io)
    }

    /// Reads exactly one MBAP-delimited frame, waiting no later than
    /// `deadline`.
    ///
    /// # Errors
    ///
    /// Same as [`send_receive`](Self::send_receive). A deadline already in
    /// the past yields `WagoError::Timeout` without touching the stream.
    pub fn receive(&mut self, deadline: Instant) -> Result<Vec<u8>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(WagoError::Timeout);
        }
        self.stream.set_read_timeout(Some(remaining)).map_err(map_io)?;

        let mut frame = vec![0u8; MBAP_HEADER_SIZE];
        self.stream.read_exact(&mut frame).map_err(map_io)?;
        let header = MbapHeader::from_bytes(&frame)?;

        frame.resize(MBAP_HEADER_SIZE + header.pdu_len(), 0);
        self.stream
            .read_exact(&mut frame[MBAP_HEADER_SIZE..])
            .map_err(map_io)?;
        trace!(bytes = frame.len(), "received frame");

        Ok(frame)
    }

    /// Returns the per-exchange timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the remote device address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Shuts the stream down in both directions.
    pub fn shutdown(&self) {
        // The peer may already be gone; nothing useful to do about it.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

fn map_io(e: io::Error) -> WagoError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => WagoError::Timeout,
        _ => WagoError::Io(e),
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_MODBUS_PORT, 502);
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let result = TcpTransport::connect(addr, Duration::from_millis(200));
        assert!(matches!(result, Err(WagoError::Connection { .. })));
    }

    #[test]
    fn test_send_receive_reads_one_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = [0u8; 12];
            socket.read_exact(&mut request).unwrap();
            // Echo the transaction id, answer one register, then a stray byte.
            let mut reply = vec![request[0], request[1], 0x00, 0x00, 0x00, 0x05, 0x01];
            reply.extend_from_slice(&[0x03, 0x02, 0x13, 0x88, 0xEE]);
            socket.write_all(&reply).unwrap();
        });

        let mut transport = TcpTransport::connect(addr, Duration::from_secs(2)).unwrap();
        let request = hex::decode("002a00000006010310000001").unwrap();
        let response = transport.send_receive(&request).unwrap();
        assert_eq!(response, hex::decode("002a000000050103021388").unwrap());
        assert_eq!(transport.remote_addr(), addr);
        server.join().unwrap();
    }

    #[test]
    fn test_receive_past_deadline_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut transport = TcpTransport::connect(addr, Duration::from_secs(1)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(1));

        let result = transport.receive(Instant::now());
        assert!(matches!(result, Err(WagoError::Timeout)));
    }

    #[test]
    fn test_transport_debug() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = TcpTransport::connect(addr, Duration::from_secs(1)).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("TcpTransport"));
        assert!(debug_str.contains(&addr.to_string()));
    }
}
