//! # WAGO 750 Process-Image Client
//!
//! A Rust library for driving a WAGO 750 style I/O rack over Modbus TCP.
//!
//! The crate maps the coupler's flat register blocks to typed process images
//! (loop currents, RTD temperatures, discrete flags) and runs a scan cycle
//! that writes a complete output image per cycle.
//!
//! ## Features
//!
//! - **Whole-image transactions** - inputs are read, and outputs written, in exactly one request each
//! - **Deterministic** - each call produces exactly 1 request and 1 response, no hidden retries
//! - **Safe shutdown** - cancelling a scan loop always ends with the safe state written
//! - **No panics** - all errors returned as `Result<T, WagoError>`
//! - **Pluggable logic** - output generators are a trait, closures included
//!
//! ## Quick Start
//!
//! ```no_run
//! use wago_io::{ClientConfig, DeviceTransport, ModbusTcpClient, OutputImage, TransactionManager};
//! use std::net::Ipv4Addr;
//!
//! fn main() -> wago_io::Result<()> {
//!     let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::new(192, 168, 1, 10).into()));
//!     client.connect()?;
//!
//!     let mut io = TransactionManager::new(client);
//!
//!     // Read all inputs in one request
//!     let inputs = io.read_inputs()?;
//!     println!("AI.0 = {:.2} mA", inputs.analog_ma(0).unwrap_or_default());
//!     println!("RTD.0 = {:.1} °C", inputs.temperature_c(0).unwrap_or_default());
//!
//!     // Write both analog outputs and the discrete outputs in one request
//!     let outputs = OutputImage::new(&[16383, 24575], &[true, false, true])?;
//!     io.write_outputs(&outputs)?;
//!
//!     io.into_inner().close();
//!     Ok(())
//! }
//! ```
//!
//! ## Address Map
//!
//! | Channel | Space | Offset | Count |
//! |---------|-------|:------:|:-----:|
//! | Analog input 0-3 (4-20 mA) | Input registers | 0 | 4 |
//! | Temperature input 0-3 (Pt100) | Input registers | 4 | 4 |
//! | Discrete input 0-7 (packed) | Input registers | 8 | 1 word |
//! | Analog output 0-1 (4-20 mA) | Holding registers | 0 | 2 |
//! | Discrete output 0-7 (packed) | Holding registers | 2 | 1 word |
//! | Watchdog timeout (ms) | Holding registers | 0x1000 | 1 |
//!
//! ## Scan Cycle
//!
//! ```no_run
//! use wago_io::{
//!     render_compact, CancellationToken, ClientConfig, ControllerConfig, DemoPattern,
//!     ModbusTcpClient, ScanController,
//! };
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! let client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
//! let config = ControllerConfig::default().with_interval(Duration::from_millis(200));
//! let mut controller = ScanController::new(client, config);
//! controller.connect()?;
//!
//! // Cancel from another thread (e.g. a signal handler) to stop.
//! let token = CancellationToken::new();
//! controller.run(DemoPattern::default(), &token, |report| {
//!     println!("{}", render_compact(report.cycle, &report.observed_outputs()));
//! })?;
//! # Ok::<(), wago_io::WagoError>(())
//! ```
//!
//! ## Unit Conversions
//!
//! ```
//! use wago_io::units::{raw_to_current_ma, percent_to_raw, raw_to_temperature_c};
//!
//! assert_eq!(raw_to_current_ma(32767), 20.0);
//! assert_eq!(percent_to_raw(50.0), 16383);
//! assert_eq!(raw_to_temperature_c(2250), 25.0);
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use wago_io::{ClientConfig, DeviceTransport, ModbusTcpClient, WagoError};
//! use std::net::Ipv4Addr;
//!
//! let mut client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
//! match client.connect() {
//!     Ok(()) => println!("Connected"),
//!     Err(WagoError::Connection { addr, source }) => println!("Cannot reach {}: {}", addr, source),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod controller;
mod error;
pub mod image;
mod mbap;
mod pattern;
mod request;
mod response;
mod space;
mod status;
mod transaction;
mod transport;
pub mod units;
pub mod utils;

// Public re-exports
pub use client::{ClientConfig, ModbusTcpClient, DEFAULT_UNIT_ID};
pub use controller::{
    CancellationToken, ControllerConfig, ControllerState, CycleReport, RunSummary, ScanController,
    DEFAULT_INTERVAL,
};
pub use error::{exception_description, Result, WagoError};
pub use image::{decode_inputs, decode_outputs, encode_outputs, InputImage, OutputImage};
pub use mbap::{MbapHeader, MBAP_HEADER_SIZE};
pub use pattern::{
    scan_position, DemoPattern, KnightRider, OutputGenerator, SineWave, DEFAULT_SINE_PERIOD,
};
pub use request::{
    ReadBitsRequest, ReadWordsRequest, WriteBitsRequest, WriteRegisterRequest, WriteWordsRequest,
    MAX_READ_BITS, MAX_READ_WORDS, MAX_WRITE_BITS, MAX_WRITE_WORDS,
};
pub use response::ModbusResponse;
pub use space::RegisterSpace;
pub use status::{render_compact, render_status, StatusSnapshot};
pub use transaction::TransactionManager;
pub use transport::{DeviceTransport, TcpTransport, DEFAULT_MODBUS_PORT, DEFAULT_TIMEOUT};
