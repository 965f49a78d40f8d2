//! Shared device doubles for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use wago_io::{DeviceTransport, RegisterSpace, Result, WagoError};

/// One request seen by [`FakeDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    ReadBits(RegisterSpace, u16, u16),
    ReadWords(RegisterSpace, u16, u16),
    WriteBits(u16, Vec<bool>),
    WriteWords(u16, Vec<u16>),
    Close,
}

/// In-memory device with scripted failures and a call log.
#[derive(Debug)]
pub struct FakeDevice {
    pub calls: Vec<Call>,
    pub input: Vec<u16>,
    pub holding: HashMap<u16, u16>,
    pub coils: Vec<bool>,
    /// Remaining connect attempts that fail.
    pub connect_failures: u32,
    /// Zero-based indices of `write_words` calls that fail.
    pub failing_writes: Vec<usize>,
    /// Zero-based indices of `read_words` calls that fail.
    pub failing_reads: Vec<usize>,
    pub writes: usize,
    pub reads: usize,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            input: vec![0, 8191, 16383, 32767, 2000, 2250, 1000, 3000, 0b0000_0101],
            holding: HashMap::new(),
            coils: vec![false; 8],
            connect_failures: 0,
            failing_writes: Vec::new(),
            failing_reads: Vec::new(),
            writes: 0,
            reads: 0,
        }
    }
}

impl FakeDevice {
    /// Returns every `write_words` payload in call order.
    pub fn written_images(&self) -> Vec<Vec<u16>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::WriteWords(_, values) => Some(values.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the holding registers 0..3.
    pub fn output_words(&self) -> [u16; 3] {
        [0, 1, 2].map(|a| self.holding.get(&a).copied().unwrap_or(0))
    }
}

impl DeviceTransport for FakeDevice {
    fn connect(&mut self) -> Result<()> {
        self.calls.push(Call::Connect);
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(WagoError::connection(
                "10.0.0.1:502",
                io::Error::from(io::ErrorKind::ConnectionRefused),
            ));
        }
        Ok(())
    }

    fn read_bits(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<bool>> {
        self.calls.push(Call::ReadBits(space, address, count));
        Ok((address..address + count)
            .map(|a| self.coils.get(a as usize).copied().unwrap_or(false))
            .collect())
    }

    fn read_words(&mut self, space: RegisterSpace, address: u16, count: u16) -> Result<Vec<u16>> {
        self.calls.push(Call::ReadWords(space, address, count));
        let index = self.reads;
        self.reads += 1;
        if self.failing_reads.contains(&index) {
            return Err(WagoError::Timeout);
        }
        Ok(match space {
            RegisterSpace::InputRegister => self
                .input
                .iter()
                .skip(address as usize)
                .take(count as usize)
                .copied()
                .collect(),
            _ => (address..address + count)
                .map(|a| self.holding.get(&a).copied().unwrap_or(0))
                .collect(),
        })
    }

    fn write_bits(&mut self, address: u16, values: &[bool]) -> Result<()> {
        self.calls.push(Call::WriteBits(address, values.to_vec()));
        for (i, &v) in values.iter().enumerate() {
            if let Some(slot) = self.coils.get_mut(address as usize + i) {
                *slot = v;
            }
        }
        Ok(())
    }

    fn write_words(&mut self, address: u16, values: &[u16]) -> Result<()> {
        self.calls.push(Call::WriteWords(address, values.to_vec()));
        let index = self.writes;
        self.writes += 1;
        if self.failing_writes.contains(&index) {
            return Err(WagoError::exception(0x10, 0x04));
        }
        for (i, &v) in values.iter().enumerate() {
            self.holding.insert(address + i as u16, v);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.calls.push(Call::Close);
    }
}

/// Register contents of a [`spawn_server`] device.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    pub input: Vec<u16>,
    pub holding: HashMap<u16, u16>,
    pub coils: Vec<bool>,
    /// Function codes answered with exception 0x01 (illegal function).
    pub rejected_functions: Vec<u8>,
}

/// Starts a single-connection Modbus TCP server on a loopback port.
///
/// The server answers until the client disconnects and then returns its
/// final register contents.
pub fn spawn_server(registers: Registers) -> (SocketAddr, JoinHandle<Registers>) {
    spawn_slow_server(registers, Duration::ZERO)
}

/// Like [`spawn_server`], but holds the first reply back for `first_delay`.
pub fn spawn_slow_server(
    registers: Registers,
    first_delay: Duration,
) -> (SocketAddr, JoinHandle<Registers>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut registers = registers;
        let (mut socket, _) = listener.accept().unwrap();
        let mut delay = first_delay;
        loop {
            let mut header = [0u8; 7];
            if socket.read_exact(&mut header).is_err() {
                break;
            }
            let length = u16::from_be_bytes([header[4], header[5]]) as usize;
            let mut pdu = vec![0u8; length - 1];
            if socket.read_exact(&mut pdu).is_err() {
                break;
            }

            let reply = answer(&mut registers, &pdu);
            let mut frame = vec![header[0], header[1], 0, 0];
            frame.extend_from_slice(&(reply.len() as u16 + 1).to_be_bytes());
            frame.push(header[6]);
            frame.extend_from_slice(&reply);
            thread::sleep(std::mem::take(&mut delay));
            if socket.write_all(&frame).is_err() {
                break;
            }
        }
        registers
    });

    (addr, handle)
}

fn word(pdu: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([pdu[at], pdu[at + 1]])
}

fn answer(registers: &mut Registers, pdu: &[u8]) -> Vec<u8> {
    let function = pdu[0];
    let exception = |code: u8| vec![function | 0x80, code];
    if registers.rejected_functions.contains(&function) {
        return exception(0x01);
    }

    match function {
        0x01 | 0x02 => {
            let (address, count) = (word(pdu, 1), word(pdu, 3));
            let mut bytes = vec![0u8; (count as usize).div_ceil(8)];
            for i in 0..count as usize {
                if registers.coils.get(address as usize + i).copied().unwrap_or(false) {
                    bytes[i / 8] |= 1 << (i % 8);
                }
            }
            let mut reply = vec![function, bytes.len() as u8];
            reply.extend_from_slice(&bytes);
            reply
        }
        0x03 | 0x04 => {
            let (address, count) = (word(pdu, 1), word(pdu, 3));
            let mut reply = vec![function, (count * 2) as u8];
            for a in address..address + count {
                let value = if function == 0x04 {
                    match registers.input.get(a as usize) {
                        Some(v) => *v,
                        None => return exception(0x02),
                    }
                } else {
                    registers.holding.get(&a).copied().unwrap_or(0)
                };
                reply.extend_from_slice(&value.to_be_bytes());
            }
            reply
        }
        0x06 => {
            registers.holding.insert(word(pdu, 1), word(pdu, 3));
            pdu.to_vec()
        }
        0x0F => {
            let (address, count) = (word(pdu, 1), word(pdu, 3));
            for i in 0..count as usize {
                let on = pdu[6 + i / 8] & (1 << (i % 8)) != 0;
                let slot = address as usize + i;
                if registers.coils.len() <= slot {
                    registers.coils.resize(slot + 1, false);
                }
                registers.coils[slot] = on;
            }
            pdu[..5].to_vec()
        }
        0x10 => {
            let (address, count) = (word(pdu, 1), word(pdu, 3));
            for i in 0..count {
                registers
                    .holding
                    .insert(address + i, word(pdu, 6 + 2 * i as usize));
            }
            pdu[..5].to_vec()
        }
        _ => exception(0x01),
    }
}
