//! Bit packing and formatting helpers.
//!
//! Two packing conventions appear on a Modbus device and both are LSB first:
//!
//! - **Word packing**: up to 16 flags in one register, flag *i* in bit *i*.
//!   Used by the packed discrete fields of the process image.
//! - **Byte packing**: coil and discrete-input payloads on the wire, flag *i*
//!   in bit `i % 8` of byte `i / 8`.
//!
//! # Example
//!
//! ```
//! use wago_io::utils::{flags_to_word, get_bit, word_to_bits};
//!
//! let word = flags_to_word(&[true, false, true]);
//! assert_eq!(word, 0b101);
//! assert!(get_bit(word, 2));
//! assert_eq!(word_to_bits(word)[0], true);
//! ```

/// Number of flags one register can carry.
pub const BITS_PER_WORD: usize = 16;

/// Gets a single bit from a 16-bit word.
///
/// # Example
///
/// ```
/// use wago_io::utils::get_bit;
///
/// let value: u16 = 0b0000_0000_0000_0101; // bits 0 and 2 are set
/// assert!(get_bit(value, 0));
/// assert!(!get_bit(value, 1));
/// assert!(get_bit(value, 2));
/// ```
#[inline]
pub fn get_bit(value: u16, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

/// Sets or clears a single bit in a 16-bit word.
///
/// # Example
///
/// ```
/// use wago_io::utils::set_bit;
///
/// assert_eq!(set_bit(0, 5, true), 0b0000_0000_0010_0000);
/// assert_eq!(set_bit(0xFFFF, 0, false), 0xFFFE);
/// ```
#[inline]
pub fn set_bit(value: u16, bit: u8, state: bool) -> u16 {
    if state {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// Unpacks a 16-bit word into 16 flags, index 0 being the LSB.
pub fn word_to_bits(value: u16) -> [bool; BITS_PER_WORD] {
    let mut bits = [false; BITS_PER_WORD];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = get_bit(value, i as u8);
    }
    bits
}

/// Packs flags into a 16-bit word, index 0 into the LSB.
///
/// Flags beyond the 16th are ignored.
///
/// # Example
///
/// ```
/// use wago_io::utils::flags_to_word;
///
/// let mut flags = vec![false; 20];
/// flags[1] = true;
/// flags[19] = true; // past the word, dropped
/// assert_eq!(flags_to_word(&flags), 0b10);
/// ```
pub fn flags_to_word(flags: &[bool]) -> u16 {
    flags
        .iter()
        .take(BITS_PER_WORD)
        .enumerate()
        .fold(0u16, |word, (i, &flag)| set_bit(word, i as u8, flag))
}

/// Packs flags into bytes the way coil payloads travel on the wire.
pub(crate) fn pack_bits_le(values: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len().div_ceil(8)];
    for (i, &value) in values.iter().enumerate() {
        if value {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpacks the first `count` flags from a coil/discrete-input payload.
///
/// Missing trailing bytes read as `false`.
pub(crate) fn unpack_bits_le(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes.get(i / 8).is_some_and(|b| b & (1 << (i % 8)) != 0))
        .collect()
}

/// Formats flags as a string of `1`/`0`, first flag first.
///
/// # Example
///
/// ```
/// use wago_io::utils::format_flags;
///
/// assert_eq!(format_flags(&[true, false, false, true]), "1001");
/// ```
pub fn format_flags(flags: &[bool]) -> String {
    flags.iter().map(|&f| if f { '1' } else { '0' }).collect()
}

/// Formats a 16-bit word as grouped binary.
///
/// # Example
///
/// ```
/// use wago_io::utils::format_binary;
///
/// assert_eq!(format_binary(0x1234), "0b0001_0010_0011_0100");
/// ```
pub fn format_binary(value: u16) -> String {
    let binary = format!("{:016b}", value);
    format!(
        "0b{}_{}_{}_{}",
        &binary[0..4],
        &binary[4..8],
        &binary[8..12],
        &binary[12..16]
    )
}

/// Formats a 16-bit word as hexadecimal.
///
/// # Example
///
/// ```
/// use wago_io::utils::format_hex;
///
/// assert_eq!(format_hex(0x00A5), "0x00A5");
/// ```
pub fn format_hex(value: u16) -> String {
    format!("0x{:04X}", value)
}
