//! Raw register value to engineering unit conversions.
//!
//! The bus coupler exposes every analog channel as a 16-bit raw value. These
//! functions map raw values to loop current, temperature and percent and
//! back. All conversions are lossy: one raw step is about 0.003% of span, so
//! round trips agree to within one raw unit, not exactly.
//!
//! Values outside the nominal span are passed through, not clamped: a raw
//! value above 32767 decodes to more than 20 mA. Conversions back to raw
//! saturate at the register limits (0 and 65535).
//!
//! # Example
//!
//! ```
//! use wago_io::units::{current_ma_to_raw, raw_to_current_ma, raw_to_temperature_c};
//!
//! assert_eq!(raw_to_current_ma(0), 4.0);
//! assert_eq!(raw_to_current_ma(32767), 20.0);
//! assert_eq!(current_ma_to_raw(3.2), 0);
//! assert_eq!(raw_to_temperature_c(2000), 0.0);
//! ```

use std::fmt;

/// Raw value representing full scale (20 mA / 100%).
pub const RAW_FULL_SCALE: f64 = 32767.0;

/// Loop current at raw zero, in milliamps.
pub const CURRENT_MIN_MA: f64 = 4.0;

/// Loop current span between raw zero and full scale, in milliamps.
pub const CURRENT_SPAN_MA: f64 = 16.0;

/// Temperature encoded by raw zero, in degrees Celsius.
pub const TEMPERATURE_OFFSET_C: f64 = -200.0;

/// Raw units per degree Celsius (0.1 °C resolution).
pub const TEMPERATURE_SCALE: f64 = 10.0;

/// Converts a raw analog value to 4-20 mA loop current.
pub fn raw_to_current_ma(raw: u16) -> f64 {
    CURRENT_MIN_MA + (f64::from(raw) / RAW_FULL_SCALE) * CURRENT_SPAN_MA
}

/// Converts a loop current to a raw analog value.
///
/// Currents below 4 mA map to 0. The result is truncated toward zero.
pub fn current_ma_to_raw(ma: f64) -> u16 {
    if ma < CURRENT_MIN_MA {
        return 0;
    }
    // `as` saturates at u16::MAX and maps NaN to 0.
    (((ma - CURRENT_MIN_MA) / CURRENT_SPAN_MA) * RAW_FULL_SCALE) as u16
}

/// Converts a raw RTD value to degrees Celsius.
pub fn raw_to_temperature_c(raw: u16) -> f64 {
    f64::from(raw) / TEMPERATURE_SCALE + TEMPERATURE_OFFSET_C
}

/// Converts a raw analog value to percent of full scale.
pub fn raw_to_percent(raw: u16) -> f64 {
    (f64::from(raw) / RAW_FULL_SCALE) * 100.0
}

/// Converts percent of full scale to a raw analog value, truncating toward zero.
///
/// Negative percentages map to 0.
pub fn percent_to_raw(percent: f64) -> u16 {
    ((percent / 100.0) * RAW_FULL_SCALE) as u16
}

/// A value in engineering units, derived from exactly one raw register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineeringValue {
    /// Loop current in milliamps.
    Milliamps(f64),
    /// Temperature in degrees Celsius.
    Celsius(f64),
    /// Percent of full scale.
    Percent(f64),
}

impl EngineeringValue {
    /// Decodes a raw value as loop current.
    pub fn current(raw: u16) -> Self {
        Self::Milliamps(raw_to_current_ma(raw))
    }

    /// Decodes a raw value as RTD temperature.
    pub fn temperature(raw: u16) -> Self {
        Self::Celsius(raw_to_temperature_c(raw))
    }

    /// Decodes a raw value as percent of full scale.
    pub fn percent(raw: u16) -> Self {
        Self::Percent(raw_to_percent(raw))
    }

    /// Returns the numeric value without its unit.
    pub fn value(self) -> f64 {
        match self {
            Self::Milliamps(v) | Self::Celsius(v) | Self::Percent(v) => v,
        }
    }

    /// Encodes the value back to a raw register value.
    ///
    /// Temperatures are encoded with the RTD fixed-point scaling.
    pub fn to_raw(self) -> u16 {
        match self {
            Self::Milliamps(ma) => current_ma_to_raw(ma),
            Self::Celsius(c) => ((c - TEMPERATURE_OFFSET_C) * TEMPERATURE_SCALE).round() as u16,
            Self::Percent(p) => percent_to_raw(p),
        }
    }
}

impl fmt::Display for EngineeringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Milliamps(v) => write!(f, "{:.2} mA", v),
            Self::Celsius(v) => write!(f, "{:.1} °C", v),
            Self::Percent(v) => write!(f, "{:.1} %", v),
        }
    }
}
