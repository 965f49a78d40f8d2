//! Human-readable status output.

use std::fmt;

use tracing::warn;

use crate::image::{
    InputImage, OutputImage, ANALOG_INPUT_COUNT, ANALOG_OUTPUT_COUNT, DISCRETE_INPUT_COUNT,
    DISCRETE_OUTPUT_COUNT, TEMPERATURE_INPUT_COUNT, WATCHDOG_REGISTER,
};
use crate::transaction::TransactionManager;
use crate::transport::DeviceTransport;
use crate::units::raw_to_percent;
use crate::utils::{format_flags, format_hex};

const RULE_WIDTH: usize = 70;
const FLAGS_PER_ROW: usize = 4;

/// Everything shown by the full status block.
///
/// Each section is read independently; a section whose read failed is `None`
/// and is left out of the output.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// Discrete inputs from the discrete-input space.
    pub discrete_inputs: Option<Vec<bool>>,
    /// Discrete outputs from the coil space.
    pub coils: Option<Vec<bool>>,
    /// Input image.
    pub inputs: Option<InputImage>,
    /// Output image.
    pub outputs: Option<OutputImage>,
    /// Watchdog timeout in milliseconds.
    pub watchdog: Option<u16>,
}

impl StatusSnapshot {
    /// Reads every section from the device, logging and skipping failures.
    pub fn collect<T: DeviceTransport>(transactions: &mut TransactionManager<T>) -> Self {
        fn keep<V>(section: &str, result: crate::Result<V>) -> Option<V> {
            result
                .map_err(|e| warn!("Status read of {} failed: {}", section, e))
                .ok()
        }

        Self {
            discrete_inputs: keep("discrete inputs", transactions.read_discrete_inputs()),
            coils: keep("coils", transactions.read_coils()),
            inputs: keep("input image", transactions.read_inputs()),
            outputs: keep("output image", transactions.read_outputs()),
            watchdog: keep("watchdog", transactions.read_watchdog()),
        }
    }
}

fn write_flags(f: &mut fmt::Formatter<'_>, label: &str, flags: &[bool]) -> fmt::Result {
    for (i, on) in flags.iter().enumerate() {
        write!(f, "  {}.{}: {}  ", label, i, if *on { "ON " } else { "OFF" })?;
        if (i + 1) % FLAGS_PER_ROW == 0 {
            writeln!(f)?;
        }
    }
    Ok(())
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "WAGO 750 I/O Status")?;
        writeln!(f, "{}", rule)?;

        if let Some(di) = &self.discrete_inputs {
            writeln!(f)?;
            writeln!(
                f,
                "[750-1415] Digital Inputs (Discrete Inputs FC02, addr 0-{}):",
                DISCRETE_INPUT_COUNT - 1
            )?;
            write_flags(f, "DI", &di[..di.len().min(DISCRETE_INPUT_COUNT)])?;
        }

        if let Some(coils) = &self.coils {
            writeln!(f)?;
            writeln!(
                f,
                "[750-1515] Digital Outputs (Coils FC01, addr 0-{}):",
                DISCRETE_OUTPUT_COUNT - 1
            )?;
            write_flags(f, "DO", &coils[..coils.len().min(DISCRETE_OUTPUT_COUNT)])?;
        }

        if let Some(inputs) = &self.inputs {
            writeln!(f)?;
            writeln!(f, "[750-455] Analog Inputs 4-20mA (Input Registers FC04, addr 0-3):")?;
            for (i, raw) in inputs.analog.iter().enumerate().take(ANALOG_INPUT_COUNT) {
                let ma = inputs.analog_ma(i).unwrap_or_default();
                writeln!(f, "  AI.{}: {:6.2} mA  (raw: {})", i, ma, format_hex(*raw))?;
            }

            writeln!(f)?;
            writeln!(f, "[750-464] RTD/Pt100 Inputs (Input Registers FC04, addr 4-7):")?;
            for (i, raw) in inputs.temperature.iter().enumerate().take(TEMPERATURE_INPUT_COUNT) {
                let c = inputs.temperature_c(i).unwrap_or_default();
                writeln!(f, "  RTD.{}: {:7.1} C  (raw: {})", i, c, format_hex(*raw))?;
            }
        }

        if let Some(outputs) = &self.outputs {
            writeln!(f)?;
            writeln!(f, "[750-563] Analog Outputs (Holding Registers FC03, addr 0-1):")?;
            for (i, raw) in outputs.analog.iter().enumerate().take(ANALOG_OUTPUT_COUNT) {
                let ma = outputs.analog_ma(i).unwrap_or_default();
                let pct = outputs.analog_percent(i).unwrap_or_default();
                writeln!(
                    f,
                    "  AO.{}: {:6.2} mA  ({:5.1}%)  (raw: {})",
                    i,
                    ma,
                    pct,
                    format_hex(*raw)
                )?;
            }
        }

        if let Some(ms) = self.watchdog {
            let note = if ms == 0 { "(disabled)" } else { "" };
            writeln!(f)?;
            writeln!(
                f,
                "Watchdog Timeout (HR 0x{:04X}): {} ms {}",
                WATCHDOG_REGISTER, ms, note
            )?;
        }

        writeln!(f)?;
        write!(f, "{}", rule)
    }
}

/// Renders the full status block.
pub fn render_status(snapshot: &StatusSnapshot) -> String {
    snapshot.to_string()
}

/// Renders the one-line loop status for `cycle`.
///
/// ```
/// use wago_io::{render_compact, OutputImage};
///
/// let image = OutputImage::new(&[16383, 32767], &[true]).unwrap();
/// assert_eq!(
///     render_compact(7, &image),
///     "[   7] DO: 10000000  |  AO.0:  50.0%  AO.1: 100.0%"
/// );
/// ```
pub fn render_compact(cycle: u64, outputs: &OutputImage) -> String {
    format!(
        "[{:4}] DO: {}  |  AO.0: {:5.1}%  AO.1: {:5.1}%",
        cycle,
        format_flags(outputs.fitted_discrete()),
        raw_to_percent(outputs.analog[0]),
        raw_to_percent(outputs.analog[1])
    )
}
