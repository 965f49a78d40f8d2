//! Scan-cycle controller.
//!
//! [`ScanController`] owns the device connection for its whole lifetime and
//! drives it through `Idle -> Connected -> Running -> Stopping -> Closed`.
//!
//! While running, each cycle computes the next output image, writes it in one
//! transaction, optionally reads back outputs and inputs, reports the cycle
//! and then pauses. Transport errors inside a cycle are logged, counted and
//! reported; the loop carries on with the next cycle. Errors that point at a
//! broken address map (a malformed image) end the run.
//!
//! Cancellation is checked once per cycle boundary through a
//! [`CancellationToken`], so a cycle's write always completes first. On the
//! way out the controller writes the safe state once and closes the
//! connection.
//!
//! # Example
//!
//! ```no_run
//! use wago_io::{
//!     CancellationToken, ClientConfig, ControllerConfig, DemoPattern, ModbusTcpClient,
//!     ScanController,
//! };
//! use std::net::Ipv4Addr;
//!
//! let client = ModbusTcpClient::new(ClientConfig::new(Ipv4Addr::LOCALHOST.into()));
//! let mut controller = ScanController::new(client, ControllerConfig::default().with_max_cycles(20));
//! controller.connect()?;
//!
//! let token = CancellationToken::new();
//! let summary = controller.run(DemoPattern::default(), &token, |report| {
//!     println!("cycle {} wrote {:?}", report.cycle, report.outputs.analog);
//! })?;
//! assert!(summary.safe_state_written);
//! # Ok::<(), wago_io::WagoError>(())
//! ```

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::error::{Result, WagoError};
use crate::image::{InputImage, OutputImage};
use crate::pattern::OutputGenerator;
use crate::transaction::TransactionManager;
use crate::transport::DeviceTransport;

/// Default pause between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle state of a [`ScanController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerState {
    /// Created, no connection.
    Idle,
    /// Connection open, loop not started.
    Connected,
    /// Cycle loop active.
    Running,
    /// Writing the safe state before closing.
    Stopping,
    /// Connection closed; terminal.
    Closed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Connected => "Connected",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation signal shared between threads.
///
/// Clones share the same flag. Cancelling wakes any thread blocked in
/// [`wait_timeout`](Self::wait_timeout).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    /// Returns whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks for up to `timeout` or until cancelled.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, wakeup) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            cancelled = wakeup
                .wait_timeout(cancelled, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }
}

/// Scan-cycle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    /// Pause after each cycle. Measures sleep time, not cycle period.
    pub interval: Duration,
    /// Stop after this many cycles; `None` runs until cancelled.
    pub max_cycles: Option<u64>,
    /// Read back outputs and inputs after each write.
    pub read_back: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_cycles: None,
            read_back: true,
        }
    }
}

impl ControllerConfig {
    /// Sets the pause between cycles (default is 500 ms).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Limits the run to `cycles` cycles.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Enables or disables read-back after each write (default is on).
    pub fn with_read_back(mut self, read_back: bool) -> Self {
        self.read_back = read_back;
        self
    }
}

/// Outcome of one scan cycle, passed to the cycle callback.
#[derive(Debug)]
pub struct CycleReport {
    /// Zero-based cycle index.
    pub cycle: u64,
    /// Image the controller attempted to write.
    pub outputs: OutputImage,
    /// Result of the output write.
    pub write: Result<()>,
    /// Outputs read back from the device, if read-back is enabled.
    pub readback: Option<Result<OutputImage>>,
    /// Inputs read from the device, if read-back is enabled.
    pub inputs: Option<Result<InputImage>>,
}

impl CycleReport {
    /// Returns whether every exchange of the cycle succeeded.
    pub fn is_ok(&self) -> bool {
        self.write.is_ok()
            && !matches!(self.readback, Some(Err(_)))
            && !matches!(self.inputs, Some(Err(_)))
    }

    /// Returns the output image as the device reports it, falling back to the
    /// commanded image when no read-back is available.
    pub fn observed_outputs(&self) -> OutputImage {
        match &self.readback {
            Some(Ok(image)) => *image,
            _ => self.outputs,
        }
    }

    /// Takes the first read error that is not a transport failure.
    fn into_fatal(self) -> Option<WagoError> {
        [self.readback.and_then(|r| r.err()), self.inputs.and_then(|r| r.err())]
            .into_iter()
            .flatten()
            .find(|e| !e.is_transport())
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Cycles executed, successful or not.
    pub cycles: u64,
    /// Cycles whose output write failed.
    pub write_failures: u64,
    /// Failed read-back exchanges.
    pub read_failures: u64,
    /// Whether the final safe-state write succeeded.
    pub safe_state_written: bool,
}

impl RunSummary {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.write.is_err() {
            self.write_failures += 1;
        }
        for read_failed in [
            matches!(report.readback, Some(Err(_))),
            matches!(report.inputs, Some(Err(_))),
        ] {
            if read_failed {
                self.read_failures += 1;
            }
        }
    }
}

/// Drives the scan cycle against one device.
#[derive(Debug)]
pub struct ScanController<T> {
    transactions: TransactionManager<T>,
    config: ControllerConfig,
    state: ControllerState,
    last_inputs: Option<InputImage>,
}

impl<T: DeviceTransport> ScanController<T> {
    /// Creates an idle controller owning `transport`.
    pub fn new(transport: T, config: ControllerConfig) -> Self {
        Self {
            transactions: TransactionManager::new(transport),
            config,
            state: ControllerState::Idle,
            last_inputs: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Returns the controller settings.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the most recent input image read during the run.
    pub fn last_inputs(&self) -> Option<&InputImage> {
        self.last_inputs.as_ref()
    }

    /// Returns the transaction manager for one-off requests.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::InvalidState` unless the controller is connected
    /// and not running.
    pub fn transactions(&mut self) -> Result<&mut TransactionManager<T>> {
        self.expect_state(ControllerState::Connected, "issue requests")?;
        Ok(&mut self.transactions)
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        self.transactions.transport()
    }

    /// Opens the device connection.
    ///
    /// # Errors
    ///
    /// Returns the transport's connect error and stays `Idle`, so the caller
    /// may retry. Returns `WagoError::InvalidState` if not `Idle`.
    pub fn connect(&mut self) -> Result<()> {
        self.expect_state(ControllerState::Idle, "connect")?;
        self.transactions.transport_mut().connect()?;
        self.transition(ControllerState::Connected);
        Ok(())
    }

    /// Runs the scan cycle until cancelled or the configured cycle limit is
    /// reached, then writes the safe state and closes the connection.
    ///
    /// `on_cycle` is called once per cycle with that cycle's report.
    ///
    /// # Errors
    ///
    /// Returns `WagoError::InvalidState` unless `Connected`. Returns a
    /// non-transport error (such as a malformed image) that ended the run
    /// early; the safe state is still written and the connection closed.
    pub fn run<G, F>(
        &mut self,
        mut generator: G,
        token: &CancellationToken,
        mut on_cycle: F,
    ) -> Result<RunSummary>
    where
        G: OutputGenerator,
        F: FnMut(&CycleReport),
    {
        self.expect_state(ControllerState::Connected, "run")?;
        self.transition(ControllerState::Running);

        let mut summary = RunSummary::default();
        let mut fatal = None;

        while !token.is_cancelled() && !self.limit_reached(summary.cycles) {
            let report = self.cycle(summary.cycles, &mut generator);
            summary.record(&report);
            on_cycle(&report);

            let cycle = report.cycle;
            if let Some(e) = report.into_fatal() {
                debug!("Scan loop aborted in cycle {}: {}", cycle, e);
                fatal = Some(e);
                break;
            }
            if self.limit_reached(summary.cycles) {
                break;
            }
            if token.wait_timeout(self.config.interval) {
                debug!("Cancellation observed after cycle {}", cycle);
                break;
            }
        }

        summary.safe_state_written = self.stop();
        info!(
            "Scan loop stopped after {} cycles (write failures: {}, read failures: {})",
            summary.cycles, summary.write_failures, summary.read_failures
        );

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Closes the connection without writing the safe state.
    ///
    /// Used when no scan loop has run. Closing a closed controller is a no-op.
    pub fn close(&mut self) {
        if self.state == ControllerState::Closed {
            return;
        }
        self.transactions.transport_mut().close();
        self.transition(ControllerState::Closed);
    }

    fn cycle<G: OutputGenerator>(&mut self, cycle: u64, generator: &mut G) -> CycleReport {
        let outputs = generator.next_outputs(cycle, self.last_inputs.as_ref());

        let write = self.transactions.write_outputs(&outputs);
        if let Err(e) = &write {
            warn!("Cycle {}: output write failed: {}", cycle, e);
        }

        let (readback, inputs) = if self.config.read_back {
            let readback = self.transactions.read_outputs();
            if let Err(e) = &readback {
                warn!("Cycle {}: output read-back failed: {}", cycle, e);
            }
            let inputs = self.transactions.read_inputs();
            match &inputs {
                Ok(image) => self.last_inputs = Some(*image),
                Err(e) => warn!("Cycle {}: input read failed: {}", cycle, e),
            }
            (Some(readback), Some(inputs))
        } else {
            (None, None)
        };

        CycleReport {
            cycle,
            outputs,
            write,
            readback,
            inputs,
        }
    }

    /// Writes the safe state and closes. Returns whether the write succeeded.
    fn stop(&mut self) -> bool {
        self.transition(ControllerState::Stopping);

        let written = match self.transactions.write_outputs(&OutputImage::safe()) {
            Ok(()) => {
                info!("Outputs reset to safe state");
                true
            }
            Err(e) => {
                error!("Safe-state write failed: {}", e);
                false
            }
        };

        self.close();
        written
    }

    fn limit_reached(&self, cycles: u64) -> bool {
        self.config.max_cycles.is_some_and(|max| cycles >= max)
    }

    fn expect_state(&self, expected: ControllerState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WagoError::InvalidState {
                state: self.state.to_string(),
                operation,
            })
        }
    }

    fn transition(&mut self, next: ControllerState) {
        info!("Controller {} -> {}", self.state, next);
        self.state = next;
    }
}
