//! # wago-io
//!
//! Command-line client for a WAGO 750 style I/O rack.
//!
//! # Usage
//!
//! ```bash
//! # Print the current I/O status once
//! wago-io --host 192.168.1.10
//!
//! # Exercise outputs and the watchdog, then print the status again
//! wago-io --host 192.168.1.10 --demo
//!
//! # Cycle outputs until Ctrl-C, then reset them to the safe state
//! wago-io --host 192.168.1.10 --loop --interval 0.2
//!
//! # Verbose JSON logs on stderr
//! wago-io --loop --cycles 50 -v --json
//! ```

use std::error::Error;
use std::net::{SocketAddr, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use wago_io::utils::format_flags;
use wago_io::{
    render_compact, render_status, CancellationToken, ClientConfig, ControllerConfig,
    DemoPattern, ModbusTcpClient, ScanController, StatusSnapshot, TransactionManager, WagoError,
    DEFAULT_MODBUS_PORT, DEFAULT_UNIT_ID,
};

/// Modbus TCP client for a WAGO 750 I/O rack
#[derive(Parser, Debug)]
#[command(name = "wago-io")]
#[command(version)]
#[command(about = "Modbus TCP client for a WAGO 750 style I/O rack")]
#[command(long_about = None)]
struct Args {
    /// Device host name or IP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Device Modbus TCP port
    #[arg(long, default_value_t = DEFAULT_MODBUS_PORT)]
    port: u16,

    /// Run the one-shot output and watchdog demo
    #[arg(long, conflicts_with = "run_loop")]
    demo: bool,

    /// Cycle outputs continuously until Ctrl-C
    #[arg(long = "loop")]
    run_loop: bool,

    /// Pause between loop cycles, in seconds
    #[arg(long, default_value_t = 0.5, value_name = "SECONDS")]
    interval: f64,

    /// Stop the loop after this many cycles
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Connect and per-request timeout, in milliseconds
    #[arg(long, default_value_t = 5000, value_name = "MS")]
    timeout: u64,

    /// Modbus unit identifier
    #[arg(long, default_value_t = DEFAULT_UNIT_ID)]
    unit_id: u8,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Fails only before the connection is up. Once connected, errors are
/// reported where they occur and the process still exits 0.
fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    let interval = Duration::try_from_secs_f64(args.interval)
        .map_err(|_| WagoError::invalid_parameter("interval", "must be a non-negative number of seconds"))?;

    let addr = resolve(&args.host, args.port)?;
    let client_config = ClientConfig::from_addr(addr)
        .with_timeout(Duration::from_millis(args.timeout))
        .with_unit_id(args.unit_id);

    let mut controller_config = ControllerConfig::default().with_interval(interval);
    if let Some(cycles) = args.cycles {
        controller_config = controller_config.with_max_cycles(cycles);
    }

    println!("Connecting to {}:{}...", args.host, args.port);
    let mut controller = ScanController::new(ModbusTcpClient::new(client_config), controller_config);
    controller.connect()?;
    println!("Connected!");

    let outcome: Result<(), Box<dyn Error>> = if args.run_loop {
        run_loop(&mut controller, interval)
    } else {
        controller.transactions().map_err(Into::into).map(|io| {
            if args.demo {
                run_demo(io)
            } else {
                print_status(io)
            }
        })
    };
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
    }

    controller.close();
    println!("\nDisconnected.");
    Ok(())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::WARN };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, WagoError> {
    let target = format!("{}:{}", host, port);
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| WagoError::connection(target.clone(), e))?;
    addrs.next().ok_or_else(|| {
        WagoError::connection(
            target,
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses"),
        )
    })
}

fn print_status(transactions: &mut TransactionManager<ModbusTcpClient>) {
    println!("{}", render_status(&StatusSnapshot::collect(transactions)));
}

fn on_off(flags: &[bool]) -> Vec<&'static str> {
    flags.iter().map(|&on| if on { "ON" } else { "OFF" }).collect()
}

/// Prints a failed demo step and hands back the value of a successful one.
fn step<T>(what: &str, result: wago_io::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            println!("  {} failed: {}", what, e);
            None
        }
    }
}

fn run_demo(io: &mut TransactionManager<ModbusTcpClient>) {
    print_status(io);

    println!("\nDemo: Writing to Digital Outputs...");
    let pattern = [true, false, true, false, true, false, true, false];
    println!("  Writing pattern: {:?}", on_off(&pattern));
    step("Coil write", io.write_coils(&pattern));
    thread::sleep(Duration::from_millis(500));
    if let Some(coils) = step("Coil read", io.read_coils()) {
        println!("  Read back:       {:?}", on_off(&coils));
    }

    println!("\nDemo: Writing to Analog Outputs...");
    println!("  Setting AO.0 to 50% (12mA), AO.1 to 75% (16mA)...");
    // The discrete word rides along, so only write on top of a fresh read.
    if let Some(mut outputs) = step("Output read", io.read_outputs()) {
        outputs.analog = [
            wago_io::units::percent_to_raw(50.0),
            wago_io::units::percent_to_raw(75.0),
        ];
        step("Output write", io.write_outputs(&outputs));
    }
    thread::sleep(Duration::from_millis(300));
    if let Some(outputs) = step("Output read", io.read_outputs()) {
        println!(
            "  Read back: AO.0={:.1}%, AO.1={:.1}%  DO={}",
            outputs.analog_percent(0).unwrap_or_default(),
            outputs.analog_percent(1).unwrap_or_default(),
            format_flags(outputs.fitted_discrete())
        );
    }

    println!("\nDemo: Configuring Watchdog...");
    println!("  Setting watchdog to 5000ms...");
    step("Watchdog write", io.write_watchdog(5000));
    if let Some(timeout) = step("Watchdog read", io.read_watchdog()) {
        println!("  Watchdog is now: {} ms", timeout);
    }
    println!("  Disabling watchdog (set to 0)...");
    step("Watchdog write", io.write_watchdog(0));

    print_status(io);
}

fn run_loop(
    controller: &mut ScanController<ModbusTcpClient>,
    interval: Duration,
) -> Result<(), Box<dyn Error>> {
    print_status(controller.transactions()?);

    let rule = "=".repeat(70);
    println!("\n{}", rule);
    println!("Continuous Output Cycling Mode");
    println!("{}", rule);
    println!("Interval: {}s  |  Press Ctrl+C to stop", interval.as_secs_f64());
    println!("{}", "-".repeat(70));

    let token = CancellationToken::new();
    let signal = token.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal.cancel();
    })?;

    let summary = controller.run(DemoPattern::default(), &token, |report| {
        println!("{}", render_compact(report.cycle, &report.observed_outputs()));
    })?;

    println!("\nStopping...");
    if summary.safe_state_written {
        println!("Outputs reset to safe state.");
    }
    println!(
        "Ran {} cycles ({} write failures, {} read failures).",
        summary.cycles, summary.write_failures, summary.read_failures
    );
    Ok(())
}
