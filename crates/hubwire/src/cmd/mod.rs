use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use hubwire_hub::HubConfig;
use hubwire_transport::{SerialConfig, DEFAULT_BAUD_RATE};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod monitor;
pub mod send;
pub mod valve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the hub loops and stream activity until Ctrl-C.
    Monitor(MonitorArgs),
    /// Send one raw command and report its outcome.
    Send(SendArgs),
    /// Open or close one valve.
    Valve(ValveArgs),
    /// Explain a device id.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Valve(args) => valve::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial link and loop settings shared by every command that talks to a hub.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port (e.g. /dev/ttyUSB0, COM3).
    pub port: PathBuf,
    /// Baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// How long to wait for each response (e.g. 600ms, 1s).
    #[arg(long, default_value = "600ms")]
    pub response_timeout: String,
    /// How long a write may block on a full transmit buffer.
    #[arg(long, default_value = "1s")]
    pub write_timeout: String,
    /// Activity log entries to keep.
    #[arg(long, default_value_t = 20)]
    pub activity_capacity: usize,
}

impl LinkArgs {
    pub fn serial_config(&self) -> CliResult<SerialConfig> {
        Ok(SerialConfig {
            baud_rate: self.baud,
            write_timeout: parse_duration(&self.write_timeout)?,
            ..SerialConfig::new(&self.port)
        })
    }

    pub fn hub_config(&self, bootstrap: bool) -> CliResult<HubConfig> {
        Ok(HubConfig {
            response_timeout: parse_duration(&self.response_timeout)?,
            activity_capacity: self.activity_capacity,
            bootstrap,
            ..HubConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Stop after this long instead of waiting for Ctrl-C (e.g. 30s).
    #[arg(long)]
    pub duration: Option<String>,
    /// Skip the startup queries.
    #[arg(long)]
    pub no_bootstrap: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command code and body as hex, checksum excluded (e.g. "42 00 00 00 00").
    #[arg(long)]
    pub hex: String,
    /// How long to wait for the command to settle.
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["open", "close"])))]
pub struct ValveArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Device id, decimal or 0x-prefixed hex.
    #[arg(long)]
    pub device: String,
    /// Valve slot on the device, starting at 1.
    #[arg(long)]
    pub slot: u8,
    #[arg(long)]
    pub open: bool,
    #[arg(long)]
    pub close: bool,
    /// How long to wait for the transaction to settle.
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Device id, decimal or 0x-prefixed hex.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Accepts `1234` or `0x4D2`.
pub fn parse_device_id(input: &str) -> CliResult<u32> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::new(USAGE, format!("invalid device id: {input}")))
}
