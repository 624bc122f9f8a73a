use hubwire_hub::Hub;
use hubwire_proto::CommandCode;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{hub_error, outcome_code, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::{print_outcomes, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = parse_hex(&args.hex)?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let config = args.link.hub_config(false)?;

    let hub = Hub::open(&args.link.serial_config()?, config)
        .map_err(|err| hub_error("open failed", err))?;
    let receipt = hub
        .submit_raw(&raw)
        .map_err(|err| hub_error("submit failed", err))?;
    let outcomes = receipt.wait(wait_timeout);
    hub.shutdown()
        .map_err(|err| hub_error("shutdown failed", err))?;

    let label = command_label(raw[0]);
    print_outcomes(&label, outcomes.as_deref(), format);
    Ok(outcomes.map_or(TIMEOUT, |o| outcome_code(&o)))
}

/// Hex bytes, whitespace ignored. Must contain at least the code byte.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.split_whitespace().collect();
    let raw = hex::decode(&compact)
        .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))?;
    if raw.is_empty() {
        return Err(CliError::new(USAGE, "--hex must include a command code"));
    }
    Ok(raw)
}

fn command_label(code: u8) -> String {
    CommandCode::from_u8(code)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| format!("0x{code:02X}"))
}
