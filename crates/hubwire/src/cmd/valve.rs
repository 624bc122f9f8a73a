use hubwire_hub::Hub;
use hubwire_proto::{DeviceId, ValveAction, ValveBitmask};

use crate::cmd::{parse_device_id, parse_duration, ValveArgs};
use crate::exit::{hub_error, outcome_code, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::{print_outcomes, OutputFormat};

pub fn run(args: ValveArgs, format: OutputFormat) -> CliResult<i32> {
    let device = DeviceId::from_raw(parse_device_id(&args.device)?);
    let action = if args.open {
        ValveAction::Open
    } else {
        ValveAction::Close
    };
    let mask = ValveBitmask::empty()
        .with_for(device, args.slot, action)
        .map_err(|err| CliError::new(USAGE, format!("{device}: {err}")))?;
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let config = args.link.hub_config(false)?;

    let hub = Hub::open(&args.link.serial_config()?, config)
        .map_err(|err| hub_error("open failed", err))?;
    let receipt = hub
        .actuate_valves(device, mask)
        .map_err(|err| hub_error("submit failed", err))?;
    let outcomes = receipt.wait(wait_timeout);
    hub.shutdown()
        .map_err(|err| hub_error("shutdown failed", err))?;

    let label = format!("valves {} slot {} {mask}", device.raw(), args.slot);
    print_outcomes(&label, outcomes.as_deref(), format);
    Ok(outcomes.map_or(TIMEOUT, |o| outcome_code(&o)))
}
