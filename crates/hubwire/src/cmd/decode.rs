use hubwire_proto::DeviceId;

use crate::cmd::{parse_device_id, DecodeArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_device, DeviceReport, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let id = DeviceId::from_raw(parse_device_id(&args.id)?);
    print_device(&DeviceReport::new(id), format);
    Ok(SUCCESS)
}
