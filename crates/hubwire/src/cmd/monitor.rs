use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hubwire_hub::Hub;

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{hub_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_activity, print_summary, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = args.duration.as_deref().map(parse_duration).transpose()?;
    let config = args.link.hub_config(!args.no_bootstrap)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let hub = Hub::open(&args.link.serial_config()?, config)
        .map_err(|err| hub_error("open failed", err))?;

    let started = Instant::now();
    let mut next_seq = 0u64;
    while running.load(Ordering::SeqCst) {
        for entry in hub.activity().since(next_seq) {
            next_seq = entry.seq + 1;
            print_activity(&entry, format);
        }
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let status = hub.status();
    let devices = hub.observed_devices().snapshot();
    hub.shutdown()
        .map_err(|err| hub_error("shutdown failed", err))?;
    print_summary(&status, &devices, format);

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
