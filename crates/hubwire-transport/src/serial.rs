use std::path::PathBuf;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::HubStream;

/// Line rate the hub firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How long a write may wait for room in the driver's TX buffer.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// serialport treats a zero timeout as "poll once".
const MIN_PORT_TIMEOUT: Duration = Duration::from_millis(1);

/// Serial link configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub path: PathBuf,
    /// Line rate in baud. Default: 115200.
    pub baud_rate: u32,
    /// Port timeout set at open. It bounds writes on the returned stream;
    /// a read half made with `try_clone` sets its own read timeout.
    pub write_timeout: Duration,
}

impl SerialConfig {
    /// Configuration for `path` with the hub's default line settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    fn port_timeout(&self) -> Duration {
        self.write_timeout.max(MIN_PORT_TIMEOUT)
    }
}

/// Open the serial port described by `config` (8 data bits, no parity,
/// one stop bit, no flow control).
///
/// The link is opened once per process; a failure here is fatal to the
/// caller and is not retried.
pub fn open(config: &SerialConfig) -> Result<HubStream> {
    let path = config.path.to_string_lossy().into_owned();
    debug!(path = %path, baud = config.baud_rate, "opening serial port");

    let port = serialport::new(path.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.port_timeout())
        .open().map_err(|source| TransportError::Open {
        path: config.path.clone(),
        source,
    })?;

    info!(path = %path, baud = config.baud_rate, "serial port open");
    Ok(HubStream::from_serial(port))
}
