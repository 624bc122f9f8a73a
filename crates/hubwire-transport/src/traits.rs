use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::Result;

/// Serial drivers take a concrete timeout; `None` maps to this.
const BLOCKING_SERIAL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Reports how many bytes can be read without blocking.
///
/// The event loop uses this to drain whatever the driver has already
/// buffered after a blocking read returns.
pub trait Pending {
    /// Number of bytes already buffered by the transport.
    fn bytes_pending(&self) -> std::io::Result<usize>;
}

impl<T: AsRef<[u8]>> Pending for std::io::Cursor<T> {
    fn bytes_pending(&self) -> std::io::Result<usize> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()) as usize)
    }
}

/// A connected hub link; implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by transport operations.
/// Production code wraps a serial port; simulations and tests use a
/// Unix socket pair.
pub struct HubStream {
    inner: HubStreamInner,
}

enum HubStreamInner {
    Serial(Box<dyn SerialPort>),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for HubStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            HubStreamInner::Serial(port) => port.read(buf),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for HubStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            HubStreamInner::Serial(port) => port.write(buf),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            HubStreamInner::Serial(port) => port.flush(),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Pending for HubStream {
    fn bytes_pending(&self) -> std::io::Result<usize> {
        match &self.inner {
            HubStreamInner::Serial(port) => port
                .bytes_to_read()
                .map(|n| n as usize)
                .map_err(std::io::Error::from),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => unix_bytes_pending(stream),
        }
    }
}

impl HubStream {
    /// Wrap an opened serial port.
    pub(crate) fn from_serial(port: Box<dyn SerialPort>) -> Self {
        Self {
            inner: HubStreamInner::Serial(port),
        }
    }

    /// Create a connected pair of in-process streams.
    ///
    /// One end plays the host, the other plays the hub. Used by the
    /// loopback simulator and by tests.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((
            Self {
                inner: HubStreamInner::Unix(left),
            },
            Self {
                inner: HubStreamInner::Unix(right),
            },
        ))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// A timed-out read surfaces as `TimedOut` (serial) or `WouldBlock`
    /// (socket); readers treat both as "no data yet".
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            HubStreamInner::Serial(port) => port
                .set_timeout(timeout.unwrap_or(BLOCKING_SERIAL_TIMEOUT))
                .map_err(Into::into),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new handle to the same link).
    ///
    /// The hub splits one link into a read half and a write half this way.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            HubStreamInner::Serial(port) => Ok(Self::from_serial(port.try_clone()?)),
            #[cfg(unix)]
            HubStreamInner::Unix(stream) => {
                let cloned = stream.try_clone()?;
                Ok(Self {
                    inner: HubStreamInner::Unix(cloned),
                })
            }
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            HubStreamInner::Serial(_) => "serial",
            #[cfg(unix)]
            HubStreamInner::Unix(_) => "unix-socket-pair",
        }
    }
}

#[cfg(unix)]
fn unix_bytes_pending(stream: &std::os::unix::net::UnixStream) -> std::io::Result<usize> {
    use std::os::fd::AsRawFd;

    let mut available: libc::c_int = 0;
    // SAFETY: `available` is a valid writable c_int and the descriptor is an
    // open socket owned by `stream` for the duration of the call.
    let rc = unsafe { libc::ioctl(stream.as_raw_fd(), libc::FIONREAD, &mut available) };
    if rc == 0 {
        Ok(available.max(0) as usize)
    } else {
        Err(std::io::Error::last_os_error())
    }
}

impl std::fmt::Debug for HubStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            HubStreamInner::Serial(port) => f
                .debug_struct("HubStream")
                .field("type", &"serial")
                .field("name", &port.name())
                .finish(),
            #[cfg(unix)]
            HubStreamInner::Unix(_) => f.debug_struct("HubStream").field("type", &"unix").finish(),
        }
    }
}
