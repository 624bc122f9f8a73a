//! Byte transport to a field hub.
//!
//! Provides a unified stream over the mechanisms a hub can be reached by:
//! - A serial port (the production link, 8N1)
//! - A local socket pair (loopback simulation and tests, Unix only)
//!
//! This is the lowest layer of hubwire. Everything else builds on top of
//! the [`HubStream`] type provided here.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{open, SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_WRITE_TIMEOUT};
pub use traits::{HubStream, Pending};
