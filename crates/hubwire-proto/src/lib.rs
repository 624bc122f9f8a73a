//! Hub protocol vocabulary.
//!
//! Knows what the bytes inside a frame mean: command and event codes, the
//! fixed little-endian body layouts, how a response is matched to the
//! command that caused it, and how 32-bit device identifiers map onto the
//! three device families.

pub mod address;
pub mod codes;
pub mod commands;
pub mod error;
pub mod events;
pub mod validate;
pub mod valves;

pub use address::{DeviceId, Family, MeshVariant, Siblings};
pub use codes::{classify, CommandCode, EventClass, EventCode};
pub use commands::{bootstrap_sequence, valve_transaction, Command};
pub use error::{ProtoError, Result};
pub use events::{ChannelInfo, Event, Versions, Vitals};
pub use validate::{expectation, validate, Expectation, Verdict};
pub use valves::{ValveAction, ValveBitmask, MAX_VALVE_SLOTS};
