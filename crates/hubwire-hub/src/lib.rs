//! Runtime for a single field hub.
//!
//! Two worker threads share the link: the command loop owns the write
//! half and sends one command at a time, the event loop owns the read half
//! and hands solicited responses back over a channel. Everything else a
//! caller can see (activity log, observed devices, hub status) is a shared
//! snapshot.

pub mod activity;
pub mod command_loop;
pub mod config;
pub mod devices;
pub mod error;
pub mod event_loop;
pub mod hub;
pub mod status;

pub use activity::{ActivityEntry, ActivityLog};
pub use command_loop::{CommandLoop, Outbound, Outcome};
pub use config::HubConfig;
pub use devices::ObservedDevices;
pub use error::{HubError, Result};
pub use event_loop::EventLoop;
pub use hub::{Commander, Hub, Receipt};
pub use status::{HubStatus, SharedStatus};
