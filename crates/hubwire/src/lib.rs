//! Host-side driver for field hubs on a framed serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port and loopback byte streams
//! - [`frame`]: byte-stuffed framing and the seeded Fletcher checksum
//! - [`proto`]: command/event tables, payload layouts, device addressing
//! - [`hub`]: the command and event loops (behind the `hub` feature)

/// Re-export transport types.
pub mod transport {
    pub use hubwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hubwire_frame::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use hubwire_proto::*;
}

/// Re-export hub runtime types (requires `hub` feature).
#[cfg(feature = "hub")]
pub mod hub {
    pub use hubwire_hub::*;
}
