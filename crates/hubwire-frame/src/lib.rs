//! Byte-stuffed framing and checksums for the hub serial link.
//!
//! Every packet on the wire is:
//! - A Start byte (0x83)
//! - The packet bytes, with reserved values escaped as `0x88, byte ^ 0xFF`
//! - A Stop byte (0x87)
//!
//! A packet is a one-byte code, a fixed-layout body, and a two-byte seeded
//! Fletcher checksum over code and body.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod hex;
pub mod reader;
pub mod writer;

pub use checksum::{append_checksum, fletcher16, verify, CHECKSUM_LEN, CHECKSUM_SEED, MIN_PACKET_LEN};
#[cfg(feature = "async")]
pub use codec::HubCodec;
pub use codec::{
    encode_frame, escape_into, is_reserved, unescape, Deframer, FrameConfig, DEFAULT_MAX_FRAME,
    ESCAPE, START, STOP,
};
pub use error::{FrameError, Result};
pub use hex::Hex;
pub use reader::{FrameReader, ReadBatch};
pub use writer::FrameWriter;
