use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Start, stop and a fully escaped vitals request fit without growing.
const WIRE_BUFFER_CAPACITY: usize = 64;

/// Frames packets onto a byte stream.
///
/// Each frame is written and flushed in one go; the last frame's wire
/// bytes stay around for tracing.
pub struct FrameWriter<T> {
    inner: T,
    wire: BytesMut,
    max_frame_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            wire: BytesMut::with_capacity(WIRE_BUFFER_CAPACITY),
            max_frame_size: config.max_frame_size,
        }
    }

    /// Frame and send a packet that already carries its checksum trailer.
    pub fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.max_frame_size {
            return Err(FrameError::PayloadTooLarge {
                size: packet.len(),
                max: self.max_frame_size,
            });
        }

        self.wire.clear();
        encode_frame(packet, &mut self.wire);
        self.inner.write_all(&self.wire).map_err(closed_or_io)?;
        self.inner.flush().map_err(closed_or_io)
    }

    /// Send an empty frame (`83 87`).
    ///
    /// The hub discards any partial frame it was holding when it sees one.
    pub fn send_reset(&mut self) -> Result<()> {
        self.send_packet(&[])
    }

    /// Wire bytes of the most recently sent frame.
    pub fn last_wire(&self) -> &[u8] {
        &self.wire
    }

    #[cfg(test)]
    fn sink(&self) -> &T {
        &self.inner
    }
}

fn closed_or_io(err: std::io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero | ErrorKind::BrokenPipe => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
