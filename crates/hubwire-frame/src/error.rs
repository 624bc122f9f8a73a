/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The deframed packet is too short to hold a code and a checksum.
    #[error("short frame ({len} bytes)")]
    ShortFrame { len: usize },

    /// The trailing checksum does not match the one computed over the body.
    #[error("checksum mismatch (received {received:02X?}, computed {computed:02X?})")]
    ChecksumMismatch { received: [u8; 2], computed: [u8; 2] },

    /// Input ended right after an escape byte.
    #[error("frame ends inside an escape sequence")]
    DanglingEscape,

    /// The frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
