/// Errors that can occur while building or decoding hub packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// The packet has no code byte.
    #[error("empty packet")]
    Empty,

    /// The code byte is not in the command table.
    #[error("unknown command code 0x{0:02X}")]
    UnknownCommand(u8),

    /// The code byte is not in the event table.
    #[error("unknown event code 0x{0:02X}")]
    UnknownEvent(u8),

    /// The body is shorter than the code's fixed layout.
    #[error("event 0x{code:02X} body truncated ({actual} bytes, expected {expected})")]
    Truncated {
        code: u8,
        expected: usize,
        actual: usize,
    },

    /// A command body does not match its code's fixed layout.
    #[error("command 0x{code:02X} takes a {expected}-byte body, got {actual}")]
    BodyLength {
        code: u8,
        expected: usize,
        actual: usize,
    },

    /// A valve slot outside the device's range.
    #[error("valve slot {slot} out of range (1..={max})")]
    InvalidSlot { slot: u8, max: u8 },
}

pub type Result<T> = std::result::Result<T, ProtoError>;
