use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use hubwire_frame::{append_checksum, Hex};

use crate::address::DeviceId;
use crate::codes::CommandCode;
use crate::error::{ProtoError, Result};
use crate::valves::ValveBitmask;

/// A host-to-hub command: code byte plus fixed-layout body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: CommandCode,
    body: Bytes,
}

impl Command {
    /// Build a command, checking the body against the code's layout.
    pub fn new(code: CommandCode, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        if body.len() != code.body_len() {
            return Err(ProtoError::BodyLength {
                code: code as u8,
                expected: code.body_len(),
                actual: body.len(),
            });
        }
        Ok(Self { code, body })
    }

    fn bare(code: CommandCode) -> Self {
        Self {
            code,
            body: Bytes::new(),
        }
    }

    fn with_device(code: CommandCode, device: u32) -> Self {
        Self {
            code,
            body: Bytes::copy_from_slice(&device.to_le_bytes()),
        }
    }

    pub fn versions_get() -> Self {
        Self::bare(CommandCode::VersionsGet)
    }

    pub fn valves_begin() -> Self {
        Self::bare(CommandCode::ValvesBegin)
    }

    pub fn net_id_get() -> Self {
        Self::bare(CommandCode::NetIdGet)
    }

    pub fn valves_commit() -> Self {
        Self::bare(CommandCode::ValvesCommit)
    }

    pub fn pairing_pattern_generate() -> Self {
        Self::bare(CommandCode::PairingPatternGenerate)
    }

    pub fn pairing_pattern_get() -> Self {
        Self::bare(CommandCode::PairingPatternGet)
    }

    /// Select a radio channel; 0 leaves the choice to the hub.
    pub fn channel(channel: u8) -> Self {
        Self {
            code: CommandCode::Channel,
            body: Bytes::copy_from_slice(&[channel]),
        }
    }

    /// Link check; the hub answers with every bit inverted.
    pub fn test(pattern: [u8; 4]) -> Self {
        Self {
            code: CommandCode::Test,
            body: Bytes::copy_from_slice(&pattern),
        }
    }

    /// Ask for vitals from one device, or from all of them with 0.
    pub fn vitals_get(device: u32) -> Self {
        Self::with_device(CommandCode::VitalsGet, device)
    }

    pub fn forget(device: u32) -> Self {
        Self::with_device(CommandCode::Forget, device)
    }

    pub fn valves_put(device: impl Into<DeviceId>, mask: ValveBitmask) -> Self {
        let mut body = BytesMut::with_capacity(5);
        body.put_u32_le(device.into().raw());
        body.put_u8(mask.bits());
        Self {
            code: CommandCode::ValvesPut,
            body: body.freeze(),
        }
    }

    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Code byte, body, and checksum trailer: ready for framing.
    pub fn to_packet(&self) -> Bytes {
        let mut raw = BytesMut::with_capacity(1 + self.body.len());
        raw.put_u8(self.code as u8);
        raw.put_slice(&self.body);
        append_checksum(&raw)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.code.name())
        } else {
            write!(f, "{} [{}]", self.code.name(), Hex(&self.body))
        }
    }
}

/// Queries sent once at startup, in order.
pub fn bootstrap_sequence() -> [Command; 5] {
    [
        Command::net_id_get(),
        Command::channel(0),
        Command::versions_get(),
        Command::pairing_pattern_get(),
        Command::vitals_get(0),
    ]
}

/// Begin, put, commit: the three commands that actuate valves.
pub fn valve_transaction(device: impl Into<DeviceId>, mask: ValveBitmask) -> [Command; 3] {
    [
        Command::valves_begin(),
        Command::valves_put(device, mask),
        Command::valves_commit(),
    ]
}
