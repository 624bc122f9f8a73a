//! Command and event code tables.
//!
//! Codes are grouped by body size: the high nibble of most codes is the
//! body length in bytes.

use serde::Serialize;

use crate::error::ProtoError;

/// Commands the host can send to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CommandCode {
    VersionsGet = 0x01,
    ValvesBegin = 0x02,
    NetIdGet = 0x03,
    ValvesCommit = 0x04,
    PairingPatternGenerate = 0x06,
    PairingPatternGet = 0x07,
    /// Body: channel, 0 selects automatically.
    Channel = 0x11,
    /// Body: 4 bytes the hub echoes back inverted.
    Test = 0x41,
    /// Body: device id, 0 for every device.
    VitalsGet = 0x42,
    /// Body: device id.
    Forget = 0x43,
    /// Body: device id, packed valve actions.
    ValvesPut = 0x51,
}

impl CommandCode {
    pub const ALL: [CommandCode; 11] = [
        CommandCode::VersionsGet,
        CommandCode::ValvesBegin,
        CommandCode::NetIdGet,
        CommandCode::ValvesCommit,
        CommandCode::PairingPatternGenerate,
        CommandCode::PairingPatternGet,
        CommandCode::Channel,
        CommandCode::Test,
        CommandCode::VitalsGet,
        CommandCode::Forget,
        CommandCode::ValvesPut,
    ];

    /// Look up a command by wire value.
    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u8 == code)
    }

    /// Fixed body length following the code byte.
    pub fn body_len(self) -> usize {
        match self {
            CommandCode::VersionsGet
            | CommandCode::ValvesBegin
            | CommandCode::NetIdGet
            | CommandCode::ValvesCommit
            | CommandCode::PairingPatternGenerate
            | CommandCode::PairingPatternGet => 0,
            CommandCode::Channel => 1,
            CommandCode::Test | CommandCode::VitalsGet | CommandCode::Forget => 4,
            CommandCode::ValvesPut => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandCode::VersionsGet => "versions_get",
            CommandCode::ValvesBegin => "valves_begin",
            CommandCode::NetIdGet => "net_id_get",
            CommandCode::ValvesCommit => "valves_commit",
            CommandCode::PairingPatternGenerate => "pairing_pattern_generate",
            CommandCode::PairingPatternGet => "pairing_pattern_get",
            CommandCode::Channel => "channel",
            CommandCode::Test => "test",
            CommandCode::VitalsGet => "vitals_get",
            CommandCode::Forget => "forget",
            CommandCode::ValvesPut => "valves_put",
        }
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = ProtoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(ProtoError::UnknownCommand(code))
    }
}

/// Events the hub emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum EventCode {
    CycleStartImminent = 0x01,
    AllVitalsReported = 0x02,
    CommandErrorNotFound = 0x12,
    CommandErrorIllegal = 0x13,
    CommandSuccess = 0x14,
    CommandErrorSize = 0x22,
    PairingPattern = 0x23,
    Channel = 0x31,
    Test = 0x41,
    NetId = 0x42,
    CommandErrorChecksum = 0x51,
    Valves = 0x52,
    SubnetInfo = 0x81,
    Versions = 0xA1,
    Vitals = 0xB1,
}

/// How the command loop treats an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// Emitted on the hub's own schedule; never a response.
    Asynchronous,
    /// A response to the command in flight.
    Response,
    /// The exchange was garbled in transit; the command may be resent.
    TransmissionError,
    /// The hub understood the command and rejected it.
    ProtocolError,
}

impl EventClass {
    /// True for every class that answers a command.
    pub fn is_solicited(self) -> bool {
        !matches!(self, EventClass::Asynchronous)
    }
}

impl EventCode {
    pub const ALL: [EventCode; 15] = [
        EventCode::CycleStartImminent,
        EventCode::AllVitalsReported,
        EventCode::CommandErrorNotFound,
        EventCode::CommandErrorIllegal,
        EventCode::CommandSuccess,
        EventCode::CommandErrorSize,
        EventCode::PairingPattern,
        EventCode::Channel,
        EventCode::Test,
        EventCode::NetId,
        EventCode::CommandErrorChecksum,
        EventCode::Valves,
        EventCode::SubnetInfo,
        EventCode::Versions,
        EventCode::Vitals,
    ];

    /// Look up an event by wire value.
    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u8 == code)
    }

    /// Fixed body length following the code byte.
    pub fn body_len(self) -> usize {
        match self {
            EventCode::CycleStartImminent | EventCode::AllVitalsReported => 0,
            EventCode::CommandErrorNotFound
            | EventCode::CommandErrorIllegal
            | EventCode::CommandSuccess => 1,
            EventCode::CommandErrorSize | EventCode::PairingPattern => 2,
            EventCode::Channel => 3,
            EventCode::Test | EventCode::NetId => 4,
            EventCode::CommandErrorChecksum | EventCode::Valves => 5,
            EventCode::SubnetInfo => 8,
            EventCode::Versions => 10,
            EventCode::Vitals => 11,
        }
    }

    pub fn class(self) -> EventClass {
        match self {
            EventCode::CycleStartImminent
            | EventCode::AllVitalsReported
            | EventCode::SubnetInfo
            | EventCode::Vitals => EventClass::Asynchronous,
            // Illegal means the parameters were wrong, not the bytes.
            EventCode::CommandErrorIllegal => EventClass::ProtocolError,
            EventCode::CommandErrorNotFound
            | EventCode::CommandErrorSize
            | EventCode::CommandErrorChecksum => EventClass::TransmissionError,
            EventCode::CommandSuccess
            | EventCode::PairingPattern
            | EventCode::Channel
            | EventCode::Test
            | EventCode::NetId
            | EventCode::Valves
            | EventCode::Versions => EventClass::Response,
        }
    }

    pub fn is_transmission_error(self) -> bool {
        self.class() == EventClass::TransmissionError
    }

    pub fn is_solicited(self) -> bool {
        self.class().is_solicited()
    }

    pub fn name(self) -> &'static str {
        match self {
            EventCode::CycleStartImminent => "cycle_start_imminent",
            EventCode::AllVitalsReported => "all_vitals_reported",
            EventCode::CommandErrorNotFound => "command_error_not_found",
            EventCode::CommandErrorIllegal => "command_error_illegal",
            EventCode::CommandSuccess => "command_success",
            EventCode::CommandErrorSize => "command_error_size",
            EventCode::PairingPattern => "pairing_pattern",
            EventCode::Channel => "channel",
            EventCode::Test => "test",
            EventCode::NetId => "net_id",
            EventCode::CommandErrorChecksum => "command_error_checksum",
            EventCode::Valves => "valves",
            EventCode::SubnetInfo => "subnet_info",
            EventCode::Versions => "versions",
            EventCode::Vitals => "vitals",
        }
    }
}

impl TryFrom<u8> for EventCode {
    type Error = ProtoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(ProtoError::UnknownEvent(code))
    }
}

/// Classify a raw event code.
///
/// Codes outside the table are treated as responses: only the known
/// asynchronous notices are kept away from the command loop.
pub fn classify(code: u8) -> EventClass {
    EventCode::from_u8(code).map_or(EventClass::Response, EventCode::class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_roundtrip_through_u8() {
        for code in CommandCode::ALL {
            assert_eq!(CommandCode::try_from(code as u8), Ok(code));
        }
        assert_eq!(
            CommandCode::try_from(0x05),
            Err(ProtoError::UnknownCommand(0x05))
        );
    }

    #[test]
    fn event_codes_roundtrip_through_u8() {
        for code in EventCode::ALL {
            assert_eq!(EventCode::from_u8(code as u8), Some(code));
        }
        assert!(EventCode::from_u8(0xFF).is_none());
    }

    #[test]
    fn body_len_follows_high_nibble_for_short_codes() {
        for code in EventCode::ALL {
            let nibble = (code as u8 >> 4) as usize;
            if nibble <= 5 {
                assert_eq!(code.body_len(), nibble, "{}", code.name());
            }
        }
        assert_eq!(CommandCode::ValvesPut.body_len(), 5);
        assert_eq!(CommandCode::Channel.body_len(), 1);
    }

    #[test]
    fn asynchronous_codes() {
        let asynchronous: Vec<_> = EventCode::ALL
            .into_iter()
            .filter(|c| !c.is_solicited())
            .collect();
        assert_eq!(
            asynchronous,
            vec![
                EventCode::CycleStartImminent,
                EventCode::AllVitalsReported,
                EventCode::SubnetInfo,
                EventCode::Vitals,
            ]
        );
    }

    #[test]
    fn illegal_is_not_a_transmission_error() {
        assert!(EventCode::CommandErrorChecksum.is_transmission_error());
        assert!(EventCode::CommandErrorSize.is_transmission_error());
        assert!(EventCode::CommandErrorNotFound.is_transmission_error());
        assert!(!EventCode::CommandErrorIllegal.is_transmission_error());
        assert_eq!(
            EventCode::CommandErrorIllegal.class(),
            EventClass::ProtocolError
        );
    }

    #[test]
    fn unknown_codes_classify_as_responses() {
        assert_eq!(classify(0x99), EventClass::Response);
        assert_eq!(classify(0xB1), EventClass::Asynchronous);
    }
}
