use std::fmt;

use bytes::Buf;
use hubwire_frame::Hex;
use serde::Serialize;

use crate::address::DeviceId;
use crate::codes::EventCode;
use crate::error::{ProtoError, Result};

/// Periodic status report from a field device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vitals {
    pub device: DeviceId,
    /// Raw supply reading; units depend on hub firmware.
    pub power: u16,
    pub rssi: u8,
    /// Valve position bitmask.
    pub valves: u16,
    pub extra: u16,
}

/// Hub firmware identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Versions {
    pub protocol: u8,
    pub network: u8,
    /// Build identifier, NUL padding removed.
    pub build: String,
}

/// Radio channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub current: u8,
    pub min: u8,
    pub max: u8,
}

/// A decoded hub event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    CycleStartImminent,
    AllVitalsReported,
    CommandErrorNotFound { command: u8 },
    CommandErrorIllegal { command: u8 },
    CommandSuccess { command: u8 },
    CommandErrorSize { command: u8, received_len: u8 },
    PairingPattern(u16),
    Channel(ChannelInfo),
    Test([u8; 4]),
    NetId(DeviceId),
    CommandErrorChecksum {
        command: u8,
        received: [u8; 2],
        computed: [u8; 2],
    },
    Valves { device: DeviceId, positions: u8 },
    SubnetInfo { device: DeviceId, subnet: u32 },
    Versions(Versions),
    Vitals(Vitals),
}

impl Event {
    /// Decode a verified packet (code byte + body, checksum already removed).
    ///
    /// Bytes past the code's fixed layout are ignored.
    pub fn parse(packet: &[u8]) -> Result<Self> {
        let (&code_byte, mut body) = packet.split_first().ok_or(ProtoError::Empty)?;
        let code = EventCode::try_from(code_byte)?;
        let expected = code.body_len();
        if body.len() < expected {
            return Err(ProtoError::Truncated {
                code: code_byte,
                expected,
                actual: body.len(),
            });
        }

        let event = match code {
            EventCode::CycleStartImminent => Event::CycleStartImminent,
            EventCode::AllVitalsReported => Event::AllVitalsReported,
            EventCode::CommandErrorNotFound => Event::CommandErrorNotFound {
                command: body.get_u8(),
            },
            EventCode::CommandErrorIllegal => Event::CommandErrorIllegal {
                command: body.get_u8(),
            },
            EventCode::CommandSuccess => Event::CommandSuccess {
                command: body.get_u8(),
            },
            EventCode::CommandErrorSize => Event::CommandErrorSize {
                command: body.get_u8(),
                received_len: body.get_u8(),
            },
            EventCode::PairingPattern => Event::PairingPattern(body.get_u16_le()),
            EventCode::Channel => Event::Channel(ChannelInfo {
                current: body.get_u8(),
                min: body.get_u8(),
                max: body.get_u8(),
            }),
            EventCode::Test => {
                let mut echo = [0u8; 4];
                body.copy_to_slice(&mut echo);
                Event::Test(echo)
            }
            EventCode::NetId => Event::NetId(DeviceId::from_raw(body.get_u32_le())),
            EventCode::CommandErrorChecksum => {
                let command = body.get_u8();
                let mut received = [0u8; 2];
                let mut computed = [0u8; 2];
                body.copy_to_slice(&mut received);
                body.copy_to_slice(&mut computed);
                Event::CommandErrorChecksum {
                    command,
                    received,
                    computed,
                }
            }
            EventCode::Valves => Event::Valves {
                device: DeviceId::from_raw(body.get_u32_le()),
                positions: body.get_u8(),
            },
            EventCode::SubnetInfo => Event::SubnetInfo {
                device: DeviceId::from_raw(body.get_u32_le()),
                subnet: body.get_u32_le(),
            },
            EventCode::Versions => {
                let protocol = body.get_u8();
                let network = body.get_u8();
                let build = String::from_utf8_lossy(&body[..8])
                    .trim_matches('\0')
                    .to_string();
                Event::Versions(Versions {
                    protocol,
                    network,
                    build,
                })
            }
            EventCode::Vitals => Event::Vitals(Vitals {
                device: DeviceId::from_raw(body.get_u32_le()),
                power: body.get_u16_le(),
                rssi: body.get_u8(),
                valves: body.get_u16_le(),
                extra: body.get_u16_le(),
            }),
        };
        Ok(event)
    }

    pub fn code(&self) -> EventCode {
        match self {
            Event::CycleStartImminent => EventCode::CycleStartImminent,
            Event::AllVitalsReported => EventCode::AllVitalsReported,
            Event::CommandErrorNotFound { .. } => EventCode::CommandErrorNotFound,
            Event::CommandErrorIllegal { .. } => EventCode::CommandErrorIllegal,
            Event::CommandSuccess { .. } => EventCode::CommandSuccess,
            Event::CommandErrorSize { .. } => EventCode::CommandErrorSize,
            Event::PairingPattern(_) => EventCode::PairingPattern,
            Event::Channel(_) => EventCode::Channel,
            Event::Test(_) => EventCode::Test,
            Event::NetId(_) => EventCode::NetId,
            Event::CommandErrorChecksum { .. } => EventCode::CommandErrorChecksum,
            Event::Valves { .. } => EventCode::Valves,
            Event::SubnetInfo { .. } => EventCode::SubnetInfo,
            Event::Versions(_) => EventCode::Versions,
            Event::Vitals(_) => EventCode::Vitals,
        }
    }
}

/// One-line trace form, as written to the activity log.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CycleStartImminent => write!(f, "cycleStart"),
            Event::AllVitalsReported => write!(f, "allVitalsReported"),
            Event::CommandErrorNotFound { command } => {
                write!(f, "ERROR not found command=0x{command:02X}")
            }
            Event::CommandErrorIllegal { command } => {
                write!(f, "ERROR illegal command=0x{command:02X}")
            }
            Event::CommandSuccess { command } => write!(f, "success command=0x{command:02X}"),
            Event::CommandErrorSize {
                command,
                received_len,
            } => write!(
                f,
                "ERROR size command=0x{command:02X} received_len={received_len}"
            ),
            Event::PairingPattern(pattern) => write!(f, "pairingPattern={pattern:09b}"),
            Event::Channel(info) => write!(
                f,
                "channel={}, min={}, max={}",
                info.current, info.min, info.max
            ),
            Event::Test(echo) => write!(f, "test [{}]", Hex(echo)),
            Event::NetId(id) => write!(f, "netid={} ({})", id.raw(), id.family().name()),
            Event::CommandErrorChecksum {
                command,
                received,
                computed,
            } => write!(
                f,
                "ERROR checksum command=0x{command:02X} received=[{}] computed=[{}]",
                Hex(received),
                Hex(computed)
            ),
            Event::Valves { device, positions } => {
                write!(f, "valves oid={} positions={positions:08b}", device.raw())
            }
            Event::SubnetInfo { device, subnet } => {
                write!(f, "subnet oid={}, subnet={subnet}", device.raw())
            }
            Event::Versions(v) => write!(
                f,
                "versions git={}, protocol={}, network={}",
                v.build, v.protocol, v.network
            ),
            Event::Vitals(v) => write!(
                f,
                "rtu oid={}, power={}, rssi={}, valves={:04X}, extra={:04X}",
                v.device.raw(),
                v.power,
                v.rssi,
                v.valves,
                v.extra
            ),
        }
    }
}
