//! Response validation.
//!
//! A solicited event resolves the in-flight command only if it passes the
//! command's validator. Both sides are raw packets starting at the code
//! byte; trailing checksum bytes are ignored.

use serde::Serialize;

use crate::codes::{CommandCode, EventCode};

/// Device ids sit right after the code byte in both directions.
const DEVICE_ID: std::ops::Range<usize> = 1..5;

/// What a command's response has to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The event code alone decides.
    Code(EventCode),
    /// A `Valves` report echoing the command's device id.
    EchoedDevice,
    /// A `Test` report carrying the bit inversion of the sent pattern.
    InvertedTest,
}

/// Validator for a command code. `None` for codes outside the table.
pub fn expectation(command: u8) -> Option<Expectation> {
    let code = CommandCode::from_u8(command)?;
    Some(match code {
        CommandCode::ValvesBegin
        | CommandCode::ValvesCommit
        | CommandCode::VitalsGet
        | CommandCode::Forget => Expectation::Code(EventCode::CommandSuccess),
        CommandCode::VersionsGet => Expectation::Code(EventCode::Versions),
        CommandCode::Channel => Expectation::Code(EventCode::Channel),
        CommandCode::NetIdGet => Expectation::Code(EventCode::NetId),
        CommandCode::PairingPatternGet | CommandCode::PairingPatternGenerate => {
            Expectation::Code(EventCode::PairingPattern)
        }
        CommandCode::ValvesPut => Expectation::EchoedDevice,
        CommandCode::Test => Expectation::InvertedTest,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Mismatch,
    /// No validator exists; the command counts as resolved anyway.
    Unverified,
}

/// Check `event` against the command in flight.
pub fn validate(command: &[u8], event: &[u8]) -> Verdict {
    let Some(expect) = command.first().copied().and_then(expectation) else {
        return Verdict::Unverified;
    };
    let Some(&event_code) = event.first() else {
        return Verdict::Mismatch;
    };

    let accepted = match expect {
        Expectation::Code(code) => event_code == code as u8,
        Expectation::EchoedDevice => {
            event_code == EventCode::Valves as u8
                && matches!(
                    (command.get(DEVICE_ID), event.get(DEVICE_ID)),
                    (Some(sent), Some(echoed)) if sent == echoed
                )
        }
        Expectation::InvertedTest => {
            event_code == EventCode::Test as u8
                && matches!(
                    (command.get(DEVICE_ID), event.get(DEVICE_ID)),
                    (Some(sent), Some(echoed))
                        if sent.iter().zip(echoed).all(|(s, e)| *e == !*s)
                )
        }
    };

    if accepted {
        Verdict::Accepted
    } else {
        Verdict::Mismatch
    }
}
