use std::fmt;
use std::io;

use hubwire_frame::FrameError;
use hubwire_hub::{HubError, Outcome};
use hubwire_transport::TransportError;

// Exit codes follow the sysexits-style layout used across our tools.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn hub_error(context: &str, err: HubError) -> CliError {
    match err {
        HubError::Transport(err) => transport_error(context, err),
        HubError::Frame(err) => frame_error(context, err),
        HubError::Proto(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        HubError::Closed | HubError::EventLoopStopped => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

/// Exit code for a settled submission: the first failure decides.
pub fn outcome_code(outcomes: &[Outcome]) -> i32 {
    match outcomes.iter().find(|o| !o.is_success()) {
        None => SUCCESS,
        Some(Outcome::TimedOut) => TIMEOUT,
        Some(Outcome::Rejected) => DATA_INVALID,
        Some(_) => FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_decides() {
        assert_eq!(outcome_code(&[Outcome::Resolved, Outcome::Unverified]), SUCCESS);
        assert_eq!(
            outcome_code(&[Outcome::Resolved, Outcome::Rejected, Outcome::TimedOut]),
            DATA_INVALID
        );
        assert_eq!(outcome_code(&[Outcome::RetriesExhausted]), FAILURE);
        assert_eq!(outcome_code(&[Outcome::TimedOut]), TIMEOUT);
    }

    #[test]
    fn transport_io_maps_by_kind() {
        let err = transport_error(
            "open failed",
            TransportError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.message.starts_with("open failed: "));
    }
}
