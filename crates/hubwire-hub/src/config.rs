use std::time::Duration;

use hubwire_frame::{FrameConfig, DEFAULT_MAX_FRAME};
use serde::{Deserialize, Serialize};

/// Tunables for the command and event loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// How long to wait for the first response to a transmission.
    pub response_timeout: Duration,
    /// Pause before resending after a transmission error.
    pub retry_backoff: Duration,
    /// Resends allowed per command after the first transmission.
    pub max_retries: u8,
    /// Upper bound on waiting for a matching response once a
    /// non-matching one arrived, measured from the last transmission.
    pub validation_window: Duration,
    /// Empty frames sent before the first command.
    pub reset_frames: u8,
    pub reset_spacing: Duration,
    /// Activity log capacity; oldest entries are evicted beyond it.
    pub activity_capacity: usize,
    /// Read timeout of the event loop; bounds how long shutdown waits on it.
    pub poll_interval: Duration,
    /// Largest unescaped frame accepted from the hub.
    pub max_frame_size: usize,
    /// Queue the startup queries before any caller command.
    pub bootstrap: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(600),
            retry_backoff: Duration::from_millis(10),
            max_retries: 3,
            validation_window: Duration::from_secs(2),
            reset_frames: 3,
            reset_spacing: Duration::from_millis(50),
            activity_capacity: 20,
            poll_interval: Duration::from_millis(100),
            max_frame_size: DEFAULT_MAX_FRAME,
            bootstrap: true,
        }
    }
}

impl HubConfig {
    /// Frame settings for the event loop's reader.
    pub fn reader_frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_size: self.max_frame_size,
            read_timeout: Some(self.poll_interval),
        }
    }

    /// Frame settings for the command loop's writer.
    pub fn writer_frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_size: self.max_frame_size,
            read_timeout: None,
        }
    }
}
