use std::sync::{Arc, PoisonError, RwLock};

use hubwire_proto::{ChannelInfo, DeviceId, Versions};
use serde::Serialize;

/// What the hub has said about itself so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStatus {
    pub net_id: Option<DeviceId>,
    /// The hub's own id falls in the long-range family.
    pub long_range: bool,
    pub versions: Option<Versions>,
    pub channel: Option<ChannelInfo>,
    pub pairing_pattern: Option<u16>,
}

/// Shared, concurrently readable [`HubStatus`].
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<HubStatus>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, f: impl FnOnce(&mut HubStatus)) {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn snapshot(&self) -> HubStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_long_range(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .long_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_visible_through_clone() {
        let status = SharedStatus::new();
        let view = status.clone();
        status.update(|s| {
            s.net_id = Some(DeviceId::from_raw(1_000_000));
            s.long_range = true;
        });
        assert!(view.is_long_range());
        assert_eq!(view.snapshot().net_id, Some(DeviceId::LongRange(1_000_000)));
    }

    #[test]
    fn serializes_missing_fields_as_null() {
        let json = serde_json::to_value(HubStatus::default()).unwrap();
        assert!(json["net_id"].is_null());
        assert_eq!(json["long_range"], false);
    }
}
