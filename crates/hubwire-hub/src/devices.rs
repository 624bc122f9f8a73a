use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use hubwire_proto::DeviceId;

/// Devices seen in vitals reports. Append-only, shared by clone.
#[derive(Debug, Clone, Default)]
pub struct ObservedDevices {
    inner: Arc<RwLock<BTreeSet<DeviceId>>>,
}

impl ObservedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a device. Returns `true` the first time it is seen.
    pub fn insert(&self, device: DeviceId) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device)
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&device)
    }

    /// Sorted copy of the set.
    pub fn snapshot(&self) -> Vec<DeviceId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
