//! Packed valve actions for `ValvesPut`.

use std::fmt;

use serde::Serialize;

use crate::address::DeviceId;
use crate::error::{ProtoError, Result};

/// A single byte holds two bits for each of four slots.
pub const MAX_VALVE_SLOTS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValveAction {
    Open,
    Close,
}

/// Valve actions packed two bits per slot.
///
/// Slot 1 occupies bits 0-1 and slot 4 bits 6-7. Within a pair the low bit
/// requests open and the high bit requests close; a clear pair leaves the
/// valve alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValveBitmask(u8);

impl ValveBitmask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set `slot` (1-based) to `action`, replacing any earlier action.
    pub fn with(self, slot: u8, action: ValveAction) -> Result<Self> {
        let shift = slot_shift(slot, MAX_VALVE_SLOTS)?;
        let bit = match action {
            ValveAction::Open => 0b01,
            ValveAction::Close => 0b10,
        };
        Ok(Self((self.0 & !(0b11 << shift)) | (bit << shift)))
    }

    /// Like [`with`](Self::with), but also checks the slot against the
    /// device's valve count.
    pub fn with_for(self, device: DeviceId, slot: u8, action: ValveAction) -> Result<Self> {
        slot_shift(slot, device.valve_count().min(MAX_VALVE_SLOTS))?;
        self.with(slot, action)
    }

    /// Action requested for `slot`, if any. Both bits set reads as close.
    pub fn action(self, slot: u8) -> Option<ValveAction> {
        let shift = slot_shift(slot, MAX_VALVE_SLOTS).ok()?;
        match (self.0 >> shift) & 0b11 {
            0 => None,
            0b01 => Some(ValveAction::Open),
            _ => Some(ValveAction::Close),
        }
    }
}

fn slot_shift(slot: u8, max: u8) -> Result<u8> {
    if slot == 0 || slot > max {
        return Err(ProtoError::InvalidSlot { slot, max });
    }
    Ok((slot - 1) * 2)
}

impl fmt::Display for ValveBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_two_bits_per_slot() {
        let mask = ValveBitmask::empty()
            .with(1, ValveAction::Open)
            .unwrap()
            .with(4, ValveAction::Close)
            .unwrap();
        assert_eq!(mask.bits(), 0b1000_0001);
        assert_eq!(mask.action(1), Some(ValveAction::Open));
        assert_eq!(mask.action(2), None);
        assert_eq!(mask.action(4), Some(ValveAction::Close));
        assert_eq!(mask.to_string(), "10000001");
    }

    #[test]
    fn later_action_replaces_earlier() {
        let mask = ValveBitmask::empty()
            .with(2, ValveAction::Open)
            .unwrap()
            .with(2, ValveAction::Close)
            .unwrap();
        assert_eq!(mask.bits(), 0b0000_1000);
    }

    #[test]
    fn slot_bounds() {
        assert_eq!(
            ValveBitmask::empty().with(0, ValveAction::Open),
            Err(ProtoError::InvalidSlot { slot: 0, max: 4 })
        );
        assert!(ValveBitmask::empty().with(5, ValveAction::Open).is_err());
        assert_eq!(ValveBitmask::empty().action(9), None);
    }

    #[test]
    fn device_valve_count_limits_slots() {
        let single = DeviceId::from_raw(0xA000_0001);
        assert!(ValveBitmask::empty()
            .with_for(single, 1, ValveAction::Open)
            .is_ok());
        assert_eq!(
            ValveBitmask::empty().with_for(single, 2, ValveAction::Open),
            Err(ProtoError::InvalidSlot { slot: 2, max: 1 })
        );

        let gauge_only = DeviceId::from_raw(9_000_010);
        assert!(ValveBitmask::empty()
            .with_for(gauge_only, 1, ValveAction::Close)
            .is_err());
    }
}
