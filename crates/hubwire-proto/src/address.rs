//! Device identifiers.
//!
//! A 32-bit id encodes both which family of field device it names and
//! which valve slot on that device. The family is a pure function of the
//! numeric range:
//!
//! ```text
//! 0 ..= 9                      local      valves wired to the hub itself
//! 10 ..= 0x00FF_FFFF           long-range TYPE * 1_000_000 + UNIT * 10 + SLOT
//! 0x0100_0000 ..= 0xFFFF_FFFF  mesh       variant nibble ... slot nibble
//! ```

use std::fmt;

use serde::Serialize;

/// Ids below this are local valves.
const LOCAL_LIMIT: u32 = 10;

/// Ids at or above this are mesh devices.
const MESH_BASE: u32 = 0x0100_0000;

/// Long-range valve count by type code.
const LONG_RANGE_VALVES: [u8; 10] = [0, 1, 2, 0, 0, 1, 2, 0, 0, 0];

/// Long-range type that carries gauges instead of valves.
const LONG_RANGE_GAUGE_TYPE: u32 = 9;

/// Long-range types that report valve position back.
const LONG_RANGE_VERIFIED_TYPES: [u32; 2] = [5, 6];

/// Device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Local,
    LongRange,
    Mesh,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::Local => "local",
            Family::LongRange => "long_range",
            Family::Mesh => "mesh",
        }
    }
}

/// Mesh device variant, from the id's top nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MeshVariant {
    A,
    B,
    C,
    D,
}

impl MeshVariant {
    fn from_nibble(nibble: u32) -> Option<Self> {
        match nibble {
            0xA => Some(MeshVariant::A),
            0xB => Some(MeshVariant::B),
            0xC => Some(MeshVariant::C),
            0xD => Some(MeshVariant::D),
            _ => None,
        }
    }

    pub fn valve_count(self) -> u8 {
        match self {
            MeshVariant::A => 1,
            MeshVariant::B => 2,
            MeshVariant::C | MeshVariant::D => 4,
        }
    }

    pub fn letter(self) -> char {
        match self {
            MeshVariant::A => 'A',
            MeshVariant::B => 'B',
            MeshVariant::C => 'C',
            MeshVariant::D => 'D',
        }
    }
}

/// A classified device identifier.
///
/// Construct with [`DeviceId::from_raw`] (or `From<u32>`), which is the only
/// way to pick a variant, so the tag always agrees with the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceId {
    Local(u32),
    LongRange(u32),
    Mesh(u32),
}

impl DeviceId {
    pub fn from_raw(value: u32) -> Self {
        if value < LOCAL_LIMIT {
            DeviceId::Local(value)
        } else if value < MESH_BASE {
            DeviceId::LongRange(value)
        } else {
            DeviceId::Mesh(value)
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            DeviceId::Local(v) | DeviceId::LongRange(v) | DeviceId::Mesh(v) => v,
        }
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.raw().to_le_bytes()
    }

    pub fn family(self) -> Family {
        match self {
            DeviceId::Local(_) => Family::Local,
            DeviceId::LongRange(_) => Family::LongRange,
            DeviceId::Mesh(_) => Family::Mesh,
        }
    }

    pub fn is_long_range(self) -> bool {
        matches!(self, DeviceId::LongRange(_))
    }

    /// Long-range type code (`value / 1_000_000`).
    pub fn long_range_type(self) -> Option<u32> {
        match self {
            DeviceId::LongRange(v) => Some(v / 1_000_000),
            DeviceId::Local(_) | DeviceId::Mesh(_) => None,
        }
    }

    pub fn mesh_variant(self) -> Option<MeshVariant> {
        match self {
            DeviceId::Mesh(v) => MeshVariant::from_nibble(v >> 28),
            DeviceId::Local(_) | DeviceId::LongRange(_) => None,
        }
    }

    pub fn valve_count(self) -> u8 {
        match self {
            DeviceId::Local(_) => 2,
            DeviceId::LongRange(v) => LONG_RANGE_VALVES
                .get((v / 1_000_000) as usize)
                .copied()
                .unwrap_or(0),
            DeviceId::Mesh(_) => self.mesh_variant().map_or(0, MeshVariant::valve_count),
        }
    }

    pub fn gauge_count(self) -> u8 {
        match self {
            DeviceId::LongRange(v) if v / 1_000_000 == LONG_RANGE_GAUGE_TYPE => 2,
            DeviceId::Local(_) | DeviceId::LongRange(_) | DeviceId::Mesh(_) => 0,
        }
    }

    pub fn has_valves(self) -> bool {
        self.valve_count() > 0
    }

    /// Whether the device reports actual valve position after actuation.
    pub fn has_verification(self) -> bool {
        match self {
            DeviceId::LongRange(v) => LONG_RANGE_VERIFIED_TYPES.contains(&(v / 1_000_000)),
            DeviceId::Local(_) | DeviceId::Mesh(_) => false,
        }
    }

    /// Valve slot addressed by this id; 0 names the unit itself.
    pub fn valve_index(self) -> u32 {
        match self {
            DeviceId::Local(v) => v,
            DeviceId::LongRange(v) => v % 10,
            DeviceId::Mesh(v) => v & 0xF,
        }
    }

    /// Name of the physical unit, shared by all of its valve slots.
    pub fn unit_string(self) -> String {
        match self {
            DeviceId::Local(_) => "MC".to_string(),
            DeviceId::LongRange(v) => {
                format!("{}-{:05}", v / 1_000_000, (v % 1_000_000) / 10)
            }
            DeviceId::Mesh(v) => {
                let mut hex = format!("{v:X}");
                hex.pop();
                hex
            }
        }
    }

    /// Name of this specific valve slot.
    pub fn valve_string(self) -> String {
        match self {
            DeviceId::Local(v) => format!("MC.{v}"),
            DeviceId::LongRange(_) => format!("{}-{}", self.unit_string(), self.valve_index()),
            DeviceId::Mesh(v) => format!("{v:X}"),
        }
    }

    /// Unit name, with `#slot` appended for multi-valve units.
    pub fn debug_string(self) -> String {
        if self.valve_count() <= 1 {
            self.unit_string()
        } else {
            format!("{}#{}", self.unit_string(), self.valve_index())
        }
    }

    /// Single-letter tag used when generating point names.
    pub fn name_token(self) -> char {
        match self {
            DeviceId::Local(_) => 'L',
            DeviceId::LongRange(_) | DeviceId::Mesh(_) => {
                if self.valve_index() != 0 {
                    'V'
                } else {
                    'R'
                }
            }
        }
    }

    /// The ids of this unit's valves: `value + 1 ..= value + valve_count`,
    /// cut short where that range leaves this id's family.
    pub fn siblings(self) -> Siblings {
        Siblings {
            base: self.raw(),
            family: self.family(),
            next: 0,
            count: self.valve_count(),
        }
    }
}

impl From<u32> for DeviceId {
    fn from(value: u32) -> Self {
        DeviceId::from_raw(value)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debug_string())
    }
}

impl Serialize for DeviceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw())
    }
}

/// Iterator over a unit's valve ids. Every item shares the unit's family;
/// iteration ends at a family boundary or at `u32::MAX`.
#[derive(Debug, Clone)]
pub struct Siblings {
    base: u32,
    family: Family,
    next: u8,
    count: u8,
}

impl Iterator for Siblings {
    type Item = DeviceId;

    fn next(&mut self) -> Option<DeviceId> {
        if self.next >= self.count {
            return None;
        }
        self.next += 1;
        let sibling = self
            .base
            .checked_add(u32::from(self.next))
            .map(DeviceId::from_raw)
            .filter(|id| id.family() == self.family);
        if sibling.is_none() {
            self.next = self.count;
        }
        sibling
    }
}
