//! Equipment record layouts and plausibility validators.
//!
//! The scanner itself is layout-agnostic; this module supplies the two
//! record layouts the investigation actually established, plus the
//! validators used to find their tables. Offsets and bounds are the
//! empirically confirmed ones, not a documented format.

use serde::{Deserialize, Serialize};

use crate::core::address_space::VirtualAddress;
use crate::core::memory_image::MemoryImage;
use crate::error::Result;

/// Armor records: two model ids and a variant tag, 40 bytes apart.
pub const ARMOR_STRIDE: u32 = 40;
/// Weapon records: 24 bytes apart.
pub const WEAPON_STRIDE: u32 = 24;
/// Byte offset of a weapon record's model id.
pub const WEAPON_MODEL_OFFSET: usize = 16;
/// Byte offset of a weapon record's attack stat.
pub const WEAPON_ATTACK_OFFSET: usize = 2;

/// Variant tag: first physical variant of a paired item.
pub const TAG_VARIANT_A: u8 = 0x07;
/// Variant tag: second physical variant of a paired item.
pub const TAG_VARIANT_B: u8 = 0x0B;
/// Variant tag: item shared by both variant families.
pub const TAG_UNIVERSAL: u8 = 0x0F;

/// One armor table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorRecord {
    /// Zero-based position in the table.
    pub index: u32,
    pub primary_model: i16,
    pub secondary_model: i16,
    pub tag: u8,
}

impl ArmorRecord {
    /// Interpret raw record bytes. `None` when the span is too short.
    pub fn parse(index: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 5 {
            return None;
        }
        Some(Self {
            index,
            primary_model: i16::from_le_bytes([bytes[0], bytes[1]]),
            secondary_model: i16::from_le_bytes([bytes[2], bytes[3]]),
            tag: bytes[4],
        })
    }

    /// Read entry `index` of the table starting at `table_base`.
    pub fn read(image: &MemoryImage, table_base: VirtualAddress, index: u32) -> Result<Self> {
        let addr = table_base.wrapping_add(index.wrapping_mul(ARMOR_STRIDE));
        let bytes = image.read_bytes(addr, ARMOR_STRIDE as usize)?;
        Ok(Self {
            index,
            primary_model: i16::from_le_bytes([bytes[0], bytes[1]]),
            secondary_model: i16::from_le_bytes([bytes[2], bytes[3]]),
            tag: bytes[4],
        })
    }

    /// The empty sentinel: both model ids zero.
    pub fn is_empty_sentinel(&self) -> bool {
        self.primary_model == 0 && self.secondary_model == 0
    }
}

/// One weapon table entry (the fields the tooling interprets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub index: u32,
    pub attack: u16,
    pub model: u16,
}

impl WeaponRecord {
    pub fn parse(index: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WEAPON_MODEL_OFFSET + 2 {
            return None;
        }
        Some(Self {
            index,
            attack: u16::from_le_bytes([
                bytes[WEAPON_ATTACK_OFFSET],
                bytes[WEAPON_ATTACK_OFFSET + 1],
            ]),
            model: u16::from_le_bytes([
                bytes[WEAPON_MODEL_OFFSET],
                bytes[WEAPON_MODEL_OFFSET + 1],
            ]),
        })
    }

    pub fn read(image: &MemoryImage, table_base: VirtualAddress, index: u32) -> Result<Self> {
        let addr = table_base.wrapping_add(index.wrapping_mul(WEAPON_STRIDE));
        let bytes = image.read_bytes(addr, WEAPON_STRIDE as usize)?;
        Ok(Self {
            index,
            attack: u16::from_le_bytes([
                bytes[WEAPON_ATTACK_OFFSET],
                bytes[WEAPON_ATTACK_OFFSET + 1],
            ]),
            model: u16::from_le_bytes([
                bytes[WEAPON_MODEL_OFFSET],
                bytes[WEAPON_MODEL_OFFSET + 1],
            ]),
        })
    }
}

/// Plausibility predicate for armor records: both model ids inside the
/// observed id space. Empty sentinels pass — they are real table slots.
pub fn armor_record_valid(bytes: &[u8]) -> bool {
    match ArmorRecord::parse(0, bytes) {
        Some(rec) => {
            (-1..=1000).contains(&rec.primary_model)
                && (-1..=1000).contains(&rec.secondary_model)
        }
        None => false,
    }
}

/// Plausibility predicate for weapon records: a sane model id and a
/// nonzero attack stat within the observed range.
pub fn weapon_record_valid(bytes: &[u8]) -> bool {
    match WeaponRecord::parse(0, bytes) {
        Some(rec) => rec.model <= 1000 && rec.attack > 0 && rec.attack <= 2000,
        None => false,
    }
}
