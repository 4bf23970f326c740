//! Differencing two snapshots of the same address space.
//!
//! Capturing one snapshot per in-target state and diffing them is how
//! unknown data locations are found in the first place: change the
//! state, then ask which halfwords moved, or which moved from one known
//! value to another.

use memchr::memmem;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::address_range::AddressRange;
use crate::core::address_space::VirtualAddress;
use crate::core::memory_image::MemoryImage;

/// One halfword that differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct U16Change {
    pub addr: VirtualAddress,
    pub before: u16,
    pub after: u16,
}

/// All halfword-aligned addresses in `range` whose 16-bit value differs
/// between the snapshots. Addresses unreadable in either image are
/// skipped.
pub fn changed_u16(before: &MemoryImage, after: &MemoryImage, range: AddressRange) -> Vec<U16Change> {
    let mut changes = Vec::new();
    let mut addr = range.start;
    while addr.0 as u64 + 2 <= range.end.0 as u64 {
        if let (Ok(a), Ok(b)) = (before.read_u16(addr), after.read_u16(addr)) {
            if a != b {
                changes.push(U16Change {
                    addr,
                    before: a,
                    after: b,
                });
            }
        }
        addr = match addr.checked_add(2) {
            Some(a) => a,
            None => break,
        };
    }
    debug!(changes = changes.len(), "u16 diff complete");
    changes
}

/// Addresses whose halfword moved from one known value to another — the
/// sharpest filter when both states' values are known.
pub fn find_transition_u16(
    before: &MemoryImage,
    after: &MemoryImage,
    range: AddressRange,
    from: u16,
    to: u16,
) -> Vec<VirtualAddress> {
    changed_u16(before, after, range)
        .into_iter()
        .filter(|c| c.before == from && c.after == to)
        .map(|c| c.addr)
        .collect()
}

/// All occurrences of a byte pattern inside `range`, clamped to the
/// readable part of the image.
pub fn find_bytes(
    image: &MemoryImage,
    range: AddressRange,
    needle: &[u8],
) -> Vec<VirtualAddress> {
    if needle.is_empty() || range.is_empty() {
        return Vec::new();
    }
    // Clamp the range to what the buffer actually backs.
    let start_off = match image.address_space().virtual_to_image_offset(range.start) {
        Ok(off) if off < image.len() => off,
        _ => return Vec::new(),
    };
    let len = (range.len() as usize).min(image.len() - start_off);
    let haystack = match image.read_bytes(range.start, len) {
        Ok(bytes) => bytes,
        Err(_) => return Vec::new(),
    };
    memmem::find_iter(haystack, needle)
        .map(|off| range.start.wrapping_add(off as u32))
        .collect()
}
