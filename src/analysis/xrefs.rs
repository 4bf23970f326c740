//! Code cross-reference search over a memory image.
//!
//! Locating the callers of a known routine, and the sites that
//! materialize a pointer into a known region, are the two searches every
//! code investigation starts with. Both walk word-aligned code ranges;
//! data decoded as code is harmless because the decoder is total.

use tracing::debug;

use crate::core::address_range::AddressRange;
use crate::core::address_space::VirtualAddress;
use crate::core::instruction::{Operand, Reg};
use crate::core::memory_image::MemoryImage;
use crate::disasm::mips;

/// The exact word encoding a linked call to `target`.
///
/// The top segment bits are dropped by the encoding; the call site must
/// share the target's 256 MiB segment, which holds for all code ranges
/// this tooling walks.
pub fn call_word(target: VirtualAddress) -> u32 {
    0x0C00_0000 | ((target.0 >> 2) & 0x03FF_FFFF)
}

/// All word-aligned sites in `range` holding a direct call to `target`.
pub fn find_calls_to(
    image: &MemoryImage,
    range: AddressRange,
    target: VirtualAddress,
) -> Vec<VirtualAddress> {
    let wanted = call_word(target);
    let mut sites = Vec::new();
    let mut addr = range.start;
    while addr.0 as u64 + 4 <= range.end.0 as u64 {
        if let Ok(word) = image.read_u32(addr) {
            if word == wanted {
                sites.push(addr);
            }
        }
        addr = match addr.checked_add(4) {
            Some(a) => a,
            None => break,
        };
    }
    debug!(target = %target, sites = sites.len(), "call search complete");
    sites
}

/// All load-upper-immediate sites in `range` carrying `upper16`, with
/// the register each one loads.
///
/// A pointer into region `0xVVVV0000..` is materialized by loading
/// `0xVVVV` into a register first, so this finds code touching a known
/// data region even when the low half varies per site.
pub fn find_upper_refs(
    image: &MemoryImage,
    range: AddressRange,
    upper16: u16,
) -> Vec<(VirtualAddress, Reg)> {
    let mut sites = Vec::new();
    let mut addr = range.start;
    while addr.0 as u64 + 4 <= range.end.0 as u64 {
        if let Ok(word) = image.read_u32(addr) {
            let insn = mips::decode(word, addr);
            if insn.mnemonic == "lui" && insn.operands.get(1) == Some(&Operand::UImm(upper16)) {
                if let Some(&Operand::Reg(reg)) = insn.operands.first() {
                    sites.push((addr, reg));
                }
            }
        }
        addr = match addr.checked_add(4) {
            Some(a) => a,
            None => break,
        };
    }
    debug!(upper = upper16, sites = sites.len(), "upper-ref search complete");
    sites
}
