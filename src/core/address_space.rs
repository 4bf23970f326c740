//! Coordinate conversion between the target's virtual address space, byte
//! offsets into a decompressed memory image, and the tagged patch-address
//! encoding consumed by the external code serializer.
//!
//! An [`AddressSpace`] never touches bytes; it is pure arithmetic over
//! three coordinate systems. All conversions are mutual inverses over
//! their valid domains.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MemdigError, Result};

/// A 32-bit address in the target's linear address space.
///
/// Independent of how the tooling stores bytes; converting to and from
/// image offsets goes through an [`AddressSpace`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct VirtualAddress(pub u32);

impl VirtualAddress {
    /// Address advanced by `bytes`, wrapping at the 32-bit boundary.
    pub fn wrapping_add(self, bytes: u32) -> Self {
        VirtualAddress(self.0.wrapping_add(bytes))
    }

    /// Checked advance; `None` past the 32-bit boundary.
    pub fn checked_add(self, bytes: u32) -> Option<Self> {
        self.0.checked_add(bytes).map(VirtualAddress)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    fn from(value: u32) -> Self {
        VirtualAddress(value)
    }
}

/// Operation tag occupying the top 4 bits of a patch address.
///
/// The encoding is bit-exact: an external patch-code consumer depends on
/// these exact discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PatchOp {
    /// Block-copy destination.
    CopyDest = 0x0,
    /// 16-bit write.
    Write16 = 0x1,
    /// 32-bit write.
    Write32 = 0x2,
    /// Block-copy source.
    CopySource = 0x5,
    /// Conditional-equal guard.
    IfEqual = 0xE,
}

impl PatchOp {
    /// Recover an operation tag from the top 4 bits of an encoded patch
    /// address. Unassigned tags return `None`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x0 => Some(PatchOp::CopyDest),
            0x1 => Some(PatchOp::Write16),
            0x2 => Some(PatchOp::Write32),
            0x5 => Some(PatchOp::CopySource),
            0xE => Some(PatchOp::IfEqual),
            _ => None,
        }
    }

    /// The 4-bit tag value.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Mapping between virtual addresses and image byte offsets.
///
/// `base` is the virtual address mirrored by image offset `image_delta`;
/// both are fixed for the image's lifetime. A save-state image typically
/// carries a small header before the RAM mirror starts, hence the delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    base: VirtualAddress,
    image_delta: u32,
}

const PATCH_OFFSET_BITS: u32 = 28;
const PATCH_OFFSET_MASK: u32 = (1 << PATCH_OFFSET_BITS) - 1;

impl AddressSpace {
    /// Create an address space anchored at `base`, which corresponds to
    /// byte offset `image_delta` in the image buffer.
    pub fn new(base: VirtualAddress, image_delta: u32) -> Self {
        Self { base, image_delta }
    }

    /// The virtual address mirrored by offset `image_delta`.
    pub fn base(&self) -> VirtualAddress {
        self.base
    }

    /// Byte offset in the image corresponding to `self.base()`.
    pub fn image_delta(&self) -> u32 {
        self.image_delta
    }

    /// Translate a virtual address to an image byte offset.
    ///
    /// Fails with `OutOfRange` when `vaddr` lies below the space's base.
    /// The result is not checked against any buffer length; that is the
    /// memory image's job.
    pub fn virtual_to_image_offset(&self, vaddr: VirtualAddress) -> Result<usize> {
        let rel = vaddr
            .0
            .checked_sub(self.base.0)
            .ok_or(MemdigError::OutOfRange { addr: vaddr })?;
        Ok(rel as usize + self.image_delta as usize)
    }

    /// Translate an image byte offset back to a virtual address.
    ///
    /// Exact inverse of [`virtual_to_image_offset`](Self::virtual_to_image_offset):
    /// fails when the offset lies inside the image header (below the
    /// delta) or the resulting address does not fit in 32 bits.
    pub fn image_offset_to_virtual(&self, offset: usize) -> Result<VirtualAddress> {
        let rel = offset
            .checked_sub(self.image_delta as usize)
            .ok_or(MemdigError::OffsetOutOfRange { offset })?;
        let rel: u32 = rel
            .try_into()
            .map_err(|_| MemdigError::OffsetOutOfRange { offset })?;
        let addr = self
            .base
            .0
            .checked_add(rel)
            .ok_or(MemdigError::OffsetOutOfRange { offset })?;
        Ok(VirtualAddress(addr))
    }

    /// Encode a virtual address as a tagged patch address.
    ///
    /// Top 4 bits carry the operation tag, the low 28 bits carry
    /// `vaddr - region_base`. Fails with `InvalidRegion` when `vaddr`
    /// lies below the region base or more than 28 bits above it.
    pub fn virtual_to_patch_address(
        &self,
        vaddr: VirtualAddress,
        region_base: VirtualAddress,
        op: PatchOp,
    ) -> Result<u32> {
        let rel = vaddr
            .0
            .checked_sub(region_base.0)
            .ok_or(MemdigError::InvalidRegion {
                addr: vaddr,
                base: region_base,
            })?;
        if rel > PATCH_OFFSET_MASK {
            return Err(MemdigError::InvalidRegion {
                addr: vaddr,
                base: region_base,
            });
        }
        Ok(((op.tag() as u32) << PATCH_OFFSET_BITS) | rel)
    }

    /// Decode a tagged patch address back into its operation tag and
    /// virtual address. Inverse of
    /// [`virtual_to_patch_address`](Self::virtual_to_patch_address);
    /// `None` when the tag is unassigned.
    pub fn patch_address_to_virtual(
        &self,
        encoded: u32,
        region_base: VirtualAddress,
    ) -> Option<(PatchOp, VirtualAddress)> {
        let op = PatchOp::from_tag((encoded >> PATCH_OFFSET_BITS) as u8)?;
        let vaddr = VirtualAddress(region_base.0.wrapping_add(encoded & PATCH_OFFSET_MASK));
        Some((op, vaddr))
    }
}
