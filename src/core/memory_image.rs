//! Bounds-checked typed reads over an immutable decompressed memory image.
//!
//! A [`MemoryImage`] owns the byte buffer a loader produced (header
//! included) and resolves virtual addresses through its [`AddressSpace`].
//! Reads are little-endian and never escape `[0, len)`; a read straddling
//! the buffer end fails cleanly rather than truncating.

use crate::core::address_space::{AddressSpace, VirtualAddress};
use crate::error::{MemdigError, Result};

/// An immutable memory image plus the address space that locates it.
pub struct MemoryImage {
    data: Vec<u8>,
    space: AddressSpace,
}

impl MemoryImage {
    /// Wrap a loader-supplied buffer. The buffer is never mutated.
    pub fn new(data: Vec<u8>, space: AddressSpace) -> Self {
        Self { data, space }
    }

    /// Size of the backing buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The address space this image is resolved through.
    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Whether a read of `len` bytes at `vaddr` stays inside the buffer.
    pub fn contains(&self, vaddr: VirtualAddress, len: usize) -> bool {
        self.read_bytes(vaddr, len).is_ok()
    }

    /// Borrow `len` raw bytes at a virtual address.
    pub fn read_bytes(&self, vaddr: VirtualAddress, len: usize) -> Result<&[u8]> {
        let start = self.space.virtual_to_image_offset(vaddr)?;
        let end = start
            .checked_add(len)
            .ok_or(MemdigError::OutOfBounds {
                addr: vaddr,
                len,
                size: self.data.len(),
            })?;
        if end > self.data.len() {
            return Err(MemdigError::OutOfBounds {
                addr: vaddr,
                len,
                size: self.data.len(),
            });
        }
        Ok(&self.data[start..end])
    }

    pub fn read_u8(&self, vaddr: VirtualAddress) -> Result<u8> {
        Ok(self.read_bytes(vaddr, 1)?[0])
    }

    pub fn read_u16(&self, vaddr: VirtualAddress) -> Result<u16> {
        let b = self.read_bytes(vaddr, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_s16(&self, vaddr: VirtualAddress) -> Result<i16> {
        let b = self.read_bytes(vaddr, 2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self, vaddr: VirtualAddress) -> Result<u32> {
        let b = self.read_bytes(vaddr, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Hex rendering of a span, for diagnostics.
    pub fn hex_dump(&self, vaddr: VirtualAddress, len: usize) -> Result<String> {
        Ok(hex::encode(self.read_bytes(vaddr, len)?))
    }
}
