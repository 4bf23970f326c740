//! Error types for memdig.
//!
//! Only the address/memory layer can fail; everything above it (decoder,
//! scanner, set builder) is total and degrades to partial results instead
//! of failing, since its inputs are data whose structure is not fully
//! known in advance.

use thiserror::Error;

use crate::core::address_space::VirtualAddress;

/// Main error type for memdig operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemdigError {
    /// Address arithmetic escaped the representable coordinate space.
    #[error("address {addr} is outside the translatable range")]
    OutOfRange { addr: VirtualAddress },

    /// An image offset with no virtual-address counterpart.
    #[error("image offset {offset:#x} is outside the translatable range")]
    OffsetOutOfRange { offset: usize },

    /// A read would escape the backing buffer.
    #[error("read of {len} bytes at {addr} escapes the image ({size:#x} bytes)")]
    OutOfBounds {
        addr: VirtualAddress,
        len: usize,
        size: usize,
    },

    /// A patch-address target falls outside the encodable 28-bit window.
    #[error("address {addr} is not encodable relative to patch region base {base}")]
    InvalidRegion {
        addr: VirtualAddress,
        base: VirtualAddress,
    },
}

/// Result type alias for memdig operations.
pub type Result<T> = std::result::Result<T, MemdigError>;
