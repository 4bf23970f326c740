//! memdig — binary-analysis substrate for decompressed emulator memory
//! images of a MIPS-family target.
//!
//! The crate is the reusable core behind a family of save-state
//! investigation tools: translating between image offsets, virtual
//! addresses, and the tagged patch-address encoding; bounds-checked
//! typed reads over an immutable image; a total, stateless instruction
//! decoder; a fixed-stride table scanner driven by plausibility
//! predicates; and a grouper that folds adjacent table records into
//! logical equipment sets.
//!
//! Everything here is a pure, synchronous function over immutable
//! inputs. One [`core::memory_image::MemoryImage`] can serve any number
//! of concurrent scans and decodes without locking.
//!
//! Loading (decompression, file formats), documentation scraping, and
//! the textual rendering of patch codes live in collaborating crates;
//! this one starts at a ready byte buffer and stops at structured
//! results.

/// Core data types module
pub mod core;

/// Analyses over a memory image
pub mod analysis;

/// Instruction decoding
pub mod disasm;

pub mod error;
pub mod logging;

pub use error::{MemdigError, Result};
