//! Instruction decoding.
//!
//! One stateless, pure decoder module shared by every analysis that walks
//! code, instead of a dispatch table copy per call site.

pub mod mips;
