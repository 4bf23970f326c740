//! Core data types: coordinates, images, and decoded instructions.

pub mod address_range;
pub mod address_space;
pub mod instruction;
pub mod memory_image;
