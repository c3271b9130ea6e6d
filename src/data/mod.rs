//! Data module: field buffers and halo buffers

/// Owned `(outer, mode, inner)` field storage and its layout.
pub mod field_buffer;
/// Halo samples at both ends of the field-line coordinate.
pub mod halo;

pub use field_buffer::{FieldBuffer, FieldLayout};
pub use halo::HaloBuffers;
