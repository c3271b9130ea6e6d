//! Decomposition descriptors of the two coupled codes.
//!
//! Built once at startup from external mesh metadata and read-only
//! afterwards.

pub mod axis;
pub mod process_grid;
pub mod real;
pub mod spectral;

pub use axis::{AxisBoundary, AxisDecomposition, Segment, split_evenly};
pub use process_grid::{Axis, ProcessGrid};
pub use real::{RealMesh, SurfaceLine};
pub use spectral::SpectralMesh;
