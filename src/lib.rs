#![cfg_attr(docsrs, feature(doc_cfg))]
//! # spectral-coupler
//!
//! spectral-coupler moves physical fields between two decomposed plasma
//! codes: a spectral code that stores Fourier modes in the angular
//! direction, and a real-space code that stores angular samples on its own
//! field-line grid. Once per coupling step the density travels from the
//! spectral code to the real-space code and the potential travels back.
//!
//! ## Features
//! - Third-order Lagrange interpolation along the field-line coordinate
//!   between independently decomposed grids, with periodic wrap or
//!   externally supplied ghost coordinates at the line ends
//! - Real ↔ complex angular transforms, either per process or distributed
//!   over the angular process group with all-to-all transposes
//! - Flat `(outer, mode, inner)` field buffers whose storage order is the
//!   wire order
//! - Pluggable communication backends (serial, in-process threads, MPI) for
//!   halo exchange, transposes and named field channels
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! spectral-coupler = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! Build a [`SpectralMesh`](decomposition::SpectralMesh) and a
//! [`RealMesh`](decomposition::RealMesh) for this process, hand them to
//! [`FieldProcessor::new`](engine::FieldProcessor::new), and drive the
//! density and potential steps with a [`Communicator`](algs::communicator::Communicator).

pub mod algs;
pub mod config;
pub mod coupler_error;
pub mod data;
pub mod decomposition;
pub mod engine;
pub mod test_case;
pub mod transform;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::boundary_exchange::{ConstantEdge, EdgeFill};
    pub use crate::algs::channel::{FieldChannel, Mode};
    pub use crate::algs::communicator::{Communicator, NoComm, LocalComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::config::{CouplerConfig, TestCase, TransformMode};
    pub use crate::coupler_error::CouplerError;
    pub use crate::data::{FieldBuffer, FieldLayout, HaloBuffers};
    pub use crate::decomposition::{
        Axis, AxisBoundary, AxisDecomposition, ProcessGrid, RealMesh, SpectralMesh, SurfaceLine,
    };
    pub use crate::engine::FieldProcessor;
    pub use crate::transform::SpectralTransform;
    pub use num_complex::Complex64;
}
