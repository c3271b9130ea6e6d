//! Re-export public algorithms.

pub mod boundary_exchange;
pub mod channel;
pub mod communicator;
pub mod interpolate;
pub mod lagrange;
pub mod stencil;
pub mod wire;

pub use boundary_exchange::{ConstantEdge, EdgeFill, exchange_z_halos};
pub use interpolate::CrossGridInterpolator;
pub use lagrange::{interpolate_into, lagrange4};
