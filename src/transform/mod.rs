//! Angular transforms between the real samples of one code and the complex
//! modes of the other.

pub mod pipeline;
pub mod plan;
pub mod transpose;

pub use pipeline::{
    YGroup, complex_to_real, complex_to_real_decomposed, real_to_complex,
    real_to_complex_decomposed,
};
pub use plan::SpectralTransform;
pub use transpose::all_to_all;
