//! Forward/inverse real transform pair of one fixed length.
//!
//! Both directions are unnormalized: `inverse(forward(x)) == len * x`.
//! Callers apply the scaling their representation requires.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use crate::coupler_error::CouplerError;

/// One forward (real → complex) and one inverse (complex → real) plan with
/// their dedicated scratch storage. Plans are created once and released
/// with the value.
pub struct SpectralTransform {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("len", &self.len)
            .finish()
    }
}

impl SpectralTransform {
    /// Plan transforms of real lines of length `len` (even, at least 2).
    pub fn new(len: usize) -> Result<Self, CouplerError> {
        if len < 2 || len % 2 != 0 {
            return Err(CouplerError::Config(format!(
                "real transform length must be even and at least 2, got {len}"
            )));
        }
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        log::debug!("planned real transform pair of length {len}");
        Ok(Self {
            len,
            forward,
            inverse,
            buffer: vec![Complex64::zero(); len],
            scratch: vec![Complex64::zero(); scratch_len],
        })
    }

    /// Real line length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-redundant coefficients, Nyquist included.
    #[inline]
    pub fn spectrum_len(&self) -> usize {
        self.len / 2 + 1
    }

    /// Analyse `input`, writing the first `output.len()` non-negative
    /// frequency coefficients.
    pub fn forward(&mut self, input: &[f64], output: &mut [Complex64]) -> Result<(), CouplerError> {
        CouplerError::expect_len("forward transform input", self.len, input.len())?;
        if output.len() > self.spectrum_len() {
            return Err(CouplerError::InvalidArgument(format!(
                "forward transform yields {} coefficients, {} requested",
                self.spectrum_len(),
                output.len()
            )));
        }
        for (b, &x) in self.buffer.iter_mut().zip(input) {
            *b = Complex64::new(x, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        output.copy_from_slice(&self.buffer[..output.len()]);
        Ok(())
    }

    /// Synthesize a real line from its leading non-negative frequency
    /// coefficients. Coefficients not given are zero; the negative
    /// frequencies are the conjugate mirror. Imaginary parts of the DC and
    /// Nyquist coefficients do not contribute to a real line and are
    /// dropped.
    pub fn inverse(&mut self, input: &[Complex64], output: &mut [f64]) -> Result<(), CouplerError> {
        CouplerError::expect_len("inverse transform output", self.len, output.len())?;
        if input.is_empty() || input.len() > self.spectrum_len() {
            return Err(CouplerError::InvalidArgument(format!(
                "inverse transform takes 1..={} coefficients, got {}",
                self.spectrum_len(),
                input.len()
            )));
        }
        let n = self.len;
        self.buffer.fill(Complex64::zero());
        self.buffer[0] = Complex64::new(input[0].re, 0.0);
        for (m, c) in input.iter().enumerate().skip(1) {
            if 2 * m == n {
                self.buffer[m] = Complex64::new(c.re, 0.0);
            } else {
                self.buffer[m] = *c;
                self.buffer[n - m] = c.conj();
            }
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        for (o, b) in output.iter_mut().zip(&self.buffer) {
            *o = b.re;
        }
        Ok(())
    }
}
