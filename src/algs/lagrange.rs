//! Third-order Lagrange interpolation on 1-D samples.
//!
//! The batched entry point walks the output coordinates with a bracket index
//! that only moves forward, so output coordinates must be non-decreasing.
//! Both orderings are validated up front instead of trusting the caller.

use std::fmt::Debug;
use std::ops::{Add, Mul};

use num_traits::Zero;

use crate::coupler_error::CouplerError;

/// Sample types the kernel can interpolate: anything that adds and scales by
/// a real weight. Implemented for `f64` and `Complex64`.
pub trait Sample:
    Copy + Default + Debug + Zero + Add<Output = Self> + Mul<f64, Output = Self> + Send + Sync + 'static
{
}

impl<T> Sample for T where
    T: Copy
        + Default
        + Debug
        + Zero
        + Add<Output = T>
        + Mul<f64, Output = T>
        + Send
        + Sync
        + 'static
{
}

/// Cubic Lagrange polynomial through `(x[i], y[i])`, evaluated at `at`.
///
/// The four abscissae must be distinct.
#[inline]
pub fn lagrange4<T: Sample>(x: &[f64; 4], y: &[T; 4], at: f64) -> T {
    let l0 = (at - x[1]) * (at - x[2]) * (at - x[3])
        / ((x[0] - x[1]) * (x[0] - x[2]) * (x[0] - x[3]));
    let l1 = (at - x[0]) * (at - x[2]) * (at - x[3])
        / ((x[1] - x[0]) * (x[1] - x[2]) * (x[1] - x[3]));
    let l2 = (at - x[0]) * (at - x[1]) * (at - x[3])
        / ((x[2] - x[0]) * (x[2] - x[1]) * (x[2] - x[3]));
    let l3 = (at - x[0]) * (at - x[1]) * (at - x[2])
        / ((x[3] - x[0]) * (x[3] - x[1]) * (x[3] - x[2]));
    y[0] * l0 + y[1] * l1 + y[2] * l2 + y[3] * l3
}

/// Interpolate `yin(xin)` onto every coordinate of `xout`, writing `yout`.
///
/// For each target the four samples `[j-2, j+1]` around the bracket index `j`
/// are used; `j` starts at 2 and only advances while the target lies at or
/// beyond `xin[j]`, clamped so the window stays inside the input. Targets
/// beyond the outermost brackets therefore reuse the edge window
/// (extrapolation).
///
/// Returns the number of targets that fell outside `[xin[0], xin[n-1]]`.
///
/// # Errors
/// `InvalidArgument` if fewer than 4 inputs are given, `xin` is not strictly
/// increasing or `xout` is not non-decreasing; `LengthMismatch` if paired
/// slices differ in length.
pub fn interpolate_into<T: Sample>(
    xin: &[f64],
    yin: &[T],
    xout: &[f64],
    yout: &mut [T],
) -> Result<usize, CouplerError> {
    let n = xin.len();
    if n < 4 {
        return Err(CouplerError::InvalidArgument(format!(
            "cubic interpolation needs at least 4 input samples, got {n}"
        )));
    }
    CouplerError::expect_len("interpolation input values", n, yin.len())?;
    CouplerError::expect_len("interpolation output values", xout.len(), yout.len())?;
    if let Some(i) = xin.windows(2).position(|w| !(w[0] < w[1])) {
        return Err(CouplerError::InvalidArgument(format!(
            "input coordinates not strictly increasing at index {}",
            i + 1
        )));
    }
    if let Some(i) = xout.windows(2).position(|w| !(w[0] <= w[1])) {
        return Err(CouplerError::InvalidArgument(format!(
            "output coordinates not non-decreasing at index {}",
            i + 1
        )));
    }

    let (lo, hi) = (xin[0], xin[n - 1]);
    let mut extrapolated = 0;
    let mut j = 2;
    for (out, &x) in yout.iter_mut().zip(xout) {
        while j < n - 2 && x >= xin[j] {
            j += 1;
        }
        if x < lo || x > hi {
            extrapolated += 1;
        }
        let xs = [xin[j - 2], xin[j - 1], xin[j], xin[j + 1]];
        let ys = [yin[j - 2], yin[j - 1], yin[j], yin[j + 1]];
        *out = lagrange4(&xs, &ys, x);
    }
    if extrapolated > 0 {
        log::debug!(
            "{extrapolated} of {} interpolation targets outside [{lo}, {hi}]; edge window reused",
            xout.len()
        );
    }
    Ok(extrapolated)
}

/// Allocating convenience wrapper around [`interpolate_into`].
pub fn interpolate<T: Sample>(xin: &[f64], yin: &[T], xout: &[f64]) -> Result<Vec<T>, CouplerError> {
    let mut yout = vec![T::zero(); xout.len()];
    interpolate_into(xin, yin, xout, &mut yout)?;
    Ok(yout)
}
