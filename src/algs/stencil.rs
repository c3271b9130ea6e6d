//! Boundary-aware stencil construction along a decomposed coordinate.
//!
//! The stencil of a local segment is the segment itself extended by
//! `width` halo slots at both ends, so the cubic kernel always finds a
//! bracketing window near the segment's own edges. Halo coordinates come
//! from the descriptor's global coordinate array (shifted by one period
//! across a periodic seam, or supplied externally at an open boundary);
//! halo values come from the halo buffers.

use crate::algs::lagrange::{Sample, interpolate_into};
use crate::coupler_error::CouplerError;
use crate::decomposition::axis::{AxisBoundary, Segment};

/// Coordinates of `seg` extended by `width` halo slots at each end.
///
/// `outer` only labels errors.
///
/// # Errors
/// - `Config` if the segment is empty, or a halo window runs past the global
///   array (neighbour segment shorter than the halo).
/// - `MissingHalo` if an open boundary supplies fewer than `width` ghosts.
pub fn extended_coordinates(
    seg: &Segment<'_>,
    width: usize,
    outer: usize,
) -> Result<Vec<f64>, CouplerError> {
    if seg.is_empty() {
        return Err(CouplerError::Config(format!(
            "empty field-line segment at outer index {outer}"
        )));
    }
    let n = seg.coords.len();
    let mut out = Vec::with_capacity(seg.len() + 2 * width);

    if seg.touches_low_edge() {
        match seg.boundary {
            AxisBoundary::Periodic { period } => {
                if width > n {
                    return Err(wrap_too_wide(width, n, outer));
                }
                out.extend(seg.coords[n - width..].iter().map(|z| z - period));
            }
            AxisBoundary::Open { low, .. } => {
                if low.len() < width {
                    return Err(CouplerError::MissingHalo { edge: "low", outer });
                }
                out.extend_from_slice(&low[low.len() - width..]);
            }
        }
    } else {
        if seg.start < width {
            return Err(window_past_end("low", width, outer));
        }
        out.extend_from_slice(&seg.coords[seg.start - width..seg.start]);
    }

    out.extend_from_slice(seg.local_coords());

    if seg.touches_high_edge() {
        match seg.boundary {
            AxisBoundary::Periodic { period } => {
                if width > n {
                    return Err(wrap_too_wide(width, n, outer));
                }
                out.extend(seg.coords[..width].iter().map(|z| z + period));
            }
            AxisBoundary::Open { high, .. } => {
                if high.len() < width {
                    return Err(CouplerError::MissingHalo { edge: "high", outer });
                }
                out.extend_from_slice(&high[..width]);
            }
        }
    } else {
        if seg.end + width > n {
            return Err(window_past_end("high", width, outer));
        }
        out.extend_from_slice(&seg.coords[seg.end..seg.end + width]);
    }
    Ok(out)
}

fn wrap_too_wide(width: usize, n: usize, outer: usize) -> CouplerError {
    CouplerError::Config(format!(
        "halo width {width} exceeds the {n} points of the periodic line at outer index {outer}"
    ))
}

fn window_past_end(edge: &str, width: usize, outer: usize) -> CouplerError {
    CouplerError::Config(format!(
        "{edge} halo of width {width} runs past the global line at outer index {outer}"
    ))
}

/// Reusable extended coordinate/value arrays for one segment.
#[derive(Clone, Debug)]
pub struct Stencil<T> {
    width: usize,
    coords: Vec<f64>,
    values: Vec<T>,
}

impl<T: Sample> Stencil<T> {
    /// Stencil over `seg` with `width` halo slots per side.
    pub fn build(seg: &Segment<'_>, width: usize, outer: usize) -> Result<Self, CouplerError> {
        let coords = extended_coordinates(seg, width, outer)?;
        let values = vec![T::zero(); coords.len()];
        Ok(Self {
            width,
            coords,
            values,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of locally owned samples.
    #[inline]
    pub fn local_len(&self) -> usize {
        self.coords.len() - 2 * self.width
    }

    /// Fill the value channel with `low ++ local ++ high`.
    pub fn load(&mut self, low: &[T], local: &[T], high: &[T]) -> Result<(), CouplerError> {
        let w = self.width;
        let n = self.local_len();
        CouplerError::expect_len("low halo", w, low.len())?;
        CouplerError::expect_len("stencil line", n, local.len())?;
        CouplerError::expect_len("high halo", w, high.len())?;
        self.values[..w].copy_from_slice(low);
        self.values[w..w + n].copy_from_slice(local);
        self.values[w + n..].copy_from_slice(high);
        Ok(())
    }

    /// Interpolate the loaded values onto `xout`.
    pub fn interpolate_into(&self, xout: &[f64], yout: &mut [T]) -> Result<usize, CouplerError> {
        interpolate_into(&self.coords, &self.values, xout, yout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn uniform(n: usize) -> Vec<f64> {
        (0..n).map(|k| TAU * k as f64 / n as f64).collect()
    }

    #[test]
    fn first_segment_wraps_low() {
        let z = uniform(12);
        let b = AxisBoundary::periodic();
        let x = extended_coordinates(&Segment::new(&z, 0..4, &b), 2, 0).unwrap();
        assert_eq!(x.len(), 8);
        assert!((x[0] - (z[10] - TAU)).abs() < 1e-12);
        assert!((x[1] - (z[11] - TAU)).abs() < 1e-12);
        assert_eq!(&x[2..6], &z[0..4]);
        assert_eq!(&x[6..], &z[4..6]);
    }

    #[test]
    fn last_segment_wraps_high() {
        let z = uniform(12);
        let b = AxisBoundary::periodic();
        let x = extended_coordinates(&Segment::new(&z, 8..12, &b), 2, 0).unwrap();
        assert_eq!(&x[..2], &z[6..8]);
        assert!((x[6] - (z[0] + TAU)).abs() < 1e-12);
        assert!((x[7] - (z[1] + TAU)).abs() < 1e-12);
    }

    #[test]
    fn single_segment_wraps_both_ends() {
        let z = uniform(6);
        let b = AxisBoundary::periodic();
        let x = extended_coordinates(&Segment::new(&z, 0..6, &b), 2, 0).unwrap();
        assert!(x.windows(2).all(|w| w[0] < w[1]));
        assert!((x[0] - (z[4] - TAU)).abs() < 1e-12);
        assert!((x[9] - (z[1] + TAU)).abs() < 1e-12);
    }

    #[test]
    fn open_boundary_needs_supplied_ghosts() {
        let z = [0.0, 1.0, 2.0, 3.0];
        let b = AxisBoundary::Open {
            low: vec![-1.0],
            high: vec![4.0, 5.0],
        };
        let err = extended_coordinates(&Segment::new(&z, 0..4, &b), 2, 3).unwrap_err();
        assert_eq!(err, CouplerError::MissingHalo { edge: "low", outer: 3 });
        let b = AxisBoundary::Open {
            low: vec![-3.0, -2.0, -1.0],
            high: vec![4.0, 5.0],
        };
        let x = extended_coordinates(&Segment::new(&z, 0..4, &b), 2, 0).unwrap();
        assert_eq!(x, vec![-2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn load_places_literal_halo_values() {
        let z = uniform(12);
        let b = AxisBoundary::periodic();
        let mut s = Stencil::<f64>::build(&Segment::new(&z, 4..8, &b), 2, 0).unwrap();
        s.load(&[7.0, 8.0], &[1.0, 2.0, 3.0, 4.0], &[9.0, 10.0]).unwrap();
        assert_eq!(s.values(), &[7.0, 8.0, 1.0, 2.0, 3.0, 4.0, 9.0, 10.0]);
        assert!(s.load(&[7.0], &[1.0, 2.0, 3.0, 4.0], &[9.0, 10.0]).is_err());
    }
}
