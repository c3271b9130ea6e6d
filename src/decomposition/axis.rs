//! Block decomposition of one mesh coordinate, and its boundary rule.

use std::f64::consts::TAU;
use std::ops::Range;

use itertools::Itertools;

use crate::coupler_error::CouplerError;

/// Contiguous block decomposition of `0..global` into ordered parts.
///
/// `offsets` has one entry per part plus a trailing `global`; part `p` owns
/// `offsets[p]..offsets[p + 1]`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AxisDecomposition {
    offsets: Vec<usize>,
    part: usize,
}

/// Counts of an even split: the first `global % parts` parts get one extra.
pub fn split_evenly(global: usize, parts: usize) -> Vec<usize> {
    let base = global / parts.max(1);
    let rem = global % parts.max(1);
    (0..parts).map(|p| base + usize::from(p < rem)).collect()
}

impl AxisDecomposition {
    /// Even split of `global` indices into `parts`, viewed from `part`.
    pub fn even(global: usize, parts: usize, part: usize) -> Result<Self, CouplerError> {
        if parts == 0 {
            return Err(CouplerError::Config("axis must have at least one part".into()));
        }
        Self::from_counts(&split_evenly(global, parts), part)
    }

    /// Decomposition with explicit per-part counts, viewed from `part`.
    pub fn from_counts(counts: &[usize], part: usize) -> Result<Self, CouplerError> {
        if counts.is_empty() {
            return Err(CouplerError::Config("axis must have at least one part".into()));
        }
        if part >= counts.len() {
            return Err(CouplerError::Config(format!(
                "part {part} out of range for {} parts",
                counts.len()
            )));
        }
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0);
        for c in counts {
            offsets.push(offsets[offsets.len() - 1] + c);
        }
        Ok(Self { offsets, part })
    }

    /// The same decomposition seen from another part.
    pub fn with_part(&self, part: usize) -> Result<Self, CouplerError> {
        if part >= self.parts() {
            return Err(CouplerError::Config(format!(
                "part {part} out of range for {} parts",
                self.parts()
            )));
        }
        Ok(Self {
            offsets: self.offsets.clone(),
            part,
        })
    }

    #[inline]
    pub fn global(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    #[inline]
    pub fn parts(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn part(&self) -> usize {
        self.part
    }

    /// Locally owned global index range.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range_of(self.part)
    }

    #[inline]
    pub fn range_of(&self, part: usize) -> Range<usize> {
        self.offsets[part]..self.offsets[part + 1]
    }

    #[inline]
    pub fn len_of(&self, part: usize) -> usize {
        self.offsets[part + 1] - self.offsets[part]
    }

    /// Number of locally owned indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.range().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.offsets[self.part]
    }

    #[inline]
    pub fn is_first(&self) -> bool {
        self.part == 0
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.part + 1 == self.parts()
    }

    /// Per-part counts.
    pub fn counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// How coordinates continue past the global ends of an axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AxisBoundary {
    /// The axis wraps; coordinates shift by one `period` across the seam.
    Periodic { period: f64 },
    /// Physical boundary. `low`/`high` hold externally computed ghost
    /// coordinates, nearest-to-boundary last for `low` and first for `high`.
    Open { low: Vec<f64>, high: Vec<f64> },
}

impl AxisBoundary {
    /// Periodic over one full turn (2π).
    pub fn periodic() -> Self {
        AxisBoundary::Periodic { period: TAU }
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        matches!(self, AxisBoundary::Periodic { .. })
    }
}

/// A locally owned segment of a global coordinate array.
#[derive(Clone, Copy, Debug)]
pub struct Segment<'a> {
    /// All global coordinates of the line, strictly increasing.
    pub coords: &'a [f64],
    /// Locally owned index range into `coords`.
    pub start: usize,
    pub end: usize,
    pub boundary: &'a AxisBoundary,
}

impl<'a> Segment<'a> {
    pub fn new(coords: &'a [f64], range: Range<usize>, boundary: &'a AxisBoundary) -> Self {
        Self {
            coords,
            start: range.start,
            end: range.end,
            boundary,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn local_coords(&self) -> &'a [f64] {
        &self.coords[self.start..self.end]
    }

    #[inline]
    pub fn touches_low_edge(&self) -> bool {
        self.start == 0
    }

    #[inline]
    pub fn touches_high_edge(&self) -> bool {
        self.end == self.coords.len()
    }
}

pub(crate) fn check_increasing(coords: &[f64], what: &str) -> Result<(), CouplerError> {
    match coords.iter().tuple_windows().position(|(a, b)| !(a < b)) {
        Some(i) => Err(CouplerError::Config(format!(
            "{what} coordinates not strictly increasing at index {}",
            i + 1
        ))),
        None => Ok(()),
    }
}

pub(crate) fn check_boundary(
    boundary: &AxisBoundary,
    coords: &[f64],
    what: &str,
) -> Result<(), CouplerError> {
    let (Some(&first), Some(&last)) = (coords.first(), coords.last()) else {
        return Ok(());
    };
    match boundary {
        AxisBoundary::Periodic { period } => {
            if !(last - first < *period) {
                return Err(CouplerError::Config(format!(
                    "{what} coordinates span {} which is not shorter than the period {period}",
                    last - first
                )));
            }
        }
        AxisBoundary::Open { low, high } => {
            // Ghosts must continue the line: increasing, below the first
            // and above the last coordinate.
            check_increasing(low, &format!("{what} low ghost"))?;
            check_increasing(high, &format!("{what} high ghost"))?;
            if low.last().is_some_and(|&g| !(g < first)) {
                return Err(CouplerError::Config(format!(
                    "{what} low ghost coordinates {low:?} do not lie below {first}"
                )));
            }
            if high.first().is_some_and(|&g| !(g > last)) {
                return Err(CouplerError::Config(format!(
                    "{what} high ghost coordinates {high:?} do not lie above {last}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split_gives_remainder_to_first_parts() {
        assert_eq!(split_evenly(10, 3), vec![4, 3, 3]);
        let d = AxisDecomposition::even(10, 3, 1).unwrap();
        assert_eq!(d.range(), 4..7);
        assert_eq!(d.global(), 10);
        assert!(!d.is_first() && !d.is_last());
        assert_eq!(d.with_part(2).unwrap().range(), 7..10);
    }

    #[test]
    fn rejects_out_of_range_part() {
        assert!(AxisDecomposition::even(8, 2, 2).is_err());
        assert!(AxisDecomposition::from_counts(&[], 0).is_err());
    }

    #[test]
    fn segment_edges() {
        let coords = [0.0, 1.0, 2.0, 3.0];
        let b = AxisBoundary::periodic();
        let s = Segment::new(&coords, 0..2, &b);
        assert!(s.touches_low_edge() && !s.touches_high_edge());
        assert_eq!(s.local_coords(), &[0.0, 1.0]);
    }

    #[test]
    fn period_must_exceed_span() {
        let b = AxisBoundary::Periodic { period: 1.0 };
        assert!(check_boundary(&b, &[0.0, 0.5, 1.0], "z").is_err());
        assert!(check_boundary(&b, &[0.0, 0.5, 0.9], "z").is_ok());
    }

    #[test]
    fn open_ghosts_must_continue_the_line() {
        let z = [0.0, 1.0, 2.0, 3.0];
        let open = |low: Vec<f64>, high: Vec<f64>| AxisBoundary::Open { low, high };
        assert!(check_boundary(&open(vec![-2.0, -1.0], vec![4.0, 5.0]), &z, "z").is_ok());
        // Ghosts inside the line, out of order, or on the wrong side.
        for b in [
            open(vec![5.0, 6.0], vec![4.0, 5.0]),
            open(vec![-1.0, -2.0], vec![4.0, 5.0]),
            open(vec![-2.0, 0.0], vec![4.0, 5.0]),
            open(vec![-2.0, -1.0], vec![3.0, 4.0]),
            open(vec![-2.0, -1.0], vec![5.0, 4.0]),
        ] {
            assert!(matches!(check_boundary(&b, &z, "z"), Err(CouplerError::Config(_))), "{b:?}");
        }
    }
}
