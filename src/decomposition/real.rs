//! Decomposition descriptor of the real-space code.
//!
//! The real-space mesh stores one field-line coordinate array per outer
//! index ("surface"), and each process owns a contiguous range of it whose
//! length varies between surfaces.

use std::ops::Range;

use crate::coupler_error::CouplerError;
use crate::decomposition::axis::{
    AxisBoundary, AxisDecomposition, Segment, check_boundary, check_increasing, split_evenly,
};

/// Field-line coordinates of one surface and the locally owned range.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceLine {
    coords: Vec<f64>,
    range: Range<usize>,
}

impl SurfaceLine {
    pub fn new(coords: Vec<f64>, range: Range<usize>) -> Result<Self, CouplerError> {
        if range.start > range.end || range.end > coords.len() {
            return Err(CouplerError::Config(format!(
                "surface range {range:?} outside {} coordinates",
                coords.len()
            )));
        }
        check_increasing(&coords, "surface")?;
        Ok(Self { coords, range })
    }

    /// Even split of `coords` over `parts`, keeping the range of `part`.
    pub fn split(coords: Vec<f64>, parts: usize, part: usize) -> Result<Self, CouplerError> {
        let d = AxisDecomposition::from_counts(&split_evenly(coords.len(), parts), part)?;
        Self::new(coords, d.range())
    }

    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    #[inline]
    pub fn local_coords(&self) -> &[f64] {
        &self.coords[self.range.clone()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Per-process view of the real-space code's mesh.
#[derive(Clone, Debug)]
pub struct RealMesh {
    x: AxisDecomposition,
    angular: AxisDecomposition,
    surfaces: Vec<SurfaceLine>,
    z_boundary: AxisBoundary,
}

impl RealMesh {
    /// `surfaces[i]` belongs to the `i`-th locally owned outer index.
    pub fn new(
        x: AxisDecomposition,
        angular: AxisDecomposition,
        surfaces: Vec<SurfaceLine>,
        z_boundary: AxisBoundary,
    ) -> Result<Self, CouplerError> {
        if surfaces.len() != x.len() {
            return Err(CouplerError::Config(format!(
                "real mesh has {} surfaces for {} local outer indices",
                surfaces.len(),
                x.len()
            )));
        }
        for s in &surfaces {
            check_boundary(&z_boundary, s.coords(), "surface")?;
        }
        Ok(Self {
            x,
            angular,
            surfaces,
            z_boundary,
        })
    }

    #[inline]
    pub fn x(&self) -> &AxisDecomposition {
        &self.x
    }

    /// Decomposition of the real angular samples.
    #[inline]
    pub fn angular(&self) -> &AxisDecomposition {
        &self.angular
    }

    #[inline]
    pub fn surfaces(&self) -> &[SurfaceLine] {
        &self.surfaces
    }

    #[inline]
    pub fn surface(&self, i: usize) -> &SurfaceLine {
        &self.surfaces[i]
    }

    #[inline]
    pub fn z_boundary(&self) -> &AxisBoundary {
        &self.z_boundary
    }

    /// Local field-line count per local outer index.
    pub fn z_counts(&self) -> Vec<usize> {
        self.surfaces.iter().map(SurfaceLine::len).collect()
    }

    /// Locally owned segment of surface `i`.
    pub fn segment(&self, i: usize) -> Segment<'_> {
        let s = &self.surfaces[i];
        Segment::new(&s.coords, s.range(), &self.z_boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_split_independently() {
        let a = SurfaceLine::split(vec![0.0, 1.0, 2.0, 3.0, 4.0], 2, 1).unwrap();
        assert_eq!(a.range(), 3..5);
        let b = SurfaceLine::split(vec![0.5, 1.5, 2.5, 3.5, 4.5, 5.5, 6.0], 2, 1).unwrap();
        let mesh = RealMesh::new(
            AxisDecomposition::even(2, 1, 0).unwrap(),
            AxisDecomposition::even(8, 1, 0).unwrap(),
            vec![a, b],
            AxisBoundary::Periodic { period: 10.0 },
        )
        .unwrap();
        assert_eq!(mesh.z_counts(), vec![2, 3]);
        assert_eq!(mesh.segment(1).local_coords(), &[4.5, 5.5, 6.0]);
    }

    #[test]
    fn surface_count_must_match_outer_range() {
        let a = SurfaceLine::split(vec![0.0, 1.0], 1, 0).unwrap();
        let err = RealMesh::new(
            AxisDecomposition::even(2, 1, 0).unwrap(),
            AxisDecomposition::even(8, 1, 0).unwrap(),
            vec![a],
            AxisBoundary::periodic(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn unsorted_surface_is_rejected() {
        assert!(SurfaceLine::new(vec![0.0, 2.0, 1.0], 0..3).is_err());
        assert!(SurfaceLine::new(vec![0.0, 1.0], 0..3).is_err());
    }
}
