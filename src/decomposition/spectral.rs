//! Decomposition descriptor of the spectral code (angular Fourier modes).

use crate::coupler_error::CouplerError;
use crate::decomposition::axis::{
    AxisBoundary, AxisDecomposition, Segment, check_boundary, check_increasing,
};
use crate::decomposition::process_grid::{Axis, ProcessGrid};

/// Per-process view of the spectral code's mesh.
///
/// `x` is the outer (radial) index, `y` counts complex angular modes and `z`
/// is the field-line coordinate with one global coordinate array.
#[derive(Clone, Debug)]
pub struct SpectralMesh {
    grid: ProcessGrid,
    x: AxisDecomposition,
    y: AxisDecomposition,
    z: AxisDecomposition,
    z_coords: Vec<f64>,
    z_boundary: AxisBoundary,
}

impl SpectralMesh {
    /// Validate and assemble a descriptor. Each axis decomposition must have
    /// as many parts as the grid along that axis, viewed from this process.
    pub fn new(
        grid: ProcessGrid,
        x: AxisDecomposition,
        y: AxisDecomposition,
        z: AxisDecomposition,
        z_coords: Vec<f64>,
        z_boundary: AxisBoundary,
    ) -> Result<Self, CouplerError> {
        for (name, axis, d) in [("x", Axis::X, &x), ("y", Axis::Y, &y), ("z", Axis::Z, &z)] {
            if d.parts() != grid.parts(axis) || d.part() != grid.coord(axis) {
                return Err(CouplerError::Config(format!(
                    "spectral {name} decomposition (part {} of {}) disagrees with process grid {:?} at {:?}",
                    d.part(),
                    d.parts(),
                    grid.dims(),
                    grid.coords()
                )));
            }
        }
        if z_coords.len() != z.global() {
            return Err(CouplerError::Config(format!(
                "spectral z has {} coordinates for {} points",
                z_coords.len(),
                z.global()
            )));
        }
        check_increasing(&z_coords, "spectral z")?;
        check_boundary(&z_boundary, &z_coords, "spectral z")?;
        Ok(Self {
            grid,
            x,
            y,
            z,
            z_coords,
            z_boundary,
        })
    }

    #[inline]
    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }

    #[inline]
    pub fn x(&self) -> &AxisDecomposition {
        &self.x
    }

    /// Angular mode decomposition.
    #[inline]
    pub fn y(&self) -> &AxisDecomposition {
        &self.y
    }

    #[inline]
    pub fn z(&self) -> &AxisDecomposition {
        &self.z
    }

    #[inline]
    pub fn z_boundary(&self) -> &AxisBoundary {
        &self.z_boundary
    }

    /// Global field-line coordinates.
    #[inline]
    pub fn z_coords(&self) -> &[f64] {
        &self.z_coords
    }

    /// Field-line coordinates owned by this process.
    #[inline]
    pub fn local_z_coords(&self) -> &[f64] {
        &self.z_coords[self.z.range()]
    }

    /// Locally owned `z` segment, as consumed by the stencil builder.
    pub fn z_segment(&self) -> Segment<'_> {
        Segment::new(&self.z_coords, self.z.range(), &self.z_boundary)
    }

    /// Total number of angular modes across all `y` parts.
    #[inline]
    pub fn global_modes(&self) -> usize {
        self.y.global()
    }

    /// Length of a real angular line holding all modes.
    #[inline]
    pub fn angular_resolution(&self) -> usize {
        2 * self.y.global()
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
    fn local_view_follows_z_part() {
        let grid = ProcessGrid::new([1, 1, 2], [0, 0, 1]).unwrap();
        let mesh = SpectralMesh::new(
            grid,
            AxisDecomposition::even(3, 1, 0).unwrap(),
            AxisDecomposition::even(4, 1, 0).unwrap(),
            AxisDecomposition::even(8, 2, 1).unwrap(),
            uniform(8),
            AxisBoundary::periodic(),
        )
        .unwrap();
        assert_eq!(mesh.local_z_coords().len(), 4);
        assert!((mesh.local_z_coords()[0] - TAU / 2.0).abs() < 1e-12);
        assert_eq!(mesh.angular_resolution(), 8);
        assert!(mesh.z_segment().touches_high_edge());
    }

    #[test]
    fn rejects_grid_mismatch() {
        let grid = ProcessGrid::new([1, 1, 2], [0, 0, 0]).unwrap();
        let err = SpectralMesh::new(
            grid,
            AxisDecomposition::even(3, 1, 0).unwrap(),
            AxisDecomposition::even(4, 1, 0).unwrap(),
            AxisDecomposition::even(8, 1, 0).unwrap(),
            uniform(8),
            AxisBoundary::periodic(),
        );
        assert!(matches!(err, Err(CouplerError::Config(_))));
    }
}
