//! Cartesian process grid shared by both coupled codes.

use crate::coupler_error::CouplerError;

/// One of the three mesh coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Radial / outer index.
    X,
    /// Angular (binormal) coordinate; modes on the spectral side.
    Y,
    /// Field-line coordinate along which interpolation runs.
    Z,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Process grid of shape `[npx, npy, npz]`. Linear ranks run with `x`
/// fastest: `rank = px + npx * (py + npy * pz)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessGrid {
    dims: [usize; 3],
    coords: [usize; 3],
}

impl ProcessGrid {
    pub fn new(dims: [usize; 3], coords: [usize; 3]) -> Result<Self, CouplerError> {
        if dims.contains(&0) {
            return Err(CouplerError::Config(format!(
                "process grid {dims:?} has an empty dimension"
            )));
        }
        if coords.iter().zip(&dims).any(|(c, d)| c >= d) {
            return Err(CouplerError::Config(format!(
                "process coordinates {coords:?} outside grid {dims:?}"
            )));
        }
        Ok(Self { dims, coords })
    }

    /// Grid position of linear `rank`.
    pub fn from_rank(dims: [usize; 3], rank: usize) -> Result<Self, CouplerError> {
        let size: usize = dims.iter().product();
        if rank >= size {
            return Err(CouplerError::Config(format!(
                "rank {rank} outside process grid {dims:?}"
            )));
        }
        let px = rank % dims[0].max(1);
        let py = (rank / dims[0].max(1)) % dims[1].max(1);
        let pz = rank / (dims[0] * dims[1]).max(1);
        Self::new(dims, [px, py, pz])
    }

    /// Process grid with a single process.
    pub fn serial() -> Self {
        Self {
            dims: [1, 1, 1],
            coords: [0, 0, 0],
        }
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn parts(&self, axis: Axis) -> usize {
        self.dims[axis.index()]
    }

    #[inline]
    pub fn coord(&self, axis: Axis) -> usize {
        self.coords[axis.index()]
    }

    #[inline]
    pub fn rank_of(&self, coords: [usize; 3]) -> usize {
        coords[0] + self.dims[0] * (coords[1] + self.dims[1] * coords[2])
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank_of(self.coords)
    }

    /// Rank `offset` steps along `axis`, wrapping around the grid.
    pub fn neighbor(&self, axis: Axis, offset: isize) -> usize {
        let n = self.dims[axis.index()] as isize;
        let mut c = self.coords;
        c[axis.index()] = (c[axis.index()] as isize + offset).rem_euclid(n) as usize;
        self.rank_of(c)
    }

    /// Ranks of all processes sharing this process' coordinates except along
    /// `axis`, ordered by their coordinate along `axis`.
    pub fn line(&self, axis: Axis) -> Vec<usize> {
        (0..self.dims[axis.index()])
            .map(|p| {
                let mut c = self.coords;
                c[axis.index()] = p;
                self.rank_of(c)
            })
            .collect()
    }
}
