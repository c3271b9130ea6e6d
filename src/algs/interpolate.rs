//! Cross-grid interpolation along the field-line coordinate.
//!
//! The two codes decompose `z` independently: the spectral code shares one
//! coordinate array between all outer indices, the real-space code has one
//! per surface. [`CrossGridInterpolator`] builds every stencil once from the
//! two descriptors and then maps lines between the grids:
//!
//! - density: spectral `z` segment → real surface coordinates of each `i`;
//! - potential: real surface segment of each `i` → spectral `z` coordinates.
//!
//! Halo values must already be in place; no communication happens here.

use crate::algs::lagrange::Sample;
use crate::algs::stencil::Stencil;
use crate::coupler_error::CouplerError;
use crate::data::field_buffer::FieldBuffer;
use crate::data::halo::HaloBuffers;
use crate::decomposition::{RealMesh, SpectralMesh};

#[derive(Clone, Debug)]
struct Stencils<T> {
    spectral: Stencil<T>,
    spectral_targets: Vec<f64>,
    surfaces: Vec<Stencil<T>>,
    surface_targets: Vec<Vec<f64>>,
}

/// Precomputed stencils for both transfer directions.
///
/// Constructed disabled when preprocessing is off: no stencils are built and
/// every interpolation call returns [`CouplerError::PreprocessingDisabled`].
#[derive(Clone, Debug)]
pub struct CrossGridInterpolator<T> {
    width: usize,
    modes: usize,
    stencils: Option<Stencils<T>>,
}

impl<T: Sample> CrossGridInterpolator<T> {
    /// Build the stencils of both directions with `width` halo slots.
    pub fn new(spectral: &SpectralMesh, real: &RealMesh, width: usize) -> Result<Self, CouplerError> {
        if spectral.x().len() != real.surfaces().len() {
            return Err(CouplerError::Config(format!(
                "spectral mesh owns {} outer indices, real mesh {}",
                spectral.x().len(),
                real.surfaces().len()
            )));
        }
        let spectral_stencil = Stencil::build(&spectral.z_segment(), width, 0)?;
        let mut surfaces = Vec::with_capacity(real.surfaces().len());
        let mut surface_targets = Vec::with_capacity(real.surfaces().len());
        for (i, surface) in real.surfaces().iter().enumerate() {
            surfaces.push(Stencil::build(&real.segment(i), width, i)?);
            surface_targets.push(surface.local_coords().to_vec());
        }
        Ok(Self {
            width,
            modes: spectral.y().len(),
            stencils: Some(Stencils {
                spectral: spectral_stencil,
                spectral_targets: spectral.local_z_coords().to_vec(),
                surfaces,
                surface_targets,
            }),
        })
    }

    /// An interpolator that refuses to run.
    pub fn disabled(spectral: &SpectralMesh, width: usize) -> Self {
        Self {
            width,
            modes: spectral.y().len(),
            stencils: None,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.stencils.is_some()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extended coordinates of the spectral segment.
    pub fn spectral_coords(&self) -> Option<&[f64]> {
        self.stencils.as_ref().map(|s| s.spectral.coords())
    }

    /// Extended coordinates of surface `i`.
    pub fn surface_coords(&self, i: usize) -> Option<&[f64]> {
        self.stencils
            .as_ref()
            .and_then(|s| s.surfaces.get(i))
            .map(|s| s.coords())
    }

    /// Spectral lines `(i, j)` of `input`, extended by `halos`, onto the
    /// real surface coordinates; writes `output`.
    ///
    /// Returns the number of extrapolated targets.
    pub fn density(
        &mut self,
        input: &FieldBuffer<T>,
        halos: &HaloBuffers<T>,
        output: &mut FieldBuffer<T>,
    ) -> Result<usize, CouplerError> {
        let (width, modes) = (self.width, self.modes);
        let st = self
            .stencils
            .as_mut()
            .ok_or(CouplerError::PreprocessingDisabled)?;
        let outer = st.surfaces.len();
        check_field(input, outer, modes, |_| st.spectral_targets.len())?;
        check_field(output, outer, modes, |i| st.surface_targets[i].len())?;
        halos.check_shape(outer, modes, width)?;

        let mut extrapolated = 0;
        for i in 0..outer {
            for j in 0..modes {
                st.spectral
                    .load(halos.low(i, j), input.line(i, j), halos.high(i, j))?;
                extrapolated += st
                    .spectral
                    .interpolate_into(&st.surface_targets[i], output.line_mut(i, j))?;
            }
        }
        report("density", extrapolated);
        Ok(extrapolated)
    }

    /// Real-surface lines `(i, j)` of `input`, extended by `halos`, onto the
    /// spectral `z` coordinates; writes `output`.
    ///
    /// Returns the number of extrapolated targets.
    pub fn potential(
        &mut self,
        input: &FieldBuffer<T>,
        halos: &HaloBuffers<T>,
        output: &mut FieldBuffer<T>,
    ) -> Result<usize, CouplerError> {
        let (width, modes) = (self.width, self.modes);
        let st = self
            .stencils
            .as_mut()
            .ok_or(CouplerError::PreprocessingDisabled)?;
        let outer = st.surfaces.len();
        check_field(input, outer, modes, |i| st.surface_targets[i].len())?;
        check_field(output, outer, modes, |_| st.spectral_targets.len())?;
        halos.check_shape(outer, modes, width)?;

        let mut extrapolated = 0;
        for (i, stencil) in st.surfaces.iter_mut().enumerate() {
            for j in 0..modes {
                stencil.load(halos.low(i, j), input.line(i, j), halos.high(i, j))?;
                extrapolated += stencil.interpolate_into(&st.spectral_targets, output.line_mut(i, j))?;
            }
        }
        report("potential", extrapolated);
        Ok(extrapolated)
    }
}

fn check_field<T>(
    buf: &FieldBuffer<T>,
    outer: usize,
    modes: usize,
    inner: impl Fn(usize) -> usize,
) -> Result<(), CouplerError> {
    let layout = buf.layout();
    CouplerError::expect_len("field outer extent", outer, layout.outer())?;
    CouplerError::expect_len("field mode extent", modes, layout.modes())?;
    for i in 0..outer {
        CouplerError::expect_len("field line", inner(i), layout.inner(i))?;
    }
    Ok(())
}

fn report(direction: &str, extrapolated: usize) {
    if extrapolated > 0 {
        log::warn!("{direction} interpolation extrapolated {extrapolated} targets past the stencil");
    }
}
