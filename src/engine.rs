//! The per-process field processor.
//!
//! [`FieldProcessor`] owns both mesh descriptors, the transform plans and
//! every field buffer of one coupling step. Everything is validated and
//! allocated in [`FieldProcessor::new`]; the step operations never allocate
//! field storage and never see a half-built processor.
//!
//! Density (spectral code → real-space code):
//! `receive_density` → `exchange_density_halos` → `interpolate_density` →
//! `density_to_real` → `assemble_density`.
//!
//! Potential (real-space code → spectral code):
//! `receive_potential` → `potential_to_complex` → `exchange_potential_halos`
//! → `interpolate_potential` → `assemble_potential`.
//!
//! `process_density` / `process_potential` run the middle stages in order.

use num_complex::Complex64;

use crate::algs::boundary_exchange::{EdgeFill, ZLinks, exchange_z_halos};
use crate::algs::communicator::Communicator;
use crate::algs::interpolate::CrossGridInterpolator;
use crate::config::{CouplerConfig, TestCase, TransformMode};
use crate::coupler_error::CouplerError;
use crate::data::field_buffer::{FieldBuffer, FieldLayout};
use crate::data::halo::HaloBuffers;
use crate::decomposition::{Axis, AxisDecomposition, RealMesh, SpectralMesh};
use crate::test_case;
use crate::transform::{
    SpectralTransform, YGroup, complex_to_real, complex_to_real_decomposed, real_to_complex,
    real_to_complex_decomposed,
};

const DENSITY_HALO_TAG: u16 = 0x100;
const POTENTIAL_HALO_TAG: u16 = 0x200;
const DENSITY_TRANSPOSE_TAG: u16 = 0x300;
const POTENTIAL_TRANSPOSE_TAG: u16 = 0x400;

/// Halo filler for open field lines.
pub type ComplexEdge<'a> = Option<&'a dyn EdgeFill<Complex64>>;

#[derive(Debug)]
pub struct FieldProcessor {
    config: CouplerConfig,
    spectral: SpectralMesh,
    real: RealMesh,
    density_angles: AxisDecomposition,
    synthesis: SpectralTransform,
    analysis: SpectralTransform,
    density_group: Option<YGroup>,
    potential_group: Option<YGroup>,
    links: ZLinks,
    interp: CrossGridInterpolator<Complex64>,

    density_in: FieldBuffer<Complex64>,
    density_halo: HaloBuffers<Complex64>,
    density_interp: FieldBuffer<Complex64>,
    density_out: FieldBuffer<f64>,

    potential_in: FieldBuffer<f64>,
    potential_spec: FieldBuffer<Complex64>,
    potential_halo: HaloBuffers<Complex64>,
    potential_out: FieldBuffer<Complex64>,
}

fn fatal(err: CouplerError) -> CouplerError {
    log::error!("field processor construction failed: {err}");
    err
}

impl FieldProcessor {
    /// Validate the two descriptors against each other and allocate every
    /// buffer and plan.
    ///
    /// # Errors
    /// `Config` or `Unsupported` for inconsistent descriptors or parameters;
    /// `MissingHalo` for an open line without ghost coordinates. All are
    /// fatal for the coupled run.
    pub fn new(
        spectral: SpectralMesh,
        real: RealMesh,
        config: CouplerConfig,
    ) -> Result<Self, CouplerError> {
        Self::build(spectral, real, config).map_err(fatal)
    }

    fn build(
        spectral: SpectralMesh,
        real: RealMesh,
        config: CouplerConfig,
    ) -> Result<Self, CouplerError> {
        config.validate()?;
        check_meshes(&spectral, &real, &config)?;

        let grid = *spectral.grid();
        // Density is synthesized on the spectral code's own angular grid;
        // the potential arrives on the real code's, which may be finer.
        let density_angles = AxisDecomposition::even(
            spectral.angular_resolution(),
            real.angular().parts(),
            real.angular().part(),
        )?;
        let (density_group, potential_group) = match config.transform_mode {
            TransformMode::Sequential => {
                if spectral.y().parts() > 1 || real.angular().parts() > 1 {
                    return Err(CouplerError::Unsupported(
                        "sequential transforms need every angular mode on one process",
                    ));
                }
                (None, None)
            }
            TransformMode::Decomposed => {
                let ranks = grid.line(Axis::Y);
                (
                    Some(YGroup::new(ranks.clone(), spectral.y().clone(), density_angles.clone())?),
                    Some(YGroup::new(ranks, spectral.y().clone(), real.angular().clone())?),
                )
            }
        };

        let interp = if config.preprocess {
            CrossGridInterpolator::new(&spectral, &real, config.halo_width)?
        } else {
            check_identity(&spectral, &real)?;
            CrossGridInterpolator::disabled(&spectral, config.halo_width)
        };

        let synthesis = SpectralTransform::new(spectral.angular_resolution())?;
        let analysis = SpectralTransform::new(real.angular().global())?;
        let links = ZLinks::new(&grid, spectral.z_boundary().is_periodic());

        let outer = spectral.x().len();
        let modes = spectral.y().len();
        let angles = real.angular().len();
        let density_local = density_angles.len();
        let w = config.halo_width;
        let spectral_z = FieldLayout::uniform(outer, modes, spectral.z().len());
        let real_z = |m| FieldLayout::ragged(m, real.z_counts());

        let this = Self {
            density_angles,
            synthesis,
            analysis,
            density_group,
            potential_group,
            links,
            interp,
            density_in: FieldBuffer::new(spectral_z.clone()),
            density_halo: HaloBuffers::new(outer, modes, w),
            density_interp: FieldBuffer::new(real_z(modes)),
            density_out: FieldBuffer::new(real_z(density_local)),
            potential_in: FieldBuffer::new(real_z(angles)),
            potential_spec: FieldBuffer::new(real_z(modes)),
            potential_halo: HaloBuffers::new(outer, modes, w),
            potential_out: FieldBuffer::new(spectral_z),
            spectral,
            real,
            config,
        };
        log::info!(
            "field processor at {:?}: {outer} surfaces, {modes}/{} modes, \
             {density_local}/{} density angles, {angles}/{} potential angles, \
             spectral z {}/{}, {:?}, preprocess {}, test case {:?}",
            this.spectral.grid().coords(),
            this.spectral.global_modes(),
            this.density_angles.global(),
            this.real.angular().global(),
            this.spectral.z().len(),
            this.spectral.z().global(),
            this.config.transform_mode,
            this.config.preprocess,
            this.config.test_case,
        );
        Ok(this)
    }

    #[inline]
    pub fn config(&self) -> &CouplerConfig {
        &self.config
    }

    #[inline]
    pub fn spectral(&self) -> &SpectralMesh {
        &self.spectral
    }

    #[inline]
    pub fn real(&self) -> &RealMesh {
        &self.real
    }

    /// Split of the density output's angular samples (`2 * modes` in
    /// total) over the y group.
    #[inline]
    pub fn density_angles(&self) -> &AxisDecomposition {
        &self.density_angles
    }

    /// Stencil construction and interpolation state.
    #[inline]
    pub fn interpolator(&self) -> &CrossGridInterpolator<Complex64> {
        &self.interp
    }

    /// Wire length of the spectral density input.
    pub fn density_input_len(&self) -> usize {
        self.density_in.layout().total_len()
    }

    /// Wire length of the real density output.
    pub fn density_output_len(&self) -> usize {
        self.density_out.layout().total_len()
    }

    pub fn potential_input_len(&self) -> usize {
        self.potential_in.layout().total_len()
    }

    pub fn potential_output_len(&self) -> usize {
        self.potential_output().layout().total_len()
    }

    pub fn density_input(&self) -> &FieldBuffer<Complex64> {
        &self.density_in
    }

    pub fn density_interpolated(&self) -> &FieldBuffer<Complex64> {
        &self.density_interp
    }

    pub fn density_output(&self) -> &FieldBuffer<f64> {
        &self.density_out
    }

    pub fn potential_spectral(&self) -> &FieldBuffer<Complex64> {
        &self.potential_spec
    }

    /// The spectral potential handed back to the spectral code. Without
    /// preprocessing this is the transformed buffer itself.
    pub fn potential_output(&self) -> &FieldBuffer<Complex64> {
        if self.config.preprocess {
            &self.potential_out
        } else {
            &self.potential_spec
        }
    }

    // ===== density ======================================================

    /// Load the spectral density from the other code's flat buffer, then
    /// apply the configured test case.
    pub fn receive_density(&mut self, wire: &[Complex64]) -> Result<(), CouplerError> {
        self.density_in.unpack(wire)?;
        test_case::seed_density(
            self.config.test_case,
            self.config.mode_number,
            &self.spectral,
            &mut self.density_in,
        );
        log::debug!("density input received ({} samples)", wire.len());
        Ok(())
    }

    pub fn exchange_density_halos<C: Communicator>(
        &mut self,
        comm: &C,
        edge: ComplexEdge<'_>,
    ) -> Result<(), CouplerError> {
        exchange_z_halos(
            &self.density_in,
            &mut self.density_halo,
            self.links,
            comm,
            DENSITY_HALO_TAG,
            edge,
        )
    }

    /// Spectral `z` → real surface `z`. Returns the extrapolated target count.
    pub fn interpolate_density(&mut self) -> Result<usize, CouplerError> {
        self.interp
            .density(&self.density_in, &self.density_halo, &mut self.density_interp)
    }

    /// Complex modes → real angular samples, scaled by `1 / (2 * modes)`.
    /// Reads the interpolated buffer, or the input directly when
    /// preprocessing is off.
    pub fn density_to_real<C: Communicator>(&mut self, comm: &C) -> Result<(), CouplerError> {
        let source = if self.config.preprocess {
            &self.density_interp
        } else {
            &self.density_in
        };
        match &self.density_group {
            None => complex_to_real(&mut self.synthesis, source, &mut self.density_out),
            Some(group) => complex_to_real_decomposed(
                &mut self.synthesis,
                group,
                comm,
                DENSITY_TRANSPOSE_TAG,
                source,
                &mut self.density_out,
            ),
        }
    }

    /// Copy the real density into the receiving code's flat buffer.
    pub fn assemble_density(&self, wire: &mut [f64]) -> Result<(), CouplerError> {
        self.density_out.pack_into(wire)
    }

    /// Halo exchange, interpolation and transform of a received density.
    pub fn process_density<C: Communicator>(
        &mut self,
        comm: &C,
        edge: ComplexEdge<'_>,
    ) -> Result<(), CouplerError> {
        if self.config.preprocess {
            self.exchange_density_halos(comm, edge)?;
            self.interpolate_density()?;
        }
        self.density_to_real(comm)?;
        log::debug!("density step done");
        Ok(())
    }

    // ===== potential ====================================================

    pub fn receive_potential(&mut self, wire: &[f64]) -> Result<(), CouplerError> {
        self.potential_in.unpack(wire)?;
        test_case::seed_potential(
            self.config.test_case,
            self.config.mode_number,
            &self.real,
            &mut self.potential_in,
        );
        log::debug!("potential input received ({} samples)", wire.len());
        Ok(())
    }

    /// Real angular samples → leading complex modes, scaled by
    /// `1 / real angular resolution`.
    pub fn potential_to_complex<C: Communicator>(&mut self, comm: &C) -> Result<(), CouplerError> {
        match &self.potential_group {
            None => real_to_complex(&mut self.analysis, &self.potential_in, &mut self.potential_spec),
            Some(group) => real_to_complex_decomposed(
                &mut self.analysis,
                group,
                comm,
                POTENTIAL_TRANSPOSE_TAG,
                &self.potential_in,
                &mut self.potential_spec,
            ),
        }
    }

    pub fn exchange_potential_halos<C: Communicator>(
        &mut self,
        comm: &C,
        edge: ComplexEdge<'_>,
    ) -> Result<(), CouplerError> {
        exchange_z_halos(
            &self.potential_spec,
            &mut self.potential_halo,
            self.links,
            comm,
            POTENTIAL_HALO_TAG,
            edge,
        )
    }

    /// Real surface `z` → spectral `z`. Returns the extrapolated target count.
    pub fn interpolate_potential(&mut self) -> Result<usize, CouplerError> {
        self.interp.potential(
            &self.potential_spec,
            &self.potential_halo,
            &mut self.potential_out,
        )
    }

    /// Copy the spectral potential into the receiving code's flat buffer.
    pub fn assemble_potential(&self, wire: &mut [Complex64]) -> Result<(), CouplerError> {
        self.potential_output().pack_into(wire)
    }

    /// Transform, halo exchange and interpolation of a received potential.
    pub fn process_potential<C: Communicator>(
        &mut self,
        comm: &C,
        edge: ComplexEdge<'_>,
    ) -> Result<(), CouplerError> {
        self.potential_to_complex(comm)?;
        if self.config.preprocess {
            self.exchange_potential_halos(comm, edge)?;
            self.interpolate_potential()?;
        }
        log::debug!("potential step done");
        Ok(())
    }
}

/// Cross-descriptor consistency.
fn check_meshes(
    spectral: &SpectralMesh,
    real: &RealMesh,
    config: &CouplerConfig,
) -> Result<(), CouplerError> {
    if spectral.x() != real.x() {
        return Err(CouplerError::Config(format!(
            "outer decompositions differ: spectral {:?} part {}, real {:?} part {}",
            spectral.x().counts(),
            spectral.x().part(),
            real.x().counts(),
            real.x().part()
        )));
    }
    let samples = real.angular().global();
    if samples < spectral.angular_resolution() || samples % 2 != 0 {
        return Err(CouplerError::Config(format!(
            "{samples} real angular samples for {} spectral modes (need an even count of at least {})",
            spectral.global_modes(),
            spectral.angular_resolution()
        )));
    }
    if spectral.z_boundary().is_periodic() != real.z_boundary().is_periodic() {
        return Err(CouplerError::Config(
            "spectral and real field lines disagree on periodicity".into(),
        ));
    }
    if config.test_case == TestCase::CosineMode && config.mode_number >= spectral.global_modes() {
        return Err(CouplerError::Config(format!(
            "test mode {} outside 1..{}",
            config.mode_number,
            spectral.global_modes()
        )));
    }

    let grid = spectral.grid();
    let (pz, npz) = (grid.coord(Axis::Z), grid.parts(Axis::Z));
    let w = config.halo_width;
    if spectral.z().len() < w {
        return Err(CouplerError::Config(format!(
            "spectral z segment of {} points is shorter than the halo width {w}",
            spectral.z().len()
        )));
    }
    for (i, s) in real.surfaces().iter().enumerate() {
        let r = s.range();
        if (r.start == 0) != (pz == 0) || (r.end == s.coords().len()) != (pz + 1 == npz) {
            return Err(CouplerError::Config(format!(
                "surface {i} range {r:?} of {} does not match z part {pz} of {npz}",
                s.coords().len()
            )));
        }
        if s.len() < w {
            return Err(CouplerError::Config(format!(
                "surface {i} segment of {} points is shorter than the halo width {w}",
                s.len()
            )));
        }
    }
    Ok(())
}

/// Without interpolation both codes must sample `z` identically.
fn check_identity(spectral: &SpectralMesh, real: &RealMesh) -> Result<(), CouplerError> {
    let z = spectral.local_z_coords();
    for (i, s) in real.surfaces().iter().enumerate() {
        let same = s.len() == z.len()
            && s
                .local_coords()
                .iter()
                .zip(z)
                .all(|(a, b)| (a - b).abs() <= 1e-12 * (1.0 + b.abs()));
        if !same {
            return Err(CouplerError::Config(format!(
                "preprocessing is off but surface {i} samples z differently from the spectral mesh"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::decomposition::{AxisBoundary, AxisDecomposition, ProcessGrid, SurfaceLine};
    use std::f64::consts::TAU;

    fn uniform(n: usize, shift: f64) -> Vec<f64> {
        (0..n).map(|k| TAU * (k as f64 + shift) / n as f64).collect()
    }

    fn serial(nz: usize, real_nz: &[usize], shift: f64) -> (SpectralMesh, RealMesh) {
        let x = AxisDecomposition::even(real_nz.len(), 1, 0).unwrap();
        let spectral = SpectralMesh::new(
            ProcessGrid::serial(),
            x.clone(),
            AxisDecomposition::even(4, 1, 0).unwrap(),
            AxisDecomposition::even(nz, 1, 0).unwrap(),
            uniform(nz, 0.0),
            AxisBoundary::periodic(),
        )
        .unwrap();
        let surfaces = real_nz
            .iter()
            .map(|&n| SurfaceLine::split(uniform(n, shift), 1, 0).unwrap())
            .collect();
        let real = RealMesh::new(
            x,
            AxisDecomposition::even(8, 1, 0).unwrap(),
            surfaces,
            AxisBoundary::periodic(),
        )
        .unwrap();
        (spectral, real)
    }

    #[test]
    fn rejects_wrong_angular_resolution() {
        let (s, _) = serial(16, &[16], 0.0);
        let real = RealMesh::new(
            s.x().clone(),
            AxisDecomposition::even(6, 1, 0).unwrap(),
            vec![SurfaceLine::split(uniform(16, 0.0), 1, 0).unwrap()],
            AxisBoundary::periodic(),
        )
        .unwrap();
        let err = FieldProcessor::new(s, real, CouplerConfig::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn preprocess_off_needs_shared_grid() {
        let (s, r) = serial(16, &[12], 0.5);
        let cfg = CouplerConfig {
            preprocess: false,
            ..CouplerConfig::default()
        };
        assert!(matches!(
            FieldProcessor::new(s, r, cfg.clone()),
            Err(CouplerError::Config(_))
        ));

        let (s, r) = serial(16, &[16], 0.0);
        let mut fp = FieldProcessor::new(s, r, cfg).unwrap();
        assert_eq!(fp.interpolate_density(), Err(CouplerError::PreprocessingDisabled));
        assert_eq!(fp.interpolate_potential(), Err(CouplerError::PreprocessingDisabled));
    }

    #[test]
    fn preprocess_off_is_identity_along_z() {
        let (s, r) = serial(8, &[8], 0.0);
        let cfg = CouplerConfig {
            preprocess: false,
            ..CouplerConfig::default()
        };
        let mut fp = FieldProcessor::new(s, r, cfg).unwrap();
        let wire: Vec<Complex64> = (0..fp.density_input_len())
            .map(|p| if p < 8 { Complex64::new(8.0 * p as f64, 0.0) } else { Complex64::new(0.0, 0.0) })
            .collect();
        fp.receive_density(&wire).unwrap();
        fp.process_density(&NoComm, None).unwrap();
        let mut out = vec![0.0; fp.density_output_len()];
        fp.assemble_density(&mut out).unwrap();
        // Only mode 0 is populated: every angle equals the input z value.
        for l in 0..8 {
            for k in 0..8 {
                assert!((fp.density_output()[(0, l, k)] - k as f64).abs() < 1e-12);
            }
        }
        assert_eq!(out, fp.density_output().as_slice());
    }

    #[test]
    fn preprocess_off_hands_back_transformed_potential() {
        let (s, r) = serial(8, &[8], 0.0);
        let cfg = CouplerConfig {
            preprocess: false,
            ..CouplerConfig::default()
        };
        let mut fp = FieldProcessor::new(s, r, cfg).unwrap();
        let wire: Vec<f64> = (0..fp.potential_input_len()).map(|p| (p % 8) as f64).collect();
        fp.receive_potential(&wire).unwrap();
        fp.process_potential(&NoComm, None).unwrap();
        let mut out = vec![Complex64::new(0.0, 0.0); fp.potential_output_len()];
        fp.assemble_potential(&mut out).unwrap();
        assert_eq!(out, fp.potential_output().as_slice());
        // Angle-independent input: mode 0 carries the z value.
        for k in 0..8 {
            assert!((fp.potential_output()[(0, 0, k)] - Complex64::new(k as f64, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn real_angular_grid_may_be_finer() {
        let (s, _) = serial(16, &[16], 0.5);
        let refined = |angles| {
            RealMesh::new(
                s.x().clone(),
                AxisDecomposition::even(angles, 1, 0).unwrap(),
                vec![SurfaceLine::split(uniform(16, 0.5), 1, 0).unwrap()],
                AxisBoundary::periodic(),
            )
            .unwrap()
        };
        let fp = FieldProcessor::new(s.clone(), refined(16), CouplerConfig::default()).unwrap();
        assert_eq!(fp.density_angles().global(), 8);
        assert_eq!(fp.density_output_len(), 8 * 16);
        assert_eq!(fp.potential_input_len(), 16 * 16);
        assert_eq!(fp.potential_output_len(), 4 * 16);
        assert!(matches!(
            FieldProcessor::new(s.clone(), refined(11), CouplerConfig::default()),
            Err(CouplerError::Config(_))
        ));
    }

    #[test]
    fn wire_lengths_follow_layouts() {
        let (s, r) = serial(16, &[10, 12], 0.5);
        let fp = FieldProcessor::new(s, r, CouplerConfig::default()).unwrap();
        assert_eq!(fp.density_input_len(), 2 * 4 * 16);
        assert_eq!(fp.density_output_len(), 8 * (10 + 12));
        assert_eq!(fp.potential_input_len(), 8 * (10 + 12));
        assert_eq!(fp.potential_output_len(), 2 * 4 * 16);
        let mut fp = fp;
        assert!(matches!(
            fp.receive_density(&[Complex64::new(0.0, 0.0); 3]),
            Err(CouplerError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn sequential_mode_rejects_split_modes() {
        let grid = ProcessGrid::new([1, 2, 1], [0, 0, 0]).unwrap();
        let x = AxisDecomposition::even(1, 1, 0).unwrap();
        let s = SpectralMesh::new(
            grid,
            x.clone(),
            AxisDecomposition::even(4, 2, 0).unwrap(),
            AxisDecomposition::even(16, 1, 0).unwrap(),
            uniform(16, 0.0),
            AxisBoundary::periodic(),
        )
        .unwrap();
        let r = RealMesh::new(
            x,
            AxisDecomposition::even(8, 2, 0).unwrap(),
            vec![SurfaceLine::split(uniform(16, 0.5), 1, 0).unwrap()],
            AxisBoundary::periodic(),
        )
        .unwrap();
        assert_eq!(
            FieldProcessor::new(s.clone(), r.clone(), CouplerConfig::default()).unwrap_err(),
            CouplerError::Unsupported("sequential transforms need every angular mode on one process")
        );
        let cfg = CouplerConfig {
            transform_mode: TransformMode::Decomposed,
            ..CouplerConfig::default()
        };
        assert!(FieldProcessor::new(s, r, cfg).is_ok());
    }
}
