//! Real ↔ complex conversion of whole field buffers along the angular index.
//!
//! A *line* is one `(outer, z)` pair; its samples run over the mode index of
//! the buffer. The sequential functions transform lines that hold every
//! mode locally. The decomposed ones work inside a [`YGroup`], whose members
//! each hold a slice of the modes: lines are redistributed with
//! [`all_to_all`] so each member transforms whole lines, then redistributed
//! back.
//!
//! Scaling: both directions divide by the real line length of the plan.
//! Synthesis runs at `2 * modes`; analysis runs at the real code's own
//! angular resolution and keeps only the leading modes.

use num_complex::Complex64;
use num_traits::Zero;

use crate::algs::communicator::Communicator;
use crate::algs::wire::kind;
use crate::coupler_error::CouplerError;
use crate::data::field_buffer::{FieldBuffer, FieldLayout};
use crate::decomposition::{AxisDecomposition, split_evenly};
use crate::transform::SpectralTransform;
use crate::transform::transpose::all_to_all;

fn check_lines<A, B>(input: &FieldBuffer<A>, output: &FieldBuffer<B>) -> Result<(), CouplerError> {
    let (a, b) = (input.layout(), output.layout());
    CouplerError::expect_len("transform outer extent", a.outer(), b.outer())?;
    for i in 0..a.outer() {
        CouplerError::expect_len("transform line count", a.inner(i), b.inner(i))?;
    }
    Ok(())
}

/// Synthesize real angular lines from the locally complete mode lines of
/// `input`. `output` holds `plan.len()` angular samples per line.
pub fn complex_to_real(
    plan: &mut SpectralTransform,
    input: &FieldBuffer<Complex64>,
    output: &mut FieldBuffer<f64>,
) -> Result<(), CouplerError> {
    check_lines(input, output)?;
    let modes = input.layout().modes();
    CouplerError::expect_len("angular samples", plan.len(), output.layout().modes())?;
    let scale = 1.0 / plan.len() as f64;
    let mut coeffs = vec![Complex64::zero(); modes];
    let mut line = vec![0.0; plan.len()];
    for i in 0..input.layout().outer() {
        for k in 0..input.layout().inner(i) {
            input.read_modes(i, k, &mut coeffs);
            plan.inverse(&coeffs, &mut line)?;
            line.iter_mut().for_each(|v| *v *= scale);
            output.write_modes(i, k, &line);
        }
    }
    log::debug!("complex→real over {} lines", input.layout().total_len() / modes.max(1));
    Ok(())
}

/// Analyse the locally complete real angular lines of `input`, keeping the
/// first `output.modes()` coefficients.
pub fn real_to_complex(
    plan: &mut SpectralTransform,
    input: &FieldBuffer<f64>,
    output: &mut FieldBuffer<Complex64>,
) -> Result<(), CouplerError> {
    check_lines(input, output)?;
    CouplerError::expect_len("angular samples", plan.len(), input.layout().modes())?;
    let scale = 1.0 / plan.len() as f64;
    let mut coeffs = vec![Complex64::zero(); output.layout().modes()];
    let mut line = vec![0.0; plan.len()];
    for i in 0..input.layout().outer() {
        for k in 0..input.layout().inner(i) {
            input.read_modes(i, k, &mut line);
            plan.forward(&line, &mut coeffs)?;
            coeffs.iter_mut().for_each(|c| *c *= scale);
            output.write_modes(i, k, &coeffs);
        }
    }
    log::debug!("real→complex over {} lines", input.layout().total_len() / plan.len());
    Ok(())
}

/// Processes that together hold all modes of the same lines: the ranks
/// sharing `px` and `pz`, ordered by `py`.
#[derive(Clone, Debug)]
pub struct YGroup {
    ranks: Vec<usize>,
    me: usize,
    modes: AxisDecomposition,
    angular: AxisDecomposition,
}

impl YGroup {
    /// `modes` splits the complex modes and `angular` the real samples over
    /// the same group; both are viewed from this process. The angular grid
    /// may be finer than `2 * modes`.
    pub fn new(
        ranks: Vec<usize>,
        modes: AxisDecomposition,
        angular: AxisDecomposition,
    ) -> Result<Self, CouplerError> {
        let me = modes.part();
        if modes.parts() != ranks.len()
            || angular.parts() != ranks.len()
            || angular.part() != me
        {
            return Err(CouplerError::Config(format!(
                "y group of {} ranks cannot hold mode split {:?} and angular split {:?}",
                ranks.len(),
                modes.counts(),
                angular.counts()
            )));
        }
        if angular.global() < 2 * modes.global() {
            return Err(CouplerError::Config(format!(
                "{} angular samples do not resolve {} modes",
                angular.global(),
                modes.global()
            )));
        }
        Ok(Self {
            ranks,
            me,
            modes,
            angular,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.ranks.len()
    }

    #[inline]
    pub fn modes(&self) -> &AxisDecomposition {
        &self.modes
    }

    #[inline]
    pub fn angular(&self) -> &AxisDecomposition {
        &self.angular
    }
}

/// `(outer, z)` of every line, outer-major, split evenly over the group.
struct LineBlocks {
    lines: Vec<(usize, usize)>,
    offsets: Vec<usize>,
}

impl LineBlocks {
    fn new(layout: &FieldLayout, parts: usize) -> Self {
        let lines: Vec<(usize, usize)> = (0..layout.outer())
            .flat_map(|i| (0..layout.inner(i)).map(move |k| (i, k)))
            .collect();
        let mut offsets = vec![0];
        for c in split_evenly(lines.len(), parts) {
            offsets.push(offsets[offsets.len() - 1] + c);
        }
        Self { lines, offsets }
    }

    fn block(&self, p: usize) -> &[(usize, usize)] {
        &self.lines[self.offsets[p]..self.offsets[p + 1]]
    }
}

/// Decomposed [`complex_to_real`]: `input` holds this member's modes,
/// `output` this member's angular samples.
pub fn complex_to_real_decomposed<C: Communicator>(
    plan: &mut SpectralTransform,
    group: &YGroup,
    comm: &C,
    tag: u16,
    input: &FieldBuffer<Complex64>,
    output: &mut FieldBuffer<f64>,
) -> Result<(), CouplerError> {
    check_lines(input, output)?;
    let (modes, angular, me, n) = (&group.modes, &group.angular, group.me, group.size());
    CouplerError::expect_len("local modes", modes.len(), input.layout().modes())?;
    CouplerError::expect_len("local angular samples", angular.len(), output.layout().modes())?;
    CouplerError::expect_len("angular samples", plan.len(), angular.global())?;

    let blocks = LineBlocks::new(input.layout(), n);
    let mine = blocks.block(me);

    // My modes of every line, grouped by the member that owns the line.
    let mut column = vec![Complex64::zero(); modes.len()];
    let send = (0..n)
        .map(|q| {
            let mut out = Vec::with_capacity(blocks.block(q).len() * modes.len());
            for &(i, k) in blocks.block(q) {
                input.read_modes(i, k, &mut column);
                out.extend_from_slice(&column);
            }
            out
        })
        .collect();
    let counts: Vec<usize> = (0..n).map(|p| mine.len() * modes.len_of(p)).collect();
    let got = all_to_all(comm, &group.ranks, me, tag, kind::TRANSPOSE_FORWARD, send, &counts)?;

    // Whole lines: synthesize, then cut into angular blocks per member.
    let scale = 1.0 / plan.len() as f64;
    let mut coeffs = vec![Complex64::zero(); modes.global()];
    let mut line = vec![0.0; plan.len()];
    let mut back: Vec<Vec<f64>> = (0..n)
        .map(|q| Vec::with_capacity(mine.len() * angular.len_of(q)))
        .collect();
    for l in 0..mine.len() {
        for (p, block) in got.iter().enumerate() {
            let m = modes.len_of(p);
            coeffs[modes.range_of(p)].copy_from_slice(&block[l * m..(l + 1) * m]);
        }
        plan.inverse(&coeffs, &mut line)?;
        for (q, out) in back.iter_mut().enumerate() {
            out.extend(line[angular.range_of(q)].iter().map(|&v| v * scale));
        }
    }
    let counts: Vec<usize> = (0..n).map(|p| blocks.block(p).len() * angular.len()).collect();
    let got = all_to_all(comm, &group.ranks, me, tag, kind::TRANSPOSE_BACKWARD, back, &counts)?;

    let a = angular.len();
    for (p, block) in got.iter().enumerate() {
        for (l, &(i, k)) in blocks.block(p).iter().enumerate() {
            output.write_modes(i, k, &block[l * a..(l + 1) * a]);
        }
    }
    log::debug!("decomposed complex→real: {} of {} lines transformed here", mine.len(), blocks.lines.len());
    Ok(())
}

/// Decomposed [`real_to_complex`]: `input` holds this member's angular
/// samples, `output` this member's modes.
pub fn real_to_complex_decomposed<C: Communicator>(
    plan: &mut SpectralTransform,
    group: &YGroup,
    comm: &C,
    tag: u16,
    input: &FieldBuffer<f64>,
    output: &mut FieldBuffer<Complex64>,
) -> Result<(), CouplerError> {
    check_lines(input, output)?;
    let (modes, angular, me, n) = (&group.modes, &group.angular, group.me, group.size());
    CouplerError::expect_len("local angular samples", angular.len(), input.layout().modes())?;
    CouplerError::expect_len("local modes", modes.len(), output.layout().modes())?;
    CouplerError::expect_len("angular samples", plan.len(), angular.global())?;

    let blocks = LineBlocks::new(input.layout(), n);
    let mine = blocks.block(me);

    let mut column = vec![0.0; angular.len()];
    let send = (0..n)
        .map(|q| {
            let mut out = Vec::with_capacity(blocks.block(q).len() * angular.len());
            for &(i, k) in blocks.block(q) {
                input.read_modes(i, k, &mut column);
                out.extend_from_slice(&column);
            }
            out
        })
        .collect();
    let counts: Vec<usize> = (0..n).map(|p| mine.len() * angular.len_of(p)).collect();
    let got = all_to_all(comm, &group.ranks, me, tag, kind::TRANSPOSE_FORWARD, send, &counts)?;

    let scale = 1.0 / plan.len() as f64;
    let mut line = vec![0.0; plan.len()];
    let mut coeffs = vec![Complex64::zero(); modes.global()];
    let mut back: Vec<Vec<Complex64>> = (0..n)
        .map(|q| Vec::with_capacity(mine.len() * modes.len_of(q)))
        .collect();
    for l in 0..mine.len() {
        for (p, block) in got.iter().enumerate() {
            let a = angular.len_of(p);
            line[angular.range_of(p)].copy_from_slice(&block[l * a..(l + 1) * a]);
        }
        plan.forward(&line, &mut coeffs)?;
        for (q, out) in back.iter_mut().enumerate() {
            out.extend(coeffs[modes.range_of(q)].iter().map(|&c| c * scale));
        }
    }
    let counts: Vec<usize> = (0..n).map(|p| blocks.block(p).len() * modes.len()).collect();
    let got = all_to_all(comm, &group.ranks, me, tag, kind::TRANSPOSE_BACKWARD, back, &counts)?;

    let m = modes.len();
    for (p, block) in got.iter().enumerate() {
        for (l, &(i, k)) in blocks.block(p).iter().enumerate() {
            output.write_modes(i, k, &block[l * m..(l + 1) * m]);
        }
    }
    log::debug!("decomposed real→complex: {} of {} lines transformed here", mine.len(), blocks.lines.len());
    Ok(())
}
