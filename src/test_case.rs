//! Analytic fields for verification runs.
//!
//! With a test case active the engine overwrites its received input buffers
//! with a known field, so the output can be compared against
//! [`density_reference`] / [`potential_reference`] after a full step.

use std::f64::consts::TAU;

use num_complex::Complex64;
use num_traits::Zero;

use crate::config::TestCase;
use crate::data::field_buffer::FieldBuffer;
use crate::decomposition::{RealMesh, SpectralMesh};

/// Field-line profile of the cosine case.
#[inline]
pub fn profile(z: f64) -> f64 {
    1.0 + 0.5 * z.sin()
}

/// Real density expected at angle `theta` and field-line coordinate `z`.
pub fn density_reference(case: TestCase, mode: usize, theta: f64, z: f64) -> f64 {
    match case {
        TestCase::Off => 0.0,
        TestCase::CosineMode => (mode as f64 * theta).cos() * profile(z),
        TestCase::ZRamp => z,
    }
}

/// Potential coefficient of global mode `m` expected at `z`.
pub fn potential_reference(case: TestCase, mode: usize, m: usize, z: f64) -> Complex64 {
    match case {
        TestCase::Off => Complex64::zero(),
        TestCase::CosineMode if m == mode => Complex64::new(0.5 * profile(z), 0.0),
        TestCase::ZRamp if m == 0 => Complex64::new(z, 0.0),
        _ => Complex64::zero(),
    }
}

/// Overwrite the spectral density input `(x, local modes, local z)` with
/// coefficients whose real synthesis is [`density_reference`].
pub fn seed_density(case: TestCase, mode: usize, mesh: &SpectralMesh, buf: &mut FieldBuffer<Complex64>) {
    if case == TestCase::Off {
        return;
    }
    // Inverse transforms are scaled by 1/n, and a cosine splits evenly
    // between +mode and -mode.
    let n = mesh.angular_resolution() as f64;
    let (target, weight) = match case {
        TestCase::CosineMode => (mode, 0.5 * n),
        _ => (0, n),
    };
    let z = mesh.local_z_coords();
    let first_mode = mesh.y().start();
    let layout = buf.layout().clone();
    for i in 0..layout.outer() {
        for j in 0..layout.modes() {
            let line = buf.line_mut(i, j);
            if first_mode + j != target {
                line.fill(Complex64::zero());
                continue;
            }
            for (v, &zk) in line.iter_mut().zip(z) {
                let amp = match case {
                    TestCase::CosineMode => profile(zk),
                    _ => zk,
                };
                *v = Complex64::new(weight * amp, 0.0);
            }
        }
    }
    log::debug!("seeded density input with {case:?} (mode {target})");
}

/// Overwrite the real potential input `(x, local angles, surface z)` with
/// the real field of [`density_reference`].
pub fn seed_potential(case: TestCase, mode: usize, mesh: &RealMesh, buf: &mut FieldBuffer<f64>) {
    if case == TestCase::Off {
        return;
    }
    let n = mesh.angular().global() as f64;
    let first = mesh.angular().start();
    let layout = buf.layout().clone();
    for i in 0..layout.outer() {
        let z = mesh.surface(i).local_coords();
        for l in 0..layout.modes() {
            let theta = TAU * (first + l) as f64 / n;
            for (v, &zk) in buf.line_mut(i, l).iter_mut().zip(z) {
                *v = density_reference(case, mode, theta, zk);
            }
        }
    }
    log::debug!("seeded potential input with {case:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::field_buffer::FieldLayout;
    use crate::decomposition::{AxisBoundary, AxisDecomposition, ProcessGrid};
    use crate::transform::{SpectralTransform, complex_to_real};

    #[test]
    fn seeded_density_synthesizes_reference() {
        let nz = 6;
        let z: Vec<f64> = (0..nz).map(|k| TAU * k as f64 / nz as f64).collect();
        let mesh = SpectralMesh::new(
            ProcessGrid::serial(),
            AxisDecomposition::even(1, 1, 0).unwrap(),
            AxisDecomposition::even(4, 1, 0).unwrap(),
            AxisDecomposition::even(nz, 1, 0).unwrap(),
            z.clone(),
            AxisBoundary::periodic(),
        )
        .unwrap();
        let mut buf = FieldBuffer::new(FieldLayout::uniform(1, 4, nz));
        seed_density(TestCase::CosineMode, 2, &mesh, &mut buf);
        let mut plan = SpectralTransform::new(8).unwrap();
        let mut real = FieldBuffer::new(FieldLayout::uniform(1, 8, nz));
        complex_to_real(&mut plan, &buf, &mut real).unwrap();
        for l in 0..8 {
            for k in 0..nz {
                let want = density_reference(TestCase::CosineMode, 2, TAU * l as f64 / 8.0, z[k]);
                assert!((real[(0, l, k)] - want).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn off_leaves_buffer_alone() {
        let z = vec![0.0, 1.0, 2.0, 3.0];
        let mesh = SpectralMesh::new(
            ProcessGrid::serial(),
            AxisDecomposition::even(1, 1, 0).unwrap(),
            AxisDecomposition::even(2, 1, 0).unwrap(),
            AxisDecomposition::even(4, 1, 0).unwrap(),
            z,
            AxisBoundary::periodic(),
        )
        .unwrap();
        let layout = FieldLayout::uniform(1, 2, 4);
        let mut buf = FieldBuffer::from_fn(layout, |_, j, k| Complex64::new((j + k) as f64, 1.0));
        let before = buf.clone();
        seed_density(TestCase::Off, 1, &mesh, &mut buf);
        assert_eq!(buf, before);
    }
}
