#![allow(dead_code)]
use spectral_coupler::{
    algs::communicator::LocalComm,
    decomposition::{
        AxisBoundary, AxisDecomposition, ProcessGrid, RealMesh, SpectralMesh, SurfaceLine,
    },
};
use std::f64::consts::TAU;

/// `n` points on `[0, 2π)`, offset by `shift` grid spacings.
pub fn uniform(n: usize, shift: f64) -> Vec<f64> {
    (0..n).map(|k| TAU * (k as f64 + shift) / n as f64).collect()
}

/// Spectral descriptor on `grid`: `nx` surfaces, `modes` angular modes and
/// a uniform periodic `z` grid of `nz` points, all split evenly.
pub fn spectral_mesh(grid: ProcessGrid, nx: usize, modes: usize, nz: usize) -> SpectralMesh {
    let [npx, npy, npz] = grid.dims();
    let [px, py, pz] = grid.coords();
    SpectralMesh::new(
        grid,
        AxisDecomposition::even(nx, npx, px).unwrap(),
        AxisDecomposition::even(modes, npy, py).unwrap(),
        AxisDecomposition::even(nz, npz, pz).unwrap(),
        uniform(nz, 0.0),
        AxisBoundary::periodic(),
    )
    .unwrap()
}

/// Real descriptor matching [`spectral_mesh`]: global surface `i` has
/// `surface_nz[i]` points shifted by half a spacing.
pub fn real_mesh(grid: ProcessGrid, surface_nz: &[usize], modes: usize) -> RealMesh {
    real_mesh_with_angles(grid, surface_nz, 2 * modes)
}

/// [`real_mesh`] sampling the angle at `angles` points.
pub fn real_mesh_with_angles(grid: ProcessGrid, surface_nz: &[usize], angles: usize) -> RealMesh {
    let [npx, npy, npz] = grid.dims();
    let [px, py, pz] = grid.coords();
    let x = AxisDecomposition::even(surface_nz.len(), npx, px).unwrap();
    let surfaces = x
        .range()
        .map(|i| SurfaceLine::split(uniform(surface_nz[i], 0.5), npz, pz).unwrap())
        .collect();
    RealMesh::new(
        x,
        AxisDecomposition::even(angles, npy, py).unwrap(),
        surfaces,
        AxisBoundary::periodic(),
    )
    .unwrap()
}

/// Run `f(rank, comm)` on one thread per rank and collect the results in
/// rank order.
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(usize, LocalComm) -> T + Send + Sync + Clone + 'static,
{
    let handles: Vec<_> = LocalComm::group(size)
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            let f = f.clone();
            std::thread::spawn(move || f(rank, comm))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("rank thread panicked"))
        .collect()
}

/// Maximum absolute difference of two equally long slices.
pub fn max_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
