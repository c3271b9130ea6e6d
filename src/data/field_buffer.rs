//! FieldBuffer: owned `(outer, mode, inner)` field storage.
//!
//! A [`FieldLayout`] fixes, for each outer index, the number of modes and the
//! (possibly outer-dependent) inner extent. The [`FieldBuffer`] couples a
//! layout with one contiguous `Vec` laid out in `(outer, mode, inner)` order,
//! inner fastest. That flat order is also the wire order: packing and
//! unpacking are plain copies, so wire position `p` always maps to the same
//! `(outer, mode, inner)` triple on both sides.

use std::ops::{Index, IndexMut};

use crate::coupler_error::CouplerError;

/// Shape of a field buffer.
///
/// # Invariants
///
/// - `offsets.len() == inner.len() + 1`, `offsets[0] == 0`.
/// - `offsets[i + 1] - offsets[i] == modes * inner[i]`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldLayout {
    modes: usize,
    inner: Vec<usize>,
    offsets: Vec<usize>,
}

impl FieldLayout {
    /// Every outer index has the same inner extent.
    pub fn uniform(outer: usize, modes: usize, inner: usize) -> Self {
        Self::ragged(modes, vec![inner; outer])
    }

    /// Inner extent given per outer index.
    pub fn ragged(modes: usize, inner: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(inner.len() + 1);
        offsets.push(0);
        for n in &inner {
            offsets.push(offsets[offsets.len() - 1] + modes * n);
        }
        Self {
            modes,
            inner,
            offsets,
        }
    }

    #[inline]
    pub fn outer(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn modes(&self) -> usize {
        self.modes
    }

    #[inline]
    pub fn inner(&self, i: usize) -> usize {
        self.inner[i]
    }

    /// Inner extents of all outer indices.
    #[inline]
    pub fn inner_extents(&self) -> &[usize] {
        &self.inner
    }

    /// Number of elements of a buffer with this layout.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    /// Flat `(offset, len)` of the inner line `(i, j)`.
    #[inline]
    pub fn line_span(&self, i: usize, j: usize) -> (usize, usize) {
        assert!(i < self.outer() && j < self.modes, "line ({i}, {j}) out of bounds");
        let n = self.inner[i];
        (self.offsets[i] + j * n, n)
    }

    /// Flat index of `(i, j, k)`, or `None` when out of bounds.
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        if i < self.outer() && j < self.modes && k < self.inner[i] {
            Some(self.offsets[i] + j * self.inner[i] + k)
        } else {
            None
        }
    }
}

/// Field data over a [`FieldLayout`]; never resized after allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBuffer<T> {
    layout: FieldLayout,
    data: Vec<T>,
}

impl<T: Copy + Default> FieldBuffer<T> {
    /// Allocate a buffer filled with `T::default()`.
    pub fn new(layout: FieldLayout) -> Self {
        let data = vec![T::default(); layout.total_len()];
        Self { layout, data }
    }

    /// Allocate a buffer whose `(i, j, k)` element is `f(i, j, k)`.
    pub fn from_fn(layout: FieldLayout, mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(layout.total_len());
        for i in 0..layout.outer() {
            for j in 0..layout.modes() {
                for k in 0..layout.inner(i) {
                    data.push(f(i, j, k));
                }
            }
        }
        Self { layout, data }
    }

    /// Reset every element to `T::default()`.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }

    /// Copy of the flat storage in wire order.
    pub fn pack(&self) -> Vec<T> {
        self.data.clone()
    }

    /// Copy the flat storage into `wire`.
    ///
    /// # Errors
    /// `LengthMismatch` if `wire` does not hold exactly `total_len` elements.
    pub fn pack_into(&self, wire: &mut [T]) -> Result<(), CouplerError> {
        CouplerError::expect_len("field pack", self.data.len(), wire.len())?;
        wire.copy_from_slice(&self.data);
        Ok(())
    }

    /// Overwrite the buffer from a flat wire slice.
    ///
    /// # Errors
    /// `LengthMismatch` if `wire` does not hold exactly `total_len` elements.
    pub fn unpack(&mut self, wire: &[T]) -> Result<(), CouplerError> {
        CouplerError::expect_len("field unpack", self.data.len(), wire.len())?;
        self.data.copy_from_slice(wire);
        Ok(())
    }

    /// Gather the mode column `(i, *, k)` into `out`.
    pub fn read_modes(&self, i: usize, k: usize, out: &mut [T]) {
        let n = self.layout.inner(i);
        let base = self.layout.offsets[i] + k;
        for (j, o) in out.iter_mut().enumerate().take(self.layout.modes()) {
            *o = self.data[base + j * n];
        }
    }

    /// Scatter `values` into the mode column `(i, *, k)`.
    pub fn write_modes(&mut self, i: usize, k: usize, values: &[T]) {
        let n = self.layout.inner(i);
        let base = self.layout.offsets[i] + k;
        for (j, v) in values.iter().enumerate().take(self.layout.modes()) {
            self.data[base + j * n] = *v;
        }
    }
}

impl<T> FieldBuffer<T> {
    #[inline]
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Inner line `(i, j, *)`.
    #[inline]
    pub fn line(&self, i: usize, j: usize) -> &[T] {
        let (offset, len) = self.layout.line_span(i, j);
        &self.data[offset..offset + len]
    }

    #[inline]
    pub fn line_mut(&mut self, i: usize, j: usize) -> &mut [T] {
        let (offset, len) = self.layout.line_span(i, j);
        &mut self.data[offset..offset + len]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        self.layout.index(i, j, k).map(|p| &self.data[p])
    }
}

impl<T> Index<(usize, usize, usize)> for FieldBuffer<T> {
    type Output = T;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &T {
        let p = self
            .layout
            .index(i, j, k)
            .unwrap_or_else(|| panic!("({i}, {j}, {k}) out of bounds"));
        &self.data[p]
    }
}

impl<T> IndexMut<(usize, usize, usize)> for FieldBuffer<T> {
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut T {
        let p = self
            .layout
            .index(i, j, k)
            .unwrap_or_else(|| panic!("({i}, {j}, {k}) out of bounds"));
        &mut self.data[p]
    }
}
