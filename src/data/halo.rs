//! Low/high halo samples along the field-line coordinate.

use crate::coupler_error::CouplerError;
use crate::data::field_buffer::{FieldBuffer, FieldLayout};

/// Halo samples for every `(outer, mode)` line: `width` values below the
/// local segment (`low`, ordered by increasing coordinate) and `width`
/// values above it (`high`).
#[derive(Clone, Debug, PartialEq)]
pub struct HaloBuffers<T> {
    width: usize,
    low: FieldBuffer<T>,
    high: FieldBuffer<T>,
}

impl<T: Copy + Default> HaloBuffers<T> {
    pub fn new(outer: usize, modes: usize, width: usize) -> Self {
        let layout = FieldLayout::uniform(outer, modes, width);
        Self {
            width,
            low: FieldBuffer::new(layout.clone()),
            high: FieldBuffer::new(layout),
        }
    }
}

impl<T> HaloBuffers<T> {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn outer(&self) -> usize {
        self.low.layout().outer()
    }

    #[inline]
    pub fn modes(&self) -> usize {
        self.low.layout().modes()
    }

    #[inline]
    pub fn low(&self, i: usize, j: usize) -> &[T] {
        self.low.line(i, j)
    }

    #[inline]
    pub fn high(&self, i: usize, j: usize) -> &[T] {
        self.high.line(i, j)
    }

    #[inline]
    pub fn low_mut(&mut self, i: usize, j: usize) -> &mut [T] {
        self.low.line_mut(i, j)
    }

    #[inline]
    pub fn high_mut(&mut self, i: usize, j: usize) -> &mut [T] {
        self.high.line_mut(i, j)
    }

    /// All low halos in wire order.
    #[inline]
    pub fn low_buffer(&self) -> &FieldBuffer<T> {
        &self.low
    }

    #[inline]
    pub fn high_buffer(&self) -> &FieldBuffer<T> {
        &self.high
    }

    #[inline]
    pub fn low_buffer_mut(&mut self) -> &mut FieldBuffer<T> {
        &mut self.low
    }

    #[inline]
    pub fn high_buffer_mut(&mut self) -> &mut FieldBuffer<T> {
        &mut self.high
    }

    /// Check that these halos cover an `outer x modes` field with `width` slots.
    pub fn check_shape(&self, outer: usize, modes: usize, width: usize) -> Result<(), CouplerError> {
        CouplerError::expect_len("halo outer extent", outer, self.outer())?;
        CouplerError::expect_len("halo mode extent", modes, self.modes())?;
        CouplerError::expect_len("halo width", width, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_check() {
        let mut h = HaloBuffers::<f64>::new(2, 3, 2);
        h.low_mut(1, 2).copy_from_slice(&[1.0, 2.0]);
        assert_eq!(h.low(1, 2), &[1.0, 2.0]);
        assert_eq!(h.high(1, 2), &[0.0, 0.0]);
        assert!(h.check_shape(2, 3, 2).is_ok());
        assert!(h.check_shape(2, 4, 2).is_err());
    }
}
