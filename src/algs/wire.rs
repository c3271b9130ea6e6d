//! Fixed, versioned, little-endian wire types for field messages.

use bytemuck::{Pod, Zeroable};
use num_complex::Complex64;
use static_assertions::const_assert_eq;
use std::mem::{align_of, size_of};

use crate::coupler_error::CouplerError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Message kinds carried in [`WireHdr::kind`].
pub mod kind {
    pub const HALO_LOW: u16 = 1;
    pub const HALO_HIGH: u16 = 2;
    pub const TRANSPOSE_FORWARD: u16 = 3;
    pub const TRANSPOSE_BACKWARD: u16 = 4;
    pub const FIELD: u16 = 5;
}

/// All multi-byte integers are stored pre-LE with `.to_le()` and decoded
/// with `::from_le()`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,
    pub kind_le: u16,
    /// Number of samples following the header.
    pub count_le: u32,
}

impl WireHdr {
    pub const SIZE: usize = 8;

    pub fn new(kind: u16, count: usize) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            count_le: (count as u32).to_le(),
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn count(&self) -> usize {
        u32::from_le(self.count_le) as usize
    }
}

/// Field samples that travel as fixed-size little-endian records.
pub trait WireSample: Copy {
    type Repr: Pod;
    fn to_wire(self) -> Self::Repr;
    fn from_wire(w: Self::Repr) -> Self;
}

#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireReal(pub u64);

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireComplex {
    pub re_le: u64,
    pub im_le: u64,
}

impl WireSample for f64 {
    type Repr = WireReal;
    #[inline]
    fn to_wire(self) -> WireReal {
        WireReal(self.to_bits().to_le())
    }
    #[inline]
    fn from_wire(w: WireReal) -> Self {
        f64::from_bits(u64::from_le(w.0))
    }
}

impl WireSample for Complex64 {
    type Repr = WireComplex;
    #[inline]
    fn to_wire(self) -> WireComplex {
        WireComplex {
            re_le: self.re.to_bits().to_le(),
            im_le: self.im.to_bits().to_le(),
        }
    }
    #[inline]
    fn from_wire(w: WireComplex) -> Self {
        Complex64::new(
            f64::from_bits(u64::from_le(w.re_le)),
            f64::from_bits(u64::from_le(w.im_le)),
        )
    }
}

/// Byte length of a message of `count` samples of `T`.
pub fn message_len<T: WireSample>(count: usize) -> usize {
    WireHdr::SIZE + count * size_of::<T::Repr>()
}

/// Header followed by the samples in wire representation.
pub fn encode<T: WireSample>(kind: u16, samples: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message_len::<T>(samples.len()));
    out.extend_from_slice(bytemuck::bytes_of(&WireHdr::new(kind, samples.len())));
    let body: Vec<T::Repr> = samples.iter().map(|s| s.to_wire()).collect();
    out.extend_from_slice(cast_slice(&body));
    out
}

/// Decode a message produced by [`encode`] into `out`, checking version,
/// kind and sample count.
pub fn decode_into<T: WireSample>(kind: u16, bytes: &[u8], out: &mut [T]) -> Result<(), CouplerError> {
    if bytes.len() < WireHdr::SIZE {
        return Err(CouplerError::Transport(format!(
            "message of {} bytes is shorter than its header",
            bytes.len()
        )));
    }
    let hdr: WireHdr = bytemuck::pod_read_unaligned(&bytes[..WireHdr::SIZE]);
    if hdr.version() != WIRE_VERSION || hdr.kind() != kind {
        return Err(CouplerError::Transport(format!(
            "unexpected message header (version {}, kind {}), wanted kind {kind}",
            hdr.version(),
            hdr.kind()
        )));
    }
    CouplerError::expect_len("message samples", out.len(), hdr.count())?;
    CouplerError::expect_len("message bytes", message_len::<T>(out.len()), bytes.len())?;
    let width = size_of::<T::Repr>();
    for (o, chunk) in out
        .iter_mut()
        .zip(bytes[WireHdr::SIZE..].chunks_exact(width))
    {
        *o = T::from_wire(bytemuck::pod_read_unaligned(chunk));
    }
    Ok(())
}

// ===== Compile-time sanity checks =========================================

const_assert_eq!(size_of::<WireHdr>(), WireHdr::SIZE);
const_assert_eq!(size_of::<WireReal>(), 8);
const_assert_eq!(size_of::<WireComplex>(), 16);
const_assert_eq!(align_of::<WireComplex>(), 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_message_roundtrip() {
        let v = [Complex64::new(1.5, -2.0), Complex64::new(0.0, 3.25)];
        let bytes = encode(kind::FIELD, &v);
        assert_eq!(bytes.len(), message_len::<Complex64>(2));
        let mut out = [Complex64::new(0.0, 0.0); 2];
        decode_into(kind::FIELD, &bytes, &mut out).unwrap();
        assert_eq!(out, v);
    }

    #[test]
    fn decode_checks_kind_and_count() {
        let bytes = encode(kind::HALO_LOW, &[1.0f64, 2.0]);
        let mut out = [0.0f64; 2];
        assert!(matches!(
            decode_into(kind::HALO_HIGH, &bytes, &mut out),
            Err(CouplerError::Transport(_))
        ));
        let mut short = [0.0f64; 1];
        assert!(decode_into(kind::HALO_LOW, &bytes, &mut short).is_err());
    }

    #[test]
    fn header_is_little_endian() {
        let h = WireHdr::new(kind::TRANSPOSE_FORWARD, 258);
        let b = bytemuck::bytes_of(&h);
        assert_eq!(&b[..4], &[1, 0, 3, 0]);
        assert_eq!(&b[4..], &[2, 1, 0, 0]);
    }
}
