//! Population of the field-line halos before interpolation.
//!
//! Each `(outer, mode)` line needs `width` samples past both ends of the
//! local segment. They come from one of three places:
//!
//! - the line itself, when a single process owns a whole periodic line;
//! - the previous/next process along `z`, through the communicator;
//! - an [`EdgeFill`] collaborator, at the global ends of an open line.

use crate::algs::communicator::{Communicator, Wait};
use crate::algs::wire::{self, WireSample, kind};
use crate::coupler_error::CouplerError;
use crate::data::field_buffer::{FieldBuffer, FieldLayout};
use crate::data::halo::HaloBuffers;
use crate::decomposition::{Axis, ProcessGrid};

/// Source of the halo on one side of the local segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaloSource {
    /// Wrap around the process' own line.
    SelfWrap,
    /// Receive from this rank.
    Rank(usize),
    /// Global end of an open line.
    Edge,
}

/// Halo sources below and above the local `z` segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZLinks {
    pub below: HaloSource,
    pub above: HaloSource,
}

impl ZLinks {
    pub fn new(grid: &ProcessGrid, periodic: bool) -> Self {
        let npz = grid.parts(Axis::Z);
        let pz = grid.coord(Axis::Z);
        if npz == 1 {
            let src = if periodic {
                HaloSource::SelfWrap
            } else {
                HaloSource::Edge
            };
            return Self {
                below: src,
                above: src,
            };
        }
        let below = if pz == 0 && !periodic {
            HaloSource::Edge
        } else {
            HaloSource::Rank(grid.neighbor(Axis::Z, -1))
        };
        let above = if pz + 1 == npz && !periodic {
            HaloSource::Edge
        } else {
            HaloSource::Rank(grid.neighbor(Axis::Z, 1))
        };
        Self { below, above }
    }
}

/// Ghost values past the global ends of an open line.
pub trait EdgeFill<T> {
    /// Fill `out` (ordered by increasing coordinate) below the first sample
    /// of line `(i, j)`.
    fn fill_low(&self, i: usize, j: usize, line: &[T], out: &mut [T]);
    /// Fill `out` above the last sample of line `(i, j)`.
    fn fill_high(&self, i: usize, j: usize, line: &[T], out: &mut [T]);
}

/// Repeats the boundary sample (zero gradient).
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantEdge;

impl<T: Copy> EdgeFill<T> for ConstantEdge {
    fn fill_low(&self, _i: usize, _j: usize, line: &[T], out: &mut [T]) {
        if let Some(&v) = line.first() {
            out.fill(v);
        }
    }
    fn fill_high(&self, _i: usize, _j: usize, line: &[T], out: &mut [T]) {
        if let Some(&v) = line.last() {
            out.fill(v);
        }
    }
}

/// Fill `halos` for every line of `field`.
///
/// Receives are posted before any send, and every receive is waited on
/// before halos are written.
///
/// # Errors
/// - `LengthMismatch` if the halo shape does not match `field`.
/// - `Config` if a line is shorter than the halo width.
/// - `MissingEdgeFill` if an open edge is reached and no `edge` filler is given.
/// - `Transport` if a neighbour message is lost or malformed.
pub fn exchange_z_halos<T, C>(
    field: &FieldBuffer<T>,
    halos: &mut HaloBuffers<T>,
    links: ZLinks,
    comm: &C,
    base_tag: u16,
    edge: Option<&dyn EdgeFill<T>>,
) -> Result<(), CouplerError>
where
    T: WireSample + Default,
    C: Communicator,
{
    let layout = field.layout();
    let (outer, modes, w) = (layout.outer(), layout.modes(), halos.width());
    halos.check_shape(outer, modes, w)?;
    if let Some(i) = (0..outer).find(|&i| layout.inner(i) < w) {
        return Err(CouplerError::Config(format!(
            "line of {} samples at outer index {i} is shorter than the halo width {w}",
            layout.inner(i)
        )));
    }
    let count = outer * modes * w;

    // Post receives.
    let mut pending = Vec::new();
    for (src, msg_kind) in [
        (links.below, kind::HALO_LOW),
        (links.above, kind::HALO_HIGH),
    ] {
        if let HaloSource::Rank(peer) = src {
            let mut buf = vec![0u8; wire::message_len::<T>(count)];
            let h = comm.irecv(peer, base_tag + msg_kind, &mut buf);
            pending.push((peer, msg_kind, h));
        }
    }

    // My first samples become the high halo below me, my last samples the
    // low halo above me.
    if let HaloSource::Rank(peer) = links.below {
        let msg = wire::encode(kind::HALO_HIGH, &gather(field, w, true));
        comm.isend(peer, base_tag + kind::HALO_HIGH, &msg).wait();
    }
    if let HaloSource::Rank(peer) = links.above {
        let msg = wire::encode(kind::HALO_LOW, &gather(field, w, false));
        comm.isend(peer, base_tag + kind::HALO_LOW, &msg).wait();
    }

    let mut scratch = vec![T::default(); count];
    for (peer, msg_kind, h) in pending {
        let raw = h.wait().ok_or_else(|| {
            CouplerError::Transport(format!("halo message from rank {peer} never arrived"))
        })?;
        wire::decode_into(msg_kind, &raw, &mut scratch)?;
        let target = if msg_kind == kind::HALO_LOW {
            halos.low_buffer_mut()
        } else {
            halos.high_buffer_mut()
        };
        target.unpack(&scratch)?;
    }

    fill_local(field, halos, links.below, true, edge)?;
    fill_local(field, halos, links.above, false, edge)?;
    log::debug!(
        "z halos filled for {outer}x{modes} lines (below {:?}, above {:?})",
        links.below,
        links.above
    );
    Ok(())
}

/// First (`head`) or last `w` samples of every line, in halo wire order.
fn gather<T: Copy>(field: &FieldBuffer<T>, w: usize, head: bool) -> Vec<T> {
    let layout: &FieldLayout = field.layout();
    let mut out = Vec::with_capacity(layout.outer() * layout.modes() * w);
    for i in 0..layout.outer() {
        for j in 0..layout.modes() {
            let line = field.line(i, j);
            if head {
                out.extend_from_slice(&line[..w]);
            } else {
                out.extend_from_slice(&line[line.len() - w..]);
            }
        }
    }
    out
}

fn fill_local<T: Copy>(
    field: &FieldBuffer<T>,
    halos: &mut HaloBuffers<T>,
    src: HaloSource,
    low: bool,
    edge: Option<&dyn EdgeFill<T>>,
) -> Result<(), CouplerError> {
    let layout = field.layout();
    let w = halos.width();
    match src {
        HaloSource::Rank(_) => {}
        HaloSource::SelfWrap => {
            for i in 0..layout.outer() {
                for j in 0..layout.modes() {
                    let line = field.line(i, j);
                    if low {
                        halos.low_mut(i, j).copy_from_slice(&line[line.len() - w..]);
                    } else {
                        halos.high_mut(i, j).copy_from_slice(&line[..w]);
                    }
                }
            }
        }
        HaloSource::Edge => {
            let side = if low { "low" } else { "high" };
            let fill = edge.ok_or(CouplerError::MissingEdgeFill { edge: side })?;
            for i in 0..layout.outer() {
                for j in 0..layout.modes() {
                    let line = field.line(i, j);
                    if low {
                        fill.fill_low(i, j, line, halos.low_mut(i, j));
                    } else {
                        fill.fill_high(i, j, line, halos.high_mut(i, j));
                    }
                }
            }
        }
    }
    Ok(())
}
