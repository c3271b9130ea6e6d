//! Stateless all-to-all redistribution inside a process group.
//!
//! Used by the decomposed transforms to trade "my modes of every line" for
//! "every mode of my lines" and back. Nothing here knows about fields: the
//! caller packs one block per destination and unpacks one block per source.

use crate::algs::communicator::{Communicator, Wait};
use crate::algs::wire::{self, WireSample};
use crate::coupler_error::CouplerError;

/// Send `blocks[q]` to `group[q]` and return the block every member sent
/// to this process, indexed by group position.
///
/// `me` is this process' position in `group`; its own block is moved, not
/// sent. `recv_counts[p]` is the number of samples expected from
/// `group[p]`. `kind` is both the message tag offset and the header kind.
pub fn all_to_all<T, C>(
    comm: &C,
    group: &[usize],
    me: usize,
    tag: u16,
    kind: u16,
    mut blocks: Vec<Vec<T>>,
    recv_counts: &[usize],
) -> Result<Vec<Vec<T>>, CouplerError>
where
    T: WireSample + Default,
    C: Communicator,
{
    CouplerError::expect_len("transpose send blocks", group.len(), blocks.len())?;
    CouplerError::expect_len("transpose receive counts", group.len(), recv_counts.len())?;
    CouplerError::expect_len("own transpose block", recv_counts[me], blocks[me].len())?;

    let mut pending = Vec::with_capacity(group.len().saturating_sub(1));
    for (p, &peer) in group.iter().enumerate() {
        if p != me {
            let mut buf = vec![0u8; wire::message_len::<T>(recv_counts[p])];
            pending.push((p, comm.irecv(peer, tag + kind, &mut buf)));
        }
    }
    for (q, &peer) in group.iter().enumerate() {
        if q != me {
            let msg = wire::encode(kind, &blocks[q]);
            comm.isend(peer, tag + kind, &msg).wait();
        }
    }

    let mut received: Vec<Vec<T>> = vec![Vec::new(); group.len()];
    received[me] = std::mem::take(&mut blocks[me]);
    for (p, h) in pending {
        let raw = h.wait().ok_or_else(|| {
            CouplerError::Transport(format!("transpose block from rank {} never arrived", group[p]))
        })?;
        let mut block = vec![T::default(); recv_counts[p]];
        wire::decode_into(kind, &raw, &mut block)?;
        received[p] = block;
    }
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, LocalComm};
    use crate::algs::wire::kind;

    #[test]
    fn single_member_moves_own_block() {
        let out = all_to_all(&NoComm, &[0], 0, 0, kind::TRANSPOSE_FORWARD, vec![vec![1.0f64, 2.0]], &[2])
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn three_members_swap_blocks() {
        let comms = LocalComm::group(3);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let me = c.rank();
                    // Block for q carries 10*me + q, repeated q + 1 times.
                    let blocks = (0..3)
                        .map(|q| vec![(10 * me + q) as f64; q + 1])
                        .collect();
                    let counts = vec![me + 1; 3];
                    all_to_all(&c, &[0, 1, 2], me, 50, kind::TRANSPOSE_FORWARD, blocks, &counts)
                        .unwrap()
                })
            })
            .collect();
        for (me, h) in handles.into_iter().enumerate() {
            let got = h.join().unwrap();
            for (p, block) in got.iter().enumerate() {
                assert_eq!(block, &vec![(10 * p + me) as f64; me + 1]);
            }
        }
    }
}
