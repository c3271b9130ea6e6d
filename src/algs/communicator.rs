//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are contiguous byte slices. Handles are waitable but posting is
//! non-blocking: the halo exchange and the transposes post every receive
//! and send first, then call `.wait()` before they trust received data.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

/// Non-blocking point-to-point communication.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `buf.len()` bytes from `peer`. The data is handed
    /// back by [`Wait::wait`].
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    /// Receive handles return `None` when the transport gave up.
    fn wait(self) -> Option<Vec<u8>>;
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- LocalComm: intra-process, one thread per rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
    lock: Mutex<()>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.slots.entry(key).or_default().push_back(data);
        let _guard = self.lock.lock();
        self.arrived.notify_all();
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// How long a [`LocalComm`] receive waits before reporting failure.
pub const LOCAL_RECV_TIMEOUT: Duration = Duration::from_secs(30);

/// In-process communicator: every member of a group shares one mailbox,
/// messages between the same `(src, dst, tag)` arrive in FIFO order, and
/// separate groups never see each other's traffic.
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl LocalComm {
    /// Communicators for ranks `0..size` of a fresh group.
    pub fn group(size: usize) -> Vec<LocalComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

pub struct LocalHandle {
    key: Key,
    len: usize,
    mailbox: Arc<Mailbox>,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let deadline = Instant::now() + LOCAL_RECV_TIMEOUT;
        let mut guard = self.mailbox.lock.lock();
        loop {
            if let Some(bytes) = self.mailbox.take(&self.key) {
                if bytes.len() < self.len {
                    log::error!(
                        "message {:?} carries {} bytes, {} expected",
                        self.key,
                        bytes.len(),
                        self.len
                    );
                    return None;
                }
                return Some(bytes[..self.len].to_vec());
            }
            if self
                .mailbox
                .arrived
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.mailbox.take(&self.key).map(|b| b.to_vec());
            }
        }
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            key: (peer, self.rank, tag),
            len: buf.len(),
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, Destination, Source};
    use std::rc::Rc;

    /// World communicator. Sends are buffered (they complete locally once
    /// copied into the attached buffer), receives complete in `wait`.
    pub struct MpiComm {
        _universe: Universe,
        world: Rc<SimpleCommunicator>,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialise MPI and attach `send_buffer` bytes for buffered sends.
        /// Returns `None` if MPI was already initialised.
        pub fn new(send_buffer: usize) -> Option<Self> {
            let mut universe = mpi::initialize()?;
            universe.set_buffer_size(send_buffer);
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                _universe: universe,
                world: Rc::new(world),
                rank,
                size,
            })
        }
    }

    pub struct MpiRecv {
        world: Rc<SimpleCommunicator>,
        peer: i32,
        tag: i32,
        len: usize,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let (data, _status) = self
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            (data.len() == self.len).then_some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .buffered_send_with_tag(buf, i32::from(tag));
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiRecv {
            MpiRecv {
                world: Rc::clone(&self.world),
                peer: peer as i32,
                tag: i32::from(tag),
                len: buf.len(),
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_roundtrip_two_ranks() {
        let comms = LocalComm::group(2);
        let mut recv_buf = [0u8; 4];
        let recv = comms[1].irecv(0, 7, &mut recv_buf);
        comms[0].isend(1, 7, &[1, 2, 3, 4]).wait();
        let data = recv.wait().expect("message from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(recv_buf, [1, 2, 3, 4]);
    }

    #[test]
    fn same_key_is_fifo() {
        let comms = LocalComm::group(2);
        comms[0].isend(1, 3, &[1]);
        comms[0].isend(1, 3, &[2]);
        let mut b = [0u8; 1];
        assert_eq!(comms[1].irecv(0, 3, &mut b).wait(), Some(vec![1]));
        assert_eq!(comms[1].irecv(0, 3, &mut b).wait(), Some(vec![2]));
    }

    #[test]
    fn groups_are_isolated() {
        let a = LocalComm::group(2);
        let b = LocalComm::group(2);
        a[0].isend(1, 1, &[9]);
        b[0].isend(1, 1, &[5]);
        let mut buf = [0u8; 1];
        assert_eq!(b[1].irecv(0, 1, &mut buf).wait(), Some(vec![5]));
        assert_eq!(a[1].irecv(0, 1, &mut buf).wait(), Some(vec![9]));
    }

    #[test]
    fn receive_across_threads() {
        let mut comms = LocalComm::group(2);
        let c1 = comms.pop().unwrap();
        let c0 = comms.pop().unwrap();
        let t = std::thread::spawn(move || {
            let mut buf = [0u8; 2];
            c1.irecv(0, 0, &mut buf).wait()
        });
        std::thread::sleep(Duration::from_millis(10));
        c0.isend(1, 0, &[4, 2]);
        assert_eq!(t.join().unwrap(), Some(vec![4, 2]));
    }
}
