//! Thin façade over intra-process (thread-per-rank) or inter-process (MPI)
//! message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable**; the only collective the tensor
//! layer needs is [`Communicator::allgather`], which returns a rank-ordered
//! buffer and is built on top of `isend`/`irecv` unless a backend provides a
//! native one.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

use crate::fem_error::FemError;

/// Tag reserved for the default `allgather` implementation.
pub const ALLGATHER_TAG: u16 = 0xA11A;

/// Communication interface of a distributed group.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of the calling process within the group.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// True for the compile-time serial communicator.
    fn is_no_comm(&self) -> bool {
        false
    }

    /// Gather `send` from every rank into `recv`, ordered by rank.
    ///
    /// `recv.len()` must equal `size() * send.len()`. Collective: every rank of
    /// the group must call it, or the group deadlocks.
    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), FemError> {
        let (me, n, chunk) = (self.rank(), self.size(), send.len());
        if recv.len() != n * chunk {
            return Err(FemError::Communication(format!(
                "allgather receive buffer holds {} bytes, expected {}",
                recv.len(),
                n * chunk
            )));
        }
        recv[me * chunk..(me + 1) * chunk].copy_from_slice(send);

        let sends: Vec<_> = (0..n)
            .filter(|&peer| peer != me)
            .map(|peer| self.isend(peer, ALLGATHER_TAG, send))
            .collect();
        for peer in (0..n).filter(|&peer| peer != me) {
            let slot = &mut recv[peer * chunk..(peer + 1) * chunk];
            let got = self
                .irecv(peer, ALLGATHER_TAG, slot)
                .wait()
                .ok_or_else(|| FemError::Communication(format!("no data from rank {peer}")))?;
            if got.len() != chunk {
                return Err(FemError::Communication(format!(
                    "rank {peer} contributed {} bytes, expected {chunk}",
                    got.len()
                )));
            }
            slot.copy_from_slice(&got);
        }
        for s in sends {
            s.wait();
        }
        Ok(())
    }

    /// Gather one `f64` per rank, ordered by rank.
    fn allgather_f64(&self, value: f64) -> Result<Vec<f64>, FemError> {
        self.allgather_f64_slice(&[value])
    }

    /// Gather equally sized `f64` slices from every rank, concatenated in rank order.
    fn allgather_f64_slice(&self, local: &[f64]) -> Result<Vec<f64>, FemError> {
        let mut out = vec![0.0f64; local.len() * self.size()];
        self.allgather(
            bytemuck::cast_slice(local),
            bytemuck::cast_slice_mut(&mut out[..]),
        )?;
        Ok(out)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received message (if any) whole,
    /// whatever the length of the buffer it was posted with.
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial runs: one process, rank 0.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn is_no_comm(&self) -> bool {
        true
    }

    fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), FemError> {
        if recv.len() != send.len() {
            return Err(FemError::Communication(format!(
                "allgather receive buffer holds {} bytes, expected {}",
                recv.len(),
                send.len()
            )));
        }
        recv.copy_from_slice(send);
        Ok(())
    }
}

// --- RayonComm: ranks simulated by threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// Mailbox shared by all ranks of one in-process group. FIFO per key.
#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
}

impl Mailbox {
    fn post(&self, key: Key, data: Bytes) {
        self.slots.entry(key).or_default().push_back(data);
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// Receive handle of [`RayonComm`]; `wait` blocks until the peer's message arrives.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(bytes) = self.mailbox.take(&self.key) {
                return Some(bytes.to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// One rank of a group whose members run as threads of the current process.
///
/// Ranks of a group share a private mailbox, so independent groups never see
/// each other's messages.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// Create all `size` ranks of a new group, indexed by rank.
    pub fn world(size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use mpi::Threading;

    /// Communicator over `MPI_COMM_WORLD`. Dropping it finalizes MPI.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        pub rank: usize,
        _universe: Universe,
    }

    // MPI is initialized with `Threading::Multiple`, so the handle may be used
    // from any thread.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        pub fn new() -> Result<Self, FemError> {
            let (universe, level) = mpi::initialize_with_threading(Threading::Multiple)
                .ok_or_else(|| FemError::Communication("MPI already initialized".into()))?;
            if level != Threading::Multiple {
                log::warn!("MPI provides threading level {level:?}, not Multiple");
            }
            let world = universe.world();
            let rank = world.rank() as usize;
            Ok(Self {
                world,
                rank,
                _universe: universe,
            })
        }
    }

    /// Completed receive; MPI point-to-point here is blocking.
    pub struct MpiRecv(Vec<u8>);

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            Some(self.0)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiRecv {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            MpiRecv(data)
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn allgather(&self, send: &[u8], recv: &mut [u8]) -> Result<(), FemError> {
            if recv.len() != send.len() * self.size() {
                return Err(FemError::Communication(format!(
                    "allgather receive buffer holds {} bytes, expected {}",
                    recv.len(),
                    send.len() * self.size()
                )));
            }
            self.world.all_gather_into(send, recv);
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
