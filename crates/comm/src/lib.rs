// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Message passing between the processes of a domain-decomposed simulation.
//!
//! Processes never share mutable state. Everything one rank learns about another arrives as a
//! byte message over a [`Communicator`]: point-to-point sends between neighbors, and a small set
//! of collectives (reductions, broadcast, barrier) built on top of them. Typed payloads are
//! packed into tagged blocks by [`SendBuffer`] and checked on the way out by [`RecvBuffer`].
//!
//! [`LocalComm`] is the in-process backend: one thread per rank, one FIFO channel per ordered
//! pair of ranks.

mod batch;
mod buffer;
mod error;
mod local;

pub use batch::{receive_batches, BatchSender};
pub use buffer::{BlockDataType, RecvBuffer, SendBuffer};
pub use error::{BufferError, CommError};
pub use local::{local_world, run_local, LocalComm};

use common::ids::Rank;

/// The rank that reads input, distributes the initial configuration and roots collectives.
pub const MASTER: Rank = 0;

/// Coarse message class. Receivers state which class they expect, so a message from a
/// mismatched protocol step is reported instead of silently misread.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Neighbor exchange, ghost refresh and distribution batches.
    Data,
    /// Traffic generated by the collective operations of [`Communicator`].
    Collective,
}

/// Reduction operators for the collective helpers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }

    fn apply_u64(self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }
}

/// A group of ranks that can exchange byte messages.
///
/// Messages between a given ordered pair of ranks are delivered in the order they were sent.
/// Sends never block. Every collective must be called by all ranks in the same order.
pub trait Communicator {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    /// Queues `bytes` for delivery to `dest`.
    fn send_bytes(&self, dest: Rank, tag: Tag, bytes: Vec<u8>) -> Result<(), CommError>;

    /// Blocks until the next message from `source` arrives.
    fn recv_bytes(&self, source: Rank, tag: Tag) -> Result<Vec<u8>, CommError>;

    fn is_master(&self) -> bool {
        self.rank() == MASTER
    }

    /// Sends `bytes` to `dest` and then receives one message from `source`. A message to self
    /// is handed back directly.
    fn send_recv(
        &self,
        dest: Rank,
        bytes: Vec<u8>,
        source: Rank,
    ) -> Result<Vec<u8>, CommError> {
        if dest == self.rank() && source == self.rank() {
            return Ok(bytes);
        }
        self.send_bytes(dest, Tag::Data, bytes)?;
        self.recv_bytes(source, Tag::Data)
    }

    /// Sends `bytes` from `root` to every rank and returns them. Non-root ranks pass anything
    /// (typically an empty vector) and get the root's bytes back.
    fn broadcast_bytes(&self, root: Rank, bytes: Vec<u8>) -> Result<Vec<u8>, CommError> {
        if self.rank() == root {
            for dest in (0..self.size()).filter(|&r| r != root) {
                self.send_bytes(dest, Tag::Collective, bytes.clone())?;
            }
            Ok(bytes)
        } else {
            self.recv_bytes(root, Tag::Collective)
        }
    }

    /// Collects one message from every rank on the master, in rank order. Other ranks get
    /// `None`.
    fn gather_bytes(&self, bytes: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        if self.is_master() {
            let mut all = Vec::with_capacity(self.size());
            all.push(bytes);
            for source in 1..self.size() {
                all.push(self.recv_bytes(source, Tag::Collective)?);
            }
            Ok(Some(all))
        } else {
            self.send_bytes(MASTER, Tag::Collective, bytes)?;
            Ok(None)
        }
    }

    /// Combines `value` over all ranks on the master; other ranks get `None`.
    fn reduce_f64(&self, value: f64, op: ReduceOp) -> Result<Option<f64>, CommError> {
        let Some(all) = self.gather_bytes(value.to_le_bytes().to_vec())? else {
            return Ok(None);
        };
        let mut result = value;
        for bytes in &all[1..] {
            result = op.apply_f64(result, f64::from_le_bytes(decode_8(bytes)?));
        }
        Ok(Some(result))
    }

    /// Combines `value` over all ranks and returns the result everywhere.
    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, CommError> {
        let reduced = self.reduce_f64(value, op)?.unwrap_or_default();
        let bytes = self.broadcast_bytes(MASTER, reduced.to_le_bytes().to_vec())?;
        decode_8(&bytes).map(f64::from_le_bytes)
    }

    /// Integer counterpart of [`Communicator::reduce_f64`].
    fn reduce_u64(&self, value: u64, op: ReduceOp) -> Result<Option<u64>, CommError> {
        let Some(all) = self.gather_bytes(value.to_le_bytes().to_vec())? else {
            return Ok(None);
        };
        let mut result = value;
        for bytes in &all[1..] {
            result = op.apply_u64(result, u64::from_le_bytes(decode_8(bytes)?));
        }
        Ok(Some(result))
    }

    /// Integer counterpart of [`Communicator::all_reduce_f64`].
    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, CommError> {
        let reduced = self.reduce_u64(value, op)?.unwrap_or_default();
        let bytes = self.broadcast_bytes(MASTER, reduced.to_le_bytes().to_vec())?;
        decode_8(&bytes).map(u64::from_le_bytes)
    }

    /// Returns once every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CommError> {
        self.all_reduce_u64(0, ReduceOp::Sum).map(|_| ())
    }
}

fn decode_8(bytes: &[u8]) -> Result<[u8; 8], CommError> {
    bytes
        .try_into()
        .map_err(|_| CommError::MalformedCollective { len: bytes.len() })
}

// End of File
