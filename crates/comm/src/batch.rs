// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::ids::Rank;
use serde::{de::DeserializeOwned, Serialize};

use crate::{BlockDataType, CommError, Communicator, RecvBuffer, SendBuffer, Tag};

/// Master side of a bounded broadcast stream.
///
/// Items are cached until `batch_size` of them are pending, then the whole batch is sent to
/// every other rank. [`BatchSender::finish`] flushes the remainder and terminates the stream with
/// an empty batch. Receivers drain the stream with [`receive_batches`].
pub struct BatchSender<'c, T> {
    comm: &'c dyn Communicator,
    kind: BlockDataType,
    cache: Vec<T>,
    batch_size: usize,
    buffer_capacity: usize,
    n_sent: usize,
}

impl<'c, T: Serialize> BatchSender<'c, T> {
    pub fn new(
        comm: &'c dyn Communicator,
        kind: BlockDataType,
        batch_size: usize,
        buffer_capacity: usize,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            comm,
            kind,
            cache: Vec::with_capacity(batch_size),
            batch_size,
            buffer_capacity,
            n_sent: 0,
        }
    }

    /// Adds one item and broadcasts the cache as soon as it is full.
    pub fn push(&mut self, item: T) -> Result<(), CommError> {
        self.cache.push(item);
        if self.cache.len() == self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of items cached but not yet broadcast.
    pub fn n_pending(&self) -> usize {
        self.cache.len()
    }

    /// Number of items pushed so far.
    pub fn n_items(&self) -> usize {
        self.n_sent + self.cache.len()
    }

    fn flush(&mut self) -> Result<(), CommError> {
        self.broadcast(&self.cache)?;
        self.n_sent += self.cache.len();
        self.cache.clear();
        Ok(())
    }

    fn broadcast(&self, items: &[T]) -> Result<(), CommError> {
        let mut buffer = SendBuffer::new(self.buffer_capacity);
        buffer.pack(self.kind, items)?;
        let bytes = buffer.into_bytes();
        for dest in (0..self.comm.size()).filter(|&r| r != self.comm.rank()) {
            self.comm.send_bytes(dest, Tag::Data, bytes.clone())?;
        }
        Ok(())
    }

    /// Sends any cached items followed by the empty terminating batch, and returns the total
    /// number of items sent.
    pub fn finish(mut self) -> Result<usize, CommError> {
        if !self.cache.is_empty() {
            self.flush()?;
        }
        self.broadcast(&[])?;
        Ok(self.n_sent)
    }
}

/// Receives batches broadcast by `root` until the empty terminating batch, handing each one to
/// `on_batch`. Returns the number of items received.
pub fn receive_batches<T, E, F>(
    comm: &dyn Communicator,
    root: Rank,
    kind: BlockDataType,
    mut on_batch: F,
) -> Result<usize, E>
where
    T: DeserializeOwned,
    E: From<CommError>,
    F: FnMut(Vec<T>) -> Result<(), E>,
{
    let mut n_received = 0;
    loop {
        let bytes = comm.recv_bytes(root, Tag::Data)?;
        let mut buffer = RecvBuffer::new(bytes);
        let batch: Vec<T> = buffer.unpack(kind).map_err(CommError::from)?;
        buffer.finish().map_err(CommError::from)?;
        if batch.is_empty() {
            return Ok(n_received);
        }
        n_received += batch.len();
        on_batch(batch)?;
    }
}

// End of File
