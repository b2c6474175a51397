// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::BufferError;

/// The kind of data carried by one block of a message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockDataType {
    /// Atoms migrating to a new owner.
    Atom,
    /// Atoms copied to a neighbor as ghosts.
    Ghost,
    /// Refreshed ghost positions.
    Update,
    /// Bonded groups travelling with migrating atoms, keyed by group kind.
    Group(u8),
    /// A batch of the initial configuration broadcast by the master.
    Distribution,
}

#[derive(Serialize)]
struct BlockRef<'a, T> {
    kind: BlockDataType,
    items: &'a [T],
}

#[derive(Deserialize)]
struct Block<T> {
    kind: BlockDataType,
    items: Vec<T>,
}

/// Accumulates typed blocks for one outgoing message.
#[derive(Debug)]
pub struct SendBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl SendBuffer {
    /// Creates an empty buffer that refuses to grow past `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
        }
    }

    /// Appends one block holding `items`.
    pub fn pack<T: Serialize>(&mut self, kind: BlockDataType, items: &[T]) -> Result<(), BufferError> {
        bincode::serialize_into(&mut self.bytes, &BlockRef { kind, items })?;
        if self.bytes.len() > self.capacity {
            return Err(BufferError::Overflow {
                size: self.bytes.len(),
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads typed blocks back out of a received message, in the order they were packed.
#[derive(Debug)]
pub struct RecvBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl RecvBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Reads the next block, which must be of kind `expected`.
    pub fn unpack<T: DeserializeOwned>(
        &mut self,
        expected: BlockDataType,
    ) -> Result<Vec<T>, BufferError> {
        let mut slice = &self.bytes[self.cursor..];
        let block: Block<T> = bincode::deserialize_from(&mut slice)?;
        self.cursor = self.bytes.len() - slice.len();
        if block.kind != expected {
            return Err(BufferError::UnexpectedBlock {
                expected,
                found: block.kind,
            });
        }
        Ok(block.items)
    }

    /// Checks that every byte of the message has been consumed.
    pub fn finish(self) -> Result<(), BufferError> {
        match self.bytes.len() - self.cursor {
            0 => Ok(()),
            remaining => Err(BufferError::Trailing { remaining }),
        }
    }
}


// End of File
