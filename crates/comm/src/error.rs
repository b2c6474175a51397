// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::ids::Rank;
use thiserror::Error;

use crate::{BlockDataType, Tag};

/// Failures of the message layer. All of them end the run.
#[derive(Error, Debug)]
pub enum CommError {
    /// The peer dropped its end of the channel, usually because it stopped on an error.
    #[error("rank {peer} is no longer reachable")]
    Disconnected { peer: Rank },

    /// A send or receive named a rank outside the communicator.
    #[error("rank {rank} is out of range for a communicator of size {size}")]
    InvalidRank { rank: Rank, size: usize },

    /// A message of the wrong class arrived, meaning two ranks disagree on the protocol step.
    #[error("expected a {expected:?} message from rank {source_rank}, got {found:?}")]
    UnexpectedTag {
        source_rank: Rank,
        expected: Tag,
        found: Tag,
    },

    /// A collective payload had the wrong length.
    #[error("malformed collective payload of {len} bytes")]
    MalformedCollective { len: usize },

    /// The world needs at least one rank.
    #[error("a communicator needs at least one rank")]
    EmptyWorld,

    /// The operating system refused to start a rank thread.
    #[error("failed to spawn thread for rank {rank}")]
    Spawn {
        rank: Rank,
        #[source]
        source: std::io::Error,
    },

    /// A rank thread panicked.
    #[error("rank {rank} panicked")]
    Panicked { rank: Rank },

    /// Packing or unpacking a message failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Failures while packing or unpacking typed blocks.
#[derive(Error, Debug)]
pub enum BufferError {
    /// Serialization or deserialization of a block failed.
    #[error("failed to encode or decode a block")]
    Codec(#[from] bincode::Error),

    /// The next block in the message is not the one the receiver asked for.
    #[error("expected a {expected:?} block, found {found:?}")]
    UnexpectedBlock {
        expected: BlockDataType,
        found: BlockDataType,
    },

    /// The packed message would exceed the configured buffer capacity.
    #[error("send buffer overflow: {size} bytes exceeds capacity of {capacity} bytes")]
    Overflow { size: usize, capacity: usize },

    /// Bytes were left over after the receiver unpacked every block it expected.
    #[error("{remaining} unread bytes left in receive buffer")]
    Trailing { remaining: usize },
}

// End of File
