// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::ids::Rank;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::{CommError, Communicator, Tag};

type Packet = (Tag, Vec<u8>);

/// In-process communicator: each rank owns the sending end of one channel to every rank and
/// the receiving end of one channel from every rank.
///
/// When a rank stops, its channel ends are dropped and every peer that later talks to it gets
/// [`CommError::Disconnected`], so one failing rank brings the whole world down.
#[derive(Debug)]
pub struct LocalComm {
    rank: Rank,
    senders: Vec<Sender<Packet>>,
    receivers: Vec<Receiver<Packet>>,
}

/// Creates the communicators of a world of `size` ranks, indexed by rank.
pub fn local_world(size: usize) -> Vec<LocalComm> {
    // channels[source][dest]
    let mut senders: Vec<Vec<Sender<Packet>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut receivers: Vec<Vec<Receiver<Packet>>> =
        (0..size).map(|_| Vec::with_capacity(size)).collect();
    for source_senders in senders.iter_mut() {
        for dest_receivers in receivers.iter_mut() {
            let (tx, rx) = unbounded();
            source_senders.push(tx);
            dest_receivers.push(rx);
        }
    }
    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| LocalComm {
            rank,
            senders,
            receivers,
        })
        .collect()
}

/// Runs `f` once per rank on its own thread named `rank-N` and returns the per-rank results in
/// rank order. The outer error reports a world that could not be started or a rank that
/// panicked.
pub fn run_local<T, E, F>(size: usize, f: F) -> Result<Vec<Result<T, E>>, CommError>
where
    T: Send,
    E: Send,
    F: Fn(LocalComm) -> Result<T, E> + Sync,
{
    if size == 0 {
        return Err(CommError::EmptyWorld);
    }
    let f = &f;
    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(size);
        for comm in local_world(size) {
            let rank = comm.rank;
            let handle = std::thread::Builder::new()
                .name(format!("rank-{rank}"))
                .spawn_scoped(scope, move || f(comm))
                .map_err(|source| CommError::Spawn { rank, source })?;
            handles.push(handle);
        }
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| handle.join().map_err(|_| CommError::Panicked { rank }))
            .collect()
    })
}

impl LocalComm {
    fn check_rank(&self, rank: Rank) -> Result<(), CommError> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send_bytes(&self, dest: Rank, tag: Tag, bytes: Vec<u8>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        self.senders[dest].send((tag, bytes)).map_err(|_| {
            debug!("rank {}: send to rank {dest} failed, peer is gone", self.rank);
            CommError::Disconnected { peer: dest }
        })
    }

    fn recv_bytes(&self, source: Rank, tag: Tag) -> Result<Vec<u8>, CommError> {
        self.check_rank(source)?;
        let (found, bytes) = self.receivers[source].recv().map_err(|_| {
            debug!("rank {}: receive from rank {source} failed, peer is gone", self.rank);
            CommError::Disconnected { peer: source }
        })?;
        if found != tag {
            return Err(CommError::UnexpectedTag {
                source_rank: source,
                expected: tag,
                found,
            });
        }
        Ok(bytes)
    }
}


// End of File
