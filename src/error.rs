// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use std::path::PathBuf;

use comm::CommError;
use common::{ids::GroupId, BoundaryError};
use engine::{CellListError, ExchangeError, GroupError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),

    #[error("invalid box")]
    Boundary(#[from] BoundaryError),

    #[error("[{section}] {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(section: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            section,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("communication failed")]
    Comm(#[from] CommError),

    #[error("atom exchange failed")]
    Exchange(#[from] ExchangeError),

    #[error("group distribution failed")]
    Group(#[from] GroupError),

    #[error("pair enumeration failed")]
    CellList(#[from] CellListError),

    #[error("bond {bond} has a member that is neither local nor ghost")]
    MissingBondAtom { bond: GroupId },

    #[error("out of time after {elapsed:.1} s (limit {limit:.1} s)")]
    OutOfTime { elapsed: f64, limit: f64 },
}

impl RunError {
    /// True if this rank only failed because a peer went away first.
    pub fn is_peer_failure(&self) -> bool {
        fn comm(err: &CommError) -> bool {
            matches!(err, CommError::Disconnected { .. })
        }
        fn group(err: &GroupError) -> bool {
            matches!(err, GroupError::Comm(err) if comm(err))
        }
        match self {
            RunError::Comm(err) => comm(err),
            RunError::Group(err) => group(err),
            RunError::Exchange(ExchangeError::Comm(err)) => comm(err),
            RunError::Exchange(ExchangeError::Group(err)) => group(err),
            _ => false,
        }
    }
}

// End of File
