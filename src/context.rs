// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use std::time::{Duration, Instant};

use comm::{Communicator, ReduceOp};

use crate::RunError;

/// Wall clock bookkeeping of one rank's run.
#[derive(Clone, Copy, Debug)]
pub struct RunContext {
    start: Instant,
    max_wall_time: Option<Duration>,
}

impl RunContext {
    pub fn new(max_wall_time: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            max_wall_time,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Fails on every rank once the slowest rank has used up the budget. Must be called on
    /// every rank.
    pub fn check_time(&self, comm: &dyn Communicator) -> Result<(), RunError> {
        let Some(limit) = self.max_wall_time else {
            return Ok(());
        };
        let elapsed = comm.all_reduce_f64(self.elapsed().as_secs_f64(), ReduceOp::Max)?;
        if elapsed > limit.as_secs_f64() {
            return Err(RunError::OutOfTime {
                elapsed,
                limit: limit.as_secs_f64(),
            });
        }
        Ok(())
    }
}


// End of File
