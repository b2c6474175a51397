// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! # ddmd's Logging Setup
//!
//! Every crate in the workspace logs through the [`log`] facade. This crate installs
//! [`env_logger`] as the backend, reading its configuration from the environment.
//!
//! By default, the logging level is set to [`Info`](log::Level::Info) for debug builds, and
//! [`Warn`](log::Level::Warn) for release builds, for the crates passed to [`init`]. This can be
//! overridden by setting the `RUST_LOG` environment variable, like so:
//!
//! ```sh
//! $> RUST_LOG=ddmd_engine=debug cargo run -- run.toml
//! ```
//!
//! Each simulated process runs on its own thread named `rank-N`; that name is printed in front of
//! every record so interleaved output from different ranks can be told apart.

use std::io::Write;

mod filter;

pub use filter::filter_string;

/// The crates whose records are shown by default.
pub const DEFAULT_CRATES: &[&str] = &["ddmd", "ddmd_comm", "ddmd_engine"];

/// The level used when `RUST_LOG` is not set.
pub fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    }
}

/// Initializes the logging framework for `crates` at [`default_level`]. Calling this more than
/// once is harmless; only the first call installs a logger.
pub fn init(crates: &[&str]) {
    init_with_level(crates, default_level());
}

/// Initializes the logging framework for `crates` at `log_level`, unless `RUST_LOG` is set.
pub fn init_with_level(crates: &[&str], log_level: log::LevelFilter) {
    let mut builder = if std::env::var("RUST_LOG").is_err() {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(filter_string(crates, log_level)),
        )
    } else {
        env_logger::Builder::from_default_env()
    };
    builder.format(|buf, record| {
        let thread = std::thread::current();
        writeln!(
            buf,
            "[{} {:<5} {}] {}",
            thread.name().unwrap_or("main"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    // A logger may already be installed by an earlier call or by a test harness.
    let _ = builder.try_init();
}

// End of File
