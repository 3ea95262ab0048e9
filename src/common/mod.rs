//! Common functionality shared by all subcommands.

use byte_unit::Byte;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program.
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = match procfs::process::Process::myself() {
        Ok(me) => me,
        Err(_) => return,
    };
    let page_size = procfs::page_size();
    if let Ok(stat) = me.stat() {
        tracing::debug!(
            "RSS now: {}",
            Byte::from_bytes((stat.rss * page_size) as u128).get_appropriate_unit(true)
        );
    }
}

/// Maximum number of worker threads the pool accepts.
pub const MAX_THREADS: usize = 256;

/// Number of query indices handed to a worker per claim of the shared cursor.
pub const CHUNK_SIZE: usize = 1000;

/// Largest `d` handled by the variant-enumeration path; above this the
/// neighbor engine falls back to brute-force pairwise comparison.
pub const MAXDIFF_HASH: u32 = 2;

/// The version of the `compairr` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the crate version, pinned to a stable string in tests so fixture
/// comparisons do not depend on the package version.
pub fn program_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_rss_now_smoke() {
        super::trace_rss_now();
    }
}
