#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Verbosity-flag-to-filter mapping and subscriber installation, shared by
//! the `blindftp` binary's receive and sender modes.
//!
//! BlindFTP has no reverse channel, so the log stream is the only signal an
//! operator gets about what either side is actually doing; this crate
//! exists so that signal is never silently dropped or inconsistently
//! formatted between the two modes.

use tracing_subscriber::EnvFilter;

/// The four verbosity tiers the CLI's `-v`/`-vv`/`--debug` flags select
/// between, each mapping to a fixed [`EnvFilter`] directive string rather
/// than a numeric level, so `RUST_LOG` can still override it per the
/// `tracing-subscriber` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Default: `info!` and above only.
    Normal,
    /// `-v`: also `debug!` from `blindftp`'s own crates.
    Verbose,
    /// `-vv` or `--debug`: `trace!` from `blindftp`'s own crates, `debug!`
    /// from dependencies.
    Debug,
}

impl Verbosity {
    /// Maps a repeated `-v` count (`0`, `1`, `2+`) to a tier.
    #[must_use]
    pub const fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    fn filter_directive(self) -> &'static str {
        match self {
            Self::Normal => "warn,blindftp=info,protocol=info,reassembly=info,reftree=info,heartbeat=info,receiver=info,sender=info",
            Self::Verbose => "warn,blindftp=debug,protocol=info,reassembly=debug,reftree=debug,heartbeat=debug,receiver=debug,sender=debug",
            Self::Debug => "debug,blindftp=trace,reassembly=trace,reftree=trace,heartbeat=trace,receiver=trace,sender=trace",
        }
    }
}

/// Installs a global `tracing` subscriber writing to stderr, filtered by
/// `verbosity` unless `RUST_LOG` is set in the environment (which always
/// takes precedence, per [`EnvFilter::try_from_default_env`]).
///
/// Returns an error if a subscriber was already installed — callers should
/// treat that as a programming error (each binary installs exactly one),
/// not a condition to recover from at runtime.
pub fn init(verbosity: Verbosity) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_occurrences_is_normal() {
        assert_eq!(Verbosity::from_occurrences(0), Verbosity::Normal);
    }

    #[test]
    fn one_occurrence_is_verbose() {
        assert_eq!(Verbosity::from_occurrences(1), Verbosity::Verbose);
    }

    #[test]
    fn two_or_more_occurrences_is_debug() {
        assert_eq!(Verbosity::from_occurrences(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_occurrences(9), Verbosity::Debug);
    }

    #[test]
    fn tiers_are_ordered_by_increasing_verbosity() {
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Debug);
    }

    #[test]
    fn each_tier_has_a_non_empty_directive() {
        for tier in [Verbosity::Normal, Verbosity::Verbose, Verbosity::Debug] {
            assert!(!tier.filter_directive().is_empty());
        }
    }
}
