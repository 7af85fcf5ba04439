//! The parsed command line, before any validation or dispatch happens.
//! [`Cli::validate`] is the seam between clap's own parsing (which rejects
//! malformed syntax) and [`crate::ConfigError`] (which rejects combinations
//! clap's grammar can't express).

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(
    name = "blindftp",
    version,
    about = "Unidirectional UDP bulk file transfer for data-diode links"
)]
pub struct Cli {
    /// Which operating mode to run.
    #[command(subcommand)]
    pub mode: Mode,

    /// Destination address for `send`/`synchronize`/`strict-synchronize`;
    /// bind address for `receive`.
    #[arg(long, global = true, default_value = "0.0.0.0")]
    pub addr: String,

    /// UDP port, shared by both ends of the link.
    #[arg(long, global = true, default_value_t = 36016)]
    pub port: u16,

    /// Throughput ceiling in kilobits/second; 0 disables throttling.
    #[arg(long = "rate-kbps", global = true, default_value_t = 8000)]
    pub rate_kbps: u64,

    /// Bound the synchronization loop to N passes. Absent, the loop runs
    /// until every tracked file has been sent past `--min-redundancy`.
    #[arg(long = "loop", global = true)]
    pub loop_count: Option<u32>,

    /// Minimum delay, in seconds, between synchronization passes.
    #[arg(long = "pause-secs", global = true, default_value_t = 300)]
    pub pause_secs: u64,

    /// Load a previously persisted reference tree instead of starting from
    /// an empty one.
    #[arg(long, global = true)]
    pub resume: bool,

    /// Number of times a file must be resent past before the sync loop
    /// considers it done.
    #[arg(long = "min-redundancy", global = true, default_value_t = 5)]
    pub min_redundancy: i32,

    /// Age, in days, after which a vanished file's delete notification is
    /// sent (strict-synchronize only).
    #[arg(long = "retention-days", global = true, default_value_t = 7)]
    pub retention_days: u64,

    /// Delay, in seconds, between heartbeat emissions.
    #[arg(long = "heartbeat-secs", global = true, default_value_t = 10)]
    pub heartbeat_secs: u64,

    /// Repeat for increasing verbosity; see also `--debug`.
    #[arg(short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Shorthand for `-vv`.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Send a single file and exit once every chunk has gone out once.
    Send {
        /// File to send.
        file: PathBuf,
        /// Path the receiver should publish under, relative to its
        /// destination root.
        #[arg(long)]
        dest: PathBuf,
    },
    /// Mirror a directory tree, never propagating deletes.
    Synchronize {
        /// Source directory to mirror.
        dir: PathBuf,
    },
    /// Mirror a directory tree, propagating deletes for files aged out past
    /// `--retention-days`.
    StrictSynchronize {
        /// Source directory to mirror.
        dir: PathBuf,
    },
    /// Receive into a directory, blocking forever.
    Receive {
        /// Destination directory to publish received files under.
        dir: PathBuf,
    },
    /// Rewind emission bookkeeping in a persisted reference tree, forcing
    /// the next synchronization pass to resend the selected files without
    /// a full rescan. For recovering after a diode outage the sender had
    /// no way to detect on its own.
    Reset {
        /// Directory whose persisted reference tree is being corrected.
        dir: PathBuf,
        /// Which files to select for resending.
        #[command(subcommand)]
        selector: ResetMode,
    },
}

/// The four file-selection criteria a `reset` invocation can apply,
/// mirroring the selection modes of the standalone reset tool this
/// subcommand is modeled on.
#[derive(Debug, Subcommand)]
pub enum ResetMode {
    /// Reset every file last sent strictly after this UNIX timestamp.
    SentAfter {
        /// UNIX timestamp (seconds) of the outage; files sent after this
        /// are assumed lost.
        since: u64,
    },
    /// Reset every file whose relative path matches a regular expression.
    Matching {
        /// Regular expression tested against each tracked file's relative
        /// path, e.g. `^logs/` or `\.csv$`.
        pattern: String,
    },
    /// Reset the single file at an exact relative path.
    Path {
        /// Relative path of the file to reset, as tracked in the
        /// reference document.
        path: PathBuf,
    },
    /// Reset every file that a scan of what the receiver actually holds
    /// shows as missing or changed.
    DivergingFrom {
        /// Root of a directory tree holding what the receiver actually
        /// published — typically an imported copy of its destination
        /// directory.
        received_root: PathBuf,
    },
}

impl Cli {
    /// Checks every cross-field and semantic constraint clap's grammar
    /// can't express on its own. Called once, before any I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.min_redundancy <= 0 {
            return Err(ConfigError::ZeroMinRedundancy);
        }
        if self.loop_count == Some(0) {
            return Err(ConfigError::ZeroLoopCount);
        }
        if let Mode::Send { dest, .. } = &self.mode {
            if dest.is_absolute() {
                return Err(ConfigError::AbsoluteSendDest(dest.display().to_string()));
            }
        }
        Ok(())
    }

    /// The verbosity tier implied by `-v`/`-vv`/`--debug`.
    #[must_use]
    pub fn verbosity(&self) -> logging::Verbosity {
        if self.debug {
            logging::Verbosity::Debug
        } else {
            logging::Verbosity::from_occurrences(self.verbose)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn zero_port_is_rejected() {
        let cli = Cli::parse_from(["blindftp", "--port", "0", "receive", "/tmp/x"]);
        assert_eq!(cli.validate(), Err(ConfigError::ZeroPort));
    }

    #[test]
    fn zero_min_redundancy_is_rejected() {
        let cli = Cli::parse_from(["blindftp", "--min-redundancy", "0", "receive", "/tmp/x"]);
        assert_eq!(cli.validate(), Err(ConfigError::ZeroMinRedundancy));
    }

    #[test]
    fn zero_loop_count_is_rejected() {
        let cli = Cli::parse_from(["blindftp", "--loop", "0", "receive", "/tmp/x"]);
        assert_eq!(cli.validate(), Err(ConfigError::ZeroLoopCount));
    }

    #[test]
    fn absolute_send_destination_is_rejected() {
        let cli = Cli::parse_from(["blindftp", "send", "a.txt", "--dest", "/etc/passwd"]);
        assert_eq!(
            cli.validate(),
            Err(ConfigError::AbsoluteSendDest("/etc/passwd".to_string()))
        );
    }

    #[test]
    fn defaults_parse_cleanly() {
        let cli = Cli::parse_from(["blindftp", "receive", "/tmp/x"]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.port, 36016);
        assert_eq!(cli.min_redundancy, 5);
    }

    #[test]
    fn double_v_selects_debug_verbosity() {
        let cli = Cli::parse_from(["blindftp", "-vv", "receive", "/tmp/x"]);
        assert_eq!(cli.verbosity(), logging::Verbosity::Debug);
    }

    #[test]
    fn reset_by_path_parses_into_the_matching_selector() {
        let cli = Cli::parse_from(["blindftp", "reset", "/tmp/x", "path", "a/b.txt"]);
        let Mode::Reset { dir, selector } = cli.mode else {
            panic!("expected Mode::Reset");
        };
        assert_eq!(dir, PathBuf::from("/tmp/x"));
        assert!(matches!(selector, ResetMode::Path { path } if path == PathBuf::from("a/b.txt")));
    }

    #[test]
    fn reset_sent_after_parses_the_cutoff_timestamp() {
        let cli = Cli::parse_from(["blindftp", "reset", "/tmp/x", "sent-after", "1700000000"]);
        let Mode::Reset { selector, .. } = cli.mode else {
            panic!("expected Mode::Reset");
        };
        assert!(matches!(selector, ResetMode::SentAfter { since: 1_700_000_000 }));
    }

    #[test]
    fn debug_flag_selects_debug_verbosity_without_repeated_v() {
        let cli = Cli::parse_from(["blindftp", "--debug", "receive", "/tmp/x"]);
        assert_eq!(cli.verbosity(), logging::Verbosity::Debug);
    }
}
