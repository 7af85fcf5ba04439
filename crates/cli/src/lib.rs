#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! The `blindftp` binary's command-line surface: parsing, config
//! validation, and dispatch onto `sender`/`receiver`. The binary's own
//! `main` is a thin wrapper around [`run`] so the parsing and dispatch
//! logic stays testable without a real process boundary.

mod args;
mod error;
mod run;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

pub use args::{Cli, Mode, ResetMode};
pub use error::ConfigError;
pub use run::RunError;

/// Parses `args`, validates the result, and runs the selected mode.
/// Parse errors (clap's own `--help`/`--version`/malformed-flag handling)
/// are written to `stdout` or `stderr` as clap decides and reported via the
/// matching exit code, without ever constructing a [`Cli`].
pub fn run<I, T, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(clap_err) => {
            let target: &mut dyn Write = if clap_err.kind() == clap::error::ErrorKind::DisplayHelp
                || clap_err.kind() == clap::error::ErrorKind::DisplayVersion
            {
                stdout
            } else {
                stderr
            };
            let _ = write!(target, "{clap_err}");
            return exit_code_from_clap(&clap_err);
        }
    };

    match run::dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(stderr, "blindftp: {err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code_from_clap(err: &clap::Error) -> ExitCode {
    use clap::error::ErrorKind;
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_flag_reports_success_and_writes_to_stdout() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run(["blindftp", "--help"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::SUCCESS);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_mode_reports_failure_and_writes_to_stderr() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run(["blindftp"], &mut stdout, &mut stderr);
        assert_eq!(exit, ExitCode::from(2));
        assert!(stdout.is_empty());
        assert!(!stderr.is_empty());
    }

    #[test]
    fn invalid_config_after_successful_parse_reports_failure() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run(
            ["blindftp", "--port", "0", "receive", "/nonexistent/dest"],
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(exit, ExitCode::FAILURE);
        assert!(String::from_utf8_lossy(&stderr).contains("--port"));
    }
}
