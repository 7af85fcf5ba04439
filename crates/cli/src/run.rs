//! Mode dispatch: turns a validated [`Cli`] into a call onto `sender` or
//! `receiver`. Each arm owns building that mode's config struct from the
//! common flags; none of them touch argument parsing.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use receiver::{ReceiverConfig, ReceiverError};
use reftree::{ReferenceTree, ResetSelector};
use sender::{PassConfig, SendError, SyncError};

use crate::args::{Cli, Mode, ResetMode};
use crate::error::ConfigError;

/// Everything that can go wrong once dispatch has started, wrapping each
/// mode's own error type so `main` has one thing to report.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A configuration problem caught before any I/O.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The receive loop failed.
    #[error(transparent)]
    Receive(#[from] ReceiverError),
    /// The synchronization loop failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// A single-file send failed.
    #[error(transparent)]
    Send(#[from] SendError),
    /// Loading, applying, or saving a `reset` rewind failed.
    #[error(transparent)]
    Reset(#[from] reftree::ResetError),
    /// Could not load or save the reference document outside of a
    /// synchronization pass (`reset` reads and writes it directly).
    #[error(transparent)]
    Persist(#[from] reftree::PersistError),
    /// Could not create the receiver's scratch directory.
    #[error("failed to create scratch directory {path}: {source}")]
    ScratchDirCreate {
        /// Scratch directory path that failed to create.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Could not bind an outbound UDP socket.
    #[error("failed to bind an outbound UDP socket: {0}")]
    SocketBind(std::io::Error),
}

/// Validates `cli`, installs logging, and runs the selected mode to
/// completion (or forever, for `receive`).
pub fn dispatch(cli: &Cli) -> Result<(), RunError> {
    cli.validate()?;
    if logging::init(cli.verbosity()).is_err() {
        tracing::warn!("a tracing subscriber was already installed; continuing with it");
    }

    match &cli.mode {
        Mode::Send { file, dest } => run_send(cli, file, dest),
        Mode::Synchronize { dir } => run_sync(cli, dir, false),
        Mode::StrictSynchronize { dir } => run_sync(cli, dir, true),
        Mode::Receive { dir } => run_receive(cli, dir),
        Mode::Reset { dir, selector } => run_reset(dir, selector),
    }
}

fn resolve_addr(cli: &Cli) -> Result<SocketAddr, ConfigError> {
    let host_port = format!("{}:{}", cli.addr, cli.port);
    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::InvalidAddr(cli.addr.clone(), host_port))
}

fn session_id() -> i32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i32)
}

fn run_send(cli: &Cli, file: &Path, dest: &Path) -> Result<(), RunError> {
    let addr = resolve_addr(cli)?;
    let socket = sender::bind_outbound().map_err(RunError::SocketBind)?;
    sender::send_single_file(&socket, addr, file, dest, cli.rate_kbps, session_id())?;
    Ok(())
}

fn run_sync(cli: &Cli, dir: &Path, strict_mirror: bool) -> Result<(), RunError> {
    let addr = resolve_addr(cli)?;
    let reference_doc = dir.join(reftree::DEFAULT_FILENAME);
    let mut tree = if cli.resume && reference_doc.exists() {
        reftree::load(&reference_doc).map_err(SyncError::from)?
    } else {
        ReferenceTree::empty(0)
    };

    let socket = sender::bind_outbound().map_err(RunError::SocketBind)?;
    let mut limiter = bandwidth::RateLimiter::from_kbps(cli.rate_kbps);
    let config = PassConfig {
        source_root: dir.to_path_buf(),
        reference_doc,
        dest_addr: addr,
        session_id: session_id(),
        strict_mirror,
        min_redundancy: cli.min_redundancy,
        retention: Duration::from_secs(cli.retention_days.saturating_mul(24 * 3600)),
    };

    let emitter = heartbeat::HeartbeatEmitter::new(
        config.session_id,
        Duration::from_secs(cli.heartbeat_secs),
    );
    let heartbeat_socket = socket.try_clone().map_err(RunError::SocketBind)?;
    std::thread::Builder::new()
        .name("blindftp-heartbeat".to_string())
        .spawn(move || sender::heartbeat_loop::run(emitter, &heartbeat_socket, addr))
        .expect("failed to spawn heartbeat thread");

    let mut session_seq: i32 = 0;
    sender::sync_loop::run(
        &mut tree,
        &socket,
        &mut limiter,
        &config,
        &mut session_seq,
        Duration::from_secs(cli.pause_secs),
        cli.loop_count,
    )?;
    Ok(())
}

fn run_receive(cli: &Cli, dir: &Path) -> Result<(), RunError> {
    let addr = resolve_addr(cli)?;
    let scratch_dir: PathBuf = dir.join(".blindftp-scratch");
    std::fs::create_dir_all(&scratch_dir).map_err(|source| RunError::ScratchDirCreate {
        path: scratch_dir.clone(),
        source,
    })?;

    receiver::run(ReceiverConfig {
        bind_addr: addr,
        dest_root: dir.to_path_buf(),
        scratch_dir,
        default_heartbeat_delay: Duration::from_secs(cli.heartbeat_secs),
    })?;
    Ok(())
}

fn run_reset(dir: &Path, selector: &ResetMode) -> Result<(), RunError> {
    let reference_doc = dir.join(reftree::DEFAULT_FILENAME);
    let mut tree = reftree::load(&reference_doc)?;

    let selector = match selector {
        ResetMode::SentAfter { since } => ResetSelector::SentAfter(*since),
        ResetMode::Matching { pattern } => ResetSelector::matching_path(pattern)?,
        ResetMode::Path { path } => ResetSelector::ExactPath(path.clone()),
        ResetMode::DivergingFrom { received_root } => {
            ResetSelector::DivergingFrom(received_root.clone())
        }
    };

    let outcome = reftree::reset(&mut tree, &selector)?;
    tracing::info!(
        reset = outcome.reset_files,
        total = outcome.total_files,
        "reference tree emission bookkeeping rewound"
    );
    if outcome.reset_files > 0 {
        reftree::save(&tree, &reference_doc)?;
    }
    Ok(())
}
