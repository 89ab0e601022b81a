//! Tracing setup for the server and the CLI.
//!
//! Events go to a compact stdout layer and to a log file written through a non-blocking
//! appender. `DOCQA_LOG_FILE` selects the file; without it events are appended to
//! `logs/docqa.log`. `RUST_LOG` controls filtering and defaults to `info`.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "DOCQA_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "docqa.log";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    /// Explicit file chosen through the environment.
    File(PathBuf),
    /// Default file inside a directory created on demand.
    Directory { dir: PathBuf, file: &'static str },
}

impl LogTarget {
    fn resolve(explicit: Option<String>) -> Self {
        match explicit.map(|value| value.trim().to_string()) {
            Some(path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            _ => Self::Directory {
                dir: PathBuf::from(DEFAULT_LOG_DIR),
                file: DEFAULT_LOG_FILE,
            },
        }
    }

    fn path(&self) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Directory { dir, file } => dir.join(file),
        }
    }

    fn open(&self) -> std::io::Result<NonBlocking> {
        let (writer, guard) = match self {
            Self::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            Self::Directory { dir, file } => {
                std::fs::create_dir_all(dir)?;
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file))
            }
        };
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }
}

/// Install the global tracing subscriber.
///
/// A log file that cannot be opened is reported on stderr and logging continues on stdout only.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let target = LogTarget::resolve(std::env::var(LOG_FILE_VAR).ok());
    match target.open() {
        Ok(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            tracing::debug!(path = %target.path().display(), "File logging enabled");
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", target.path().display());
            registry.init();
        }
    }
}
