//! Log output setup.
//!
//! Logs go to a daily rolling file so they never interleave with the
//! conversation. `RUST_LOG` overrides the configured level.

use parlor_core::config::LoggingConfig;
use parlor_infrastructure::ParlorPaths;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "parlor.log";

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive until exit.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    if config.file {
        match ParlorPaths::logs_dir() {
            Ok(dir) if fs::create_dir_all(&dir).is_ok() => {
                let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                fmt()
                    .with_env_filter(env_filter(config))
                    .with_writer(writer)
                    .with_ansi(false)
                    .init();
                return Some(guard);
            }
            _ => eprintln!("Could not create the log directory; logging to stderr"),
        }
    }

    fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .init();
    None
}
