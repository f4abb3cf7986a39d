//! Logging setup
//!
//! Logs go to stderr so they never mix with command output, or to
//! `config.log_file` when one is configured. `RUST_LOG` overrides the
//! level chosen from `--verbose`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use guide_core::Config;

/// Level used for guide crates when `RUST_LOG` is not set
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = default_level(verbose);
        EnvFilter::new(format!("guide_core={},guide_cli={}", level, level))
    })
}

/// Open `path` for appending, creating its parent directory first
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global subscriber (ignored if one is already set)
pub fn init(config: &Config, verbose: u8) {
    let filter = env_filter(verbose);

    if let Some(ref log_path) = config.log_file {
        match open_log_file(log_path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file)
                    .try_init();
                debug!("Logging to {:?}", log_path);
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
