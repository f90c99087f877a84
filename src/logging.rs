//! Diagnostic logging.
//!
//! Everything the crate reports goes through `tracing`. Output is off the
//! terminal's main stream: it lands on stderr, or in `--log-file` when given,
//! so the chat transcript on stdout stays clean.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `nova=debug`.
pub const LOG_ENV: &str = "NOVA_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Calling it twice is harmless; the first
/// subscriber wins.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_on_init() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nova.log");

        init(Some(&path)).expect("init succeeds");

        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing").join("nova.log");

        assert!(init(Some(&path)).is_err());
    }
}
