//! Test utilities
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests:
//!
//! - [`MockTransport`]: a scripted [`RemoteTransport`](crate::git::RemoteTransport)
//!   with per-mirror latency and failures, call counters, and a gate to
//!   hold pulls open
//! - [`RecordingNotifier`]: keeps every message instead of sending it
//! - [`write_tree`] / [`sample_app_tree`]: filesystem fixtures
//! - [`TestGit`] / [`TestMirror`]: local repositories standing in for mirrors
//!
//! To enable logging in tests:
//! ```bash
//! RUST_LOG=debug cargo test
//! ```

pub mod fixtures;
pub mod git_helper;
pub mod transport;

pub use fixtures::{RecordingNotifier, sample_app_tree, write_tree};
pub use git_helper::{TestGit, TestMirror};
pub use transport::{MockTransport, ProbeScript, PullScript};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a test-writer tracing subscriber once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging
/// stays off.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
