//! Supporting utilities.
//!
//! - [`backoff`]: delay sequences for retries
//! - [`fs`]: tree copy, clear and digest plus atomic writes
//! - [`platform`]: path expansion and executable lookup

pub mod backoff;
pub mod fs;
pub mod platform;

pub use fs::{ExcludeSet, atomic_write, ensure_dir};
pub use platform::{ensure_git_available, resolve_path};
