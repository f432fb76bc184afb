//! File system helpers used by backups, restores and state persistence.
//!
//! - [`dirs`]: directory creation, exclusion-aware tree copy and clear
//! - [`atomic`]: write-then-rename file writes
//! - [`exclude`]: glob patterns matched against path components
//! - [`digest`]: SHA-256 digests of whole trees, used to verify restores

pub mod atomic;
pub mod digest;
pub mod dirs;
pub mod exclude;

pub use atomic::atomic_write;
pub use digest::tree_digest;
pub use dirs::{clear_tree, copy_tree, ensure_dir, ensure_parent_dir, remove_dir_all};
pub use exclude::{ALWAYS_EXCLUDED, ExcludeSet};
