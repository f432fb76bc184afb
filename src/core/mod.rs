//! Core types shared across the updater.
//!
//! Currently this is the error system: [`UpdateError`] for typed failure
//! kinds and [`ErrorContext`] for command line rendering.

pub mod error;

pub use error::{
    ErrorContext, UpdateError, describe_network_failure, truncate_diagnostic, user_friendly_error,
};
