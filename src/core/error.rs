//! Error handling for the updater
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`UpdateError`]) so callers can tell a
//!    transient tag fetch failure from a fatal rollback failure
//! 2. **User-friendly messages** ([`ErrorContext`]) for the command line,
//!    with suggestions and without stack traces
//!
//! Library functions return [`anyhow::Result`]; typed failures travel inside
//! the `anyhow::Error` and are recovered with `downcast_ref::<UpdateError>()`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chatbot_updater::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::UpdateInProgress);
//! let ctx = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::MAX_DIAGNOSTIC_CHARS;

/// Typed failure kinds of the update subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// A probe did not answer within its timeout.
    #[error("Mirror '{mirror}' did not answer in time")]
    ProbeTimeout {
        mirror: String,
    },

    /// A probe completed but the remote query failed.
    #[error("Mirror '{mirror}' is unreachable")]
    ProbeUnreachable {
        mirror: String,
        reason: String,
    },

    /// Listing tags on the selected mirror failed after all retries.
    #[error("Failed to fetch release tags from {url}")]
    TagFetchFailure {
        url: String,
        reason: String,
    },

    /// Pulling the latest changes into the working tree failed.
    #[error("Update failed: {reason}")]
    ApplyFailure {
        reason: String,
    },

    /// Pulling failed and the snapshot could not be put back.
    #[error("Update failed and restore failed, manual intervention required")]
    RollbackFailure {
        apply_reason: String,
        restore_reason: String,
    },

    /// The persisted update state could not be written.
    #[error("Failed to persist update state to {path}")]
    ConfigPersistFailure {
        path: String,
        reason: String,
    },

    /// Another apply holds the process-wide update lock.
    #[error("An update is already in progress")]
    UpdateInProgress,

    #[error("Git operation failed: {operation}")]
    GitCommandError {
        operation: String,
        stderr: String,
    },

    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("Unknown command '{input}'")]
    UnknownCommand {
        input: String,
        suggestion: Option<String>,
    },
}

impl UpdateError {
    /// Whether retrying later could reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProbeTimeout { .. }
                | Self::ProbeUnreachable { .. }
                | Self::TagFetchFailure { .. }
                | Self::GitCommandError { .. }
        )
    }

    /// Underlying tool output, if the variant carries any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ProbeUnreachable { reason, .. }
            | Self::TagFetchFailure { reason, .. }
            | Self::ApplyFailure { reason }
            | Self::ConfigPersistFailure { reason, .. } => Some(reason),
            Self::RollbackFailure { restore_reason, .. } => Some(restore_reason),
            Self::GitCommandError { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Trim tool output to at most `max_chars` characters.
///
/// Cuts on a character boundary and marks the cut with `…`.
#[must_use]
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Short categorized description of a network failure for operator replies.
///
/// Raw output is kept out of the message except for a truncated tail.
#[must_use]
pub fn describe_network_failure(reason: &str) -> String {
    let lower = reason.to_lowercase();
    if lower.contains("connection reset") {
        "the network connection was reset".to_string()
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "the mirror did not answer in time".to_string()
    } else if lower.contains("could not resolve host") {
        "the mirror host could not be resolved".to_string()
    } else if reason.trim().is_empty() {
        "the mirror could not be reached".to_string()
    } else {
        truncate_diagnostic(reason, MAX_DIAGNOSTIC_CHARS)
    }
}

/// Error wrapper with a suggestion and details for command line output.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with suggestions.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let Some(update_error) = error.downcast_ref::<UpdateError>().cloned() else {
        if let Some(io_error) = error.downcast_ref::<std::io::Error>()
            && io_error.kind() == std::io::ErrorKind::PermissionDenied
        {
            return ErrorContext::new(error)
                .with_suggestion("Check ownership of the application directory and state file");
        }
        return ErrorContext::new(error);
    };

    let details = update_error
        .diagnostic()
        .filter(|d| !d.trim().is_empty())
        .map(|d| truncate_diagnostic(d, MAX_DIAGNOSTIC_CHARS));

    let ctx = match &update_error {
        UpdateError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git and make sure it is available in PATH"),
        UpdateError::TagFetchFailure { .. } => {
            ErrorContext::new(error).with_suggestion("This is usually a network problem; retry later")
        }
        UpdateError::UpdateInProgress => ErrorContext::new(error)
            .with_suggestion("Wait for the running update to finish before starting another"),
        UpdateError::RollbackFailure { apply_reason, .. } => ErrorContext::new(error)
            .with_suggestion(format!(
                "Restore the application directory by hand; the update failed with: {}",
                truncate_diagnostic(apply_reason, MAX_DIAGNOSTIC_CHARS)
            )),
        UpdateError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the configuration file or point --config at a valid one"),
        UpdateError::UnknownCommand { suggestion: Some(s), .. } => {
            ErrorContext::new(error).with_suggestion(format!("Did you mean '{s}'?"))
        }
        _ => ErrorContext::new(error),
    };

    match details {
        Some(d) => ctx.with_details(d),
        None => ctx,
    }
}
