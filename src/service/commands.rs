//! Operator command parsing.

use std::fmt;
use std::str::FromStr;

use crate::core::UpdateError;

/// Commands the operator can send to the updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCommand {
    CheckForUpdate,
    EnableAutoUpdate,
    DisableAutoUpdate,
    ConfirmUpdate,
    CancelUpdate,
}

impl OperatorCommand {
    pub const ALL: [Self; 5] = [
        Self::CheckForUpdate,
        Self::EnableAutoUpdate,
        Self::DisableAutoUpdate,
        Self::ConfirmUpdate,
        Self::CancelUpdate,
    ];

    /// Canonical spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckForUpdate => "check-for-update",
            Self::EnableAutoUpdate => "enable-auto-update",
            Self::DisableAutoUpdate => "disable-auto-update",
            Self::ConfirmUpdate => "confirm-update",
            Self::CancelUpdate => "cancel-update",
        }
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorCommand {
    type Err = UpdateError;

    /// Case-insensitive; a leading `/` and surrounding whitespace are ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().trim_start_matches('/').to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == normalized).ok_or_else(|| {
            UpdateError::UnknownCommand {
                input: input.trim().to_string(),
                suggestion: suggest(&normalized).map(|c| c.as_str().to_string()),
            }
        })
    }
}

/// Closest known command, if any is reasonably close.
fn suggest(input: &str) -> Option<OperatorCommand> {
    OperatorCommand::ALL
        .into_iter()
        .map(|c| (c, strsim::jaro_winkler(input, c.as_str())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}
