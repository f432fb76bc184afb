//! Platform helpers: path expansion and tool discovery.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::UpdateError;

/// Name of the git executable on this platform.
#[must_use]
pub const fn git_command() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Whether `cmd` can be found on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Fail early with [`UpdateError::GitNotFound`] when git is not installed.
pub fn ensure_git_available() -> Result<()> {
    if command_exists(git_command()) {
        Ok(())
    } else {
        Err(UpdateError::GitNotFound.into())
    }
}

/// Expand `~` and environment variables in a configured path.
///
/// # Errors
///
/// Fails when the path references an undefined variable.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| {
        format!(
            "Failed to expand path: {path}\n\n\
            Use $VAR or ${{VAR}} for environment variables and ~/ for the home directory"
        )
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        #[cfg(unix)]
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-real-command-4711"));
    }

    #[test]
    fn test_resolve_path_plain_and_home() {
        assert_eq!(resolve_path("/srv/bot").unwrap(), PathBuf::from("/srv/bot"));

        let home = dirs::home_dir().unwrap();
        assert_eq!(resolve_path("~/bot").unwrap(), home.join("bot"));
    }

    #[test]
    fn test_resolve_path_undefined_variable_fails() {
        assert!(resolve_path("$CHATBOT_UPDATER_SURELY_UNDEFINED_VAR/x").is_err());
    }
}
