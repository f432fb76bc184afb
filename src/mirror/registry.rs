use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::UpdateError;

/// GitHub location of the bot's source tree.
pub const GITHUB_MIRROR_URL: &str = "https://github.com/MiniYv/GracyBot.git";
/// Gitee location of the same tree, usually faster from mainland China.
pub const GITEE_MIRROR_URL: &str = "https://gitee.com/MiniYv/GracyBot.git";

/// One named remote location hosting the application's source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mirror {
    pub name: String,
    pub url: String,
}

impl Mirror {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Fixed, ordered list of mirrors.
///
/// Registry order is the race preference: when several mirrors answer, the
/// first listed wins, and it is also the default when nothing answers. The
/// serial fallback walks its own order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRegistry {
    mirrors: Vec<Mirror>,
    fallback_order: Vec<usize>,
}

impl Default for MirrorRegistry {
    /// GitHub first, Gitee second; the fallback tries Gitee first because a
    /// failed race usually means GitHub is the one being slow.
    fn default() -> Self {
        Self {
            mirrors: vec![
                Mirror::new("GitHub", GITHUB_MIRROR_URL),
                Mirror::new("Gitee", GITEE_MIRROR_URL),
            ],
            fallback_order: vec![1, 0],
        }
    }
}

impl MirrorRegistry {
    /// Create a registry whose fallback order equals registry order.
    ///
    /// # Errors
    ///
    /// Fails when `mirrors` is empty or contains duplicate names.
    pub fn new(mirrors: Vec<Mirror>) -> Result<Self> {
        if mirrors.is_empty() {
            return Err(UpdateError::ConfigError {
                message: "at least one mirror must be configured".to_string(),
            }
            .into());
        }
        for (i, mirror) in mirrors.iter().enumerate() {
            if mirrors[..i].iter().any(|m| m.name == mirror.name) {
                return Err(UpdateError::ConfigError {
                    message: format!("duplicate mirror name '{}'", mirror.name),
                }
                .into());
            }
        }

        let fallback_order = (0..mirrors.len()).collect();
        Ok(Self {
            mirrors,
            fallback_order,
        })
    }

    /// Replace the fallback order with the given mirror names.
    ///
    /// Mirrors not named are appended in registry order, so every mirror is
    /// still tried once.
    ///
    /// # Errors
    ///
    /// Fails when a name is not registered.
    pub fn with_fallback_order<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self> {
        let mut order = Vec::with_capacity(self.mirrors.len());
        for name in names {
            let name = name.as_ref();
            let idx = self.position(name).ok_or_else(|| UpdateError::ConfigError {
                message: format!("fallback order names unknown mirror '{name}'"),
            })?;
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
        for idx in 0..self.mirrors.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
        self.fallback_order = order;
        Ok(self)
    }

    /// The first-listed mirror, used when nothing is reachable.
    pub fn primary(&self) -> &Mirror {
        &self.mirrors[0]
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    /// Mirrors in serial fallback order.
    pub fn fallback_mirrors(&self) -> impl Iterator<Item = &Mirror> {
        self.fallback_order.iter().map(|&i| &self.mirrors[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.mirrors.iter().position(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}
