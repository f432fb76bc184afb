//! Glob-based exclusion of paths from backups and restores.

use anyhow::{Context, Result};
use glob::Pattern;
use std::path::Path;

/// Entry names that are never copied into a backup nor removed on restore.
pub const ALWAYS_EXCLUDED: &[&str] = &[".git"];

/// Set of glob patterns matched against every component of a relative path.
///
/// A path is excluded as soon as one of its components matches, so `.git`
/// excludes `.git/objects/ab/cdef` and `__pycache__` excludes
/// `pkg/__pycache__/mod.pyc`.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    /// Compile `patterns`, adding [`ALWAYS_EXCLUDED`].
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid glob.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len() + ALWAYS_EXCLUDED.len());
        for raw in ALWAYS_EXCLUDED.iter().copied().chain(patterns.iter().map(AsRef::as_ref)) {
            let pattern =
                Pattern::new(raw).with_context(|| format!("Invalid exclude pattern '{raw}'"))?;
            if !compiled.contains(&pattern) {
                compiled.push(pattern);
            }
        }
        Ok(Self {
            patterns: compiled,
        })
    }

    /// Whether `relative` (relative to the tree root) is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            self.patterns.iter().any(|p| p.matches(&name))
        })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}

impl Default for ExcludeSet {
    fn default() -> Self {
        Self {
            patterns: ALWAYS_EXCLUDED.iter().filter_map(|p| Pattern::new(p).ok()).collect(),
        }
    }
}
