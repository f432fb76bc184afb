//! Atomic file writes.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::dirs::ensure_parent_dir;

/// Write `content` to `path` so readers never observe a partial file.
///
/// The content goes to a sibling temporary file, is synced to disk, and is
/// then renamed over `path`. Parent directories are created as needed.
///
/// # Errors
///
/// Fails when the temporary file cannot be written or renamed. An existing
/// file at `path` is left untouched in that case.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        fs::remove_file(&temp_path).ok();
        format!("Failed to rename temp file to: {}", path.display())
    })?;

    Ok(())
}
