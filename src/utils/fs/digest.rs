//! Content digests of whole directory trees.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::exclude::ExcludeSet;

/// SHA-256 over every non-excluded file under `root`, hex encoded.
///
/// Files are visited in sorted relative-path order; each contributes its
/// relative path (with `/` separators) and its bytes. Symlinks contribute
/// their target instead of content. Two trees have the same digest exactly
/// when they hold the same files with the same bytes.
pub fn tree_digest(root: &Path, excludes: &ExcludeSet) -> Result<String> {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path().strip_prefix(root).is_ok_and(|rel| !excludes.is_excluded(rel)));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        hasher.update(key.as_bytes());
        hasher.update([0u8]);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())?;
            hasher.update(target.to_string_lossy().as_bytes());
        } else {
            let content = fs::read(entry.path())
                .with_context(|| format!("Failed to read file for digest: {}", entry.path().display()))?;
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(&content);
        }
        hasher.update([0u8]);
    }

    Ok(hex::encode(hasher.finalize()))
}
