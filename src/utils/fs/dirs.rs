//! Directory creation, tree copying and tree clearing.
//!
//! Backups and restores move whole application trees around. Both honour an
//! [`ExcludeSet`]: excluded entries are neither copied nor deleted, which is
//! what keeps `.git` and the updater's own state intact across a rollback.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::exclude::ExcludeSet;

/// Create `path` and its parents when missing.
///
/// # Errors
///
/// Fails when the directory cannot be created or `path` is an existing file.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Create the parent directory of `path`, if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, skipping excluded entries.
///
/// Symbolic links are recreated as links rather than followed. Returns the
/// number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, excludes: &ExcludeSet) -> Result<usize> {
    ensure_dir(dst)?;
    let mut copied = 0;

    let walker = WalkDir::new(src).min_depth(1).follow_links(false).into_iter();
    for entry in walker.filter_entry(|e| {
        e.path().strip_prefix(src).is_ok_and(|rel| !excludes.is_excluded(rel))
    }) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            ensure_parent_dir(&target)?;
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let link = fs::read_link(src)
        .with_context(|| format!("Failed to read symlink: {}", src.display()))?;
    ensure_parent_dir(dst)?;
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst).ok();
    }
    std::os::unix::fs::symlink(&link, dst)
        .with_context(|| format!("Failed to create symlink: {}", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst)?;
    fs::copy(src, dst)
        .map(|_| ())
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))
}

/// Delete everything under `root` that is not excluded.
///
/// Excluded entries are kept whole wherever they sit, along with the
/// directories leading to them. `root` itself remains.
pub fn clear_tree(root: &Path, excludes: &ExcludeSet) -> Result<()> {
    clear_dir(root, root, excludes)?;
    Ok(())
}

/// Returns whether anything was kept inside `dir`.
fn clear_dir(root: &Path, dir: &Path, excludes: &ExcludeSet) -> Result<bool> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut kept = false;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(root)?;
        if excludes.is_excluded(relative) {
            kept = true;
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if clear_dir(root, &path, excludes)? {
                kept = true;
            } else {
                fs::remove_dir(&path)
                    .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            }
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
        }
    }

    Ok(kept)
}

/// Remove a directory tree; a missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}
