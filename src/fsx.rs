//! Filesystem collaborators.
//!
//! The container engine touches the filesystem only through these helpers:
//! listing the files under an input root, turning a path into an alias, and
//! turning an alias back into a location under an output directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::archive::Alias;
use crate::error::{PackrError, Result};

/// Recursively lists every regular file under `root`, sorted by path.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PackrError::NotADirectory { path: root.to_path_buf() });
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e.into_io_error().unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            PackrError::io(source, path)
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Builds the alias of `path`: its location relative to `root`, `/`-separated.
pub fn alias_for(root: &Path, path: &Path) -> Result<Alias> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| PackrError::InvalidAlias { path: path.to_path_buf() })?;
                parts.push(part);
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return Err(PackrError::InvalidAlias { path: path.to_path_buf() }),
        }
    }
    if parts.is_empty() {
        return Err(PackrError::InvalidAlias { path: path.to_path_buf() });
    }
    Alias::new(parts.join("/"))
}

/// Resolves an alias to a path under `out_dir`.
///
/// Aliases are `/`-separated; every other byte is part of a file name. Leading
/// separators are dropped so absolute aliases land inside `out_dir`, and
/// aliases that climb out with `..` are rejected.
pub fn restore_path(out_dir: &Path, alias: &Alias) -> Result<PathBuf> {
    let unsafe_alias = || PackrError::UnsafeAlias { alias: alias.to_string() };
    let mut target = out_dir.to_path_buf();
    let mut pushed = false;
    for part in strip_drive(alias.as_str()).split(ALIAS_SEPARATORS) {
        match part {
            "" | "." => {}
            ".." => return Err(unsafe_alias()),
            p => {
                target.push(p);
                pushed = true;
            }
        }
    }
    if !pushed {
        return Err(unsafe_alias());
    }
    Ok(target)
}

// Windows treats `\` as a separator too, so it must not survive inside a name.
#[cfg(windows)]
const ALIAS_SEPARATORS: &[char] = &['/', '\\'];
#[cfg(not(windows))]
const ALIAS_SEPARATORS: &[char] = &['/'];

/// Drops a leading `C:` drive from aliases written on Windows.
#[cfg(windows)]
fn strip_drive(alias: &str) -> &str {
    match alias.as_bytes() {
        [letter, b':', ..] if letter.is_ascii_alphabetic() => &alias[2..],
        _ => alias,
    }
}

#[cfg(not(windows))]
fn strip_drive(alias: &str) -> &str {
    alias
}

/// Creates `path` and all of its parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| PackrError::io(e, path))
}

/// Writes `bytes` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, bytes).map_err(|e| PackrError::io(e, path))
}
