//! # Packing Pipeline
//!
//! This module turns a directory into a container, one entry per file.
//!
//! ## Key Features:
//! - **File Discovery**: delegates the recursive walk to [`crate::fsx::list_files`].
//! - **Modes**: [`PackMode::Archive`] stores bytes verbatim, [`PackMode::Compress`]
//!   runs each file through the DEFLATE [`codec`](crate::codec).
//! - **Partial failure**: a file that cannot be read or stored is logged and
//!   skipped; the remaining files are still packed.
//!
//! The multi-threaded variant lives in [`crate::workers`] and shares
//! [`pack_entry`] as its unit of work.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::archive::{Alias, Container, ContainerWriter, Entry, CURRENT_VERSION};
use crate::codec;
use crate::error::{PackrError, Result};
use crate::fsx;
use crate::report::{PackReport, SkippedFile};

/// Defines how file bytes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackMode {
    /// Plain storage without any compression.
    Archive,
    /// Raw DEFLATE at the given level (0-9).
    Compress { level: u32 },
}

impl PackMode {
    /// Applies the mode's transform to one file's bytes.
    pub fn transform(self, alias: Alias, data: Vec<u8>) -> Result<Entry> {
        match self {
            PackMode::Archive => Entry::raw(alias, data),
            PackMode::Compress { level } => {
                let original_size = u32::try_from(data.len()).map_err(|_| PackrError::FileTooLarge {
                    path: alias.as_str().into(),
                    size: data.len() as u64,
                })?;
                let payload = codec::compress(&data, level)?;
                Entry::deflated(alias, original_size, payload)
            }
        }
    }
}

/// Holds all configuration options for a pack or restore operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// DEFLATE level, 0-9.
    pub level: u32,
    /// Worker threads for the parallel variants. `0` means one per CPU core.
    pub threads: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { level: codec::DEFAULT_LEVEL, threads: 0 }
    }
}

impl PackOptions {
    /// Resolves `threads` against the CPU count and the amount of work.
    pub fn effective_threads(&self, units: usize) -> usize {
        let wanted = if self.threads == 0 { num_cpus::get() } else { self.threads };
        wanted.min(units).max(1)
    }
}

/// A container built in memory together with the files that were left out.
#[derive(Debug)]
pub struct PackOutcome {
    pub container: Container,
    pub skipped: Vec<SkippedFile>,
}

/// Reads one file and builds its entry. This is the unit of work for both the
/// sequential and the parallel packer.
pub fn pack_entry(root: &Path, path: &Path, mode: PackMode) -> Result<Entry> {
    let alias = fsx::alias_for(root, path)?;
    let data = fs::read(path).map_err(|e| PackrError::io(e, path))?;
    mode.transform(alias, data)
}

/// Packs `paths` into a new in-memory container.
pub fn pack(root: &Path, paths: &[PathBuf], mode: PackMode) -> PackOutcome {
    let mut container = Container::new(CURRENT_VERSION);
    let skipped = pack_into(&mut container, root, paths, mode);
    PackOutcome { container, skipped }
}

/// Appends one entry per readable path to `container`, in `paths` order.
pub fn pack_into(container: &mut Container, root: &Path, paths: &[PathBuf], mode: PackMode) -> Vec<SkippedFile> {
    let mut skipped = Vec::new();
    for path in paths {
        match pack_entry(root, path, mode) {
            Ok(entry) => {
                debug!(
                    alias = %entry.alias(),
                    original = entry.original_size(),
                    stored = entry.stored_size(),
                    "packed entry"
                );
                container.append(entry);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                skipped.push(SkippedFile::new(path, &e));
            }
        }
    }
    skipped
}

/// Packs `in_dir` into a new container at `out_file` without compression.
pub fn archive(in_dir: &Path, out_file: &Path) -> Result<PackReport> {
    run(in_dir, out_file, PackMode::Archive)
}

/// Packs `in_dir` into a new container at `out_file`, compressing every file
/// on the calling thread.
pub fn compress(in_dir: &Path, out_file: &Path) -> Result<PackReport> {
    compress_with(in_dir, out_file, &PackOptions::default())
}

/// [`compress`] with an explicit level.
pub fn compress_with(in_dir: &Path, out_file: &Path, options: &PackOptions) -> Result<PackReport> {
    run(in_dir, out_file, PackMode::Compress { level: options.level })
}

fn run(in_dir: &Path, out_file: &Path, mode: PackMode) -> Result<PackReport> {
    let start = Instant::now();
    // List first: a bad input directory must not leave a container behind.
    let files = fsx::list_files(in_dir)?;
    info!(files = files.len(), ?mode, output = %out_file.display(), "packing");

    let mut writer = ContainerWriter::open_for_create(out_file)?;
    let skipped = pack_into(writer.container_mut(), in_dir, &files, mode);
    finish_pack(writer, skipped, 1, start)
}

/// Finalizes `writer` and summarises the operation.
pub(crate) fn finish_pack(
    writer: ContainerWriter,
    skipped: Vec<SkippedFile>,
    threads: usize,
    start: Instant,
) -> Result<PackReport> {
    let original_bytes = writer.container().original_bytes();
    let stored_bytes = writer.container().stored_bytes();
    let summary = writer.finalize()?;

    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "some files were not packed");
    }
    Ok(PackReport {
        entries: summary.entry_count,
        skipped,
        original_bytes,
        stored_bytes,
        container_bytes: summary.bytes_written,
        threads,
        elapsed: start.elapsed(),
    })
}
