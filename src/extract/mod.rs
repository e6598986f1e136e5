//! # Extraction Module
//!
//! This module restores the entries of a container into a directory tree.
//! Every restore path (verbatim, decompressing, parallel) rebuilds the full
//! relative path stored in each alias under the output directory.

mod parallel;

pub use parallel::{decompress_parallel, decompress_parallel_with};

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::archive::{open_for_read, Entry, EntryCodec, EntryInfo};
use crate::error::{PackrError, Result};
use crate::fsx;
use crate::report::{SkippedFile, UnpackReport, WorkerTally};

/// How entry payloads become file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Write payloads as stored; deflate entries are refused.
    Verbatim,
    /// Inflate deflate entries, copy raw ones.
    Decode,
}

/// Restores one entry under `out_dir` and returns the number of bytes written.
pub fn restore_entry(entry: &Entry, out_dir: &Path, mode: RestoreMode) -> Result<u64> {
    let target = fsx::restore_path(out_dir, entry.alias())?;
    match (mode, entry.codec()) {
        (RestoreMode::Verbatim, EntryCodec::Deflate) => {
            Err(PackrError::UnexpectedCodec { alias: entry.alias().to_string() })
        }
        (RestoreMode::Verbatim, EntryCodec::Raw) => {
            fsx::write_file(&target, entry.payload())?;
            Ok(entry.payload().len() as u64)
        }
        (RestoreMode::Decode, _) => {
            let bytes = entry.decode()?;
            fsx::write_file(&target, &bytes)?;
            Ok(bytes.len() as u64)
        }
    }
}

/// Restores `entry` and records the outcome in `tally`.
///
/// Per-file failures are logged and counted as skipped; container-level
/// failures are returned to the caller.
pub(crate) fn restore_into_tally(
    entry: &Entry,
    out_dir: &Path,
    mode: RestoreMode,
    tally: &mut WorkerTally,
) -> Result<()> {
    match restore_entry(entry, out_dir, mode) {
        Ok(written) => {
            debug!(alias = %entry.alias(), bytes = written, "restored entry");
            tally.processed += 1;
            tally.bytes += written;
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(alias = %entry.alias(), error = %e, "skipping entry");
            tally.skipped.push(SkippedFile::new(entry.alias().as_str(), &e));
            Ok(())
        }
    }
}

/// Restores an uncompressed container verbatim into `out_dir`.
pub fn unarchive(in_file: &Path, out_dir: &Path) -> Result<UnpackReport> {
    run(in_file, out_dir, RestoreMode::Verbatim)
}

/// Restores a container into `out_dir`, inflating compressed entries.
pub fn decompress(in_file: &Path, out_dir: &Path) -> Result<UnpackReport> {
    run(in_file, out_dir, RestoreMode::Decode)
}

fn run(in_file: &Path, out_dir: &Path, mode: RestoreMode) -> Result<UnpackReport> {
    let start = Instant::now();
    let container = open_for_read(in_file)?;
    fsx::ensure_dir(out_dir)?;
    info!(entries = container.len(), ?mode, output = %out_dir.display(), "restoring");

    let mut tally = WorkerTally::default();
    for entry in container.entries() {
        restore_into_tally(entry, out_dir, mode, &mut tally)?;
    }
    Ok(finish_unpack(tally, 1, start))
}

pub(crate) fn finish_unpack(tally: WorkerTally, threads: usize, start: Instant) -> UnpackReport {
    if !tally.skipped.is_empty() {
        warn!(skipped = tally.skipped.len(), "some entries were not restored");
    }
    UnpackReport {
        restored: tally.processed,
        skipped: tally.skipped,
        bytes_written: tally.bytes,
        threads,
        elapsed: start.elapsed(),
    }
}

/// Lists the entries of a container in storage order.
pub fn list_entries(in_file: &Path) -> Result<Vec<EntryInfo>> {
    let container = open_for_read(in_file)?;
    Ok(container.entries().iter().map(Entry::info).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Alias;
    use tempfile::tempdir;

    #[test]
    fn verbatim_restore_refuses_deflate_entries() {
        let out = tempdir().unwrap();
        let payload = crate::codec::compress(b"data", 8).unwrap();
        let entry = Entry::deflated(Alias::new("d.txt").unwrap(), 4, payload).unwrap();

        let err = restore_entry(&entry, out.path(), RestoreMode::Verbatim).unwrap_err();
        assert!(matches!(err, PackrError::UnexpectedCodec { .. }));
        assert!(!out.path().join("d.txt").exists());

        assert_eq!(restore_entry(&entry, out.path(), RestoreMode::Decode).unwrap(), 4);
        assert_eq!(std::fs::read(out.path().join("d.txt")).unwrap(), b"data");
    }

    #[test]
    fn restore_rebuilds_nested_paths() {
        let out = tempdir().unwrap();
        let entry = Entry::raw(Alias::new("a/b/c.bin").unwrap(), vec![0, 0, 0]).unwrap();
        restore_entry(&entry, out.path(), RestoreMode::Verbatim).unwrap();
        assert_eq!(std::fs::read(out.path().join("a/b/c.bin")).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn corrupt_payload_is_fatal() {
        let out = tempdir().unwrap();
        let entry = Entry::deflated(Alias::new("bad").unwrap(), 100, vec![0xff; 8]).unwrap();
        let mut tally = WorkerTally::default();
        let err = restore_into_tally(&entry, out.path(), RestoreMode::Decode, &mut tally).unwrap_err();
        assert!(matches!(err, PackrError::CorruptData(_)));
    }

    #[test]
    fn escaping_alias_is_skipped() {
        let out = tempdir().unwrap();
        let entry = Entry::raw(Alias::new("../outside.txt").unwrap(), b"x".to_vec()).unwrap();
        let mut tally = WorkerTally::default();
        restore_into_tally(&entry, out.path(), RestoreMode::Decode, &mut tally).unwrap();
        assert_eq!(tally.processed, 0);
        assert_eq!(tally.skipped.len(), 1);
    }
}
