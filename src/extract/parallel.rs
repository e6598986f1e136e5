//! Parallel restore.
//!
//! The container is loaded once, then entry indices are drained from the
//! shared work queue by a pool of workers. Each worker inflates its entry and
//! writes its own file, so no lock is taken after the dequeue. An entry that
//! fails with a container-level error (corrupt payload) does not stop the
//! other workers; the first such error is returned after every worker joined.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use super::{finish_unpack, restore_into_tally, RestoreMode};
use crate::archive::open_for_read;
use crate::compress::PackOptions;
use crate::error::Result;
use crate::fsx;
use crate::report::UnpackReport;
use crate::workers::run_pool;

/// Restores a container into `out_dir` on `threads` workers, inflating
/// compressed entries. `0` threads means one per CPU core.
pub fn decompress_parallel(in_file: &Path, out_dir: &Path, threads: usize) -> Result<UnpackReport> {
    decompress_parallel_with(in_file, out_dir, &PackOptions { threads, ..PackOptions::default() })
}

/// [`decompress_parallel`] with explicit options.
pub fn decompress_parallel_with(in_file: &Path, out_dir: &Path, options: &PackOptions) -> Result<UnpackReport> {
    let start = Instant::now();
    let container = open_for_read(in_file)?;
    fsx::ensure_dir(out_dir)?;
    let threads = options.effective_threads(container.len());
    info!(entries = container.len(), threads, output = %out_dir.display(), "restoring in parallel");

    let entries = container.entries();
    let mut tally = run_pool((0..entries.len()).collect(), threads, |index: usize, tally| {
        if let Err(e) = restore_into_tally(&entries[index], out_dir, RestoreMode::Decode, tally) {
            if tally.fatal.is_none() {
                tally.fatal = Some(e);
            }
        }
    })?;

    if let Some(e) = tally.fatal.take() {
        return Err(e);
    }
    Ok(finish_unpack(tally, threads, start))
}
