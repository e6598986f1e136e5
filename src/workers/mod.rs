//! Worker-pool engine for multi-threaded packing and restoring.
//!
//! ## Strategy
//!
//! 1. Every unit of work (a source path, or an entry index) is pushed into a
//!    shared queue before any worker starts.
//! 2. `threads` scoped workers pop one unit at a time. Reading, compressing and
//!    decompressing happen outside any lock.
//! 3. Packing workers merge finished entries through [`SharedContainer`], whose
//!    only operation is `append`. Restoring workers write distinct files and
//!    take no lock at all.
//! 4. All workers are joined before the container is finalized or the
//!    operation returns.
//!
//! Workers race for units, so with more than one thread the storage order of a
//! packed container varies between runs. Containers from repeated runs hold the
//! same entries but need not be byte-identical.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};
use tracing::{debug, info, warn};

use crate::archive::{Container, ContainerWriter, Entry};
use crate::compress::{finish_pack, pack_entry, PackMode, PackOptions};
use crate::error::{PackrError, Result};
use crate::fsx;
use crate::report::{PackReport, SkippedFile, WorkerTally};

/// A container that many workers append to.
///
/// Appending is the only operation exposed, and each append holds the lock
/// just long enough to push the entry.
pub struct SharedContainer<'a> {
    inner: Mutex<&'a mut Container>,
}

impl<'a> SharedContainer<'a> {
    pub fn new(container: &'a mut Container) -> Self {
        Self { inner: Mutex::new(container) }
    }

    pub fn append(&self, entry: Entry) {
        // A push cannot leave the list half-updated, so a poisoned lock is still usable.
        let mut container = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        container.append(entry);
    }
}

/// Fills a queue with every unit up front. The sender is dropped on return so
/// workers see the queue close once it is drained.
fn work_queue<T>(units: impl IntoIterator<Item = T>) -> Receiver<T> {
    let (sender, receiver) = unbounded();
    for unit in units {
        if sender.send(unit).is_err() {
            break;
        }
    }
    receiver
}

/// Runs `work` over every unit on `threads` scoped workers and joins them.
///
/// Each worker keeps its own [`WorkerTally`]; tallies are merged after the join.
pub(crate) fn run_pool<T, F>(units: Vec<T>, threads: usize, work: F) -> Result<WorkerTally>
where
    T: Send,
    F: Fn(T, &mut WorkerTally) + Sync,
{
    let queue = work_queue(units);
    let threads = threads.max(1);

    thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let queue = queue.clone();
                let work = &work;
                s.spawn(move || {
                    let mut tally = WorkerTally::default();
                    while let Ok(unit) = queue.recv() {
                        work(unit, &mut tally);
                    }
                    debug!(worker, processed = tally.processed, skipped = tally.skipped.len(), "worker done");
                    tally
                })
            })
            .collect();

        let mut total = WorkerTally::default();
        let mut panicked = false;
        for handle in handles {
            match handle.join() {
                Ok(tally) => total.merge(tally),
                Err(_) => panicked = true,
            }
        }
        if panicked {
            Err(PackrError::WorkerPanicked)
        } else {
            Ok(total)
        }
    })
}

/// Packs `paths` into `container` using `threads` workers.
pub fn pack_parallel_into(
    container: &mut Container,
    root: &Path,
    paths: Vec<PathBuf>,
    mode: PackMode,
    threads: usize,
) -> Result<Vec<SkippedFile>> {
    let shared = SharedContainer::new(container);
    let tally = run_pool(paths, threads, |path: PathBuf, tally| match pack_entry(root, &path, mode) {
        Ok(entry) => {
            tally.processed += 1;
            tally.bytes += entry.original_size() as u64;
            shared.append(entry);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping file");
            tally.skipped.push(SkippedFile::new(&path, &e));
        }
    })?;
    Ok(tally.skipped)
}

/// Packs `in_dir` into `out_file`, compressing files on `threads` workers.
/// `0` threads means one per CPU core.
pub fn compress_parallel(in_dir: &Path, out_file: &Path, threads: usize) -> Result<PackReport> {
    compress_parallel_with(in_dir, out_file, &PackOptions { threads, ..PackOptions::default() })
}

/// [`compress_parallel`] with explicit options.
pub fn compress_parallel_with(in_dir: &Path, out_file: &Path, options: &PackOptions) -> Result<PackReport> {
    let start = Instant::now();
    let files = fsx::list_files(in_dir)?;
    let threads = options.effective_threads(files.len());
    info!(files = files.len(), threads, output = %out_file.display(), "packing in parallel");

    let mut writer = ContainerWriter::open_for_create(out_file)?;
    let mode = PackMode::Compress { level: options.level };
    match pack_parallel_into(writer.container_mut(), in_dir, files, mode, threads) {
        Ok(skipped) => finish_pack(writer, skipped, threads, start),
        Err(e) => {
            writer.abandon();
            Err(e)
        }
    }
}
