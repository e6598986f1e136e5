//! Outcome reports for pack and restore operations.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::PackrError;

/// A file that was reported and left out of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: impl Into<PathBuf>, err: &PackrError) -> Self {
        Self { path: path.into(), reason: err.to_string() }
    }
}

/// What a pack operation put into the container.
#[derive(Debug, Clone, Default)]
pub struct PackReport {
    /// Entries written; equals the container's on-disk `entry_count`.
    pub entries: u32,
    pub skipped: Vec<SkippedFile>,
    pub original_bytes: u64,
    pub stored_bytes: u64,
    pub container_bytes: u64,
    pub threads: usize,
    pub elapsed: Duration,
}

impl PackReport {
    /// Stored size over original size; 1.0 for an empty container.
    pub fn ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            1.0
        } else {
            self.stored_bytes as f64 / self.original_bytes as f64
        }
    }

    pub fn throughput_mbps(&self) -> f64 {
        mbps(self.original_bytes, self.elapsed)
    }
}

/// What a restore operation wrote to disk.
#[derive(Debug, Clone, Default)]
pub struct UnpackReport {
    pub restored: usize,
    pub skipped: Vec<SkippedFile>,
    pub bytes_written: u64,
    pub threads: usize,
    pub elapsed: Duration,
}

impl UnpackReport {
    pub fn throughput_mbps(&self) -> f64 {
        mbps(self.bytes_written, self.elapsed)
    }
}

/// Per-worker counters, owned by one thread and merged after the join.
#[derive(Debug, Default)]
pub(crate) struct WorkerTally {
    pub processed: usize,
    pub bytes: u64,
    pub skipped: Vec<SkippedFile>,
    /// First operation-level failure seen by the worker.
    pub fatal: Option<PackrError>,
}

impl WorkerTally {
    pub fn merge(&mut self, other: WorkerTally) {
        self.processed += other.processed;
        self.bytes += other.bytes;
        self.skipped.extend(other.skipped);
        if self.fatal.is_none() {
            self.fatal = other.fatal;
        }
    }
}

fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    bytes as f64 / (1024.0 * 1024.0) / secs
}
