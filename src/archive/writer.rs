use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{encode_file_header, Container, Entry, CURRENT_VERSION};
use crate::error::{PackrError, Result};

/// Result of a successful [`ContainerWriter::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub entry_count: u32,
    pub bytes_written: u64,
}

/// A writer responsible for constructing a `.packr` container.
///
/// The file is created (never truncated) when the writer is opened and holds a
/// placeholder header until [`finalize`](Self::finalize) rewrites it together
/// with every accumulated entry. `finalize` consumes the writer, so a container
/// can only be written once.
pub struct ContainerWriter {
    path: PathBuf,
    file: File,
    container: Container,
}

impl ContainerWriter {
    /// Creates a new container file at `path`.
    ///
    /// Fails with [`PackrError::AlreadyExists`] if anything exists at `path`.
    pub fn open_for_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => PackrError::AlreadyExists { path: path.clone() },
                _ => PackrError::io(e, &path),
            })?;

        file.write_all(&encode_file_header(CURRENT_VERSION, 0))
            .and_then(|_| file.flush())
            .map_err(|e| PackrError::io(e, &path))?;
        debug!(path = %path.display(), "created container");

        Ok(Self { path, file, container: Container::new(CURRENT_VERSION) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a fully built entry to the in-memory container.
    pub fn append(&mut self, entry: Entry) {
        self.container.append(entry);
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Mutable access for callers that share the container between workers.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Discards the container and removes its file.
    pub fn abandon(self) {
        let Self { path, file, .. } = self;
        drop(file);
        remove_partial(&path);
    }

    /// Writes the header with the final entry count, then every entry header
    /// followed by its payload, and closes the file.
    ///
    /// If writing fails the file is removed rather than left half-written.
    pub fn finalize(self) -> Result<FinalizeSummary> {
        let Self { path, file, container } = self;
        match write_container(&path, file, &container) {
            Ok(summary) => {
                info!(
                    path = %path.display(),
                    entries = summary.entry_count,
                    bytes = summary.bytes_written,
                    "container finalized"
                );
                Ok(summary)
            }
            Err(e) => {
                remove_partial(&path);
                Err(e)
            }
        }
    }
}

/// Removes a container that will never be finalized. Failure is only logged,
/// since the caller is already on an error path.
fn remove_partial(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove partial container");
            false
        }
    }
}

fn write_container(path: &Path, file: File, container: &Container) -> Result<FinalizeSummary> {
    let io_err = |e: io::Error| PackrError::io(e, path);

    let entry_count = u32::try_from(container.len())
        .map_err(|_| PackrError::CorruptData(format!("{} entries exceed the u32 entry count", container.len())))?;

    // use 8 MiB buffer to reduce syscall overhead during payload writes
    let mut writer = BufWriter::with_capacity(8 * 1024 * 1024, file);
    writer.seek(SeekFrom::Start(0)).map_err(io_err)?;
    writer.write_all(&encode_file_header(CURRENT_VERSION, entry_count)).map_err(io_err)?;
    for entry in container.entries() {
        writer.write_all(&entry.encode_header()).map_err(io_err)?;
        writer.write_all(entry.payload()).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    let mut file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    let bytes_written = file.stream_position().map_err(io_err)?;
    // Drop anything past the last payload.
    file.set_len(bytes_written).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;

    Ok(FinalizeSummary { entry_count, bytes_written })
}
