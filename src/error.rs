use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `packr` crate.
///
/// Container-level variants (`AlreadyExists`, `NotFound`, `CorruptData`,
/// `NotADirectory`, `WorkerPanicked`) abort an operation. The remaining
/// variants describe a single file and are reported and skipped by the
/// pack/restore loops.
#[derive(Error, Debug)]
pub enum PackrError {
    /// Creating a container at a path that already exists.
    #[error("container already exists: '{}'", path.display())]
    AlreadyExists { path: PathBuf },

    /// Opening a container that does not exist.
    #[error("container not found: '{}'", path.display())]
    NotFound { path: PathBuf },

    /// Header or entry records inconsistent with the file contents, or a
    /// payload that does not inflate to its recorded size.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// An I/O error occurred while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The relative path does not fit in the fixed alias field.
    #[error("path '{alias}' is {len} bytes, the alias field holds at most {max}")]
    AliasTooLong { alias: String, len: usize, max: usize },

    /// The path cannot be stored as a UTF-8 alias.
    #[error("path '{}' cannot be stored as an alias", path.display())]
    InvalidAlias { path: PathBuf },

    /// A stored alias does not resolve to a path inside the output directory.
    #[error("alias '{alias}' does not name a file inside the output directory")]
    UnsafeAlias { alias: String },

    /// Entry sizes are stored as `u32`.
    #[error("file '{}' is {size} bytes, larger than the 4 GiB entry limit", path.display())]
    FileTooLarge { path: PathBuf, size: u64 },

    /// A verbatim restore met an entry that needs decompression.
    #[error("entry '{alias}' is deflate-compressed and cannot be restored verbatim")]
    UnexpectedCodec { alias: String },

    /// The DEFLATE encoder reported a failure.
    #[error("compression error: {0}")]
    Compression(String),

    #[error("input is not a directory: '{}'", path.display())]
    NotADirectory { path: PathBuf },

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

impl PackrError {
    /// Wraps an `io::Error` with the path it happened on.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PackrError::Io { source, path: path.into() }
    }

    /// Returns true if the error aborts the whole operation rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PackrError::AlreadyExists { .. }
                | PackrError::NotFound { .. }
                | PackrError::CorruptData(_)
                | PackrError::NotADirectory { .. }
                | PackrError::WorkerPanicked
        )
    }
}

pub type Result<T> = std::result::Result<T, PackrError>;
