//! # packr Core Library
//!
//! This crate provides the core functionality for the `packr` directory packer.
//!
//! A directory tree is packed into a single `.packr` container: a fixed-size
//! header followed by one self-describing record per file. Each record can be
//! stored verbatim or DEFLATE-compressed, and both packing and restoring can
//! be spread over a pool of worker threads.
//!
//! ## Key Modules
//!
//! - [`archive`]: the container model, its binary layout, and container I/O.
//! - [`codec`]: raw DEFLATE compression with per-thread scratch state.
//! - [`compress`]: the packing pipeline (`archive` and `compress` modes).
//! - [`extract`]: restoring containers, sequentially or in parallel.
//! - [`workers`]: the worker pool shared by the parallel operations.
//! - [`fsx`]: filesystem helpers (directory walk, restore paths).
//!
//! ## Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! let report = packr::compress_parallel(Path::new("assets"), Path::new("assets.packr"), 4)?;
//! println!("{} entries, ratio {:.2}", report.entries, report.ratio());
//!
//! packr::decompress(Path::new("assets.packr"), Path::new("restored"))?;
//! # Ok::<(), packr::PackrError>(())
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod codec;
pub mod compress;
pub mod error;
pub mod extract;
pub mod fsx;
pub mod report;
pub mod workers;

pub use archive::{Container, ContainerWriter, Entry, EntryCodec, EntryInfo};
pub use compress::{archive, compress, compress_with, PackMode, PackOptions};
pub use error::{PackrError, Result};
pub use extract::{decompress, decompress_parallel, decompress_parallel_with, list_entries, unarchive};
pub use report::{PackReport, SkippedFile, UnpackReport};
pub use workers::{compress_parallel, compress_parallel_with};
