use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::codec::{DEFAULT_LEVEL, MAX_LEVEL};

/// Environment variable consulted when `--threads` is not given.
pub const THREADS_ENV: &str = "PACKR_THREADS";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log every entry as it is packed or restored.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Pack a directory into a new container without compression.
    #[command(alias = "a")]
    Archive {
        /// The directory to pack.
        #[arg(required = true)]
        input: PathBuf,

        /// The path for the new container (e.g., assets.packr). Must not exist.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Pack a directory into a new container, DEFLATE-compressing every file.
    #[command(alias = "c")]
    Compress {
        /// The directory to pack.
        #[arg(required = true)]
        input: PathBuf,

        /// The path for the new container. Must not exist.
        #[arg(short, long)]
        output: PathBuf,

        /// DEFLATE level (0-9). Higher levels trade speed for size.
        #[arg(long, default_value_t = DEFAULT_LEVEL, value_parser = clap::value_parser!(u32).range(0..=MAX_LEVEL as i64))]
        level: u32,

        /// Number of worker threads. [0 = one per CPU core, default: PACKR_THREADS or 1]
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Restore an uncompressed container verbatim.
    #[command(alias = "u")]
    Unarchive {
        /// The container to restore.
        #[arg(required = true)]
        container: PathBuf,

        /// The directory to restore into. Created if missing.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Restore a container, inflating compressed entries.
    #[command(alias = "x")]
    Decompress {
        /// The container to restore.
        #[arg(required = true)]
        container: PathBuf,

        /// The directory to restore into. Created if missing.
        #[arg(short, long)]
        output: PathBuf,

        /// Number of worker threads. [0 = one per CPU core, default: PACKR_THREADS or 1]
        #[arg(long)]
        threads: Option<usize>,
    },

    /// List the entries of a container without restoring it.
    #[command(alias = "l")]
    List {
        /// The container to list.
        #[arg(required = true)]
        container: PathBuf,

        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Gets the worker count from the command-line option or the `PACKR_THREADS`
/// environment variable, falling back to a single thread.
///
/// Priority:
/// 1. `--threads` command-line argument.
/// 2. `PACKR_THREADS` environment variable.
/// 3. `1`.
pub fn threads_from_opt_or_env(threads_opt: Option<usize>) -> Result<usize, String> {
    if let Some(threads) = threads_opt {
        return Ok(threads);
    }
    match std::env::var(THREADS_ENV) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("{THREADS_ENV} must be a non-negative integer, got '{value}'")),
        Err(_) => Ok(1),
    }
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn explicit_threads_win() {
        assert_eq!(threads_from_opt_or_env(Some(5)), Ok(5));
    }

    #[test]
    fn compress_accepts_alias_and_flags() {
        let args = Args::try_parse_from(["packr", "c", "in", "-o", "out.packr", "--threads", "4", "--level", "3"]).unwrap();
        match args.command {
            Commands::Compress { threads, level, .. } => {
                assert_eq!(threads, Some(4));
                assert_eq!(level, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn level_out_of_range_is_rejected() {
        assert!(Args::try_parse_from(["packr", "compress", "in", "-o", "out", "--level", "12"]).is_err());
    }
}
