//! CLI runner shared by the `packr` binary and the CLI tests.
//!
//! Dispatches a parsed command to the library operations and prints a short
//! summary (counts, sizes, elapsed time) of each run.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::cli::{self, Args, Commands};
use crate::compress::PackOptions;
use crate::report::{PackReport, UnpackReport};
use crate::{compress, extract, workers};

/// Installs the `tracing` subscriber. `RUST_LOG` overrides the `--verbose` default.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Ignore a second initialisation (tests run many commands in one process).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run();
    init_logging(args.verbose);
    run_command(args)
}

/// Executes one parsed command.
pub fn run_command(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Commands::Archive { input, output } => {
            let report = compress::archive(&input, &output)?;
            print_pack("archive", &report);
        }
        Commands::Compress { input, output, level, threads } => {
            let threads = cli::threads_from_opt_or_env(threads)?;
            let options = PackOptions { level, threads };
            let report = if threads == 1 {
                compress::compress_with(&input, &output, &options)?
            } else {
                workers::compress_parallel_with(&input, &output, &options)?
            };
            print_pack("compress", &report);
        }
        Commands::Unarchive { container, output } => {
            let report = extract::unarchive(&container, &output)?;
            print_unpack("unarchive", &report);
        }
        Commands::Decompress { container, output, threads } => {
            let threads = cli::threads_from_opt_or_env(threads)?;
            let report = if threads == 1 {
                extract::decompress(&container, &output)?
            } else {
                let options = PackOptions { threads, ..PackOptions::default() };
                extract::decompress_parallel_with(&container, &output, &options)?
            };
            print_unpack("decompress", &report);
        }
        Commands::List { container, json } => {
            let entries = extract::list_entries(&container)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("Container Index ({} entries):", entries.len());
                for entry in entries {
                    println!(
                        "- {} ({} bytes, {} stored, {:?})",
                        entry.alias, entry.original_size, entry.stored_size, entry.codec
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_pack(operation: &str, report: &PackReport) {
    println!(
        "{operation}: {} entries, {} -> {} bytes (ratio {:.3}), {} skipped, {} thread(s), {}",
        report.entries,
        report.original_bytes,
        report.stored_bytes,
        report.ratio(),
        report.skipped.len(),
        report.threads,
        format_elapsed(report.elapsed),
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

fn print_unpack(operation: &str, report: &UnpackReport) {
    println!(
        "{operation}: {} files, {} bytes, {} skipped, {} thread(s), {}",
        report.restored,
        report.bytes_written,
        report.skipped.len(),
        report.threads,
        format_elapsed(report.elapsed),
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{:.1} ms", secs * 1000.0)
    } else {
        format!("{secs:.2} s")
    }
}
