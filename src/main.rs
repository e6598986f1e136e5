//! Main entry point for the packr CLI app

fn main() -> std::process::ExitCode {
    if let Err(e) = packr::cli_runner::run_cli_app() {
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
