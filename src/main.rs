//! envprobe - host environment diagnostic probe
//!
//! Collects a capability snapshot of an injected host environment and
//! probes ICE candidate gathering:
//! - Full two-section report (default command)
//! - `envprobe capabilities` - synchronous capability snapshot as JSON
//! - `envprobe ice` - async ICE candidate probe

mod cli;
mod host;
mod logging;
mod probe;
mod settings;
mod sink;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    // Create tokio runtime for async commands
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    match cli.command {
        Some(Commands::Capabilities) => match cli::capabilities::run(&cli) {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                categorize_error(&e)
            }
        },
        Some(Commands::Ice) => rt.block_on(async {
            match cli::ice::run(&cli).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    categorize_error(&e)
                }
            }
        }),
        Some(Commands::Report) | None => rt.block_on(async {
            match cli::report::run(&cli).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    categorize_error(&e)
                }
            }
        }),
    }
}

/// Categorize an error into the appropriate exit code
fn categorize_error(e: &anyhow::Error) -> i32 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("fixture") {
        exit_codes::FIXTURE_ERROR
    } else if msg.contains("config") || msg.contains("stun") || msg.contains("must") {
        exit_codes::CONFIG_ERROR
    } else {
        exit_codes::UNEXPECTED_FAILURE
    }
}
