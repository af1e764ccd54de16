//! Logging setup
//!
//! All logs go to stderr so stdout stays reserved for probe records.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` overrides the level
/// chosen by `--verbose`.
pub fn init(verbose: bool, json_output: bool) -> anyhow::Result<()> {
    let default_filter = if verbose {
        "envprobe=debug"
    } else {
        "envprobe=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json_output {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
