//! Ice command implementation

use tracing::warn;

use crate::cli::Cli;
use crate::probe::{self, IceOutcome};
use crate::sink::StdoutSink;

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = crate::cli::load_settings(cli)?;
    let host = crate::cli::load_host(cli)?;

    let mut sink = StdoutSink {
        compact: cli.compact,
    };
    let outcome = probe::probe_ice(&host, &settings, &mut sink).await?;
    if outcome == IceOutcome::NoTerminalEvent {
        warn!("candidate gathering ended without a terminal event; nothing emitted");
    }
    Ok(())
}
