//! Capabilities command implementation

use crate::cli::Cli;
use crate::probe;
use crate::sink::{RenderSink, StdoutSink};

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = crate::cli::load_settings(cli)?;
    let host = crate::cli::load_host(cli)?;

    let snapshot = probe::collect_capabilities(&host, &settings);
    let mut sink = StdoutSink {
        compact: cli.compact,
    };
    sink.render(&serde_json::to_value(&snapshot)?)?;
    Ok(())
}
