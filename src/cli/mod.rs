//! CLI module - command-line interface
//!
//! - `envprobe` - render both probe sections like the diagnostic page
//! - `envprobe capabilities` - print the synchronous capability snapshot
//! - `envprobe ice` - run the ICE candidate probe

pub mod capabilities;
pub mod ice;
pub mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::host::fixture::{FixtureHost, HostFixture};
use crate::settings::ProbeSettings;

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const FIXTURE_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}

/// envprobe - Host environment diagnostic probe
///
/// Collects a capability snapshot of a host environment (navigator,
/// screen, WebGL, fonts and more) and probes ICE candidate gathering.
/// Defaults to the full report when no subcommand is given.
#[derive(Parser, Debug)]
#[command(name = "envprobe")]
#[command(author, version, about, long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    " ",
    env!("BUILD_DATE"),
    ")"
))]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit machine-readable logs (JSON) to stderr
    #[arg(long = "json-output", global = true)]
    pub json_output: bool,

    /// Host fixture file (.toml or .json); defaults to a built-in
    /// Chrome-like environment
    #[arg(long, global = true, env = "ENVPROBE_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Probe configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Single-line JSON output
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render both probe sections, the way the diagnostic page lays
    /// them out (default command)
    Report,

    /// Print the synchronous capability snapshot as JSON
    Capabilities,

    /// Run the ICE candidate probe and print its terminal record
    Ice,
}

/// Load and validate probe settings from `--config` or the default
/// location.
pub fn load_settings(cli: &Cli) -> anyhow::Result<ProbeSettings> {
    let settings = match &cli.config {
        Some(path) => ProbeSettings::load_from(path)?,
        None => ProbeSettings::load(),
    };
    settings.validate()?;
    Ok(settings)
}

/// Build the host from `--fixture`, or the built-in Chrome-like
/// environment when none is given.
pub fn load_host(cli: &Cli) -> anyhow::Result<FixtureHost> {
    let fixture = match &cli.fixture {
        Some(path) => HostFixture::from_path(path)?,
        None => HostFixture::chrome_like(),
    };
    Ok(FixtureHost::new(fixture))
}
