//! Report command implementation
//!
//! Mirrors the diagnostic page layout: the capability snapshot lands in
//! one container, the ICE record in another, and both are printed as
//! labeled sections.

use tracing::info;

use crate::cli::Cli;
use crate::probe;
use crate::sink::{ContainerSink, Page, RenderSink};

const BROWSER_CONTAINER: &str = "browser-container";
const WEBRTC_CONTAINER: &str = "web-rtc-container";

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = crate::cli::load_settings(cli)?;
    let host = crate::cli::load_host(cli)?;

    let page = Page::shared();
    info!(
        "collecting report at {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );

    let snapshot = probe::collect_capabilities(&host, &settings);
    let mut browser_sink = ContainerSink::new(page.clone(), BROWSER_CONTAINER);
    browser_sink.render(&serde_json::to_value(&snapshot)?)?;

    let mut rtc_sink = ContainerSink::new(page.clone(), WEBRTC_CONTAINER);
    probe::probe_ice(&host, &settings, &mut rtc_sink).await?;

    let page = page.lock().unwrap();
    for container in [BROWSER_CONTAINER, WEBRTC_CONTAINER] {
        println!("== {} ==", container);
        match page.text(container) {
            Some(text) => println!("{}", text),
            None => println!("(no record)"),
        }
        println!();
    }
    Ok(())
}
