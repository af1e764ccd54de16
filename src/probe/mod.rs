//! Capability probes
//!
//! Each submodule reads one slice of the host environment and produces a
//! serializable sub-record. `collect_capabilities` runs all of them and
//! assembles the snapshot; no sub-probe failure is fatal to the others.

pub mod fonts;
pub mod ice;
pub mod navigator;
pub mod page;
pub mod webgl;

use serde::Serialize;
use tracing::debug;

use crate::host::HostEnvironment;
use crate::settings::ProbeSettings;

pub use ice::{probe_ice, IceOutcome, IceProbeResult};

/// One synchronous pass over every capability surface. Field order is
/// presentation order.
#[derive(Debug, Serialize)]
pub struct CapabilitySnapshot {
    pub navigator: navigator::NavigatorProps,
    pub chrome: page::ChromeProps,
    pub history: page::HistoryProps,
    pub prototypes: page::PrototypeProps,
    pub screen: page::ScreenProps,
    pub document: page::DocumentProps,
    pub window: page::WindowProps,
    pub webgl: webgl::WebglProbeResult,
    pub fonts: fonts::FontProbeResult,
}

/// Collect the full capability snapshot. Synchronous; every element the
/// probes create is removed before this returns.
pub fn collect_capabilities(
    host: &dyn HostEnvironment,
    settings: &ProbeSettings,
) -> CapabilitySnapshot {
    debug!("collecting capability snapshot");
    CapabilitySnapshot {
        navigator: navigator::probe(host),
        chrome: page::probe_chrome(host),
        history: page::probe_history(host),
        prototypes: page::probe_prototypes(host),
        screen: page::probe_screen(host),
        document: page::probe_document(host),
        window: page::probe_window(host),
        webgl: webgl::probe(host),
        fonts: fonts::probe(host, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixture::{FixtureHost, HostFixture};

    const SECTIONS: [&str; 9] = [
        "navigator",
        "chrome",
        "history",
        "prototypes",
        "screen",
        "document",
        "window",
        "webgl",
        "fonts",
    ];

    #[test]
    fn test_snapshot_has_every_section_even_on_a_bare_host() {
        let host = FixtureHost::new(HostFixture::default());
        let settings = ProbeSettings::default();
        let value = serde_json::to_value(collect_capabilities(&host, &settings)).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), SECTIONS.len());
        for section in SECTIONS {
            assert!(obj.contains_key(section), "missing section {section}");
        }
    }

    #[test]
    fn test_snapshot_survives_a_host_whose_dom_reads_fail() {
        let mut fixture = HostFixture::chrome_like();
        fixture.element_error = Some("dom is sealed".into());
        let host = FixtureHost::new(fixture);
        let settings = ProbeSettings::default();
        let value = serde_json::to_value(collect_capabilities(&host, &settings)).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), SECTIONS.len());
        for section in SECTIONS {
            assert!(obj.contains_key(section), "missing section {section}");
        }
        assert_eq!(obj["webgl"]["webgl_available"], serde_json::json!(false));
        assert_eq!(obj["fonts"]["error"], serde_json::json!("dom is sealed"));
        assert!(obj["fonts"].get("stack").is_some());
        assert_eq!(host.live_elements(), 0);
    }

    #[test]
    fn test_collection_is_idempotent() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let first = serde_json::to_value(collect_capabilities(&host, &settings)).unwrap();
        let second = serde_json::to_value(collect_capabilities(&host, &settings)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_collection_leaves_no_elements_behind() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let _ = collect_capabilities(&host, &settings);
        assert_eq!(host.live_elements(), 0);
        assert_eq!(host.double_removals(), 0);
    }
}
