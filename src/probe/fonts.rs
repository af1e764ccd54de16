//! Font metric probe
//!
//! Renders a probe string in each candidate font with a monospace fallback
//! and compares the resulting box against the monospace baseline. A font
//! whose box differs in either dimension is considered installed. The same
//! pass samples measurement noise: a batch of identically-styled generic
//! elements, and repeated reads of one unchanged element.
//!
//! The difference heuristic cannot see fonts whose metrics happen to match
//! the baseline exactly.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::host::{BoxMetrics, DomHost, ElementStyle, HostEnvironment, HostError, ScopedElement};
use crate::settings::ProbeSettings;

const NOISE_TEXT: &str = "Test element";

/// Font sub-record. A probe failure carries the error and its debug
/// rendering instead of blocking the surrounding snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FontProbeResult {
    Report(Box<FontReport>),
    Failed(FontProbeFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct FontProbeFailure {
    pub error: String,
    pub stack: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontReport {
    pub base_dimensions: BoxMetrics,
    pub font_measurements: BTreeMap<String, FontMeasurement>,
    pub available_fonts: Vec<String>,
    pub noise_measurements: Vec<BoxMetrics>,
    pub consistency_measurements: Vec<BoxMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontMeasurement {
    pub width: i64,
    pub height: i64,
    pub width_diff: i64,
    pub height_diff: i64,
}

/// Collect the font sub-record.
pub fn probe(host: &dyn HostEnvironment, settings: &ProbeSettings) -> FontProbeResult {
    match measure_all(host.dom(), settings) {
        Ok(report) => FontProbeResult::Report(Box::new(report)),
        Err(e) => {
            debug!("font probe failed: {}", e);
            FontProbeResult::Failed(FontProbeFailure {
                error: e.to_string(),
                stack: format!("{e:?}"),
            })
        }
    }
}

fn probe_style(family: String, font_size_px: u32) -> ElementStyle {
    ElementStyle {
        font_family: Some(family),
        font_size_px: Some(font_size_px),
        offscreen: true,
        ..Default::default()
    }
}

fn noise_style() -> ElementStyle {
    ElementStyle {
        font_family: Some("Arial".to_string()),
        font_size_px: Some(16),
        width_px: Some(200),
        height_px: Some(50),
        padding_px: Some(10),
        border_px: Some(1),
        offscreen: true,
    }
}

fn measure_all(dom: &dyn DomHost, settings: &ProbeSettings) -> Result<FontReport, HostError> {
    let base_style = probe_style("monospace".to_string(), settings.probe_font_size_px);
    let base = ScopedElement::create(dom, &base_style, &settings.probe_text)?.measure()?;

    let mut font_measurements = BTreeMap::new();
    let mut available_fonts = Vec::new();
    for font in &settings.test_fonts {
        let style = probe_style(
            format!("\"{}\", monospace", font),
            settings.probe_font_size_px,
        );
        let metrics = ScopedElement::create(dom, &style, &settings.probe_text)?.measure()?;
        if metrics.width != base.width || metrics.height != base.height {
            available_fonts.push(font.clone());
        }
        font_measurements.insert(
            font.clone(),
            FontMeasurement {
                width: metrics.width,
                height: metrics.height,
                width_diff: metrics.width - base.width,
                height_diff: metrics.height - base.height,
            },
        );
    }

    let style = noise_style();
    let mut noise_measurements = Vec::with_capacity(settings.noise_sample_count);
    for _ in 0..settings.noise_sample_count {
        noise_measurements.push(ScopedElement::create(dom, &style, NOISE_TEXT)?.measure()?);
    }

    let element = ScopedElement::create(dom, &style, NOISE_TEXT)?;
    let mut consistency_measurements = Vec::with_capacity(settings.consistency_reads);
    for _ in 0..settings.consistency_reads {
        consistency_measurements.push(element.measure()?);
    }

    Ok(FontReport {
        base_dimensions: base,
        font_measurements,
        available_fonts,
        noise_measurements,
        consistency_measurements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixture::{FixtureHost, HostFixture, JitterFixture};
    use serde_json::json;

    #[test]
    fn test_baseline_and_diffs() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let value = serde_json::to_value(probe(&host, &settings)).unwrap();
        assert_eq!(value["base_dimensions"], json!({"width": 1030, "height": 84}));
        assert_eq!(value["font_measurements"]["Arial"]["width"], json!(468));
        assert_eq!(
            value["font_measurements"]["Arial"]["width_diff"],
            json!(468 - 1030)
        );
        assert_eq!(
            value["font_measurements"]["Arial"]["height_diff"],
            json!(0)
        );
    }

    #[test]
    fn test_metrics_matching_baseline_read_as_unavailable() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let FontProbeResult::Report(report) = probe(&host, &settings) else {
            panic!("expected report");
        };
        // Helvetica is not installed in this environment: it falls back to
        // the monospace baseline and the heuristic cannot distinguish it.
        assert!(!report.available_fonts.contains(&"Helvetica".to_string()));
        // Courier New matches the baseline width but not its height.
        assert!(report.available_fonts.contains(&"Courier New".to_string()));
        assert_eq!(report.available_fonts.len(), 9);
        assert_eq!(report.font_measurements.len(), 10);
    }

    #[test]
    fn test_noise_and_consistency_sample_counts() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let FontProbeResult::Report(report) = probe(&host, &settings) else {
            panic!("expected report");
        };
        assert_eq!(report.noise_measurements.len(), 50);
        assert!(report
            .noise_measurements
            .iter()
            .all(|m| *m == BoxMetrics { width: 222, height: 72 }));
        assert_eq!(report.consistency_measurements.len(), 3);
        assert_eq!(
            report.consistency_measurements[0],
            report.consistency_measurements[2]
        );
    }

    #[test]
    fn test_jitter_shows_up_in_noise_sample() {
        let mut fixture = HostFixture::chrome_like();
        fixture.fonts.jitter = Some(JitterFixture {
            amplitude_px: 3,
            probability: 1.0,
            seed: 7,
        });
        let host = FixtureHost::new(fixture);
        let settings = ProbeSettings::default();
        let FontProbeResult::Report(report) = probe(&host, &settings) else {
            panic!("expected report");
        };
        let distinct: std::collections::BTreeSet<(i64, i64)> = report
            .noise_measurements
            .iter()
            .map(|m| (m.width, m.height))
            .collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_every_probe_element_is_removed() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let settings = ProbeSettings::default();
        let _ = probe(&host, &settings);
        assert_eq!(host.live_elements(), 0);
        assert_eq!(host.double_removals(), 0);
    }

    #[test]
    fn test_failing_dom_yields_error_and_stack() {
        let mut fixture = HostFixture::chrome_like();
        fixture.element_error = Some("dom is sealed".into());
        let host = FixtureHost::new(fixture);
        let settings = ProbeSettings::default();
        let value = serde_json::to_value(probe(&host, &settings)).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["error"], json!("dom is sealed"));
        assert!(obj["stack"].as_str().unwrap().contains("dom is sealed"));
        assert_eq!(host.live_elements(), 0);
    }
}
