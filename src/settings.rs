//! Probe settings
//!
//! Persistent configuration for the probe harness:
//! - STUN server used for ICE gathering
//! - font probe text, size and candidate list
//! - noise-sample and consistency-read counts

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// STUN server URL handed to the peer connection.
    pub stun_server: String,

    /// Text rendered by the font probe.
    pub probe_text: String,

    /// Font size for probe elements, in pixels.
    pub probe_font_size_px: u32,

    /// Fonts measured against the monospace baseline.
    pub test_fonts: Vec<String>,

    /// Generic elements created to sample box-metric noise.
    pub noise_sample_count: usize,

    /// Repeated reads of one unchanged element.
    pub consistency_reads: usize,

    /// Label for the data channel that forces ICE gathering.
    pub data_channel_label: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            stun_server: "stun:stun.l.google.com:19302".to_string(),
            probe_text: "mmmmmmmmmmlli".to_string(),
            probe_font_size_px: 72,
            test_fonts: vec![
                "Arial".to_string(),
                "Times New Roman".to_string(),
                "Courier New".to_string(),
                "Helvetica".to_string(),
                "Georgia".to_string(),
                "Verdana".to_string(),
                "Comic Sans MS".to_string(),
                "Impact".to_string(),
                "Trebuchet MS".to_string(),
                "Arial Black".to_string(),
            ],
            noise_sample_count: 50,
            consistency_reads: 3,
            data_channel_label: String::new(),
        }
    }
}

impl ProbeSettings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("envprobe").join("config.toml"))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::settings_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(settings) => return settings,
                    Err(e) => tracing::warn!("ignoring config at {:?}: {}", path, e),
                }
            }
        }
        Self::default()
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config path"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let text = toml::to_string_pretty(self)?;
        std::fs::write(&path, text)?;

        Ok(())
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.stun_server)
            .with_context(|| format!("invalid STUN server URL '{}'", self.stun_server))?;
        if url.scheme() != "stun" && url.scheme() != "stuns" {
            anyhow::bail!(
                "STUN server URL '{}' must use the stun or stuns scheme",
                self.stun_server
            );
        }
        if self.probe_text.is_empty() {
            anyhow::bail!("probe_text must not be empty");
        }
        if self.test_fonts.is_empty() {
            anyhow::bail!("test_fonts must not be empty");
        }
        if self.consistency_reads == 0 {
            anyhow::bail!("consistency_reads must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_probe_constants() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.probe_text, "mmmmmmmmmmlli");
        assert_eq!(settings.probe_font_size_px, 72);
        assert_eq!(settings.test_fonts.len(), 10);
        assert_eq!(settings.noise_sample_count, 50);
        assert_eq!(settings.consistency_reads, 3);
        assert!(settings.data_channel_label.is_empty());
        settings.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_non_stun_scheme() {
        let settings = ProbeSettings {
            stun_server: "https://example.com".to_string(),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("stun"));
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let settings = ProbeSettings {
            stun_server: "not a url".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = ProbeSettings::default();
        settings.noise_sample_count = 10;
        std::fs::write(&path, toml::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = ProbeSettings::load_from(&path).unwrap();
        assert_eq!(loaded.noise_sample_count, 10);
        assert_eq!(loaded.stun_server, settings.stun_server);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "stun_server = \"stun:stun.example.net:3478\"\n").unwrap();

        let loaded = ProbeSettings::load_from(&path).unwrap();
        assert_eq!(loaded.stun_server, "stun:stun.example.net:3478");
        assert_eq!(loaded.consistency_reads, 3);
    }
}
