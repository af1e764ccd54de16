//! Navigator probe
//!
//! Reads identity/hardware fields, flattens the plugin and MIME type
//! collections, and presence-gates optional capability objects to booleans
//! instead of exposing them.

use serde::Serialize;

use crate::host::{HostEnvironment, UserAgentData};

/// Navigator sub-record. An absent navigator collapses to the presence
/// flag alone.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NavigatorProps {
    Absent(NavigatorAbsent),
    Present(Box<NavigatorReport>),
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigatorAbsent {
    #[serde(rename = "hasNavigator")]
    pub has_navigator: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatorReport {
    pub has_navigator: bool,
    pub platform: Option<String>,
    pub user_agent: Option<String>,
    pub app_version: Option<String>,
    /// Firefox-only; omitted where the host does not define it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oscpu: Option<String>,
    pub vendor: Option<String>,

    // Hardware properties
    pub hardware_concurrency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    pub max_touch_points: Option<u32>,

    // Navigator properties
    pub webdriver: Option<bool>,
    pub languages: Vec<String>,
    pub plugins: Vec<String>,
    pub mime_types: Vec<String>,
    pub do_not_track: Option<String>,
    pub cookie_enabled: Option<bool>,

    // Advanced APIs, presence-gated to booleans
    pub media_devices: bool,
    pub bluetooth: bool,
    pub credentials: bool,
    pub geolocation: bool,
    pub permissions: bool,

    pub user_agent_data: Option<UserAgentData>,
}

/// Collect the navigator sub-record.
pub fn probe(host: &dyn HostEnvironment) -> NavigatorProps {
    let Some(nav) = host.navigator() else {
        return NavigatorProps::Absent(NavigatorAbsent {
            has_navigator: false,
        });
    };

    NavigatorProps::Present(Box::new(NavigatorReport {
        has_navigator: true,
        platform: nav.platform(),
        user_agent: nav.user_agent(),
        app_version: nav.app_version(),
        oscpu: nav.oscpu(),
        vendor: nav.vendor(),
        hardware_concurrency: nav.hardware_concurrency(),
        device_memory: nav.device_memory(),
        max_touch_points: nav.max_touch_points(),
        webdriver: nav.webdriver(),
        languages: nav.languages(),
        plugins: nav.plugins(),
        mime_types: nav.mime_types(),
        do_not_track: nav.do_not_track(),
        cookie_enabled: nav.cookie_enabled(),
        media_devices: nav.has_media_devices(),
        bluetooth: nav.has_bluetooth(),
        credentials: nav.has_credentials(),
        geolocation: nav.has_geolocation(),
        permissions: nav.has_permissions(),
        user_agent_data: nav.user_agent_data(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixture::{FixtureHost, HostFixture};
    use serde_json::json;

    #[test]
    fn test_absent_navigator_is_presence_flag_only() {
        let host = FixtureHost::new(HostFixture::default());
        let props = probe(&host);
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(value, json!({"hasNavigator": false}));
    }

    #[test]
    fn test_present_navigator_fields() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe(&host)).unwrap();
        assert_eq!(value["hasNavigator"], json!(true));
        assert_eq!(value["platform"], json!("Win32"));
        assert_eq!(value["vendor"], json!("Google Inc."));
        assert_eq!(value["hardwareConcurrency"], json!(8));
        assert_eq!(value["mediaDevices"], json!(true));
        assert_eq!(value["languages"], json!(["en-US", "en"]));
        // Chromium hosts do not define oscpu.
        assert!(value.get("oscpu").is_none());
        // doNotTrack is defined but null.
        assert_eq!(value["doNotTrack"], json!(null));
    }

    #[test]
    fn test_user_agent_data_is_reduced_to_three_fields() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe(&host)).unwrap();
        let uad = value["userAgentData"].as_object().unwrap();
        assert_eq!(uad.len(), 3);
        assert!(uad.contains_key("brands"));
        assert!(uad.contains_key("mobile"));
        assert!(uad.contains_key("platform"));
    }

    #[test]
    fn test_plugin_collections_are_flat_string_lists() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe(&host)).unwrap();
        assert!(value["plugins"]
            .as_array()
            .unwrap()
            .iter()
            .all(|p| p.is_string()));
        assert!(value["mimeTypes"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m.is_string()));
    }
}
