//! Direct-read page probes: chrome, history, prototypes, screen, document
//! and window geometry. No computation, just field reads with presence
//! flags; an absent surface never raises.

use serde::Serialize;

use crate::host::{Builtin, HostEnvironment};

/// The `chrome` object sub-record
#[derive(Debug, Clone, Serialize)]
pub struct ChromeProps {
    #[serde(rename = "hasChrome")]
    pub has_chrome: bool,
    pub app: ChromeAppProps,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChromeAppProps {
    #[serde(rename = "hasApp")]
    pub has_app: bool,
    #[serde(rename = "isInstalled")]
    pub is_installed: Option<bool>,
    #[serde(rename = "InstallState")]
    pub install_state: Option<String>,
    #[serde(rename = "RunningState")]
    pub running_state: Option<String>,
}

pub fn probe_chrome(host: &dyn HostEnvironment) -> ChromeProps {
    match host.chrome() {
        Some(chrome) => {
            let app = chrome.app;
            ChromeProps {
                has_chrome: true,
                app: ChromeAppProps {
                    has_app: app.is_some(),
                    is_installed: app.as_ref().and_then(|a| a.is_installed),
                    install_state: app.as_ref().and_then(|a| a.install_state.clone()),
                    running_state: app.as_ref().and_then(|a| a.running_state.clone()),
                },
            }
        }
        None => ChromeProps {
            has_chrome: false,
            app: ChromeAppProps {
                has_app: false,
                is_installed: None,
                install_state: None,
                running_state: None,
            },
        },
    }
}

/// Session history sub-record
#[derive(Debug, Clone, Serialize)]
pub struct HistoryProps {
    #[serde(rename = "hasHistory")]
    pub has_history: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(rename = "scrollRestoration", skip_serializing_if = "Option::is_none")]
    pub scroll_restoration: Option<String>,
}

pub fn probe_history(host: &dyn HostEnvironment) -> HistoryProps {
    match host.history() {
        Some(history) => HistoryProps {
            has_history: true,
            length: Some(history.length),
            scroll_restoration: Some(history.scroll_restoration),
        },
        None => HistoryProps {
            has_history: false,
            length: None,
            scroll_restoration: None,
        },
    }
}

/// Stringified builtin implementations, used to detect tampering or
/// instrumentation of the host
#[derive(Debug, Clone, Serialize)]
pub struct PrototypeProps {
    #[serde(rename = "String.prototype.match")]
    pub string_match: String,
    #[serde(rename = "Function.prototype.toString")]
    pub function_to_string: String,
}

pub fn probe_prototypes(host: &dyn HostEnvironment) -> PrototypeProps {
    let read = |builtin: Builtin| {
        host.builtin_source(builtin)
            .unwrap_or_else(|e| format!("Error: {}", e))
    };
    PrototypeProps {
        string_match: read(Builtin::StringPrototypeMatch),
        function_to_string: read(Builtin::FunctionPrototypeToString),
    }
}

/// Screen geometry sub-record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenProps {
    pub has_screen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avail_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avail_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_depth: Option<u32>,
}

pub fn probe_screen(host: &dyn HostEnvironment) -> ScreenProps {
    match host.screen() {
        Some(screen) => ScreenProps {
            has_screen: true,
            width: Some(screen.width),
            height: Some(screen.height),
            avail_width: Some(screen.avail_width),
            avail_height: Some(screen.avail_height),
            color_depth: Some(screen.color_depth),
            pixel_depth: Some(screen.pixel_depth),
        },
        None => ScreenProps {
            has_screen: false,
            width: None,
            height: None,
            avail_width: None,
            avail_height: None,
            color_depth: None,
            pixel_depth: None,
        },
    }
}

/// Document sub-record
#[derive(Debug, Clone, Serialize)]
pub struct DocumentProps {
    #[serde(rename = "hasDocument")]
    pub has_document: bool,
    #[serde(rename = "documentElement", skip_serializing_if = "Option::is_none")]
    pub document_element: Option<DocumentElementProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentElementProps {
    pub width: Option<i64>,
    pub height: Option<i64>,
}

pub fn probe_document(host: &dyn HostEnvironment) -> DocumentProps {
    match host.document() {
        Some(document) => DocumentProps {
            has_document: true,
            document_element: Some(DocumentElementProps {
                width: document.client_width,
                height: document.client_height,
            }),
            cookie: document.cookie,
        },
        None => DocumentProps {
            has_document: false,
            document_element: None,
            cookie: None,
        },
    }
}

/// Window geometry sub-record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowProps {
    pub has_window: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_height: Option<i64>,
    #[serde(rename = "screenX", skip_serializing_if = "Option::is_none")]
    pub screen_x: Option<i64>,
    #[serde(rename = "screenY", skip_serializing_if = "Option::is_none")]
    pub screen_y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_top: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_pixel_ratio: Option<f64>,
}

pub fn probe_window(host: &dyn HostEnvironment) -> WindowProps {
    match host.window_geometry() {
        Some(window) => WindowProps {
            has_window: true,
            outer_width: Some(window.outer_width),
            outer_height: Some(window.outer_height),
            inner_width: Some(window.inner_width),
            inner_height: Some(window.inner_height),
            screen_x: Some(window.screen_x),
            screen_y: Some(window.screen_y),
            screen_left: Some(window.screen_left),
            screen_top: Some(window.screen_top),
            device_pixel_ratio: Some(window.device_pixel_ratio),
        },
        None => WindowProps {
            has_window: false,
            outer_width: None,
            outer_height: None,
            inner_width: None,
            inner_height: None,
            screen_x: None,
            screen_y: None,
            screen_left: None,
            screen_top: None,
            device_pixel_ratio: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixture::{BuiltinFixture, FixtureHost, HostFixture};
    use serde_json::json;

    #[test]
    fn test_absent_chrome_is_total() {
        let host = FixtureHost::new(HostFixture::default());
        let value = serde_json::to_value(probe_chrome(&host)).unwrap();
        assert_eq!(
            value,
            json!({
                "hasChrome": false,
                "app": {
                    "hasApp": false,
                    "isInstalled": null,
                    "InstallState": null,
                    "RunningState": null
                }
            })
        );
    }

    #[test]
    fn test_chrome_app_fields() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe_chrome(&host)).unwrap();
        assert_eq!(value["hasChrome"], json!(true));
        assert_eq!(value["app"]["hasApp"], json!(true));
        assert_eq!(value["app"]["isInstalled"], json!(false));
        assert_eq!(value["app"]["InstallState"], json!("not_installed"));
    }

    #[test]
    fn test_prototype_reads_use_property_path_keys() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe_prototypes(&host)).unwrap();
        assert_eq!(
            value["String.prototype.match"],
            json!("function match() { [native code] }")
        );
        assert_eq!(
            value["Function.prototype.toString"],
            json!("function toString() { [native code] }")
        );
    }

    #[test]
    fn test_prototype_read_failure_becomes_error_string() {
        let mut fixture = HostFixture::chrome_like();
        fixture.builtins.insert(
            "String.prototype.match".into(),
            BuiltinFixture::Error("access denied".into()),
        );
        let host = FixtureHost::new(fixture);
        let props = probe_prototypes(&host);
        assert_eq!(props.string_match, "Error: access denied");
    }

    #[test]
    fn test_screen_and_window_geometry() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let screen = serde_json::to_value(probe_screen(&host)).unwrap();
        assert_eq!(screen["hasScreen"], json!(true));
        assert_eq!(screen["availHeight"], json!(1040));
        assert_eq!(screen["colorDepth"], json!(24));

        let window = serde_json::to_value(probe_window(&host)).unwrap();
        assert_eq!(window["hasWindow"], json!(true));
        assert_eq!(window["innerHeight"], json!(947));
        assert_eq!(window["screenX"], json!(0));
        assert_eq!(window["devicePixelRatio"], json!(1.0));
    }

    #[test]
    fn test_absent_surfaces_collapse_to_presence_flags() {
        let host = FixtureHost::new(HostFixture::default());
        assert_eq!(
            serde_json::to_value(probe_screen(&host)).unwrap(),
            json!({"hasScreen": false})
        );
        assert_eq!(
            serde_json::to_value(probe_window(&host)).unwrap(),
            json!({"hasWindow": false})
        );
        assert_eq!(
            serde_json::to_value(probe_history(&host)).unwrap(),
            json!({"hasHistory": false})
        );
        assert_eq!(
            serde_json::to_value(probe_document(&host)).unwrap(),
            json!({"hasDocument": false})
        );
    }

    #[test]
    fn test_document_element_dimensions() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let value = serde_json::to_value(probe_document(&host)).unwrap();
        assert_eq!(value["documentElement"]["width"], json!(1920));
        assert_eq!(value["documentElement"]["height"], json!(947));
        assert_eq!(value["cookie"], json!(""));
    }
}
