//! Fixture host
//!
//! A deserializable description of a browser environment, replayed through
//! the [`HostEnvironment`] traits. The e2e harness ships fixture files; the
//! tests build fixtures inline. `HostFixture::chrome_like()` describes a
//! stable Chrome-on-Windows environment so the CLI works without arguments.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use super::{
    BoxMetrics, Builtin, CandidateEvent, ChromeAppInfo, ChromeInfo, DocumentInfo, DomHost,
    ElementId, ElementStyle, Gl2Context, Gl2Parameter, GlContext, GlParameter, GlValue,
    HistoryInfo, HostEnvironment, HostError, NavigatorHost, PeerConnection, RtcConfig,
    ScreenInfo, SessionDescription, ShaderStage, UserAgentBrand, UserAgentData, WindowInfo,
};

/// Serializable description of a host environment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostFixture {
    pub navigator: Option<NavigatorFixture>,
    pub chrome: Option<ChromeInfo>,
    pub history: Option<HistoryInfo>,
    pub screen: Option<ScreenInfo>,
    pub window: Option<WindowInfo>,
    pub document: Option<DocumentInfo>,
    /// Builtin source overrides, keyed by property path. Missing keys read
    /// as native sources.
    pub builtins: BTreeMap<String, BuiltinFixture>,
    /// When set, element and canvas creation fail with this message.
    pub element_error: Option<String>,
    pub fonts: FontFixture,
    pub webgl: Option<WebglFixture>,
    pub rtc: Option<RtcFixture>,
}

impl HostFixture {
    /// Load a fixture from a `.toml` or `.json` file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read fixture {}: {}", path.display(), e))?;
        let fixture = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid fixture {}: {}", path.display(), e))?,
            _ => toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid fixture {}: {}", path.display(), e))?,
        };
        Ok(fixture)
    }

    /// A stable Chrome-on-Windows-like environment used as the default host.
    pub fn chrome_like() -> Self {
        let user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
        Self {
            navigator: Some(NavigatorFixture {
                platform: Some("Win32".into()),
                user_agent: Some(user_agent.into()),
                app_version: Some(user_agent.trim_start_matches("Mozilla/").into()),
                oscpu: None,
                vendor: Some("Google Inc.".into()),
                hardware_concurrency: Some(8),
                device_memory: Some(8.0),
                max_touch_points: Some(0),
                webdriver: Some(false),
                languages: vec!["en-US".into(), "en".into()],
                plugins: vec![
                    "PDF Viewer".into(),
                    "Chrome PDF Viewer".into(),
                    "Chromium PDF Viewer".into(),
                ],
                mime_types: vec!["application/pdf".into(), "text/pdf".into()],
                do_not_track: None,
                cookie_enabled: Some(true),
                media_devices: true,
                bluetooth: true,
                credentials: true,
                geolocation: true,
                permissions: true,
                user_agent_data: Some(UserAgentData {
                    brands: vec![
                        UserAgentBrand {
                            brand: "Chromium".into(),
                            version: "124".into(),
                        },
                        UserAgentBrand {
                            brand: "Google Chrome".into(),
                            version: "124".into(),
                        },
                    ],
                    mobile: false,
                    platform: "Windows".into(),
                }),
            }),
            chrome: Some(ChromeInfo {
                app: Some(ChromeAppInfo {
                    is_installed: Some(false),
                    install_state: Some("not_installed".into()),
                    running_state: Some("cannot_run".into()),
                }),
            }),
            history: Some(HistoryInfo {
                length: 2,
                scroll_restoration: "auto".into(),
            }),
            screen: Some(ScreenInfo {
                width: 1920,
                height: 1080,
                avail_width: 1920,
                avail_height: 1040,
                color_depth: 24,
                pixel_depth: 24,
            }),
            window: Some(WindowInfo {
                outer_width: 1920,
                outer_height: 1040,
                inner_width: 1920,
                inner_height: 947,
                screen_x: 0,
                screen_y: 0,
                screen_left: 0,
                screen_top: 0,
                device_pixel_ratio: 1.0,
            }),
            document: Some(DocumentInfo {
                client_width: Some(1920),
                client_height: Some(947),
                cookie: Some(String::new()),
            }),
            builtins: BTreeMap::new(),
            element_error: None,
            fonts: FontFixture::chrome_like(),
            webgl: Some(WebglFixture::chrome_like()),
            rtc: Some(RtcFixture {
                offer_error: None,
                candidates: vec![
                    CandidateFixture {
                        candidate: Some(
                            "candidate:842163049 1 udp 1677729535 203.0.113.7 58342 typ srflx \
                             raddr 0.0.0.0 rport 0 generation 0 ufrag 4d2a network-cost 999"
                                .into(),
                        ),
                    },
                    CandidateFixture { candidate: None },
                ],
            }),
        }
    }
}

/// Navigator values for the fixture host
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NavigatorFixture {
    pub platform: Option<String>,
    pub user_agent: Option<String>,
    pub app_version: Option<String>,
    pub oscpu: Option<String>,
    pub vendor: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory: Option<f64>,
    pub max_touch_points: Option<u32>,
    pub webdriver: Option<bool>,
    pub languages: Vec<String>,
    pub plugins: Vec<String>,
    pub mime_types: Vec<String>,
    pub do_not_track: Option<String>,
    pub cookie_enabled: Option<bool>,
    pub media_devices: bool,
    pub bluetooth: bool,
    pub credentials: bool,
    pub geolocation: bool,
    pub permissions: bool,
    pub user_agent_data: Option<UserAgentData>,
}

impl NavigatorHost for NavigatorFixture {
    fn platform(&self) -> Option<String> {
        self.platform.clone()
    }
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }
    fn app_version(&self) -> Option<String> {
        self.app_version.clone()
    }
    fn oscpu(&self) -> Option<String> {
        self.oscpu.clone()
    }
    fn vendor(&self) -> Option<String> {
        self.vendor.clone()
    }
    fn hardware_concurrency(&self) -> Option<u32> {
        self.hardware_concurrency
    }
    fn device_memory(&self) -> Option<f64> {
        self.device_memory
    }
    fn max_touch_points(&self) -> Option<u32> {
        self.max_touch_points
    }
    fn webdriver(&self) -> Option<bool> {
        self.webdriver
    }
    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }
    fn plugins(&self) -> Vec<String> {
        self.plugins.clone()
    }
    fn mime_types(&self) -> Vec<String> {
        self.mime_types.clone()
    }
    fn do_not_track(&self) -> Option<String> {
        self.do_not_track.clone()
    }
    fn cookie_enabled(&self) -> Option<bool> {
        self.cookie_enabled
    }
    fn has_media_devices(&self) -> bool {
        self.media_devices
    }
    fn has_bluetooth(&self) -> bool {
        self.bluetooth
    }
    fn has_credentials(&self) -> bool {
        self.credentials
    }
    fn has_geolocation(&self) -> bool {
        self.geolocation
    }
    fn has_permissions(&self) -> bool {
        self.permissions
    }
    fn user_agent_data(&self) -> Option<UserAgentData> {
        self.user_agent_data.clone()
    }
}

/// Scripted builtin read: a source string or a read failure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinFixture {
    Source(String),
    Error(String),
}

/// Font face metrics and optional layout jitter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontFixture {
    /// Monospace baseline box for the probe text at probe size.
    pub base: BoxMetrics,
    /// Installed faces; fonts not listed here fall back to the baseline.
    pub faces: BTreeMap<String, BoxMetrics>,
    /// Anti-fingerprinting noise model applied to every measurement.
    pub jitter: Option<JitterFixture>,
}

impl Default for FontFixture {
    fn default() -> Self {
        Self {
            base: BoxMetrics {
                width: 1030,
                height: 84,
            },
            faces: BTreeMap::new(),
            jitter: None,
        }
    }
}

impl FontFixture {
    fn chrome_like() -> Self {
        let faces = [
            ("Arial", 468, 84),
            ("Times New Roman", 412, 83),
            // Courier New matches the monospace baseline width; only the
            // height differs, which still counts as available.
            ("Courier New", 1030, 82),
            ("Georgia", 478, 84),
            ("Verdana", 562, 84),
            ("Comic Sans MS", 550, 98),
            ("Impact", 420, 85),
            ("Trebuchet MS", 502, 85),
            ("Arial Black", 516, 85),
        ]
        .into_iter()
        .map(|(name, width, height)| (name.to_string(), BoxMetrics { width, height }))
        .collect();
        Self {
            base: BoxMetrics {
                width: 1030,
                height: 84,
            },
            faces,
            jitter: None,
        }
    }
}

/// Seeded per-measurement box jitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JitterFixture {
    pub amplitude_px: i64,
    /// Chance that any single measurement is perturbed.
    pub probability: f64,
    pub seed: u64,
}

impl Default for JitterFixture {
    fn default() -> Self {
        Self {
            amplitude_px: 2,
            probability: 0.15,
            seed: 0,
        }
    }
}

/// WebGL1 capability table plus scripted pipeline behavior
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WebglFixture {
    pub parameters: BTreeMap<String, GlValue>,
    pub extensions: Vec<String>,
    /// When set, shader compilation fails with this message.
    pub rendering_error: Option<String>,
    pub webgl2: Option<Webgl2Fixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Webgl2Fixture {
    pub parameters: BTreeMap<String, GlValue>,
}

impl WebglFixture {
    fn chrome_like() -> Self {
        let parameters = [
            (
                "version",
                GlValue::Str("WebGL 1.0 (OpenGL ES 2.0 Chromium)".into()),
            ),
            (
                "shading_language_version",
                GlValue::Str("WebGL GLSL ES 1.0 (OpenGL ES GLSL ES 1.0 Chromium)".into()),
            ),
            ("vendor", GlValue::Str("WebKit".into())),
            ("renderer", GlValue::Str("WebKit WebGL".into())),
            ("max_texture_size", GlValue::Int(16384)),
            ("max_vertex_attribs", GlValue::Int(16)),
            ("max_vertex_uniform_vectors", GlValue::Int(4095)),
            ("max_fragment_uniform_vectors", GlValue::Int(1024)),
            ("max_varying_vectors", GlValue::Int(30)),
            ("max_renderbuffer_size", GlValue::Int(16384)),
            ("max_viewport_dims", GlValue::IntList(vec![32767, 32767])),
            (
                "aliased_line_width_range",
                GlValue::FloatList(vec![1.0, 1.0]),
            ),
            (
                "aliased_point_size_range",
                GlValue::FloatList(vec![1.0, 1024.0]),
            ),
            ("max_cube_map_texture_size", GlValue::Int(16384)),
            ("max_combined_texture_image_units", GlValue::Int(32)),
            ("max_texture_image_units", GlValue::Int(16)),
            ("max_vertex_texture_image_units", GlValue::Int(16)),
            ("depth_bits", GlValue::Int(24)),
            ("stencil_bits", GlValue::Int(0)),
            ("red_bits", GlValue::Int(8)),
            ("green_bits", GlValue::Int(8)),
            ("blue_bits", GlValue::Int(8)),
            ("alpha_bits", GlValue::Int(8)),
            ("subpixel_bits", GlValue::Int(4)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let webgl2_parameters = [
            (
                "version",
                GlValue::Str("WebGL 2.0 (OpenGL ES 3.0 Chromium)".into()),
            ),
            (
                "shading_language_version",
                GlValue::Str("WebGL GLSL ES 3.00 (OpenGL ES GLSL ES 3.0 Chromium)".into()),
            ),
            ("max_3d_texture_size", GlValue::Int(2048)),
            ("max_array_texture_layers", GlValue::Int(2048)),
            ("max_color_attachments", GlValue::Int(8)),
            ("max_draw_buffers", GlValue::Int(8)),
            ("max_element_index", GlValue::Int(4_294_967_294)),
            ("max_elements_indices", GlValue::Int(150_000_000)),
            ("max_elements_vertices", GlValue::Int(150_000_000)),
            ("max_fragment_input_components", GlValue::Int(120)),
            ("max_fragment_uniform_blocks", GlValue::Int(12)),
            ("max_fragment_uniform_components", GlValue::Int(4096)),
            ("max_samples", GlValue::Int(8)),
            ("max_texture_lod_bias", GlValue::Float(2.0)),
            (
                "max_transform_feedback_interleaved_components",
                GlValue::Int(120),
            ),
            ("max_transform_feedback_separate_attribs", GlValue::Int(4)),
            (
                "max_transform_feedback_separate_components",
                GlValue::Int(4),
            ),
            ("max_uniform_block_size", GlValue::Int(65536)),
            ("max_uniform_buffer_bindings", GlValue::Int(72)),
            ("max_varying_components", GlValue::Int(120)),
            ("max_vertex_output_components", GlValue::Int(64)),
            ("max_vertex_uniform_blocks", GlValue::Int(12)),
            ("max_vertex_uniform_components", GlValue::Int(4096)),
            ("min_program_texel_offset", GlValue::Int(-8)),
            ("max_program_texel_offset", GlValue::Int(7)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            parameters,
            extensions: vec![
                "ANGLE_instanced_arrays".into(),
                "EXT_blend_minmax".into(),
                "EXT_color_buffer_half_float".into(),
                "EXT_texture_filter_anisotropic".into(),
                "OES_element_index_uint".into(),
                "OES_standard_derivatives".into(),
                "OES_texture_float".into(),
                "OES_vertex_array_object".into(),
                "WEBGL_debug_renderer_info".into(),
                "WEBGL_lose_context".into(),
            ],
            rendering_error: None,
            webgl2: Some(Webgl2Fixture {
                parameters: webgl2_parameters,
            }),
        }
    }
}

/// Scripted peer negotiation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RtcFixture {
    /// When set, offer creation rejects with this message.
    pub offer_error: Option<String>,
    /// Candidate events in arrival order; an entry without a candidate is
    /// the gathering-complete event.
    pub candidates: Vec<CandidateFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CandidateFixture {
    pub candidate: Option<String>,
}

#[derive(Debug, Default)]
struct DomState {
    next_id: ElementId,
    elements: HashMap<ElementId, ElementRecord>,
    double_removals: usize,
}

#[derive(Debug)]
struct ElementRecord {
    style: ElementStyle,
    is_canvas: bool,
}

/// Host environment backed by a [`HostFixture`]
pub struct FixtureHost {
    fixture: HostFixture,
    dom: Mutex<DomState>,
    rng: Mutex<StdRng>,
}

impl FixtureHost {
    pub fn new(fixture: HostFixture) -> Self {
        let seed = fixture.fonts.jitter.as_ref().map(|j| j.seed).unwrap_or(0);
        Self {
            fixture,
            dom: Mutex::new(DomState::default()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Number of elements currently attached. Zero after a well-behaved
    /// probe returns.
    pub fn live_elements(&self) -> usize {
        self.dom.lock().unwrap().elements.len()
    }

    /// Number of removals that targeted an already-removed element.
    pub fn double_removals(&self) -> usize {
        self.dom.lock().unwrap().double_removals
    }

    /// First comma-separated face in a font-family stack, unquoted.
    fn primary_face(family: &str) -> &str {
        family
            .split(',')
            .next()
            .unwrap_or(family)
            .trim()
            .trim_matches('"')
    }

    fn styled_box(&self, style: &ElementStyle) -> BoxMetrics {
        // Fixed-size elements measure as their border box.
        if let (Some(width), Some(height)) = (style.width_px, style.height_px) {
            let edges = 2 * (style.padding_px.unwrap_or(0) + style.border_px.unwrap_or(0));
            return BoxMetrics {
                width: width + edges,
                height: height + edges,
            };
        }
        // Text probes resolve through the font stack.
        match style.font_family.as_deref().map(Self::primary_face) {
            Some(face) if face != "monospace" => self
                .fixture
                .fonts
                .faces
                .get(face)
                .copied()
                .unwrap_or(self.fixture.fonts.base),
            _ => self.fixture.fonts.base,
        }
    }

    fn jittered(&self, metrics: BoxMetrics) -> BoxMetrics {
        let Some(jitter) = self.fixture.fonts.jitter.as_ref() else {
            return metrics;
        };
        let mut rng = self.rng.lock().unwrap();
        if rng.random::<f64>() >= jitter.probability {
            return metrics;
        }
        let amplitude = jitter.amplitude_px;
        BoxMetrics {
            width: metrics.width + rng.random_range(-amplitude..=amplitude),
            height: metrics.height + rng.random_range(-amplitude..=amplitude),
        }
    }
}

impl DomHost for FixtureHost {
    fn create_element(&self, style: &ElementStyle, _text: &str) -> Result<ElementId, HostError> {
        if let Some(message) = self.fixture.element_error.as_ref() {
            return Err(HostError::Rejected(message.clone()));
        }
        let mut dom = self.dom.lock().unwrap();
        dom.next_id += 1;
        let id = dom.next_id;
        dom.elements.insert(
            id,
            ElementRecord {
                style: style.clone(),
                is_canvas: false,
            },
        );
        Ok(id)
    }

    fn measure(&self, element: ElementId) -> Result<BoxMetrics, HostError> {
        let style = {
            let dom = self.dom.lock().unwrap();
            let record = dom
                .elements
                .get(&element)
                .ok_or(HostError::UnknownElement(element))?;
            record.style.clone()
        };
        Ok(self.jittered(self.styled_box(&style)))
    }

    fn remove_element(&self, element: ElementId) {
        let mut dom = self.dom.lock().unwrap();
        if dom.elements.remove(&element).is_none() {
            dom.double_removals += 1;
        }
    }

    fn create_canvas(&self, _width: u32, _height: u32) -> Result<ElementId, HostError> {
        if let Some(message) = self.fixture.element_error.as_ref() {
            return Err(HostError::Rejected(message.clone()));
        }
        let mut dom = self.dom.lock().unwrap();
        dom.next_id += 1;
        let id = dom.next_id;
        dom.elements.insert(
            id,
            ElementRecord {
                style: ElementStyle::default(),
                is_canvas: true,
            },
        );
        Ok(id)
    }

    fn webgl_context(&self, canvas: ElementId) -> Option<Box<dyn GlContext>> {
        let dom = self.dom.lock().unwrap();
        let record = dom.elements.get(&canvas)?;
        if !record.is_canvas {
            return None;
        }
        let webgl = self.fixture.webgl.clone()?;
        Some(Box::new(FixtureGl {
            fixture: webgl,
            pipeline: PipelineState::default(),
        }))
    }

    fn webgl2_context(&self, canvas: ElementId) -> Option<Box<dyn Gl2Context>> {
        let dom = self.dom.lock().unwrap();
        let record = dom.elements.get(&canvas)?;
        if !record.is_canvas {
            return None;
        }
        let webgl2 = self.fixture.webgl.as_ref()?.webgl2.clone()?;
        Some(Box::new(FixtureGl2 { fixture: webgl2 }))
    }
}

impl HostEnvironment for FixtureHost {
    fn navigator(&self) -> Option<&dyn NavigatorHost> {
        self.fixture
            .navigator
            .as_ref()
            .map(|n| n as &dyn NavigatorHost)
    }

    fn chrome(&self) -> Option<ChromeInfo> {
        self.fixture.chrome.clone()
    }

    fn history(&self) -> Option<HistoryInfo> {
        self.fixture.history.clone()
    }

    fn screen(&self) -> Option<ScreenInfo> {
        self.fixture.screen.clone()
    }

    fn window_geometry(&self) -> Option<WindowInfo> {
        self.fixture.window.clone()
    }

    fn document(&self) -> Option<DocumentInfo> {
        self.fixture.document.clone()
    }

    fn builtin_source(&self, builtin: Builtin) -> Result<String, HostError> {
        match self.fixture.builtins.get(builtin.key()) {
            Some(BuiltinFixture::Source(source)) => Ok(source.clone()),
            Some(BuiltinFixture::Error(message)) => Err(HostError::Rejected(message.clone())),
            None => Ok(builtin.native_source().to_string()),
        }
    }

    fn dom(&self) -> &dyn DomHost {
        self
    }

    fn supports_peer_connection(&self) -> bool {
        self.fixture.rtc.is_some()
    }

    fn connect_peer(&self, _config: &RtcConfig) -> Result<Box<dyn PeerConnection>, HostError> {
        let rtc = self
            .fixture
            .rtc
            .clone()
            .ok_or(HostError::Unavailable("RTCPeerConnection"))?;
        Ok(Box::new(FixturePeer {
            fixture: rtc,
            channels: Vec::new(),
        }))
    }
}

#[derive(Debug, Default)]
struct PipelineState {
    vertex_compiled: bool,
    fragment_compiled: bool,
    linked: bool,
    buffer_uploaded: bool,
    attribute_bound: bool,
}

struct FixtureGl {
    fixture: WebglFixture,
    pipeline: PipelineState,
}

impl GlContext for FixtureGl {
    fn parameter(&self, parameter: GlParameter) -> Result<GlValue, HostError> {
        self.fixture
            .parameters
            .get(parameter.name())
            .cloned()
            .ok_or(HostError::MissingParameter(parameter.name()))
    }

    fn supported_extensions(&self) -> Vec<String> {
        self.fixture.extensions.clone()
    }

    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<(), HostError> {
        if let Some(message) = self.fixture.rendering_error.as_ref() {
            return Err(HostError::Rejected(message.clone()));
        }
        match stage {
            ShaderStage::Vertex => self.pipeline.vertex_compiled = true,
            ShaderStage::Fragment => self.pipeline.fragment_compiled = true,
        }
        Ok(())
    }

    fn link_program(&mut self) -> Result<(), HostError> {
        if !self.pipeline.vertex_compiled || !self.pipeline.fragment_compiled {
            return Err(HostError::Rejected(
                "cannot link program without compiled shaders".into(),
            ));
        }
        self.pipeline.linked = true;
        Ok(())
    }

    fn upload_vertices(&mut self, vertices: &[f32]) -> Result<(), HostError> {
        if vertices.is_empty() || vertices.len() % 2 != 0 {
            return Err(HostError::Rejected("invalid vertex buffer".into()));
        }
        self.pipeline.buffer_uploaded = true;
        Ok(())
    }

    fn bind_attribute(&mut self, name: &str) -> Result<(), HostError> {
        if !self.pipeline.linked {
            return Err(HostError::Rejected(format!(
                "no linked program for attribute {name}"
            )));
        }
        self.pipeline.attribute_bound = true;
        Ok(())
    }

    fn clear_and_draw(&mut self, vertex_count: u32) -> Result<(), HostError> {
        if !self.pipeline.buffer_uploaded || !self.pipeline.attribute_bound {
            return Err(HostError::Rejected("draw call without bound buffer".into()));
        }
        if vertex_count == 0 {
            return Err(HostError::Rejected("empty draw call".into()));
        }
        Ok(())
    }
}

struct FixtureGl2 {
    fixture: Webgl2Fixture,
}

impl Gl2Context for FixtureGl2 {
    fn parameter(&self, parameter: Gl2Parameter) -> Result<GlValue, HostError> {
        self.fixture
            .parameters
            .get(parameter.name())
            .cloned()
            .ok_or(HostError::MissingParameter(parameter.name()))
    }
}

struct FixturePeer {
    fixture: RtcFixture,
    channels: Vec<String>,
}

#[async_trait]
impl PeerConnection for FixturePeer {
    fn create_data_channel(&mut self, label: &str) {
        self.channels.push(label.to_string());
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, HostError> {
        if let Some(message) = self.fixture.offer_error.as_ref() {
            return Err(HostError::Rejected(message.clone()));
        }
        Ok(SessionDescription {
            sdp: "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n".into(),
        })
    }

    async fn set_local_description(
        &mut self,
        _description: SessionDescription,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn candidate_events(&mut self) -> BoxStream<'static, CandidateEvent> {
        let events: Vec<CandidateEvent> = self
            .fixture
            .candidates
            .drain(..)
            .map(|c| CandidateEvent {
                candidate: c.candidate,
            })
            .collect();
        futures::stream::iter(events).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_lifecycle() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let style = ElementStyle {
            font_family: Some("monospace".into()),
            font_size_px: Some(72),
            offscreen: true,
            ..Default::default()
        };
        let id = host.create_element(&style, "mmmmmmmmmmlli").unwrap();
        assert_eq!(host.live_elements(), 1);
        let metrics = host.measure(id).unwrap();
        assert_eq!(
            metrics,
            BoxMetrics {
                width: 1030,
                height: 84
            }
        );
        host.remove_element(id);
        assert_eq!(host.live_elements(), 0);
        assert!(matches!(
            host.measure(id),
            Err(HostError::UnknownElement(_))
        ));
        host.remove_element(id);
        assert_eq!(host.double_removals(), 1);
    }

    #[test]
    fn test_font_stack_resolution() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let arial = ElementStyle {
            font_family: Some("\"Arial\", monospace".into()),
            font_size_px: Some(72),
            offscreen: true,
            ..Default::default()
        };
        let id = host.create_element(&arial, "mmmmmmmmmmlli").unwrap();
        assert_eq!(host.measure(id).unwrap().width, 468);
        host.remove_element(id);

        // Unknown faces fall back to the monospace baseline.
        let unknown = ElementStyle {
            font_family: Some("\"Helvetica\", monospace".into()),
            font_size_px: Some(72),
            offscreen: true,
            ..Default::default()
        };
        let id = host.create_element(&unknown, "mmmmmmmmmmlli").unwrap();
        assert_eq!(host.measure(id).unwrap().width, 1030);
        host.remove_element(id);
    }

    #[test]
    fn test_fixed_size_elements_measure_border_box() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let style = ElementStyle {
            font_family: Some("Arial".into()),
            font_size_px: Some(16),
            width_px: Some(200),
            height_px: Some(50),
            padding_px: Some(10),
            border_px: Some(1),
            offscreen: true,
        };
        let id = host.create_element(&style, "Test element").unwrap();
        let metrics = host.measure(id).unwrap();
        assert_eq!(metrics.width, 222);
        assert_eq!(metrics.height, 72);
        host.remove_element(id);
    }

    #[test]
    fn test_gl_pipeline_order_enforced() {
        let host = FixtureHost::new(HostFixture::chrome_like());
        let canvas = host.create_canvas(1, 1).unwrap();
        let mut gl = host.webgl_context(canvas).unwrap();
        assert!(gl.link_program().is_err());
        gl.compile_shader(ShaderStage::Vertex, "void main() {}").unwrap();
        gl.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap();
        gl.link_program().unwrap();
        gl.upload_vertices(&[0.0, 0.5, -0.5, -0.5, 0.5, -0.5]).unwrap();
        gl.bind_attribute("a_position").unwrap();
        gl.clear_and_draw(3).unwrap();
        host.remove_element(canvas);
    }

    #[test]
    fn test_scripted_rendering_error() {
        let mut fixture = HostFixture::chrome_like();
        fixture.webgl.as_mut().unwrap().rendering_error = Some("shader rejected".into());
        let host = FixtureHost::new(fixture);
        let canvas = host.create_canvas(1, 1).unwrap();
        let mut gl = host.webgl_context(canvas).unwrap();
        let err = gl
            .compile_shader(ShaderStage::Vertex, "void main() {}")
            .unwrap_err();
        assert_eq!(err.to_string(), "shader rejected");
        host.remove_element(canvas);
    }

    #[test]
    fn test_scripted_element_failure() {
        let mut fixture = HostFixture::chrome_like();
        fixture.element_error = Some("dom is sealed".into());
        let host = FixtureHost::new(fixture);
        let style = ElementStyle::default();
        let err = host.create_element(&style, "x").unwrap_err();
        assert_eq!(err.to_string(), "dom is sealed");
        let err = host.create_canvas(1, 1).unwrap_err();
        assert_eq!(err.to_string(), "dom is sealed");
        assert_eq!(host.live_elements(), 0);
    }

    #[test]
    fn test_builtin_defaults_and_overrides() {
        let mut fixture = HostFixture::default();
        fixture.builtins.insert(
            "String.prototype.match".into(),
            BuiltinFixture::Error("denied".into()),
        );
        let host = FixtureHost::new(fixture);
        assert_eq!(
            host.builtin_source(Builtin::FunctionPrototypeToString)
                .unwrap(),
            "function toString() { [native code] }"
        );
        let err = host
            .builtin_source(Builtin::StringPrototypeMatch)
            .unwrap_err();
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn test_jitter_is_seeded_and_optional() {
        let mut fixture = HostFixture::chrome_like();
        fixture.fonts.jitter = Some(JitterFixture {
            amplitude_px: 3,
            probability: 1.0,
            seed: 42,
        });
        let host_a = FixtureHost::new(fixture.clone());
        let host_b = FixtureHost::new(fixture);
        let style = ElementStyle {
            width_px: Some(200),
            height_px: Some(50),
            offscreen: true,
            ..Default::default()
        };
        let a = host_a.create_element(&style, "x").unwrap();
        let b = host_b.create_element(&style, "x").unwrap();
        // Same seed, same perturbation sequence.
        assert_eq!(host_a.measure(a).unwrap(), host_b.measure(b).unwrap());
        host_a.remove_element(a);
        host_b.remove_element(b);
    }

    #[test]
    fn test_fixture_toml_round_trip() {
        let fixture = HostFixture::chrome_like();
        let text = toml::to_string(&fixture).unwrap();
        let parsed: HostFixture = toml::from_str(&text).unwrap();
        assert_eq!(
            parsed.navigator.as_ref().unwrap().vendor.as_deref(),
            Some("Google Inc.")
        );
        assert!(parsed.webgl.is_some());
        assert_eq!(parsed.rtc.unwrap().candidates.len(), 2);
    }
}
