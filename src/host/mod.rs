//! Host environment abstraction
//!
//! Probes never touch a real browser directly. Everything they read comes
//! through the narrow traits in this module, so the aggregator and the ICE
//! prober can run against the bundled fixture host or any test double.

pub mod fixture;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle for a host-created element.
pub type ElementId = u64;

/// Errors surfaced by host reads and operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The host rejected an operation with its own message.
    #[error("{0}")]
    Rejected(String),

    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("parameter {0} is not available")]
    MissingParameter(&'static str),

    #[error("{0} is not available in this host")]
    Unavailable(&'static str),
}

/// Narrow read interface over the host's navigator surface
pub trait NavigatorHost {
    fn platform(&self) -> Option<String>;
    fn user_agent(&self) -> Option<String>;
    fn app_version(&self) -> Option<String>;
    fn oscpu(&self) -> Option<String>;
    fn vendor(&self) -> Option<String>;
    fn hardware_concurrency(&self) -> Option<u32>;
    fn device_memory(&self) -> Option<f64>;
    fn max_touch_points(&self) -> Option<u32>;
    fn webdriver(&self) -> Option<bool>;
    fn languages(&self) -> Vec<String>;
    /// Plugin names, already flattened from the host's enumerable collection.
    fn plugins(&self) -> Vec<String>;
    /// MIME type strings, already flattened.
    fn mime_types(&self) -> Vec<String>;
    fn do_not_track(&self) -> Option<String>;
    fn cookie_enabled(&self) -> Option<bool>;
    fn has_media_devices(&self) -> bool;
    fn has_bluetooth(&self) -> bool;
    fn has_credentials(&self) -> bool;
    fn has_geolocation(&self) -> bool;
    fn has_permissions(&self) -> bool;
    fn user_agent_data(&self) -> Option<UserAgentData>;
}

/// Reduced userAgentData surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAgentData {
    pub brands: Vec<UserAgentBrand>,
    pub mobile: bool,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAgentBrand {
    pub brand: String,
    pub version: String,
}

/// The host's `chrome` object, when present
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChromeInfo {
    pub app: Option<ChromeAppInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChromeAppInfo {
    pub is_installed: Option<bool>,
    pub install_state: Option<String>,
    pub running_state: Option<String>,
}

/// Session history surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryInfo {
    pub length: u32,
    pub scroll_restoration: String,
}

/// Screen geometry and color depth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: i64,
    pub height: i64,
    pub avail_width: i64,
    pub avail_height: i64,
    pub color_depth: u32,
    pub pixel_depth: u32,
}

/// Window geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowInfo {
    pub outer_width: i64,
    pub outer_height: i64,
    pub inner_width: i64,
    pub inner_height: i64,
    pub screen_x: i64,
    pub screen_y: i64,
    pub screen_left: i64,
    pub screen_top: i64,
    pub device_pixel_ratio: f64,
}

/// Document surface
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DocumentInfo {
    pub client_width: Option<i64>,
    pub client_height: Option<i64>,
    pub cookie: Option<String>,
}

/// Built-in functions whose source text is stringified to detect tampering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    StringPrototypeMatch,
    FunctionPrototypeToString,
}

impl Builtin {
    /// All probed builtins, in output order
    pub fn all() -> &'static [Builtin] {
        &[Builtin::StringPrototypeMatch, Builtin::FunctionPrototypeToString]
    }

    /// The property path used as the output key
    pub fn key(&self) -> &'static str {
        match self {
            Builtin::StringPrototypeMatch => "String.prototype.match",
            Builtin::FunctionPrototypeToString => "Function.prototype.toString",
        }
    }

    /// Source text of an untampered implementation
    pub fn native_source(&self) -> &'static str {
        match self {
            Builtin::StringPrototypeMatch => "function match() { [native code] }",
            Builtin::FunctionPrototypeToString => "function toString() { [native code] }",
        }
    }
}

/// Style subset the measurement probes care about
#[derive(Debug, Clone, Default)]
pub struct ElementStyle {
    pub font_family: Option<String>,
    pub font_size_px: Option<u32>,
    pub width_px: Option<i64>,
    pub height_px: Option<i64>,
    pub padding_px: Option<i64>,
    pub border_px: Option<i64>,
    /// Absolutely positioned off-viewport and hidden.
    pub offscreen: bool,
}

/// Measured element box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxMetrics {
    pub width: i64,
    pub height: i64,
}

/// Element creation, measurement and WebGL context acquisition
pub trait DomHost {
    fn create_element(&self, style: &ElementStyle, text: &str) -> Result<ElementId, HostError>;
    fn measure(&self, element: ElementId) -> Result<BoxMetrics, HostError>;
    fn remove_element(&self, element: ElementId);
    fn create_canvas(&self, width: u32, height: u32) -> Result<ElementId, HostError>;
    /// WebGL1 context (including the experimental fallback the host may use).
    /// `None` means context creation failed.
    fn webgl_context(&self, canvas: ElementId) -> Option<Box<dyn GlContext>>;
    /// WebGL2 context on the same canvas, if the host supports one.
    fn webgl2_context(&self, canvas: ElementId) -> Option<Box<dyn Gl2Context>>;
}

/// Element guard: removes the element on every exit path, including errors.
pub struct ScopedElement<'a> {
    dom: &'a dyn DomHost,
    id: ElementId,
}

impl<'a> ScopedElement<'a> {
    pub fn create(
        dom: &'a dyn DomHost,
        style: &ElementStyle,
        text: &str,
    ) -> Result<Self, HostError> {
        let id = dom.create_element(style, text)?;
        Ok(Self { dom, id })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn measure(&self) -> Result<BoxMetrics, HostError> {
        self.dom.measure(self.id)
    }
}

impl Drop for ScopedElement<'_> {
    fn drop(&mut self) {
        self.dom.remove_element(self.id);
    }
}

/// Canvas guard: the canvas is detached exactly once regardless of which
/// exit path the WebGL probe takes.
pub struct ScopedCanvas<'a> {
    dom: &'a dyn DomHost,
    id: ElementId,
}

impl<'a> ScopedCanvas<'a> {
    pub fn create(dom: &'a dyn DomHost, width: u32, height: u32) -> Result<Self, HostError> {
        let id = dom.create_canvas(width, height)?;
        Ok(Self { dom, id })
    }

    pub fn webgl(&self) -> Option<Box<dyn GlContext>> {
        self.dom.webgl_context(self.id)
    }

    pub fn webgl2(&self) -> Option<Box<dyn Gl2Context>> {
        self.dom.webgl2_context(self.id)
    }
}

impl Drop for ScopedCanvas<'_> {
    fn drop(&mut self) {
        self.dom.remove_element(self.id);
    }
}

/// A parameter value read from a GL context.
///
/// Typed-array-valued parameters surface as plain numeric lists so results
/// serialize directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlValue {
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl GlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GlValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GlValue::Int(v) => Some(*v as f64),
            GlValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64_list(&self) -> Option<Vec<i64>> {
        match self {
            GlValue::IntList(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            GlValue::IntList(v) => Some(v.iter().map(|x| *x as f64).collect()),
            GlValue::FloatList(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// WebGL1 parameters read by the capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlParameter {
    Version,
    ShadingLanguageVersion,
    Vendor,
    Renderer,
    MaxTextureSize,
    MaxVertexAttribs,
    MaxVertexUniformVectors,
    MaxFragmentUniformVectors,
    MaxVaryingVectors,
    MaxRenderbufferSize,
    MaxViewportDims,
    AliasedLineWidthRange,
    AliasedPointSizeRange,
    MaxCubeMapTextureSize,
    MaxCombinedTextureImageUnits,
    MaxTextureImageUnits,
    MaxVertexTextureImageUnits,
    DepthBits,
    StencilBits,
    RedBits,
    GreenBits,
    BlueBits,
    AlphaBits,
    SubpixelBits,
}

impl GlParameter {
    pub fn name(&self) -> &'static str {
        match self {
            GlParameter::Version => "version",
            GlParameter::ShadingLanguageVersion => "shading_language_version",
            GlParameter::Vendor => "vendor",
            GlParameter::Renderer => "renderer",
            GlParameter::MaxTextureSize => "max_texture_size",
            GlParameter::MaxVertexAttribs => "max_vertex_attribs",
            GlParameter::MaxVertexUniformVectors => "max_vertex_uniform_vectors",
            GlParameter::MaxFragmentUniformVectors => "max_fragment_uniform_vectors",
            GlParameter::MaxVaryingVectors => "max_varying_vectors",
            GlParameter::MaxRenderbufferSize => "max_renderbuffer_size",
            GlParameter::MaxViewportDims => "max_viewport_dims",
            GlParameter::AliasedLineWidthRange => "aliased_line_width_range",
            GlParameter::AliasedPointSizeRange => "aliased_point_size_range",
            GlParameter::MaxCubeMapTextureSize => "max_cube_map_texture_size",
            GlParameter::MaxCombinedTextureImageUnits => "max_combined_texture_image_units",
            GlParameter::MaxTextureImageUnits => "max_texture_image_units",
            GlParameter::MaxVertexTextureImageUnits => "max_vertex_texture_image_units",
            GlParameter::DepthBits => "depth_bits",
            GlParameter::StencilBits => "stencil_bits",
            GlParameter::RedBits => "red_bits",
            GlParameter::GreenBits => "green_bits",
            GlParameter::BlueBits => "blue_bits",
            GlParameter::AlphaBits => "alpha_bits",
            GlParameter::SubpixelBits => "subpixel_bits",
        }
    }
}

/// WebGL2-only parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gl2Parameter {
    Version,
    ShadingLanguageVersion,
    Max3dTextureSize,
    MaxArrayTextureLayers,
    MaxColorAttachments,
    MaxDrawBuffers,
    MaxElementIndex,
    MaxElementsIndices,
    MaxElementsVertices,
    MaxFragmentInputComponents,
    MaxFragmentUniformBlocks,
    MaxFragmentUniformComponents,
    MaxSamples,
    MaxTextureLodBias,
    MaxTransformFeedbackInterleavedComponents,
    MaxTransformFeedbackSeparateAttribs,
    MaxTransformFeedbackSeparateComponents,
    MaxUniformBlockSize,
    MaxUniformBufferBindings,
    MaxVaryingComponents,
    MaxVertexOutputComponents,
    MaxVertexUniformBlocks,
    MaxVertexUniformComponents,
    MinProgramTexelOffset,
    MaxProgramTexelOffset,
}

impl Gl2Parameter {
    pub fn name(&self) -> &'static str {
        match self {
            Gl2Parameter::Version => "version",
            Gl2Parameter::ShadingLanguageVersion => "shading_language_version",
            Gl2Parameter::Max3dTextureSize => "max_3d_texture_size",
            Gl2Parameter::MaxArrayTextureLayers => "max_array_texture_layers",
            Gl2Parameter::MaxColorAttachments => "max_color_attachments",
            Gl2Parameter::MaxDrawBuffers => "max_draw_buffers",
            Gl2Parameter::MaxElementIndex => "max_element_index",
            Gl2Parameter::MaxElementsIndices => "max_elements_indices",
            Gl2Parameter::MaxElementsVertices => "max_elements_vertices",
            Gl2Parameter::MaxFragmentInputComponents => "max_fragment_input_components",
            Gl2Parameter::MaxFragmentUniformBlocks => "max_fragment_uniform_blocks",
            Gl2Parameter::MaxFragmentUniformComponents => "max_fragment_uniform_components",
            Gl2Parameter::MaxSamples => "max_samples",
            Gl2Parameter::MaxTextureLodBias => "max_texture_lod_bias",
            Gl2Parameter::MaxTransformFeedbackInterleavedComponents => {
                "max_transform_feedback_interleaved_components"
            }
            Gl2Parameter::MaxTransformFeedbackSeparateAttribs => {
                "max_transform_feedback_separate_attribs"
            }
            Gl2Parameter::MaxTransformFeedbackSeparateComponents => {
                "max_transform_feedback_separate_components"
            }
            Gl2Parameter::MaxUniformBlockSize => "max_uniform_block_size",
            Gl2Parameter::MaxUniformBufferBindings => "max_uniform_buffer_bindings",
            Gl2Parameter::MaxVaryingComponents => "max_varying_components",
            Gl2Parameter::MaxVertexOutputComponents => "max_vertex_output_components",
            Gl2Parameter::MaxVertexUniformBlocks => "max_vertex_uniform_blocks",
            Gl2Parameter::MaxVertexUniformComponents => "max_vertex_uniform_components",
            Gl2Parameter::MinProgramTexelOffset => "min_program_texel_offset",
            Gl2Parameter::MaxProgramTexelOffset => "max_program_texel_offset",
        }
    }
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// WebGL1 context: parameter reads plus the minimal pipeline surface the
/// rendering self-test drives.
pub trait GlContext {
    fn parameter(&self, parameter: GlParameter) -> Result<GlValue, HostError>;
    fn supported_extensions(&self) -> Vec<String>;
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<(), HostError>;
    fn link_program(&mut self) -> Result<(), HostError>;
    fn upload_vertices(&mut self, vertices: &[f32]) -> Result<(), HostError>;
    fn bind_attribute(&mut self, name: &str) -> Result<(), HostError>;
    fn clear_and_draw(&mut self, vertex_count: u32) -> Result<(), HostError>;
}

/// WebGL2 context: parameter reads only
pub trait Gl2Context {
    fn parameter(&self, parameter: Gl2Parameter) -> Result<GlValue, HostError>;
}

/// Peer connection configuration
#[derive(Debug, Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

/// A local session description produced by offer creation
#[derive(Debug, Clone)]
pub struct SessionDescription {
    pub sdp: String,
}

/// One ICE candidate event. A `None` candidate means gathering completed
/// with nothing further to report.
#[derive(Debug, Clone)]
pub struct CandidateEvent {
    pub candidate: Option<String>,
}

/// Peer connection surface driven by the ICE prober
#[async_trait]
pub trait PeerConnection: Send {
    /// Created solely to force ICE gathering to begin.
    fn create_data_channel(&mut self, label: &str);
    async fn create_offer(&mut self) -> Result<SessionDescription, HostError>;
    async fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<(), HostError>;
    /// Candidate events in arrival order. The prober consumes this
    /// single-shot: the first terminal event wins, the rest are ignored.
    fn candidate_events(&mut self) -> BoxStream<'static, CandidateEvent>;
}

/// The injected host environment. Each probe reads only the narrow slice
/// it needs; test doubles implement the same surface.
pub trait HostEnvironment: Send + Sync {
    fn navigator(&self) -> Option<&dyn NavigatorHost>;
    fn chrome(&self) -> Option<ChromeInfo>;
    fn history(&self) -> Option<HistoryInfo>;
    fn screen(&self) -> Option<ScreenInfo>;
    fn window_geometry(&self) -> Option<WindowInfo>;
    fn document(&self) -> Option<DocumentInfo>;
    fn builtin_source(&self, builtin: Builtin) -> Result<String, HostError>;
    fn dom(&self) -> &dyn DomHost;
    fn supports_peer_connection(&self) -> bool;
    fn connect_peer(&self, config: &RtcConfig) -> Result<Box<dyn PeerConnection>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys() {
        assert_eq!(
            Builtin::StringPrototypeMatch.key(),
            "String.prototype.match"
        );
        assert_eq!(
            Builtin::FunctionPrototypeToString.key(),
            "Function.prototype.toString"
        );
        assert_eq!(Builtin::all().len(), 2);
    }

    #[test]
    fn test_gl_value_conversions() {
        assert_eq!(GlValue::Int(16384).as_i64(), Some(16384));
        assert_eq!(GlValue::Int(2).as_f64(), Some(2.0));
        assert_eq!(GlValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(GlValue::Str("WebGL 1.0".into()).as_str(), Some("WebGL 1.0"));
        assert_eq!(
            GlValue::IntList(vec![32767, 32767]).as_i64_list(),
            Some(vec![32767, 32767])
        );
        assert_eq!(
            GlValue::IntList(vec![1, 1024]).as_f64_list(),
            Some(vec![1.0, 1024.0])
        );
        assert_eq!(GlValue::Str("x".into()).as_i64(), None);
    }

    #[test]
    fn test_gl_value_untagged_deserialize() {
        let v: GlValue = serde_json::from_str("16384").unwrap();
        assert_eq!(v, GlValue::Int(16384));
        let v: GlValue = serde_json::from_str("2.0").unwrap();
        assert_eq!(v, GlValue::Float(2.0));
        let v: GlValue = serde_json::from_str("\"WebKit\"").unwrap();
        assert_eq!(v, GlValue::Str("WebKit".into()));
        let v: GlValue = serde_json::from_str("[1.0, 1024.5]").unwrap();
        assert_eq!(v, GlValue::FloatList(vec![1.0, 1024.5]));
    }

    #[test]
    fn test_parameter_names() {
        assert_eq!(GlParameter::MaxTextureSize.name(), "max_texture_size");
        assert_eq!(
            Gl2Parameter::MaxProgramTexelOffset.name(),
            "max_program_texel_offset"
        );
    }
}
