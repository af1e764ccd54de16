//! WebGL capability probe
//!
//! Acquires a context on a throwaway 1x1 canvas, reads the parameter and
//! extension tables, layers WebGL2 parameters on top when a second context
//! is available, and finishes with a minimal draw-pipeline self-test. The
//! canvas is detached on every exit path.

use serde::Serialize;
use tracing::debug;

use crate::host::{
    Gl2Context, Gl2Parameter, GlContext, GlParameter, GlValue, HostEnvironment, ScopedCanvas,
    ShaderStage,
};

const VERTEX_SHADER: &str = "\
attribute vec2 position;
void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}";

const FRAGMENT_SHADER: &str = "\
precision mediump float;
void main() {
    gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0);
}";

const TRIANGLE: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];

/// WebGL sub-record. Context acquisition failure collapses to the
/// two-field unavailable shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WebglProbeResult {
    Unavailable(WebglUnavailable),
    Available(Box<WebglReport>),
}

#[derive(Debug, Clone, Serialize)]
pub struct WebglUnavailable {
    pub webgl_available: bool,
    pub error: String,
}

/// Full capability report of an acquired context. Parameters a host fails
/// to report are omitted rather than failing the probe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebglReport {
    pub webgl_available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shading_language_version: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_texture_size: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_attribs: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_uniform_vectors: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fragment_uniform_vectors: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_varying_vectors: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_renderbuffer_size: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_viewport_dims: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliased_line_width_range: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliased_point_size_range: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cube_map_texture_size: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_combined_texture_image_units: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_texture_image_units: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_texture_image_units: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stencil_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_bits: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpixel_bits: Option<GlValue>,

    pub supported_extensions: Vec<String>,

    pub webgl2_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webgl2_version: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webgl2_shading_language_version: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_3d_texture_size: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_array_texture_layers: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_color_attachments: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_draw_buffers: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_element_index: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_elements_indices: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_elements_vertices: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fragment_input_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fragment_uniform_blocks: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fragment_uniform_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_samples: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_texture_lod_bias: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transform_feedback_interleaved_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transform_feedback_separate_attribs: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transform_feedback_separate_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uniform_block_size: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uniform_buffer_bindings: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_varying_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_output_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_uniform_blocks: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_vertex_uniform_components: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_program_texel_offset: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_program_texel_offset: Option<GlValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webgl2_error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering_test: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering_error: Option<String>,
}

/// Collect the WebGL sub-record.
pub fn probe(host: &dyn HostEnvironment) -> WebglProbeResult {
    let dom = host.dom();
    let canvas = match ScopedCanvas::create(dom, 1, 1) {
        Ok(canvas) => canvas,
        Err(e) => {
            return WebglProbeResult::Unavailable(WebglUnavailable {
                webgl_available: false,
                error: e.to_string(),
            });
        }
    };

    let Some(mut gl) = canvas.webgl() else {
        return WebglProbeResult::Unavailable(WebglUnavailable {
            webgl_available: false,
            error: "WebGL not supported".to_string(),
        });
    };

    let mut report = Box::new(WebglReport {
        webgl_available: true,
        ..WebglReport::default()
    });

    fill_webgl1(&mut report, gl.as_ref());
    report.supported_extensions = gl.supported_extensions();

    match canvas.webgl2() {
        Some(gl2) => {
            report.webgl2_available = true;
            fill_webgl2(&mut report, gl2.as_ref());
        }
        None => {
            report.webgl2_available = false;
        }
    }

    match run_rendering_test(gl.as_mut()) {
        Ok(()) => report.rendering_test = Some("success".to_string()),
        Err(e) => {
            debug!("rendering self-test failed: {}", e);
            report.rendering_test = Some("failed".to_string());
            report.rendering_error = Some(e.to_string());
        }
    }

    WebglProbeResult::Available(report)
}

fn fill_webgl1(report: &mut WebglReport, gl: &dyn GlContext) {
    let read = |parameter: GlParameter| gl.parameter(parameter).ok();

    report.version = read(GlParameter::Version);
    report.shading_language_version = read(GlParameter::ShadingLanguageVersion);
    report.vendor = read(GlParameter::Vendor);
    report.renderer = read(GlParameter::Renderer);
    report.max_texture_size = read(GlParameter::MaxTextureSize);
    report.max_vertex_attribs = read(GlParameter::MaxVertexAttribs);
    report.max_vertex_uniform_vectors = read(GlParameter::MaxVertexUniformVectors);
    report.max_fragment_uniform_vectors = read(GlParameter::MaxFragmentUniformVectors);
    report.max_varying_vectors = read(GlParameter::MaxVaryingVectors);
    report.max_renderbuffer_size = read(GlParameter::MaxRenderbufferSize);
    report.max_viewport_dims = read(GlParameter::MaxViewportDims);
    report.aliased_line_width_range = read(GlParameter::AliasedLineWidthRange);
    report.aliased_point_size_range = read(GlParameter::AliasedPointSizeRange);
    report.max_cube_map_texture_size = read(GlParameter::MaxCubeMapTextureSize);
    report.max_combined_texture_image_units = read(GlParameter::MaxCombinedTextureImageUnits);
    report.max_texture_image_units = read(GlParameter::MaxTextureImageUnits);
    report.max_vertex_texture_image_units = read(GlParameter::MaxVertexTextureImageUnits);
    report.depth_bits = read(GlParameter::DepthBits);
    report.stencil_bits = read(GlParameter::StencilBits);
    report.red_bits = read(GlParameter::RedBits);
    report.green_bits = read(GlParameter::GreenBits);
    report.blue_bits = read(GlParameter::BlueBits);
    report.alpha_bits = read(GlParameter::AlphaBits);
    report.subpixel_bits = read(GlParameter::SubpixelBits);
}

/// WebGL2 parameter reads never fail the probe; the first failure is
/// recorded in `webgl2_error` and the remaining reads continue.
fn fill_webgl2(report: &mut WebglReport, gl2: &dyn Gl2Context) {
    let mut first_error: Option<String> = None;
    let mut read = |parameter: Gl2Parameter| match gl2.parameter(parameter) {
        Ok(value) => Some(value),
        Err(e) => {
            if first_error.is_none() {
                first_error = Some(format!("{}: {}", parameter.name(), e));
            }
            None
        }
    };

    report.webgl2_version = read(Gl2Parameter::Version);
    report.webgl2_shading_language_version = read(Gl2Parameter::ShadingLanguageVersion);
    report.max_3d_texture_size = read(Gl2Parameter::Max3dTextureSize);
    report.max_array_texture_layers = read(Gl2Parameter::MaxArrayTextureLayers);
    report.max_color_attachments = read(Gl2Parameter::MaxColorAttachments);
    report.max_draw_buffers = read(Gl2Parameter::MaxDrawBuffers);
    report.max_element_index = read(Gl2Parameter::MaxElementIndex);
    report.max_elements_indices = read(Gl2Parameter::MaxElementsIndices);
    report.max_elements_vertices = read(Gl2Parameter::MaxElementsVertices);
    report.max_fragment_input_components = read(Gl2Parameter::MaxFragmentInputComponents);
    report.max_fragment_uniform_blocks = read(Gl2Parameter::MaxFragmentUniformBlocks);
    report.max_fragment_uniform_components = read(Gl2Parameter::MaxFragmentUniformComponents);
    report.max_samples = read(Gl2Parameter::MaxSamples);
    report.max_texture_lod_bias = read(Gl2Parameter::MaxTextureLodBias);
    report.max_transform_feedback_interleaved_components =
        read(Gl2Parameter::MaxTransformFeedbackInterleavedComponents);
    report.max_transform_feedback_separate_attribs =
        read(Gl2Parameter::MaxTransformFeedbackSeparateAttribs);
    report.max_transform_feedback_separate_components =
        read(Gl2Parameter::MaxTransformFeedbackSeparateComponents);
    report.max_uniform_block_size = read(Gl2Parameter::MaxUniformBlockSize);
    report.max_uniform_buffer_bindings = read(Gl2Parameter::MaxUniformBufferBindings);
    report.max_varying_components = read(Gl2Parameter::MaxVaryingComponents);
    report.max_vertex_output_components = read(Gl2Parameter::MaxVertexOutputComponents);
    report.max_vertex_uniform_blocks = read(Gl2Parameter::MaxVertexUniformBlocks);
    report.max_vertex_uniform_components = read(Gl2Parameter::MaxVertexUniformComponents);
    report.min_program_texel_offset = read(Gl2Parameter::MinProgramTexelOffset);
    report.max_program_texel_offset = read(Gl2Parameter::MaxProgramTexelOffset);

    report.webgl2_error = first_error;
}

/// Compile, link and draw a single red triangle. Any pipeline failure is
/// the result, not a probe error.
fn run_rendering_test(gl: &mut dyn GlContext) -> Result<(), crate::host::HostError> {
    gl.compile_shader(ShaderStage::Vertex, VERTEX_SHADER)?;
    gl.compile_shader(ShaderStage::Fragment, FRAGMENT_SHADER)?;
    gl.link_program()?;
    gl.upload_vertices(&TRIANGLE)?;
    gl.bind_attribute("position")?;
    gl.clear_and_draw(3)?;
    Ok(())
}
