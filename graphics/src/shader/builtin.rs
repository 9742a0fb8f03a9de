//! Built-in shader sources.

/// Cache key of the built-in default shader.
pub const DEFAULT_SHADER_KEY: &str = "Default";

/// Unlit shader: vertex color times the diffuse map, tinted by the model
/// block. Consumes `POSITION`, `COLOR` and `TEXCOORD`.
///
/// Its uniform blocks mirror [`CameraUniform`](crate::uniforms::CameraUniform)
/// and [`ModelUniform`](crate::uniforms::ModelUniform).
pub const DEFAULT_SHADER_SOURCE: &str = r#"
struct Camera {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view_projection: mat4x4<f32>,
    position: vec4<f32>,
};

struct Model {
    model: mat4x4<f32>,
    tint: vec4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> model: Model;

@group(1) @binding(0) var diffuse_texture: texture_2d<f32>;
@group(1) @binding(1) var diffuse_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_projection * model.model * vec4<f32>(in.position, 1.0);
    out.color = in.color * model.tint;
    out.uv = in.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(diffuse_texture, diffuse_sampler, in.uv) * in.color;
}
"#;
