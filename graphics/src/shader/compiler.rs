//! WGSL validation and reflection through naga.

use naga::{AddressSpace, Binding, ImageClass, ImageDimension, ScalarKind, ShaderStage, TypeInner};

use tessera_core::profiling::profile_scope;

use crate::backend::{TEXTURE_SLOT_COUNT, UNIFORM_SLOT_COUNT};
use crate::error::GraphicsError;

/// Bind group holding uniform slots.
pub const UNIFORM_GROUP: u32 = 0;

/// Bind group holding texture/sampler pairs.
pub const TEXTURE_GROUP: u32 = 1;

/// What the context needs to know about a validated shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    /// Name of the vertex entry point.
    pub vertex_entry: String,
    /// Name of the fragment entry point.
    pub fragment_entry: String,
    /// Input locations the vertex stage reads, ascending.
    pub vertex_inputs: Vec<u32>,
}

/// Parse, validate and reflect a WGSL module.
///
/// The module must contain one vertex and one fragment entry point, and its
/// resources must follow the binding convention: uniforms in group 0
/// (bindings 0-7), 2D float textures at even and samplers at odd bindings in
/// group 1 (bindings 0-15).
pub fn reflect_wgsl(name: &str, source: &str) -> Result<ShaderReflection, GraphicsError> {
    profile_scope!("reflect_wgsl");

    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        GraphicsError::ShaderCompilationFailed(format!(
            "{name}: parse error\n{}",
            e.emit_to_string(source)
        ))
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator.validate(&module).map_err(|e| {
        GraphicsError::ShaderCompilationFailed(format!("{name}: validation error: {e}"))
    })?;

    let vertex = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Vertex)
        .ok_or_else(|| {
            GraphicsError::ShaderCompilationFailed(format!("{name}: no vertex entry point"))
        })?;
    let fragment = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Fragment)
        .ok_or_else(|| {
            GraphicsError::ShaderCompilationFailed(format!("{name}: no fragment entry point"))
        })?;

    let mut vertex_inputs = Vec::new();
    for argument in &vertex.function.arguments {
        match &argument.binding {
            Some(Binding::Location { location, .. }) => vertex_inputs.push(*location),
            Some(Binding::BuiltIn(_)) => {}
            None => {
                if let TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    vertex_inputs.extend(members.iter().filter_map(|member| {
                        match member.binding {
                            Some(Binding::Location { location, .. }) => Some(location),
                            _ => None,
                        }
                    }));
                }
            }
        }
    }
    vertex_inputs.sort_unstable();
    vertex_inputs.dedup();

    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else {
            continue;
        };
        let label = global.name.as_deref().unwrap_or("<unnamed>");
        let inner = &module.types[global.ty].inner;
        let fits = match binding.group {
            UNIFORM_GROUP => {
                (binding.binding as usize) < UNIFORM_SLOT_COUNT
                    && global.space == AddressSpace::Uniform
            }
            TEXTURE_GROUP if (binding.binding as usize) < TEXTURE_SLOT_COUNT * 2 => {
                if binding.binding % 2 == 0 {
                    matches!(
                        inner,
                        TypeInner::Image {
                            dim: ImageDimension::D2,
                            arrayed: false,
                            class: ImageClass::Sampled {
                                kind: ScalarKind::Float,
                                multi: false,
                            },
                        }
                    )
                } else {
                    matches!(inner, TypeInner::Sampler { comparison: false })
                }
            }
            _ => false,
        };
        if !fits {
            return Err(GraphicsError::ShaderCompilationFailed(format!(
                "{name}: resource '{label}' at @group({}) @binding({}) does not match the binding convention",
                binding.group, binding.binding
            )));
        }
    }

    log::debug!(
        "Reflected shader {}: {} / {}, vertex inputs {:?}",
        name,
        vertex.name,
        fragment.name,
        vertex_inputs
    );

    Ok(ShaderReflection {
        vertex_entry: vertex.name.clone(),
        fragment_entry: fragment.name.clone(),
        vertex_inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::builtin::DEFAULT_SHADER_SOURCE;

    #[test]
    fn test_reflect_default_shader() {
        let reflection = reflect_wgsl("Default", DEFAULT_SHADER_SOURCE).unwrap();
        assert_eq!(reflection.vertex_entry, "vs_main");
        assert_eq!(reflection.fragment_entry, "fs_main");
        assert_eq!(reflection.vertex_inputs, vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = reflect_wgsl("broken", "fn vs_main( {").unwrap_err();
        match err {
            GraphicsError::ShaderCompilationFailed(msg) => assert!(msg.starts_with("broken")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fragment_stage() {
        let source = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
"#;
        let err = reflect_wgsl("vertex_only", source).unwrap_err();
        assert!(err.to_string().contains("no fragment entry point"));
    }

    #[test]
    fn test_argument_locations() {
        let source = r#"
@vertex
fn vs_main(
    @location(3) normal: vec3<f32>,
    @builtin(vertex_index) index: u32,
    @location(0) position: vec3<f32>,
) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position + normal * f32(index), 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let reflection = reflect_wgsl("args", source).unwrap();
        assert_eq!(reflection.vertex_inputs, vec![0, 3]);
    }

    #[test]
    fn test_binding_convention_enforced() {
        let source = r#"
@group(2) @binding(0) var<uniform> extra: vec4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0) * extra;
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let err = reflect_wgsl("bad_group", source).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("binding convention"));
    }
}
