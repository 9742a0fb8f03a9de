//! Create-or-get resource loading.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_core::color::Rgba8;
use tessera_core::image::CpuImage;
use tessera_core::mesh::generators::generate_fullscreen_triangle;

use crate::backend::GpuBackend;
use crate::cache::{ResourceCache, parse_solid_color_key, solid_color_key};
use crate::error::GraphicsError;
use crate::font::BitmapFont;
use crate::materials::{Material, MaterialDefaults, MaterialDefinition, TextureSlot};
use crate::mesh::{CpuMesh, Mesh, VertexLayoutDescriptor};
use crate::resources::{Buffer, Sampler, ShaderResourceView, Texture};
use crate::shader::{DEFAULT_SHADER_KEY, Shader};
use crate::types::{BufferDescriptor, Residency};
use crate::uniforms::{CameraUniform, EffectSettings, LightingSettings, ModelUniform};

use super::binding::BindState;
use super::{ContextUniforms, GraphicsContext, Runtime};

/// Key of the material built from the default shader and engine defaults.
pub const DEFAULT_MATERIAL_KEY: &str = "Default";

fn uniform_buffer(
    backend: &Arc<dyn GpuBackend>,
    label: &str,
    bytes: &[u8],
) -> Result<Buffer, GraphicsError> {
    let descriptor =
        BufferDescriptor::uniform(bytes.len() as u64, Residency::Dynamic).with_label(label);
    Buffer::create(backend, descriptor, Some(bytes))
}

impl ContextUniforms {
    fn new(backend: &Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        Ok(Self {
            model: uniform_buffer(
                backend,
                "model uniforms",
                bytemuck::bytes_of(&ModelUniform::default()),
            )?,
            lighting: uniform_buffer(
                backend,
                "lighting uniforms",
                bytemuck::bytes_of(&LightingSettings::default().to_uniform()),
            )?,
            effect: uniform_buffer(
                backend,
                "effect uniforms",
                bytemuck::bytes_of(&EffectSettings::default().to_uniform()),
            )?,
            identity_camera: uniform_buffer(
                backend,
                "identity camera uniforms",
                bytemuck::bytes_of(&CameraUniform::identity()),
            )?,
        })
    }
}

impl Runtime {
    /// Build the engine defaults on `backend`.
    pub(super) fn new(backend: Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        let mut textures = ResourceCache::new();
        let mut solid = |color: Rgba8| -> Result<Arc<Texture>, GraphicsError> {
            textures.get_or_try_insert_with(&solid_color_key(color), || {
                Texture::solid_color(&backend, color)
            })
        };
        let mut slot_textures = Vec::with_capacity(TextureSlot::COUNT);
        for slot in TextureSlot::ALL {
            slot_textures.push(solid(slot.default_color())?.create_shader_resource_view()?);
        }
        let white = solid(Rgba8::WHITE)?;
        let slot_textures: [ShaderResourceView; TextureSlot::COUNT] = slot_textures
            .try_into()
            .map_err(|_| GraphicsError::Internal("material default slot count".into()))?;
        let defaults = MaterialDefaults::new(slot_textures, Sampler::linear_wrap(&backend)?);

        let mut shaders = ResourceCache::new();
        shaders.insert(
            DEFAULT_SHADER_KEY,
            Arc::new(Shader::builtin_default(&*backend)?),
        );

        let fullscreen = Mesh::from_cpu(
            &backend,
            &generate_fullscreen_triangle(),
            VertexLayoutDescriptor::pcu(),
        )?;
        let uniforms = ContextUniforms::new(&backend)?;

        Ok(Self {
            backend,
            textures,
            shaders,
            materials: ResourceCache::new(),
            meshes: ResourceCache::new(),
            fonts: ResourceCache::new(),
            definitions: HashMap::new(),
            white,
            defaults,
            uniforms,
            fullscreen,
            targets: None,
            back_buffer: None,
            bindings: BindState::default(),
        })
    }

    fn texture(&mut self, key: &str) -> Result<Arc<Texture>, GraphicsError> {
        if let Some(existing) = self.textures.get(key) {
            log::debug!("Cache hit: {}", key);
            return Ok(Arc::clone(existing));
        }

        let loaded = match parse_solid_color_key(key) {
            Some(Ok(color)) => Some(Texture::solid_color(&self.backend, color)),
            Some(Err(e)) => {
                log::warn!("Invalid solid color key '{}' ({}), using white", key, e);
                None
            }
            None => match CpuImage::from_file(key) {
                Ok(image) => Some(Texture::from_image(&self.backend, &image, key)),
                Err(e) => {
                    log::warn!("Failed to load texture '{}' ({}), using white", key, e);
                    None
                }
            },
        };
        let texture = match loaded {
            Some(created) => Arc::new(created.inspect_err(|e| {
                log::error!("Failed to create texture '{}': {}", key, e);
            })?),
            None => Arc::clone(&self.white),
        };
        log::trace!("Loaded texture '{}'", key);
        self.textures.insert(key, Arc::clone(&texture));
        Ok(texture)
    }

    fn shader_from_source(&mut self, key: &str, source: &str) -> Result<Arc<Shader>, GraphicsError> {
        let backend = &self.backend;
        self.shaders
            .get_or_try_insert_with(key, || Shader::compile(&**backend, key, source))
            .inspect_err(|e| log::error!("Failed to create shader '{}': {}", key, e))
    }

    fn shader(&mut self, key: &str) -> Result<Arc<Shader>, GraphicsError> {
        let backend = &self.backend;
        self.shaders
            .get_or_try_insert_with(key, || {
                if key == DEFAULT_SHADER_KEY {
                    return Shader::builtin_default(&**backend);
                }
                let source = std::fs::read_to_string(key).map_err(|e| {
                    GraphicsError::ShaderCompilationFailed(format!("{key}: {e}"))
                })?;
                Shader::compile(&**backend, key, &source)
            })
            .inspect_err(|e| log::error!("Failed to create shader '{}': {}", key, e))
    }

    fn definition(&self, key: &str) -> Result<MaterialDefinition, GraphicsError> {
        if let Some(definition) = self.definitions.get(key) {
            return Ok(definition.clone());
        }
        if key == DEFAULT_MATERIAL_KEY {
            return Ok(MaterialDefinition::new(DEFAULT_SHADER_KEY));
        }
        let text = std::fs::read_to_string(key)
            .map_err(|e| GraphicsError::MaterialLoadFailed(format!("{key}: {e}")))?;
        MaterialDefinition::parse(&text).map_err(|e| match e {
            GraphicsError::MaterialLoadFailed(msg) => {
                GraphicsError::MaterialLoadFailed(format!("{key}: {msg}"))
            }
            other => other,
        })
    }

    fn material(&mut self, key: &str) -> Result<Arc<Material>, GraphicsError> {
        if let Some(existing) = self.materials.get(key) {
            log::debug!("Cache hit: {}", key);
            return Ok(Arc::clone(existing));
        }
        log::debug!("Cache miss: {}", key);

        let definition = self.definition(key)?;
        let shader = self.shader(&definition.shader).map_err(|e| {
            GraphicsError::MaterialLoadFailed(format!("{key}: shader '{}': {e}", definition.shader))
        })?;
        let overrides = definition.state_overrides(&shader);
        let mut builder = Material::builder(key, shader).with_state_overrides(overrides);
        for slot in TextureSlot::ALL {
            if let Some(texture_key) = definition.texture(slot) {
                let view = self.texture(texture_key)?.create_shader_resource_view()?;
                builder = builder.with_texture(slot, view);
            }
        }

        let material = Arc::new(builder.build(&self.defaults));
        self.materials.insert(key, Arc::clone(&material));
        Ok(material)
    }

    fn bitmap_font(&mut self, key: &str) -> Result<Arc<BitmapFont>, GraphicsError> {
        if let Some(existing) = self.fonts.get(key) {
            log::debug!("Cache hit: {}", key);
            return Ok(Arc::clone(existing));
        }

        // The atlas lives in the texture cache under its path, shared with
        // `create_or_get_texture`. Unlike plain textures a missing atlas is
        // fatal.
        let path = format!("{key}.png");
        let backend = &self.backend;
        let texture = self.textures.get_or_try_insert_with(&path, || {
            let image = CpuImage::from_file(&path).map_err(|e| {
                GraphicsError::ResourceCreationFailed(format!("font {key}: {path}: {e}"))
            })?;
            Texture::from_image(backend, &image, path.as_str())
        })?;
        if Arc::ptr_eq(&texture, &self.white) {
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "font {key}: {path} is cached as the missing-texture fallback"
            )));
        }

        let view = texture.create_shader_resource_view()?;
        let font = Arc::new(BitmapFont::new(key, texture, view));
        self.fonts.insert(key, Arc::clone(&font));
        Ok(font)
    }
}

impl GraphicsContext {
    /// Get the texture cached under `key`, loading it on first use.
    ///
    /// `key` is a file path or a `#solid:r,g,b,a` color. A file that is
    /// missing or cannot be decoded is not an error: a warning is logged
    /// and the default white texture is cached under `key` instead.
    pub fn create_or_get_texture(&mut self, key: &str) -> Result<Arc<Texture>, GraphicsError> {
        self.started_mut("create_or_get_texture")?.texture(key)
    }

    /// Get the shader cached under `key`, compiling it on first use.
    ///
    /// `key` is a WGSL file path, or `"Default"` for the built-in shader.
    pub fn create_or_get_shader(&mut self, key: &str) -> Result<Arc<Shader>, GraphicsError> {
        self.started_mut("create_or_get_shader")?.shader(key)
    }

    /// Get the shader cached under `key`, compiling `source` on first use.
    pub fn create_or_get_shader_from_source(
        &mut self,
        key: &str,
        source: &str,
    ) -> Result<Arc<Shader>, GraphicsError> {
        self.started_mut("create_or_get_shader_from_source")?
            .shader_from_source(key, source)
    }

    /// Get the material cached under `key`, resolving it on first use.
    ///
    /// Definitions registered with
    /// [`register_material_definition`](Self::register_material_definition)
    /// take precedence; otherwise `"Default"` names the default material and
    /// any other key is read as a definition file.
    pub fn create_or_get_material(&mut self, key: &str) -> Result<Arc<Material>, GraphicsError> {
        self.started_mut("create_or_get_material")?
            .material(key)
            .inspect_err(|e| log::error!("Failed to create material '{}': {}", key, e))
    }

    /// Register a definition to resolve when `key` is first requested.
    ///
    /// A material already cached under `key` is not rebuilt.
    pub fn register_material_definition(
        &mut self,
        key: impl Into<String>,
        definition: MaterialDefinition,
    ) -> Result<(), GraphicsError> {
        let runtime = self.started_mut("register_material_definition")?;
        let key = key.into();
        if runtime.materials.contains(&key) {
            log::warn!("Material '{}' is already loaded, definition not applied", key);
        }
        runtime.definitions.insert(key, definition);
        Ok(())
    }

    /// Get the mesh cached under `key`, calling `build` on first use.
    pub fn create_or_get_mesh(
        &mut self,
        key: &str,
        build: impl FnOnce() -> Result<(CpuMesh, Arc<VertexLayoutDescriptor>), GraphicsError>,
    ) -> Result<Arc<Mesh>, GraphicsError> {
        let runtime = self.started_mut("create_or_get_mesh")?;
        let backend = &runtime.backend;
        runtime
            .meshes
            .get_or_try_insert_with(key, || {
                let (cpu, layout) = build()?;
                Mesh::from_cpu(backend, &cpu, layout)
            })
            .inspect_err(|e| log::error!("Failed to create mesh '{}': {}", key, e))
    }

    /// Get the bitmap font cached under `key`, loading `<key>.png` on first
    /// use.
    pub fn create_or_get_bitmap_font(
        &mut self,
        key: &str,
    ) -> Result<Arc<BitmapFont>, GraphicsError> {
        self.started_mut("create_or_get_bitmap_font")?
            .bitmap_font(key)
            .inspect_err(|e| log::error!("Failed to create font '{}': {}", key, e))
    }
}
