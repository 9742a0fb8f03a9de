//! Resource creation for the wgpu backend.

use std::borrow::Cow;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::conversion::{
    convert_address_mode, convert_blend_mode, convert_buffer_usage, convert_compare_function,
    convert_cull_mode, convert_fill_mode, convert_filter_mode, convert_mipmap_filter_mode,
    convert_texture_format, convert_texture_usage, convert_vertex_format, convert_winding,
};
use super::{WgpuBackend, WgpuState, WgpuStateKind};
use crate::backend::{
    GpuBuffer, GpuInputLayout, GpuProgram, GpuSampler, GpuStateObject, GpuTexture,
    InputLayoutDescriptor, ProgramDescriptor,
};
use crate::error::GraphicsError;
use crate::shader::{BlendMode, DepthState, FillMode, RasterState};
use crate::types::{BufferDescriptor, Residency, SamplerDescriptor, TextureDescriptor};

/// Round `value` up to a multiple of `alignment`.
pub(super) fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Pad `data` with zeros to a multiple of the buffer copy alignment.
fn pad_to_copy_alignment(data: &[u8]) -> Cow<'_, [u8]> {
    let padded = align_to(data.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT) as usize;
    if padded == data.len() {
        Cow::Borrowed(data)
    } else {
        let mut bytes = data.to_vec();
        bytes.resize(padded, 0);
        Cow::Owned(bytes)
    }
}

/// Row pitch of a staging texture, padded to wgpu's copy alignment.
pub(super) fn staging_bytes_per_row(descriptor: &TextureDescriptor) -> u32 {
    let tight = descriptor.bytes_per_row();
    align_to(tight as u64, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64) as u32
}

/// Copy tightly packed rows into rows of `padded` bytes.
fn pad_rows(data: &[u8], tight: u32, padded: u32) -> Cow<'_, [u8]> {
    if tight == padded {
        return pad_to_copy_alignment(data);
    }
    let mut bytes = Vec::with_capacity(data.len() / tight as usize * padded as usize);
    for row in data.chunks(tight as usize) {
        bytes.extend_from_slice(row);
        bytes.resize(bytes.len() + (padded - tight) as usize, 0);
    }
    Cow::Owned(bytes)
}

pub(super) fn wgpu_buffer(buffer: &GpuBuffer) -> Result<&wgpu::Buffer, GraphicsError> {
    match buffer {
        GpuBuffer::Wgpu(buffer) => Ok(&**buffer),
        _ => Err(GraphicsError::Internal(
            "wgpu backend given a non-wgpu buffer".into(),
        )),
    }
}

pub(super) fn wgpu_state(state: &GpuStateObject) -> Result<&WgpuState, GraphicsError> {
    match state {
        GpuStateObject::Wgpu(state) => Ok(state),
        _ => Err(GraphicsError::Internal(
            "wgpu backend given a non-wgpu state object".into(),
        )),
    }
}

impl WgpuBackend {
    pub(super) fn create_wgpu_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuBuffer, GraphicsError> {
        let size = align_to(descriptor.size.max(1), wgpu::COPY_BUFFER_ALIGNMENT);
        let usage = match descriptor.residency {
            Residency::Staging => wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            _ => convert_buffer_usage(descriptor.usage) | wgpu::BufferUsages::COPY_DST,
        };

        let buffer = match initial_data {
            Some(data) => {
                let mut contents = vec![0u8; size as usize];
                let len = data.len().min(contents.len());
                contents[..len].copy_from_slice(&data[..len]);
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: descriptor.label.as_deref(),
                        contents: &contents,
                        usage,
                    })
            }
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };

        Ok(GpuBuffer::Wgpu(Arc::new(buffer)))
    }

    /// Record a buffer update on the frame encoder.
    ///
    /// The bytes go through a transient upload buffer so the write lands
    /// between the draws recorded before and after it.
    pub(super) fn record_buffer_write(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let target = wgpu_buffer(buffer)?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer write offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        let contents = pad_to_copy_alignment(data);
        let upload = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Tessera Upload"),
                contents: &contents,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        let size = contents.len() as u64;
        self.record(|encoder| {
            encoder.copy_buffer_to_buffer(&upload, 0, target, offset, size);
        });
        Ok(())
    }

    /// Record a full texture update on the frame encoder.
    ///
    /// Goes through an upload buffer like [`Self::record_buffer_write`], with
    /// rows padded to the copy pitch.
    pub(super) fn record_texture_write(
        &self,
        target: &GpuTexture,
        descriptor: &TextureDescriptor,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let padded = staging_bytes_per_row(descriptor);
        let contents = pad_rows(data, descriptor.bytes_per_row(), padded);
        let upload = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Tessera Texture Upload"),
                contents: &contents,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        let size = descriptor.size;

        match target {
            GpuTexture::Wgpu { texture, .. } => self.record(|encoder| {
                encoder.copy_buffer_to_texture(
                    wgpu::TexelCopyBufferInfo {
                        buffer: &upload,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(padded),
                            rows_per_image: Some(size.height),
                        },
                    },
                    texture.as_image_copy(),
                    wgpu::Extent3d {
                        width: size.width,
                        height: size.height,
                        depth_or_array_layers: 1,
                    },
                );
            }),
            GpuTexture::WgpuStaging {
                buffer,
                bytes_per_row,
            } => {
                if *bytes_per_row != padded {
                    return Err(GraphicsError::Internal(format!(
                        "staging texture pitch {bytes_per_row} does not match {padded}"
                    )));
                }
                let len = contents.len() as u64;
                self.record(|encoder| {
                    encoder.copy_buffer_to_buffer(&upload, 0, buffer, 0, len);
                });
            }
            GpuTexture::Dummy(_) => {
                return Err(GraphicsError::Internal(
                    "wgpu backend given a dummy texture".into(),
                ));
            }
        }
        Ok(())
    }

    pub(super) fn create_wgpu_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<GpuTexture, GraphicsError> {
        if descriptor.residency == Residency::Staging {
            let bytes_per_row = staging_bytes_per_row(descriptor);
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: bytes_per_row as u64 * descriptor.size.height as u64,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            return Ok(GpuTexture::WgpuStaging {
                buffer: Arc::new(buffer),
                bytes_per_row,
            });
        }

        let format = convert_texture_format(descriptor.format);
        let mut usage = convert_texture_usage(descriptor.usage) | wgpu::TextureUsages::COPY_DST;
        if !descriptor.format.has_stencil() {
            usage |= wgpu::TextureUsages::COPY_SRC;
        }
        let extent = wgpu::Extent3d {
            width: descriptor.size.width,
            height: descriptor.size.height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        // A fresh texture has no earlier use, so the queue write may run
        // ahead of the frame encoder.
        if let Some(data) = initial_data {
            self.queue.write_texture(
                texture.as_image_copy(),
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(descriptor.bytes_per_row()),
                    rows_per_image: Some(descriptor.size.height),
                },
                extent,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuTexture::Wgpu {
            texture: Arc::new(texture),
            view: Arc::new(view),
        })
    }

    pub(super) fn create_wgpu_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<GpuSampler, GraphicsError> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: convert_address_mode(descriptor.address),
            address_mode_v: convert_address_mode(descriptor.address),
            address_mode_w: convert_address_mode(descriptor.address),
            mag_filter: convert_filter_mode(descriptor.filter),
            min_filter: convert_filter_mode(descriptor.filter),
            mipmap_filter: convert_mipmap_filter_mode(descriptor.filter),
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: descriptor.compare.map(convert_compare_function),
            anisotropy_clamp: 1,
            border_color: None,
        });

        Ok(GpuSampler::Wgpu(Arc::new(sampler)))
    }

    pub(super) fn create_wgpu_program(
        &self,
        descriptor: &ProgramDescriptor<'_>,
    ) -> Result<GpuProgram, GraphicsError> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(descriptor.label),
                source: wgpu::ShaderSource::Wgsl(descriptor.source.into()),
            });

        Ok(GpuProgram::Wgpu {
            id: self.next_id(),
            module: Arc::new(module),
            vertex_entry: descriptor.vertex_entry.to_string(),
            fragment_entry: descriptor.fragment_entry.to_string(),
        })
    }

    pub(super) fn blend_state(&self, mode: BlendMode) -> GpuStateObject {
        self.state_object(WgpuStateKind::Blend(convert_blend_mode(mode)))
    }

    pub(super) fn depth_state(&self, state: DepthState) -> GpuStateObject {
        self.state_object(WgpuStateKind::Depth {
            compare: convert_compare_function(state.compare),
            write_enabled: state.write_enabled,
        })
    }

    pub(super) fn raster_state(&self, state: RasterState) -> GpuStateObject {
        let fill = if state.fill == FillMode::Wireframe && !self.wireframe_supported {
            log::warn!("Adapter lacks line polygon mode; wireframe raster state draws solid");
            FillMode::Solid
        } else {
            state.fill
        };
        self.state_object(WgpuStateKind::Raster {
            polygon_mode: convert_fill_mode(fill),
            cull_mode: convert_cull_mode(state.cull),
            front_face: convert_winding(state.winding),
        })
    }

    fn state_object(&self, kind: WgpuStateKind) -> GpuStateObject {
        GpuStateObject::Wgpu(WgpuState {
            id: self.next_id(),
            kind,
        })
    }

    pub(super) fn input_layout(&self, descriptor: &InputLayoutDescriptor) -> GpuInputLayout {
        let attributes = descriptor
            .attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: convert_vertex_format(attribute.format),
                offset: attribute.offset as u64,
                shader_location: attribute.location,
            })
            .collect();

        GpuInputLayout::Wgpu {
            id: self.next_id(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extent2d, TextureFormat};

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(5, 4), 8);
        assert_eq!(align_to(256, 256), 256);
    }

    #[test]
    fn test_pad_to_copy_alignment() {
        assert!(matches!(pad_to_copy_alignment(&[1, 2, 3, 4]), Cow::Borrowed(_)));
        let padded = pad_to_copy_alignment(&[1, 2, 3, 4, 5]);
        assert_eq!(&*padded, &[1, 2, 3, 4, 5, 0, 0, 0]);
    }

    #[test]
    fn test_staging_rows_are_padded() {
        let descriptor = TextureDescriptor {
            size: Extent2d::new(10, 4),
            format: TextureFormat::Rgba8Unorm,
            residency: Residency::Staging,
            ..Default::default()
        };
        assert_eq!(staging_bytes_per_row(&descriptor), 256);
    }
}
