//! Command recording for the wgpu backend: clears, copies, draws and
//! readback.

use super::conversion::{convert_texture_format, convert_topology};
use super::resources::{wgpu_buffer, wgpu_state};
use super::{WgpuBackend, WgpuStateKind};
use crate::backend::{DrawCall, GpuProgram, GpuTexture, TEXTURE_SLOT_COUNT, UNIFORM_SLOT_COUNT};
use crate::error::GraphicsError;
use crate::mesh::PrimitiveTopology;
use crate::types::{Extent2d, TextureDescriptor};

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    program: u64,
    blend: u64,
    depth: u64,
    raster: u64,
    input_layout: u64,
    stride: u32,
    color_format: Option<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    topology: wgpu::PrimitiveTopology,
    indexed: bool,
}

fn texture_view(texture: &GpuTexture) -> Result<&wgpu::TextureView, GraphicsError> {
    match texture {
        GpuTexture::Wgpu { view, .. } => Ok(&**view),
        _ => Err(GraphicsError::Internal(
            "wgpu backend given a texture without a view".into(),
        )),
    }
}

fn extent(size: Extent2d) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

fn is_strip(topology: PrimitiveTopology) -> bool {
    matches!(
        topology,
        PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip
    )
}

impl WgpuBackend {
    /// Record onto the frame encoder, opening one if needed.
    pub(super) fn record<R>(&self, f: impl FnOnce(&mut wgpu::CommandEncoder) -> R) -> R {
        let mut encoder = self.encoder.lock();
        let encoder = encoder.get_or_insert_with(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Tessera Frame Encoder"),
                })
        });
        f(encoder)
    }

    /// Submit the frame encoder, if anything was recorded.
    pub(super) fn flush(&self) -> Option<wgpu::SubmissionIndex> {
        let encoder = self.encoder.lock().take()?;
        Some(self.queue.submit(std::iter::once(encoder.finish())))
    }

    pub(super) fn record_clear_color(
        &self,
        target: &GpuTexture,
        color: [f32; 4],
    ) -> Result<(), GraphicsError> {
        let view = texture_view(target)?;
        let [r, g, b, a] = color.map(f64::from);
        self.record(|encoder| {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tessera Clear Color"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        });
        Ok(())
    }

    pub(super) fn record_clear_depth(
        &self,
        target: &GpuTexture,
        depth: f32,
    ) -> Result<(), GraphicsError> {
        let GpuTexture::Wgpu { texture, view } = target else {
            return Err(GraphicsError::Internal(
                "wgpu backend given a non-wgpu depth target".into(),
            ));
        };
        let stencil_ops = texture.format().has_stencil_aspect().then_some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(0),
            store: wgpu::StoreOp::Store,
        });
        self.record(|encoder| {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tessera Clear Depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        });
        Ok(())
    }

    pub(super) fn record_texture_copy(
        &self,
        source: &GpuTexture,
        destination: &GpuTexture,
        size: Extent2d,
    ) -> Result<(), GraphicsError> {
        let GpuTexture::Wgpu { texture: source, .. } = source else {
            return Err(GraphicsError::Internal(
                "texture copy source must be a GPU texture".into(),
            ));
        };

        match destination {
            GpuTexture::Wgpu {
                texture: destination,
                ..
            } => self.record(|encoder| {
                encoder.copy_texture_to_texture(
                    source.as_image_copy(),
                    destination.as_image_copy(),
                    extent(size),
                );
            }),
            GpuTexture::WgpuStaging {
                buffer,
                bytes_per_row,
            } => self.record(|encoder| {
                encoder.copy_texture_to_buffer(
                    source.as_image_copy(),
                    wgpu::TexelCopyBufferInfo {
                        buffer,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(*bytes_per_row),
                            rows_per_image: Some(size.height),
                        },
                    },
                    extent(size),
                );
            }),
            GpuTexture::Dummy(_) => {
                return Err(GraphicsError::Internal(
                    "wgpu backend given a dummy copy destination".into(),
                ));
            }
        }
        Ok(())
    }

    /// Submit pending work and read a staging texture into tightly packed
    /// rows. Blocks until the GPU is done.
    pub(super) fn read_staging(
        &self,
        staging: &GpuTexture,
        descriptor: &TextureDescriptor,
    ) -> Result<Vec<u8>, GraphicsError> {
        tessera_core::profile_scope!("wgpu_read_staging");
        let GpuTexture::WgpuStaging {
            buffer,
            bytes_per_row,
        } = staging
        else {
            return Err(GraphicsError::ResidencyViolation(
                "only staging textures can be read back".into(),
            ));
        };

        self.flush();
        let slice = buffer.slice(..);
        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GraphicsError::Internal(format!("device poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|_| GraphicsError::DeviceLost)?
            .map_err(|e| GraphicsError::Internal(format!("staging map failed: {e}")))?;

        let row_bytes = descriptor.bytes_per_row() as usize;
        let pitch = *bytes_per_row as usize;
        let mut pixels = Vec::with_capacity(row_bytes * descriptor.size.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in 0..descriptor.size.height as usize {
                let start = row * pitch;
                pixels.extend_from_slice(&mapped[start..start + row_bytes]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    pub(super) fn record_draw(&self, call: &DrawCall<'_>) -> Result<(), GraphicsError> {
        tessera_core::profile_scope!("wgpu_draw");
        let pipeline = self.pipeline_for(call)?;

        let uniform_entries = (0..UNIFORM_SLOT_COUNT)
            .map(|slot| {
                let buffer = match call.uniforms[slot] {
                    Some(buffer) => wgpu_buffer(buffer)?,
                    None => &self.fallbacks.uniform,
                };
                Ok(wgpu::BindGroupEntry {
                    binding: slot as u32,
                    resource: buffer.as_entire_binding(),
                })
            })
            .collect::<Result<Vec<_>, GraphicsError>>()?;

        let mut texture_entries = Vec::with_capacity(TEXTURE_SLOT_COUNT * 2);
        for slot in 0..TEXTURE_SLOT_COUNT {
            let view = match call.textures[slot] {
                Some(texture) => texture_view(texture)?,
                None => &self.fallbacks.texture,
            };
            let sampler = match call.samplers[slot] {
                Some(crate::backend::GpuSampler::Wgpu(sampler)) => &**sampler,
                Some(_) => {
                    return Err(GraphicsError::Internal(
                        "wgpu backend given a non-wgpu sampler".into(),
                    ));
                }
                None => &self.fallbacks.sampler,
            };
            texture_entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2,
                resource: wgpu::BindingResource::TextureView(view),
            });
            texture_entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2 + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let uniforms = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tessera Uniforms"),
            layout: &self.layouts.uniforms,
            entries: &uniform_entries,
        });
        let textures = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tessera Textures"),
            layout: &self.layouts.textures,
            entries: &texture_entries,
        });

        let color_view = call
            .color_target
            .map(|(texture, _)| texture_view(texture))
            .transpose()?;
        let depth_view = call
            .depth_target
            .map(|(texture, _)| texture_view(texture))
            .transpose()?;
        if color_view.is_none() && depth_view.is_none() {
            return Err(GraphicsError::InvalidState(
                "draw issued without any render target".into(),
            ));
        }

        let vertex_buffer = wgpu_buffer(call.vertex_buffer)?;
        let index_buffer = call.index_buffer.map(wgpu_buffer).transpose()?;
        let viewport = call.viewport;

        self.record(|encoder| {
            let color_attachments = [color_view.map(|view| wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })];
            let depth_stencil_attachment =
                depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tessera Draw"),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &uniforms, &[]);
            pass.set_bind_group(1, &textures, &[]);
            pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
            pass.set_vertex_buffer(0, vertex_buffer.slice(call.vertex_offset..));
            match index_buffer {
                Some(index_buffer) => {
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..call.count, 0, 0..1);
                }
                None => pass.draw(0..call.count, 0..1),
            }
        });
        Ok(())
    }

    /// Fetch the cached pipeline for `call`, building it on first use.
    fn pipeline_for(&self, call: &DrawCall<'_>) -> Result<wgpu::RenderPipeline, GraphicsError> {
        let GpuProgram::Wgpu {
            id: program,
            module,
            vertex_entry,
            fragment_entry,
        } = call.program
        else {
            return Err(GraphicsError::Internal(
                "wgpu backend given a non-wgpu program".into(),
            ));
        };
        let crate::backend::GpuInputLayout::Wgpu {
            id: input_layout,
            attributes,
        } = call.input_layout
        else {
            return Err(GraphicsError::Internal(
                "wgpu backend given a non-wgpu input layout".into(),
            ));
        };
        let blend = wgpu_state(call.blend)?;
        let depth = wgpu_state(call.depth)?;
        let raster = wgpu_state(call.raster)?;

        let key = PipelineKey {
            program: *program,
            blend: blend.id,
            depth: depth.id,
            raster: raster.id,
            input_layout: *input_layout,
            stride: call.vertex_stride,
            color_format: call
                .color_target
                .map(|(_, format)| convert_texture_format(format)),
            depth_format: call
                .depth_target
                .map(|(_, format)| convert_texture_format(format)),
            topology: convert_topology(call.topology),
            indexed: call.is_indexed(),
        };

        let mut pipelines = self.pipelines.lock();
        if let Some(pipeline) = pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        let WgpuStateKind::Blend(blend_state) = blend.kind else {
            return Err(GraphicsError::Internal("blend slot holds another state".into()));
        };
        let WgpuStateKind::Depth {
            compare,
            write_enabled,
        } = depth.kind
        else {
            return Err(GraphicsError::Internal("depth slot holds another state".into()));
        };
        let WgpuStateKind::Raster {
            polygon_mode,
            cull_mode,
            front_face,
        } = raster.kind
        else {
            return Err(GraphicsError::Internal("raster slot holds another state".into()));
        };

        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: call.vertex_stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }];
        let color_targets = [key.color_format.map(|format| wgpu::ColorTargetState {
            format,
            blend: Some(blend_state),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Tessera Pipeline"),
                layout: Some(&self.layouts.pipeline),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(vertex_entry.as_str()),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(fragment_entry.as_str()),
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: key.topology,
                    strip_index_format: (key.indexed && is_strip(call.topology))
                        .then_some(wgpu::IndexFormat::Uint32),
                    front_face,
                    cull_mode,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: key.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: write_enabled,
                    depth_compare: compare,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        log::debug!(
            "Built render pipeline #{} (program {}, {:?}, color {:?}, depth {:?})",
            pipelines.len() + 1,
            key.program,
            key.topology,
            key.color_format,
            key.depth_format
        );
        pipelines.insert(key, pipeline.clone());
        tessera_core::profile_plot!("wgpu_pipelines", pipelines.len());
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_topologies() {
        assert!(is_strip(PrimitiveTopology::TriangleStrip));
        assert!(is_strip(PrimitiveTopology::LineStrip));
        assert!(!is_strip(PrimitiveTopology::TriangleList));
    }

    #[test]
    fn test_extent_is_single_layer() {
        let size = extent(Extent2d::new(8, 4));
        assert_eq!((size.width, size.height, size.depth_or_array_layers), (8, 4, 1));
    }
}
