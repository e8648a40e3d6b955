use std::time::{Duration, Instant};

use anyhow::Result;
use gallery::{Camera, Frame, GalleryState, PlaneMesh};
use galleryconfig::DebugMode;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::types::{AdapterProfile, Antialiasing};

use super::atlas::AtlasTexture;
use super::buffers::{InstanceBuffers, MeshBuffers};
use super::context::{GpuContext, DEPTH_FORMAT};
use super::pipeline::{GalleryPipeline, PipelineLayouts};
use super::uniforms::GalleryUniforms;

/// Owns every GPU resource of the gallery and turns one [`Frame`] into one
/// presented image.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipeline: GalleryPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    atlas: AtlasTexture,
    mesh: MeshBuffers,
    instances: InstanceBuffers,
    depth_target: RenderTarget,
    multisample_target: Option<RenderTarget>,
    camera: Camera,
    stats: RenderStats,
}

/// An offscreen attachment sized to the surface.
struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct RenderStats {
    last_update: Instant,
    frames_since_update: u32,
    frame_count: u64,
}

impl RenderStats {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frames_since_update: 0,
            frame_count: 0,
        }
    }

    /// Counts a frame; returns the frame rate once per second.
    fn record(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        self.frames_since_update += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames_since_update as f32 / elapsed.as_secs_f32();
        self.frames_since_update = 0;
        self.last_update = now;
        Some(fps)
    }
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        camera: Camera,
        gallery: &GalleryState,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing)?;
        let device = &context.device;

        let layouts = PipelineLayouts::new(device);
        let pipeline = GalleryPipeline::new(
            device,
            &layouts,
            context.surface_format,
            context.sample_count,
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gallery uniforms"),
            contents: bytemuck::bytes_of(&<GalleryUniforms as bytemuck::Zeroable>::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas = match gallery.atlas() {
            Some(atlas) => {
                AtlasTexture::from_atlas(device, &context.queue, &layouts.atlas_layout, atlas)
            }
            None => AtlasTexture::placeholder(device, &context.queue, &layouts.atlas_layout),
        };
        let mesh = MeshBuffers::new(device, &PlaneMesh::gallery_card());
        let instances = InstanceBuffers::new(device, gallery.instances());

        let depth_target =
            RenderTarget::new(device, "depth target", DEPTH_FORMAT, context.size, context.sample_count);
        let multisample_target = (context.sample_count > 1).then(|| {
            RenderTarget::new(
                device,
                "msaa color target",
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        tracing::info!(
            adapter = %context.adapter_profile.name,
            backend = ?context.adapter_profile.backend,
            width = context.size.width,
            height = context.size.height,
            sample_count = context.sample_count,
            slots = instances.count,
            "gallery renderer ready"
        );

        Ok(Self {
            context,
            layouts,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas,
            mesh,
            instances,
            depth_target,
            multisample_target,
            camera,
            stats: RenderStats::new(),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        let device = &self.context.device;
        self.depth_target = RenderTarget::new(
            device,
            "depth target",
            DEPTH_FORMAT,
            self.context.size,
            self.context.sample_count,
        );
        self.multisample_target = if self.context.sample_count > 1 {
            Some(RenderTarget::new(
                device,
                "msaa color target",
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            ))
        } else {
            None
        };
    }

    /// Uploads whatever changed this frame and draws every slot.
    pub(crate) fn render(
        &mut self,
        frame: &Frame,
        gallery: &mut GalleryState,
    ) -> Result<(), wgpu::SurfaceError> {
        // upload before acquiring: a lost frame must not drop an atlas swap
        if frame.atlas_changed {
            if let Some(atlas) = gallery.atlas() {
                self.atlas = AtlasTexture::from_atlas(
                    &self.context.device,
                    &self.context.queue,
                    &self.layouts.atlas_layout,
                    atlas,
                );
                debug!(
                    width = self.atlas.size.0,
                    height = self.atlas.size.1,
                    generation = gallery.atlas_generation(),
                    "uploaded texture atlas"
                );
            }
        }
        if self.instances.sync(&self.context.queue, gallery.instances_mut()) {
            debug!(slots = self.instances.count, "uploaded instance attributes");
        }

        let view_proj = self.camera.view_projection(self.context.aspect());
        let uniforms = GalleryUniforms::new(&frame.params, view_proj);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let surface_frame = self.context.surface.get_current_texture()?;
        let view = surface_frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gallery pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let wireframe = frame.params.debug == DebugMode::Wireframe;
            let (pipeline, indices, index_count) = if wireframe {
                (&self.pipeline.wireframe, &self.mesh.lines, self.mesh.line_count)
            } else {
                (&self.pipeline.fill, &self.mesh.triangles, self.mesh.triangle_count)
            };

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, &self.atlas.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.mesh.vertices.slice(..));
            render_pass.set_vertex_buffer(1, self.instances.angles.slice(..));
            render_pass.set_vertex_buffer(2, self.instances.heights.slice(..));
            render_pass.set_vertex_buffer(3, self.instances.tiles.slice(..));
            render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..index_count, 0, 0..self.instances.count);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_frame.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                frame_count = self.stats.frame_count,
                atlas_generation = gallery.atlas_generation(),
                loading = gallery.is_loading(),
                "render stats"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_report_once_per_second() {
        let mut stats = RenderStats::new();
        let start = stats.last_update;
        assert_eq!(stats.record(start + Duration::from_millis(500)), None);
        let fps = stats
            .record(start + Duration::from_secs(1))
            .expect("a second has passed");
        assert!((fps - 2.0).abs() < 1e-4);
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.record(start + Duration::from_millis(1500)), None);
    }
}
