//! GPU pipeline for cortical surface rendering
//!
//! Each viewport owns, per hemisphere, a static vertex/index buffer pair and
//! two per-vertex colour buffers. The frame's parity selects which colour
//! buffer is written in `prepare` and bound in `render`; a buffer is only
//! re-uploaded when the frame carries a colour revision it does not hold yet.

use std::collections::HashMap;
use std::sync::Arc;

use iced::mouse;
use iced::widget::shader;
use iced::Rectangle;

use cortex_core::{Generation, Hemisphere, Rgba, NUM_HEMISPHERES};

use super::geometry::{check_buffer_limits, GpuVertex, MeshGeometry};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform data sent to the shader (per viewport)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    /// World-space direction towards the light, w unused
    pub light_dir: [f32; 4],
    /// [ambient, diffuse, specular, shininess]
    pub shading: [f32; 4],
    /// Camera position for the specular term, w unused
    pub eye: [f32; 4],
}

/// What one hemisphere needs for a draw
#[derive(Debug, Clone)]
pub(crate) struct HemisphereDraw {
    pub geometry: Arc<MeshGeometry>,
    pub colors: Arc<Vec<Rgba>>,
    pub revision: u64,
    pub parity: usize,
}

/// Shader program for the 3D viewport
#[derive(Debug, Clone)]
pub(crate) struct SurfaceProgram {
    /// Stable ID from the owning viewport
    pub id: u64,
    pub uniforms: Uniforms,
    pub hemispheres: [Option<HemisphereDraw>; NUM_HEMISPHERES],
}

impl shader::Program<()> for SurfaceProgram {
    type State = ();
    type Primitive = SurfacePrimitive;

    fn draw(&self, _state: &Self::State, _cursor: mouse::Cursor, _bounds: Rectangle) -> Self::Primitive {
        SurfacePrimitive {
            id: self.id,
            uniforms: self.uniforms,
            hemispheres: self.hemispheres.clone(),
        }
    }
}

/// Primitive for surface rendering - created by SurfaceProgram::draw()
#[derive(Debug, Clone)]
pub struct SurfacePrimitive {
    id: u64,
    uniforms: Uniforms,
    hemispheres: [Option<HemisphereDraw>; NUM_HEMISPHERES],
}

struct HemisphereBuffers {
    generation: Generation,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    colors: [wgpu::Buffer; 2],
    /// Colour revision currently held by each colour buffer
    uploaded: [Option<u64>; 2],
}

impl HemisphereBuffers {
    fn new(device: &wgpu::Device, hemisphere: Hemisphere, geometry: &MeshGeometry) -> Self {
        use wgpu::util::DeviceExt;

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Surface Vertex Buffer", hemisphere)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Surface Index Buffer", hemisphere)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let color_size = (geometry.vertex_count() * std::mem::size_of::<Rgba>()) as u64;
        let colors = [0, 1].map(|parity| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{} Surface Color Buffer {}", hemisphere, parity)),
                size: color_size.max(16),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        Self {
            generation: geometry.generation,
            vertices,
            indices,
            index_count: geometry.indices.len() as u32,
            colors,
            uploaded: [None, None],
        }
    }
}

/// Per-viewport GPU resources
struct ViewportResources {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    hemispheres: [Option<HemisphereBuffers>; NUM_HEMISPHERES],
    /// Geometry generation last rejected for exceeding device limits
    rejected: [Option<Generation>; NUM_HEMISPHERES],
    /// Widget bounds in physical pixels, clipped to the render target
    bounds: Rectangle,
}

struct DepthTarget {
    view: wgpu::TextureView,
    size: (u32, u32),
}

/// The GPU pipeline for rendering cortical surfaces
pub struct SurfacePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    depth: Option<DepthTarget>,
    /// Per-viewport resources, keyed by stable viewport ID
    viewports: HashMap<u64, ViewportResources>,
}

impl SurfacePipeline {
    fn ensure_depth(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if self.depth.as_ref().is_some_and(|d| d.size == size) {
            return;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Surface Depth Texture"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some(DepthTarget { view, size });
    }
}

impl shader::Pipeline for SurfacePipeline {
    fn new(device: &wgpu::Device, _queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Surface Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("surface.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Surface Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<GpuVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Rgba>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![2 => Float32x4],
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Surface Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Surfaces are viewed from both sides while orbiting
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            depth: None,
            viewports: HashMap::new(),
        }
    }
}

impl shader::Primitive for SurfacePrimitive {
    type Pipeline = SurfacePipeline;

    fn prepare(
        &self,
        pipeline: &mut Self::Pipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bounds: &Rectangle,
        viewport: &shader::Viewport,
    ) {
        let scale = viewport.scale_factor() as f32;
        let scale = if scale > 0.0 && scale.is_finite() { scale } else { 1.0 };
        let physical = viewport.physical_size();
        pipeline.ensure_depth(device, physical.width, physical.height);

        let max_buffer_size = device.limits().max_buffer_size;
        let layout = &pipeline.bind_group_layout;
        let resources = pipeline.viewports.entry(self.id).or_insert_with(|| {
            let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Surface Uniform Buffer"),
                size: std::mem::size_of::<Uniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Surface Bind Group"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }],
            });
            ViewportResources {
                uniforms,
                bind_group,
                hemispheres: [None, None],
                rejected: [None, None],
                bounds: Rectangle::default(),
            }
        });

        let x = (bounds.x * scale).clamp(0.0, physical.width as f32);
        let y = (bounds.y * scale).clamp(0.0, physical.height as f32);
        resources.bounds = Rectangle {
            x,
            y,
            width: (bounds.width * scale).min(physical.width as f32 - x),
            height: (bounds.height * scale).min(physical.height as f32 - y),
        };
        queue.write_buffer(&resources.uniforms, 0, bytemuck::bytes_of(&self.uniforms));

        for hemisphere in Hemisphere::ALL {
            let slot = &mut resources.hemispheres[hemisphere.index()];
            let Some(draw) = &self.hemispheres[hemisphere.index()] else {
                *slot = None;
                continue;
            };

            if slot.as_ref().map(|b| b.generation) != Some(draw.geometry.generation) {
                if let Err(e) = check_buffer_limits(hemisphere, &draw.geometry, max_buffer_size) {
                    let rejected = &mut resources.rejected[hemisphere.index()];
                    if *rejected != Some(draw.geometry.generation) {
                        log::warn!("SurfacePrimitive::prepare: {}, skipping hemisphere", e);
                        *rejected = Some(draw.geometry.generation);
                    }
                    *slot = None;
                    continue;
                }
                log::debug!(
                    "SurfacePrimitive::prepare: uploading {} geometry ({} vertices)",
                    hemisphere,
                    draw.geometry.vertex_count()
                );
                *slot = Some(HemisphereBuffers::new(device, hemisphere, &draw.geometry));
            }

            let Some(buffers) = slot.as_mut() else {
                continue;
            };
            if draw.colors.len() != draw.geometry.vertex_count() {
                continue;
            }
            let parity = draw.parity & 1;
            if buffers.uploaded[parity] != Some(draw.revision) {
                queue.write_buffer(&buffers.colors[parity], 0, bytemuck::cast_slice(draw.colors.as_slice()));
                buffers.uploaded[parity] = Some(draw.revision);
            }
        }
    }

    fn render(
        &self,
        pipeline: &Self::Pipeline,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clip_bounds: &Rectangle<u32>,
    ) {
        let Some(resources) = pipeline.viewports.get(&self.id) else {
            return;
        };
        let Some(depth) = &pipeline.depth else {
            return;
        };
        if resources.bounds.width < 1.0 || resources.bounds.height < 1.0 {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Surface Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, &resources.bind_group, &[]);
        let b = resources.bounds;
        pass.set_viewport(b.x, b.y, b.width, b.height, 0.0, 1.0);
        pass.set_scissor_rect(clip_bounds.x, clip_bounds.y, clip_bounds.width, clip_bounds.height);

        for hemisphere in Hemisphere::ALL {
            let (Some(draw), Some(buffers)) = (
                &self.hemispheres[hemisphere.index()],
                &resources.hemispheres[hemisphere.index()],
            ) else {
                continue;
            };
            let parity = draw.parity & 1;
            // Nothing uploaded for this parity yet (colour/vertex count mismatch)
            if buffers.uploaded[parity] != Some(draw.revision) {
                continue;
            }
            pass.set_vertex_buffer(0, buffers.vertices.slice(..));
            pass.set_vertex_buffer(1, buffers.colors[parity].slice(..));
            pass.set_index_buffer(buffers.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..buffers.index_count, 0, 0..1);
        }
    }
}
