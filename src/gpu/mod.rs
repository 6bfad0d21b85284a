//! GPU side of the engine: instance layout, uniforms and the point-sprite pass.

mod camera;
mod shader;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use winit::window::Window;

pub use camera::Camera;
pub use shader::{FLAG_GRADIENT, FLAG_INTERACTIVE, FLAG_PULSE, POINT_SHADER};

use crate::engine::ParticleEngine;
use crate::error::GpuError;
use crate::gradient::MAX_GRADIENT_STOPS;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-sample instance data, one per particle per frame.
///
/// vec3 slots are padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    /// `current + displacement`, local space.
    pub position: [f32; 3],
    /// `1 - dist / radius` inside the repulsion radius, else 0.
    pub proximity: f32,
    /// Rest position, drives gradient color and pulse phase.
    pub original: [f32; 3],
    pub _pad0: f32,
    /// Offset applied by the repulsion simulation.
    pub displacement: [f32; 3],
    pub _pad1: f32,
}

impl PointVertex {
    pub fn new(position: Vec3, original: Vec3, displacement: Vec3, proximity: f32) -> Self {
        Self {
            position: position.to_array(),
            proximity,
            original: original.to_array(),
            _pad0: 0.0,
            displacement: displacement.to_array(),
            _pad1: 0.0,
        }
    }

    /// Instance-step layout matching the point shader's inputs.
    ///
    /// Locations: 0 position, 1 proximity, 2 original, 3 displacement.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            },
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Uniform block of the point shader. Field order mirrors the WGSL struct.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub time: f32,
    pub flat_color: [f32; 3],
    pub point_size: f32,
    pub bounds_min: [f32; 3],
    pub blend_power: f32,
    pub bounds_extent: [f32; 3],
    pub _pad0: f32,
    pub viewport: [f32; 2],
    pub flags: u32,
    pub stop_count: u32,
    pub stop_colors: [[f32; 4]; MAX_GRADIENT_STOPS],
    pub stop_anchors: [[f32; 4]; MAX_GRADIENT_STOPS],
}

impl PointUniforms {
    /// Snapshot the engine's render state for one frame.
    pub fn from_engine(engine: &ParticleEngine, view_proj: Mat4, camera_pos: Vec3, viewport: [f32; 2]) -> Self {
        let params = engine.params();
        let color = engine.color_mode();

        let mut flags = 0;
        if params.pulse_enabled {
            flags |= FLAG_PULSE;
        }
        if params.repulsion_enabled {
            flags |= FLAG_INTERACTIVE;
        }

        let mut stop_colors = [[0.0; 4]; MAX_GRADIENT_STOPS];
        let mut stop_anchors = [[0.0; 4]; MAX_GRADIENT_STOPS];
        let mut stop_count = 0;
        let mut blend_power = 0.0;
        if let Some((spec, power)) = color.active_gradient() {
            flags |= FLAG_GRADIENT;
            blend_power = power;
            for (i, stop) in spec.stops().iter().take(MAX_GRADIENT_STOPS).enumerate() {
                stop_colors[i] = stop.color.extend(1.0).to_array();
                stop_anchors[i] = stop.anchor.extend(0.0).to_array();
                stop_count += 1;
            }
        }

        let (bounds_min, bounds_extent) = match engine.particle_set() {
            Some(set) => (set.bounds().min, set.bounds().extent()),
            None => (Vec3::ZERO, Vec3::ONE),
        };

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            world: engine.world_transform().to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            time: engine.elapsed_time(),
            flat_color: color.flat_color().to_array(),
            point_size: params.point_size,
            bounds_min: bounds_min.to_array(),
            blend_power,
            bounds_extent: bounds_extent.to_array(),
            _pad0: 0.0,
            viewport,
            flags,
            stop_count,
            stop_colors,
            stop_anchors,
        }
    }
}

/// Draws one engine's samples as soft point sprites.
///
/// Owns the instance buffer; call [`PointRenderer::release`] (or drop the
/// renderer) when the owning scene goes away.
pub struct PointRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: Option<wgpu::Buffer>,
    capacity: usize,
    instance_count: u32,
    generation: u64,
}

impl PointRenderer {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, depth_format: Option<wgpu::TextureFormat>) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Uniform Buffer"),
            size: std::mem::size_of::<PointUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Point Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(POINT_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[PointVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Soft sprites overlap: test against opaque geometry but never write.
            depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
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
            uniform_buffer,
            uniform_bind_group,
            instance_buffer: None,
            capacity: 0,
            instance_count: 0,
            generation: 0,
        }
    }

    /// Upload this frame's uniforms and instances.
    ///
    /// The instance buffer is reallocated when the engine was rebuilt with
    /// more samples than fit, and dropped when the engine is empty.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        engine: &ParticleEngine,
        camera: &Camera,
        viewport: [f32; 2],
    ) {
        let aspect = viewport[0] / viewport[1].max(1.0);
        let uniforms = PointUniforms::from_engine(engine, camera.view_proj(aspect), camera.position, viewport);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let vertices = engine.vertices();
        if vertices.is_empty() {
            self.release();
            self.generation = engine.generation();
            return;
        }

        if self.instance_buffer.is_none() || vertices.len() > self.capacity || self.generation != engine.generation() {
            self.release();
            self.instance_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Point Instance Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }));
            self.capacity = vertices.len();
            self.generation = engine.generation();
        } else if let Some(buffer) = &self.instance_buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
        }
        self.instance_count = vertices.len() as u32;
    }

    /// Record the draw. Draws nothing when no instances are prepared.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = &self.instance_buffer else {
            return;
        };
        if self.instance_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..6, 0..self.instance_count);
    }

    /// Free the instance buffer now rather than at drop.
    pub fn release(&mut self) {
        if let Some(buffer) = self.instance_buffer.take() {
            buffer.destroy();
        }
        self.capacity = 0;
        self.instance_count = 0;
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }
}

impl Drop for PointRenderer {
    fn drop(&mut self) {
        self.release();
        self.uniform_buffer.destroy();
    }
}

/// Window surface, device and point renderer for the viewer.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    renderer: PointRenderer,
    pub camera: Camera,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, camera: Camera) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);
        let renderer = PointRenderer::new(&device, config.format, Some(DEPTH_FORMAT));

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            renderer,
            camera,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    pub fn viewport(&self) -> [f32; 2] {
        [self.config.width as f32, self.config.height as f32]
    }

    /// Inverse view-projection for unprojecting the pointer.
    pub fn inverse_view_proj(&self) -> Mat4 {
        let [w, h] = self.viewport();
        self.camera.view_proj(w / h).inverse()
    }

    pub fn render(&mut self, engine: &ParticleEngine) -> Result<(), wgpu::SurfaceError> {
        self.renderer
            .prepare(&self.device, &self.queue, engine, &self.camera, self.viewport());

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.05,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer.draw(&mut render_pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Release GPU buffers ahead of drop.
    pub fn release(&mut self) {
        self.renderer.release();
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::gradient::Palette;
    use crate::mesh::MeshSource;
    use crate::simulation::SimulationParams;

    #[test]
    fn test_vertex_layout_size() {
        assert_eq!(std::mem::size_of::<PointVertex>(), 48);
        assert_eq!(PointVertex::layout().array_stride, 48);
    }

    #[test]
    fn test_layout_binds_every_field() {
        let layout = PointVertex::layout();
        let bound: Vec<_> = layout
            .attributes
            .iter()
            .map(|a| (a.shader_location, a.offset))
            .collect();
        assert_eq!(
            bound,
            vec![
                (0, std::mem::offset_of!(PointVertex, position) as u64),
                (1, std::mem::offset_of!(PointVertex, proximity) as u64),
                (2, std::mem::offset_of!(PointVertex, original) as u64),
                (3, std::mem::offset_of!(PointVertex, displacement) as u64),
            ]
        );
    }

    #[test]
    fn test_uniform_layout_size() {
        // Matches the WGSL struct: 208 bytes of scalars + two 128-byte arrays.
        assert_eq!(std::mem::size_of::<PointUniforms>(), 464);
        assert_eq!(std::mem::size_of::<PointUniforms>() % 16, 0);
    }

    #[test]
    fn test_uniform_flags() {
        let params = SimulationParams::default().with_pulse(true).with_interactive(false);
        let config = EngineConfig::new()
            .with_params(params)
            .with_gradient(Palette::Neon.gradient(0), 3.0);
        let engine = ParticleEngine::from_source(&MeshSource::grid(1.0, 2), config).unwrap();

        let u = PointUniforms::from_engine(&engine, Mat4::IDENTITY, Vec3::ZERO, [800.0, 600.0]);
        assert_eq!(u.flags, FLAG_GRADIENT | FLAG_PULSE);
        assert_eq!(u.stop_count, 5);
        assert_eq!(u.blend_power, 3.0);
        assert_eq!(u.bounds_min, [-0.5, -0.5, 0.0]);
    }

    #[test]
    fn test_uniform_flat_mode() {
        let engine = ParticleEngine::new(EngineConfig::default()).unwrap();
        let u = PointUniforms::from_engine(&engine, Mat4::IDENTITY, Vec3::ZERO, [1.0, 1.0]);
        assert_eq!(u.flags & FLAG_GRADIENT, 0);
        assert_eq!(u.stop_count, 0);
        assert_eq!(u.flat_color, [1.0, 1.0, 1.0]);
    }
}
