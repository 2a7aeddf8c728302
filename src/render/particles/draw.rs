//! 渲染阶段
//!
//! 在宿主提供的帧缓冲上绘制轨迹：顶点着色器读取粒子状态并重投影到世界坐标，
//! 片元着色器按速度场着色。开启 alpha 混合和深度测试，但不写深度。

use super::fields::{ReprojectionTextures, VelocityTexture};
use super::geometry::{GeometryBuilder, TrailVertex};
use super::shaders;
use super::store::ParticleStateStore;
use crate::config::{FlowConfig, Topology};
use crate::flow::{ReprojectionField, VelocityField};
use crate::host::{Camera, RenderTarget};

/// 渲染阶段 Uniform 数据
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub velocity_offset: [f32; 2],
    pub velocity_scale: [f32; 2],
    pub reprojection_offset: f32,
    pub reprojection_scale: f32,
    pub time: f32,
    pub lifespan_min: f32,
    pub lifespan_jitter: f32,
    pub fade_window: f32,
    pub depth_bias: f32,
    pub alpha_scale: f32,
    pub alpha_floor: f32,
    pub _pad: [f32; 3],
}

impl RenderUniforms {
    pub fn new(
        camera: &Camera,
        config: &FlowConfig,
        velocity: &VelocityField,
        reprojection: &ReprojectionField,
        time: f32,
    ) -> Self {
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            velocity_offset: velocity.offset(),
            velocity_scale: velocity.scale(),
            reprojection_offset: reprojection.offset,
            reprojection_scale: reprojection.scale,
            time,
            lifespan_min: config.lifecycle.lifespan_min,
            lifespan_jitter: config.lifecycle.lifespan_jitter,
            fade_window: config.render.fade_window,
            depth_bias: config.render.depth_bias,
            alpha_scale: config.render.alpha_scale,
            alpha_floor: config.render.alpha_floor,
            _pad: [0.0; 3],
        }
    }
}

/// 渲染阶段的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormats {
    pub color: wgpu::TextureFormat,
    pub depth: Option<wgpu::TextureFormat>,
}

/// 渲染阶段
pub struct RenderStage {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl RenderStage {
    pub fn new(
        device: &wgpu::Device,
        store: &ParticleStateStore,
        velocity: &VelocityTexture,
        reprojection: &ReprojectionTextures,
        topology: Topology,
        formats: TargetFormats,
    ) -> Self {
        let vertex_and_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let texture_entry = |binding: u32, filterable: bool, visibility: wgpu::ShaderStages| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }
        };
        let sampler_entry =
            |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Trail Render BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1, false, wgpu::ShaderStages::VERTEX),
                texture_entry(2, true, wgpu::ShaderStages::VERTEX),
                texture_entry(3, true, wgpu::ShaderStages::VERTEX),
                texture_entry(4, true, wgpu::ShaderStages::VERTEX),
                sampler_entry(5, wgpu::ShaderStages::VERTEX),
                texture_entry(6, true, vertex_and_fragment),
                sampler_entry(7, vertex_and_fragment),
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Trail Render Uniform Buffer"),
            size: std::mem::size_of::<RenderUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let [rx, ry, rz] = &reprojection.components;
        let make_bind_group = |slot: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Trail Render BG {}", slot)),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&store.slot(slot).view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&rx.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&ry.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&rz.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::Sampler(&reprojection.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 6,
                        resource: wgpu::BindingResource::TextureView(&velocity.texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 7,
                        resource: wgpu::BindingResource::Sampler(&velocity.sampler),
                    },
                ],
            })
        };
        let bind_groups = [make_bind_group(0), make_bind_group(1)];

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trail Render Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::render_source().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Trail Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Trail Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[TrailVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: formats.color,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology.primitive(),
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: formats.depth.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let (vertex_buffer, vertex_count) =
            GeometryBuilder::new(store.layout(), topology).create_buffer(device);

        Self {
            pipeline,
            uniform_buffer,
            bind_groups,
            vertex_buffer,
            vertex_count,
        }
    }

    /// 录制一次绘制，读取当前状态纹理
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        target: &RenderTarget<'_>,
        camera: &Camera,
        uniforms: &RenderUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let depth_stencil_attachment =
            target
                .depth
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Trail Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // 恢复宿主视口
        rpass.set_viewport(
            0.0,
            0.0,
            camera.full_width as f32,
            camera.full_height as f32,
            0.0,
            1.0,
        );
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_groups[store.current_index()], &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::VelocityBounds;
    use glam::Mat4;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 192);
    }

    #[test]
    fn test_uniforms_carry_camera_and_fade() {
        let camera = Camera::new(
            Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)),
            Mat4::IDENTITY,
            800,
            600,
        );
        let config = FlowConfig::default();
        let velocity = VelocityField::from_bounds(&VelocityBounds::new([0.0, 0.0], [1.0, 1.0]));
        let reprojection = ReprojectionField {
            offset: -10.0,
            scale: 20.0,
        };
        let uniforms = RenderUniforms::new(&camera, &config, &velocity, &reprojection, 4.0);
        assert_eq!(uniforms.view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniforms.projection, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(uniforms.reprojection_offset, -10.0);
        assert_eq!(uniforms.fade_window, 2.0);
        assert_eq!(uniforms.alpha_scale, 0.75);
        assert_eq!(uniforms.alpha_floor, 0.5);
        assert_eq!(uniforms.time, 4.0);
    }
}
