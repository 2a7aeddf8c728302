//! 模拟阶段
//!
//! 全屏三角形覆盖整个状态纹理，片元着色器为每个纹素执行一次粒子状态机，
//! 结果写入双缓冲中的下一个状态纹理。

use super::fields::VelocityTexture;
use super::shaders;
use super::store::{ParticleStateStore, STATE_FORMAT};
use crate::config::FlowConfig;
use crate::flow::VelocityField;

/// 模拟阶段 Uniform 数据
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimUniforms {
    pub velocity_offset: [f32; 2],
    pub velocity_scale: [f32; 2],
    pub time: f32,
    pub timestep: f32,
    pub trail_length: f32,
    pub velocity_time_scale: f32,
    pub lifespan_min: f32,
    pub lifespan_jitter: f32,
    pub respawn_delay_min: f32,
    pub respawn_delay_jitter: f32,
    pub activation_delay_factor: f32,
    /// 实际粒子数，超出部分的填充纹素原样复制
    pub particle_count: u32,
    pub _pad: [f32; 2],
}

impl SimUniforms {
    pub fn new(
        config: &FlowConfig,
        velocity: &VelocityField,
        time: f32,
        particle_count: u32,
    ) -> Self {
        Self {
            velocity_offset: velocity.offset(),
            velocity_scale: velocity.scale(),
            time,
            timestep: config.simulation.timestep,
            trail_length: config.simulation.trail_length as f32,
            velocity_time_scale: config.simulation.velocity_time_scale,
            lifespan_min: config.lifecycle.lifespan_min,
            lifespan_jitter: config.lifecycle.lifespan_jitter,
            respawn_delay_min: config.lifecycle.respawn_delay_min,
            respawn_delay_jitter: config.lifecycle.respawn_delay_jitter,
            activation_delay_factor: config.simulation.activation_delay_factor,
            particle_count,
            _pad: [0.0; 2],
        }
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// 模拟阶段
pub struct SimulationStage {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    /// 下标 i 的绑定组读取槽位 i 的状态纹理
    bind_groups: [wgpu::BindGroup; 2],
}

impl SimulationStage {
    pub fn new(
        device: &wgpu::Device,
        store: &ParticleStateStore,
        velocity: &VelocityTexture,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // 当前状态
                texture_entry(1, false),
                // 原点
                texture_entry(2, false),
                // 速度场
                texture_entry(3, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Uniform Buffer"),
            size: std::mem::size_of::<SimUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let make_bind_group = |slot: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Simulation BG {}", slot)),
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
                        resource: wgpu::BindingResource::TextureView(&store.origin().view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&velocity.texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&velocity.sampler),
                    },
                ],
            })
        };
        let bind_groups = [make_bind_group(0), make_bind_group(1)];

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Simulation Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::simulation_source().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Simulation Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_fullscreen",
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_simulate",
                targets: &[Some(wgpu::ColorTargetState {
                    format: STATE_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_groups,
        }
    }

    /// 录制一次模拟：读取当前状态，写入下一个状态
    ///
    /// 不负责交换，调用方在提交后调用 [`ParticleStateStore::swap`]。
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        store: &ParticleStateStore,
        uniforms: &SimUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let size = store.layout().pot_size();
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Simulation Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &store.next().view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_viewport(0.0, 0.0, size as f32, size as f32, 0.0, 1.0);
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_groups[store.current_index()], &[]);
        rpass.draw(0..3, 0..1);
    }
}
