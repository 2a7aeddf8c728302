//! 流场粒子系统
//!
//! 持有状态纹理、场纹理和两个阶段，并维护模拟时钟。
//! 每次 [`ParticleSystem::update`] 恰好执行一次模拟并交换一次状态纹理。
//!
//! 创建或提交失败的阶段会被停用：失败记录到日志并计入 `failed_programs`，
//! 之后的帧跳过该阶段，宿主不会因此中止。

use super::draw::{RenderStage, RenderUniforms, TargetFormats};
use super::fields::{ReprojectionTextures, VelocityTexture};
use super::geometry::GeometryBuilder;
use super::readback;
use super::simulate::{SimUniforms, SimulationStage};
use super::store::ParticleStateStore;
use crate::config::{FlowConfig, Topology};
use crate::core::error::{RenderError, RenderResult};
use crate::flow::{
    InitialParticles, ParticleTexel, ReprojectionData, VelocityField, VelocityRaster,
};
use crate::host::HostContext;
use futures::FutureExt;

const SIMULATE_PROGRAM: &str = "simulate";
const RENDER_PROGRAM: &str = "render";

/// 创建粒子系统所需的输入
pub struct ParticleSystemDesc<'a> {
    pub config: &'a FlowConfig,
    pub initial: &'a InitialParticles,
    pub velocity_raster: &'a VelocityRaster,
    pub velocity_field: VelocityField,
    pub reprojection: &'a ReprojectionData,
    pub formats: TargetFormats,
}

/// 粒子系统统计信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSystemStats {
    pub num_streams: u32,
    pub trail_length: u32,
    pub total_particles: u32,
    pub pot_size: u32,
    pub vertex_count: u32,
    pub topology: Topology,
    /// 当前模拟时间
    pub time: f64,
    /// 已完成的模拟步数（等于交换次数）
    pub steps: u64,
    /// 已绘制的帧数
    pub frames: u64,
    /// 是否有着色器程序失败
    pub degraded: bool,
}

/// 流场粒子系统
pub struct ParticleSystem {
    config: FlowConfig,
    store: ParticleStateStore,
    velocity: VelocityTexture,
    reprojection: ReprojectionTextures,
    /// 程序失败后为 `None`
    simulation: Option<SimulationStage>,
    render: Option<RenderStage>,
    vertex_count: u32,
    time: f64,
    frames: u64,
    failed_programs: Vec<&'static str>,
}

/// 在验证错误作用域内创建程序，失败时记录日志并返回 `None`
async fn with_error_scope<T>(
    device: &wgpu::Device,
    program: &'static str,
    failed: &mut Vec<&'static str>,
    create: impl FnOnce() -> T,
) -> Option<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match device.pop_error_scope().await {
        Some(error) => {
            tracing::error!(
                target: "flow::render",
                program,
                %error,
                "Failed to create shader program"
            );
            failed.push(program);
            None
        }
        None => Some(value),
    }
}

/// 在验证错误作用域内提交命令，返回是否成功
///
/// 不阻塞帧：作用域结果尚未就绪时视为成功，
/// 遗留错误交给设备的未捕获错误回调。
fn submit_scoped(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    program: &'static str,
    encoder: wgpu::CommandEncoder,
) -> bool {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    queue.submit(std::iter::once(encoder.finish()));
    match device.pop_error_scope().now_or_never() {
        Some(Some(error)) => {
            tracing::error!(
                target: "flow::render",
                program,
                %error,
                "GPU program failed, disabling it"
            );
            false
        }
        _ => true,
    }
}

impl ParticleSystem {
    /// 上传状态与场纹理并创建两个阶段
    pub async fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        desc: ParticleSystemDesc<'_>,
    ) -> Self {
        let store = ParticleStateStore::new(device, queue, desc.initial);
        let velocity =
            VelocityTexture::new(device, queue, desc.velocity_raster, desc.velocity_field);
        let reprojection = ReprojectionTextures::new(device, queue, desc.reprojection);
        let topology = desc.config.render.topology;

        let mut failed_programs = Vec::new();
        let simulation = with_error_scope(device, SIMULATE_PROGRAM, &mut failed_programs, || {
            SimulationStage::new(device, &store, &velocity)
        })
        .await;
        let render = with_error_scope(device, RENDER_PROGRAM, &mut failed_programs, || {
            RenderStage::new(device, &store, &velocity, &reprojection, topology, desc.formats)
        })
        .await;

        let vertex_count = GeometryBuilder::new(store.layout(), topology).vertex_count();
        tracing::info!(
            target: "flow::render",
            vertices = vertex_count,
            ?topology,
            reprojection_resolution = desc.reprojection.resolution,
            velocity_width = desc.velocity_raster.width,
            velocity_height = desc.velocity_raster.height,
            "Particle system ready"
        );

        Self {
            config: desc.config.clone(),
            store,
            velocity,
            reprojection,
            simulation,
            render,
            vertex_count,
            time: 0.0,
            frames: 0,
            failed_programs,
        }
    }

    /// 推进一个固定时间步：一次模拟 + 一次交换
    ///
    /// 模拟程序不可用时不推进时钟，也不交换。
    pub fn update<H: HostContext + ?Sized>(&mut self, host: &H) {
        let Some(simulation) = self.simulation.as_ref() else {
            return;
        };
        let time = self.time + self.config.simulation.timestep as f64;

        let layout = self.store.layout();
        let uniforms = SimUniforms::new(
            &self.config,
            &self.velocity.field,
            time as f32,
            layout.total_particles(),
        );

        let mut encoder = host
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Simulation Encoder"),
            });
        simulation.encode(&mut encoder, host.queue(), &self.store, &uniforms);
        if !submit_scoped(host.device(), host.queue(), SIMULATE_PROGRAM, encoder) {
            self.simulation = None;
            self.failed_programs.push(SIMULATE_PROGRAM);
            return;
        }

        self.time = time;
        self.store.swap();

        let steps = self.store.swap_count();
        if steps % 600 == 0 {
            tracing::debug!(target: "flow::render", steps, time = self.time, "Simulation progress");
        }
    }

    /// 把当前状态绘制到宿主帧缓冲；渲染程序不可用时什么也不做
    pub fn render<H: HostContext + ?Sized>(&mut self, host: &H) {
        let Some(render) = self.render.as_ref() else {
            return;
        };
        let camera = host.camera();
        let uniforms = RenderUniforms::new(
            &camera,
            &self.config,
            &self.velocity.field,
            &self.reprojection.field,
            self.time as f32,
        );

        let mut encoder = host
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Trail Render Encoder"),
            });
        let target = host.bind_render_target();
        render.encode(
            &mut encoder,
            host.queue(),
            &self.store,
            &target,
            &camera,
            &uniforms,
        );
        if !submit_scoped(host.device(), host.queue(), RENDER_PROGRAM, encoder) {
            self.render = None;
            self.failed_programs.push(RENDER_PROGRAM);
            return;
        }
        self.frames += 1;
    }

    /// 读回当前状态纹理（长度为 `pot_size²`）
    pub async fn read_state(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> RenderResult<Vec<ParticleTexel>> {
        let size = self.store.layout().pot_size();
        let bytes =
            readback::read_texture(device, queue, &self.store.current().texture, size, size, 16)
                .await?;
        if bytes.len() != self.store.layout().texel_count() * 16 {
            return Err(RenderError::Readback(format!(
                "unexpected state size {} bytes",
                bytes.len()
            )));
        }
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn store(&self) -> &ParticleStateStore {
        &self.store
    }

    /// 失败的程序名称
    pub fn failed_programs(&self) -> &[&'static str] {
        &self.failed_programs
    }

    pub fn stats(&self) -> ParticleSystemStats {
        let layout = self.store.layout();
        ParticleSystemStats {
            num_streams: layout.num_streams(),
            trail_length: layout.trail_length(),
            total_particles: layout.total_particles(),
            pot_size: layout.pot_size(),
            vertex_count: self.vertex_count,
            topology: self.config.render.topology,
            time: self.time,
            steps: self.store.swap_count(),
            frames: self.frames,
            degraded: !self.failed_programs.is_empty(),
        }
    }
}
