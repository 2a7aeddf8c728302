//! 流场渲染编排
//!
//! [`FlowRenderer`] 是宿主直接调用的入口：
//!
//! 1. `setup`：等待异步数据源（范围 + 速度栅格 + 速度边界），校验输入，
//!    构建重投影栅格和初始粒子，创建 GPU 资源，然后标记就绪并请求第一帧
//! 2. `render_frame`：未暂停时模拟一步，绘制，结束单步，重置宿主状态，
//!    运行中则再请求一帧
//! 3. `handle`：应用暂停 / 继续 / 单步命令
//!
//! 就绪之前的帧直接跳过。

use crate::config::FlowConfig;
use crate::control::{ControlCommand, PlaybackState};
use crate::core::error::{FlowError, FlowResult};
use crate::flow::{
    Extent, InitialParticles, ParticleLayout, ReprojectionData, SphereSpawner, SphericalSurface,
    SurfaceProjection, VelocityBounds, VelocityField, VelocityRaster,
};
use crate::host::HostContext;
use crate::render::particles::{
    ParticleSystem, ParticleSystemDesc, ParticleSystemStats, TargetFormats,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;

/// 异步数据源解析出的输入
#[derive(Debug, Clone)]
pub struct FlowSource {
    pub extent: Extent,
    pub velocity: VelocityRaster,
    pub bounds: VelocityBounds,
}

/// 流场渲染器
pub struct FlowRenderer {
    config: FlowConfig,
    system: Option<ParticleSystem>,
    playback: PlaybackState,
}

impl FlowRenderer {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            system: None,
            playback: PlaybackState::Running,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// 资源是否已准备好
    pub fn is_ready(&self) -> bool {
        self.system.is_some()
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn system(&self) -> Option<&ParticleSystem> {
        self.system.as_ref()
    }

    pub fn stats(&self) -> Option<ParticleSystemStats> {
        self.system.as_ref().map(ParticleSystem::stats)
    }

    /// 使用与范围空间参考一致的球面投影完成初始化
    pub async fn setup<H, F>(&mut self, host: &mut H, source: F) -> FlowResult<()>
    where
        H: HostContext + ?Sized,
        F: Future<Output = FlowResult<FlowSource>>,
    {
        match source.await {
            Ok(source) => {
                let projection = SphericalSurface::new(source.extent.spatial_reference);
                self.setup_with_projection(host, ready_source(source), &projection).await
            }
            Err(error) => self.finish_setup(host, Err(error)),
        }
    }

    /// 使用自定义投影完成初始化
    pub async fn setup_with_projection<H, F, P>(
        &mut self,
        host: &mut H,
        source: F,
        projection: &P,
    ) -> FlowResult<()>
    where
        H: HostContext + ?Sized,
        F: Future<Output = FlowResult<FlowSource>>,
        P: SurfaceProjection + ?Sized,
    {
        if self.is_ready() {
            return Err(FlowError::Setup("renderer is already set up".to_string()));
        }
        tracing::info!(target: "flow", "Preparing flow resources");
        let result = match source.await {
            Ok(source) => self.prepare(host, &source, projection).await,
            Err(error) => Err(error),
        };
        self.finish_setup(host, result)
    }

    fn finish_setup<H: HostContext + ?Sized>(
        &mut self,
        host: &mut H,
        result: FlowResult<()>,
    ) -> FlowResult<()> {
        match result {
            Ok(()) => {
                tracing::info!(target: "flow", "Flow renderer ready");
                host.request_render();
                Ok(())
            }
            Err(error) => {
                tracing::error!(target: "flow", %error, "Flow setup failed");
                Err(error)
            }
        }
    }

    async fn prepare<H, P>(
        &mut self,
        host: &H,
        source: &FlowSource,
        projection: &P,
    ) -> FlowResult<()>
    where
        H: HostContext + ?Sized,
        P: SurfaceProjection + ?Sized,
    {
        // 分配任何纹理之前按设备上限检查边长
        let max_dimension = host.device().limits().max_texture_dimension_2d;
        self.config.validate_for_texture_limit(max_dimension)?;
        source.velocity.check_dimensions(max_dimension)?;
        source.extent.validate()?;
        source.bounds.validate()?;

        let velocity_field = VelocityField::from_bounds(&source.bounds);
        let reprojection = ReprojectionData::build(
            &source.extent,
            projection,
            self.config.reprojection.resolution,
        )?;

        let simulation = &self.config.simulation;
        let layout = ParticleLayout::new(simulation.num_streams, simulation.trail_length);
        let mut rng = match simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let spawner = SphereSpawner::new(projection, source.extent);
        let initial = InitialParticles::generate(layout, &self.config.lifecycle, &mut rng, |rng| {
            spawner.sample(rng)
        });

        let formats = TargetFormats {
            color: host.color_format(),
            depth: host.depth_format(),
        };
        let system = ParticleSystem::new(
            host.device(),
            host.queue(),
            ParticleSystemDesc {
                config: &self.config,
                initial: &initial,
                velocity_raster: &source.velocity,
                velocity_field,
                reprojection: &reprojection,
                formats,
            },
        )
        .await;

        if !system.failed_programs().is_empty() {
            tracing::warn!(
                target: "flow",
                programs = ?system.failed_programs(),
                "Flow renderer running in degraded state"
            );
        }

        self.system = Some(system);
        Ok(())
    }

    /// 处理一帧；未就绪时返回 `false`
    pub fn render_frame<H: HostContext + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(system) = self.system.as_mut() else {
            return false;
        };

        if self.playback.should_simulate() {
            system.update(host);
        }
        system.render(host);

        let previous = self.playback;
        self.playback = self.playback.after_frame();
        if previous != self.playback {
            tracing::debug!(target: "flow::control", "Single step finished");
        }

        host.reset_state();
        if self.playback.requests_next_frame() {
            host.request_render();
        }
        true
    }

    /// 应用控制命令，需要时向宿主请求新的一帧
    pub fn handle<H: HostContext + ?Sized>(&mut self, command: ControlCommand, host: &mut H) {
        let outcome = self.playback.apply(command);
        self.playback = outcome.state;
        if outcome.request_render {
            host.request_render();
        }
    }
}

/// 把已经就绪的输入包装成数据源
pub async fn ready_source(source: FlowSource) -> FlowResult<FlowSource> {
    Ok(source)
}

/// 从编码图像和服务元数据 JSON 构建数据源
pub fn source_from_service(
    extent: Extent,
    image_bytes: &[u8],
    service_info_json: &str,
) -> FlowResult<FlowSource> {
    let velocity = VelocityRaster::from_image_bytes(image_bytes)?;
    let bounds = VelocityBounds::from_service_info_json(service_info_json)?;
    Ok(FlowSource {
        extent,
        velocity,
        bounds,
    })
}
