//! CPU 参考模拟
//!
//! 与 GPU 模拟阶段使用同一套纹素打包格式和同一个 [`advance`] 状态机，
//! 不需要 GPU 即可验证轨迹、休眠和重生行为，也用于与 GPU 回读结果对比。

use super::field::{VelocityField, VelocityRaster};
use super::layout::ParticleLayout;
use super::pingpong::PingPong;
use super::spawn::InitialParticles;
use super::state::{advance, LifespanParams, ParticleTexel, TickParams, Transition};
use crate::config::FlowConfig;

/// 速度采样接口：域 UV → 物理速度（m/s）
pub trait VelocitySampler {
    fn velocity_at(&self, uv: [f32; 2]) -> [f32; 2];
}

impl<F> VelocitySampler for F
where
    F: Fn([f32; 2]) -> [f32; 2],
{
    fn velocity_at(&self, uv: [f32; 2]) -> [f32; 2] {
        self(uv)
    }
}

/// 栅格速度场采样器，行为与 GPU 上的最近邻采样器一致
#[derive(Debug, Clone)]
pub struct RasterVelocity {
    pub raster: VelocityRaster,
    pub field: VelocityField,
}

impl VelocitySampler for RasterVelocity {
    fn velocity_at(&self, uv: [f32; 2]) -> [f32; 2] {
        self.raster.sample(uv, &self.field)
    }
}

/// 单个模拟步的转换统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCensus {
    pub waiting: usize,
    pub woke: usize,
    pub respawned: usize,
    pub advected: usize,
    pub held: usize,
}

impl StepCensus {
    fn record(&mut self, transition: Transition) {
        match transition {
            Transition::Waiting => self.waiting += 1,
            Transition::Woke => self.woke += 1,
            Transition::Respawned => self.respawned += 1,
            Transition::Advected => self.advected += 1,
            Transition::Held => self.held += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.waiting + self.woke + self.respawned + self.advected + self.held
    }
}

/// 当前状态中休眠与存活的粒子数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub dormant: usize,
    pub alive: usize,
}

/// CPU 参考模拟
pub struct ReferenceSimulation<S: VelocitySampler> {
    layout: ParticleLayout,
    config: FlowConfig,
    origin: Vec<ParticleTexel>,
    states: PingPong<Vec<ParticleTexel>>,
    sampler: S,
    time: f64,
}

impl<S: VelocitySampler> ReferenceSimulation<S> {
    /// 原点和两个状态槽位都从初始状态复制
    pub fn new(config: FlowConfig, initial: &InitialParticles, sampler: S) -> Self {
        let texels = initial.texels().to_vec();
        Self {
            layout: initial.layout(),
            config,
            origin: texels.clone(),
            states: PingPong::new(texels.clone(), texels),
            sampler,
            time: 0.0,
        }
    }

    pub fn layout(&self) -> ParticleLayout {
        self.layout
    }

    /// 当前模拟时间
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 已完成的交换次数，等于模拟步数
    pub fn swap_count(&self) -> u64 {
        self.states.generation()
    }

    /// 当前状态（长度为 `pot_size²`）
    pub fn state(&self) -> &[ParticleTexel] {
        self.states.current()
    }

    pub fn origin(&self) -> &[ParticleTexel] {
        &self.origin
    }

    /// 推进一步：先推进时间，再从当前槽位写入下一槽位，最后交换
    pub fn step(&mut self) -> StepCensus {
        self.time += self.config.simulation.timestep as f64;
        let tick = TickParams::from_config(&self.config, self.time as f32);
        let lifespan = LifespanParams {
            min: self.config.lifecycle.lifespan_min,
            jitter: self.config.lifecycle.lifespan_jitter,
        };
        let total = self.layout.total_particles() as usize;

        let mut census = StepCensus::default();
        let sampler = &self.sampler;
        let origin = &self.origin;
        let (read, write) = self.states.split_mut();
        for (index, (src, dst)) in read.iter().zip(write.iter_mut()).enumerate() {
            if index >= total {
                *dst = *src;
                continue;
            }
            let span = lifespan.lifespan(src.lifecycle);
            let (next, transition) = advance(*src, origin[index].position, &tick, span, |uv| {
                sampler.velocity_at(uv)
            });
            *dst = next;
            census.record(transition);
        }
        self.states.swap();
        census
    }

    /// 推进多步，返回累计统计
    pub fn run(&mut self, steps: usize) -> StepCensus {
        let mut total = StepCensus::default();
        for _ in 0..steps {
            let census = self.step();
            total.waiting += census.waiting;
            total.woke += census.woke;
            total.respawned += census.respawned;
            total.advected += census.advected;
            total.held += census.held;
        }
        tracing::debug!(
            target: "flow",
            steps,
            time = self.time,
            respawned = total.respawned,
            "Reference simulation advanced"
        );
        total
    }

    /// 统计当前状态中的休眠和存活粒子
    pub fn census(&self) -> Census {
        let total = self.layout.total_particles() as usize;
        self.state()[..total]
            .iter()
            .fold(Census::default(), |mut census, texel| {
                if texel.is_dormant() {
                    census.dormant += 1;
                } else {
                    census.alive += 1;
                }
                census
            })
    }

    /// 读取某条轨迹上某个粒子的当前状态
    pub fn particle(&self, stream: u32, offset: u32) -> ParticleTexel {
        self.state()[self.layout.index(stream, offset) as usize]
    }
}
