//! 粒子状态编码与状态机
//!
//! 每个粒子占用状态纹理的一个 `Rgba32Float` 纹素：
//!
//! | 通道 | 含义 |
//! |------|------|
//! | r, g | 域 UV 坐标 |
//! | b    | 生命周期时间：负数表示休眠，`-b` 为苏醒时刻；非负表示出生时刻 |
//! | a    | 轨迹权重，初始化后不再改变 |
//!
//! 寿命不单独存储，而是由出生时刻哈希得到，因此模拟和渲染可以各自重算。
//! 本模块是 GPU 着色器逻辑的 CPU 等价实现，供参考模拟和测试使用。

use crate::config::FlowConfig;

/// 状态纹理中的一个纹素
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleTexel {
    /// 域 UV 坐标
    pub position: [f32; 2],
    /// 带符号的生命周期时间
    pub lifecycle: f32,
    /// 轨迹权重 `(0, 1]`
    pub trail_weight: f32,
}

/// 从符号编码解出的生命周期阶段
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LifecyclePhase {
    /// 尚未出生，模拟时间到达 `wakes_at` 后苏醒
    Dormant { wakes_at: f32 },
    /// 存活，`born_at` 为出生时刻
    Alive { born_at: f32 },
}

impl ParticleTexel {
    pub fn new(position: [f32; 2], lifecycle: f32, trail_weight: f32) -> Self {
        Self {
            position,
            lifecycle,
            trail_weight,
        }
    }

    /// 解码生命周期阶段
    pub fn phase(&self) -> LifecyclePhase {
        if self.lifecycle < 0.0 {
            LifecyclePhase::Dormant {
                wakes_at: -self.lifecycle,
            }
        } else {
            LifecyclePhase::Alive {
                born_at: self.lifecycle,
            }
        }
    }

    pub fn is_dormant(&self) -> bool {
        self.lifecycle < 0.0
    }

    /// 轨迹滞后量：头部为 0，越靠近尾部越大
    pub fn trail_lag(&self) -> f32 {
        1.0 - self.trail_weight
    }
}

/// 与着色器一致的伪随机哈希，返回 `[0, 1)`
#[inline]
pub fn hash_random(co: [f32; 2]) -> f32 {
    let x = (co[0] * 12.9898 + co[1] * 78.233).sin() * 43758.5453;
    x - x.floor()
}

/// 寿命参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LifespanParams {
    pub min: f32,
    pub jitter: f32,
}

impl LifespanParams {
    /// 由出生时刻确定性地计算寿命
    #[inline]
    pub fn lifespan(&self, born_at: f32) -> f32 {
        self.min + hash_random([born_at, -born_at]) * self.jitter
    }
}

/// 单个模拟步的输入参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickParams {
    /// 本步的全局模拟时间
    pub time: f32,
    pub timestep: f32,
    /// 激活窗口长度
    pub delay_window: f32,
    pub velocity_time_scale: f32,
    pub respawn_delay_min: f32,
    pub respawn_delay_jitter: f32,
}

impl TickParams {
    pub fn from_config(config: &FlowConfig, time: f32) -> Self {
        Self {
            time,
            timestep: config.simulation.timestep,
            delay_window: config.simulation.delay_window(),
            velocity_time_scale: config.simulation.velocity_time_scale,
            respawn_delay_min: config.lifecycle.respawn_delay_min,
            respawn_delay_jitter: config.lifecycle.respawn_delay_jitter,
        }
    }
}

/// 单步状态转换的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// 仍在休眠
    Waiting,
    /// 本步苏醒（位置不变）
    Woke,
    /// 寿命耗尽，回到原点并重新休眠
    Respawned,
    /// 在激活窗口内，沿速度场移动
    Advected,
    /// 存活但在激活窗口外，位置不变
    Held,
}

/// 是否处于激活窗口内
#[inline]
pub fn in_activation_window(lag: f32, elapsed: f32, remaining: f32, delay_window: f32) -> bool {
    elapsed > lag * delay_window && remaining > (1.0 - lag) * delay_window
}

/// 推进一个粒子一个模拟步
///
/// `lifespan` 由调用方根据出生时刻计算（休眠粒子忽略该值），
/// `velocity_at` 返回给定域坐标处的物理速度（m/s）。
pub fn advance<F>(
    texel: ParticleTexel,
    origin: [f32; 2],
    tick: &TickParams,
    lifespan: f32,
    velocity_at: F,
) -> (ParticleTexel, Transition)
where
    F: Fn([f32; 2]) -> [f32; 2],
{
    let mut next = texel;

    if texel.lifecycle < 0.0 {
        if tick.time >= -texel.lifecycle {
            next.lifecycle = tick.time;
            return (next, Transition::Woke);
        }
        return (next, Transition::Waiting);
    }

    let elapsed = tick.time - texel.lifecycle;
    let remaining = lifespan - elapsed;

    if elapsed >= lifespan {
        next.position = origin;
        let jitter = hash_random([origin[0] + tick.time, origin[1] + tick.time]);
        next.lifecycle =
            -(tick.time + tick.respawn_delay_min + jitter * tick.respawn_delay_jitter);
        return (next, Transition::Respawned);
    }

    if in_activation_window(texel.trail_lag(), elapsed, remaining, tick.delay_window) {
        let velocity = velocity_at(texel.position);
        let step = tick.timestep * tick.velocity_time_scale;
        // V 轴向南增长，北向速度为正
        next.position[0] += velocity[0] * step;
        next.position[1] -= velocity[1] * step;
        return (next, Transition::Advected);
    }

    (next, Transition::Held)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(time: f32) -> TickParams {
        TickParams {
            time,
            timestep: 1.0 / 60.0,
            delay_window: 1.0,
            velocity_time_scale: 0.001,
            respawn_delay_min: 1.0,
            respawn_delay_jitter: 2.0,
        }
    }

    fn still(_: [f32; 2]) -> [f32; 2] {
        [0.0, 0.0]
    }

    #[test]
    fn test_texel_layout_matches_rgba32() {
        assert_eq!(std::mem::size_of::<ParticleTexel>(), 16);
        let texel = ParticleTexel::new([0.1, 0.2], -3.0, 0.5);
        let raw: [f32; 4] = bytemuck::cast(texel);
        assert_eq!(raw, [0.1, 0.2, -3.0, 0.5]);
    }

    #[test]
    fn test_phase_decoding() {
        let dormant = ParticleTexel::new([0.0, 0.0], -4.5, 1.0);
        assert_eq!(dormant.phase(), LifecyclePhase::Dormant { wakes_at: 4.5 });
        let alive = ParticleTexel::new([0.0, 0.0], 2.0, 1.0);
        assert_eq!(alive.phase(), LifecyclePhase::Alive { born_at: 2.0 });
    }

    #[test]
    fn test_hash_random_range_and_determinism() {
        for i in 0..1000 {
            let t = i as f32 * 0.37;
            let r = hash_random([t, -t]);
            assert!((0.0..1.0).contains(&r));
            assert_eq!(r, hash_random([t, -t]));
        }
    }

    #[test]
    fn test_lifespan_bounds() {
        let params = LifespanParams {
            min: 10.0,
            jitter: 10.0,
        };
        for i in 0..500 {
            let span = params.lifespan(i as f32 * 0.1);
            assert!((10.0..20.0).contains(&span));
        }
    }

    #[test]
    fn test_dormant_wakes_without_moving() {
        let texel = ParticleTexel::new([0.3, 0.4], -2.0, 1.0);
        let (next, t) = advance(texel, [0.0, 0.0], &tick(1.5), 12.0, still);
        assert_eq!(t, Transition::Waiting);
        assert_eq!(next, texel);

        let (next, t) = advance(texel, [0.0, 0.0], &tick(2.0), 12.0, still);
        assert_eq!(t, Transition::Woke);
        assert_eq!(next.lifecycle, 2.0);
        assert_eq!(next.position, [0.3, 0.4]);
    }

    #[test]
    fn test_respawn_resets_to_origin() {
        let texel = ParticleTexel::new([0.9, 0.9], 0.0, 0.5);
        let (next, t) = advance(texel, [0.25, 0.75], &tick(12.0), 12.0, still);
        assert_eq!(t, Transition::Respawned);
        assert_eq!(next.position, [0.25, 0.75]);
        assert!(next.lifecycle < 0.0);
        // 新的休眠时间在 [time + 1, time + 3) 内
        assert!(-next.lifecycle >= 13.0 && -next.lifecycle < 15.0);
        assert_eq!(next.trail_weight, 0.5);
    }

    #[test]
    fn test_advection_flips_v_axis() {
        let texel = ParticleTexel::new([0.5, 0.5], 0.0, 1.0);
        let (next, t) = advance(texel, [0.0, 0.0], &tick(0.5), 12.0, |_| [10.0, 20.0]);
        assert_eq!(t, Transition::Advected);
        let step = 1.0 / 60.0 * 0.001;
        assert!((next.position[0] - (0.5 + 10.0 * step)).abs() < 1e-7);
        assert!((next.position[1] - (0.5 - 20.0 * step)).abs() < 1e-7);
    }

    #[test]
    fn test_tail_is_held_early() {
        // 尾部粒子（权重 0.25，滞后 0.75）在 elapsed <= 0.75 时不移动
        let texel = ParticleTexel::new([0.5, 0.5], 0.0, 0.25);
        let (_, t) = advance(texel, [0.0, 0.0], &tick(0.5), 12.0, |_| [1.0, 1.0]);
        assert_eq!(t, Transition::Held);
        let (_, t) = advance(texel, [0.0, 0.0], &tick(0.8), 12.0, |_| [1.0, 1.0]);
        assert_eq!(t, Transition::Advected);
    }

    #[test]
    fn test_head_stops_before_end_of_life() {
        // 头部粒子在剩余寿命不超过一个激活窗口时停止
        let texel = ParticleTexel::new([0.5, 0.5], 0.0, 1.0);
        let (_, t) = advance(texel, [0.0, 0.0], &tick(11.5), 12.0, |_| [1.0, 1.0]);
        assert_eq!(t, Transition::Held);
        let (_, t) = advance(texel, [0.0, 0.0], &tick(10.5), 12.0, |_| [1.0, 1.0]);
        assert_eq!(t, Transition::Advected);
    }
}
