use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 模拟配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 每条轨迹的粒子数
    pub trail_length: u32,

    /// 轨迹（流）的数量
    pub num_streams: u32,

    /// 固定模拟步长（秒）
    pub timestep: f32,

    /// 速度（m/s）到域坐标位移的时间缩放系数
    pub velocity_time_scale: f32,

    /// 激活窗口系数：`delay_window = timestep * trail_length * activation_delay_factor`
    pub activation_delay_factor: f32,

    /// 初始化随机种子（None = 使用系统熵）
    pub seed: Option<u64>,
}

impl_default!(SimulationConfig {
    trail_length: 32,
    num_streams: 1024 * 1024 / 32,
    timestep: 1.0 / 60.0,
    velocity_time_scale: 0.0005,
    activation_delay_factor: 5.0,
    seed: None,
});

impl SimulationConfig {
    /// 粒子总数（流数 × 轨迹长度）
    pub fn total_particles(&self) -> u32 {
        self.num_streams * self.trail_length
    }

    /// 激活窗口长度（秒）
    pub fn delay_window(&self) -> f32 {
        self.timestep * self.trail_length as f32 * self.activation_delay_factor
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.trail_length == 0 || self.num_streams == 0 {
            return Err(ConfigError::ValidationError(
                "trail_length and num_streams must be positive".to_string(),
            ));
        }
        if self.num_streams.checked_mul(self.trail_length).is_none() {
            return Err(ConfigError::ValidationError(
                "num_streams * trail_length overflows".to_string(),
            ));
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::ValidationError(
                "timestep must be a positive number of seconds".to_string(),
            ));
        }
        if !self.velocity_time_scale.is_finite() || self.activation_delay_factor < 0.0 {
            return Err(ConfigError::ValidationError(
                "velocity_time_scale must be finite and activation_delay_factor non-negative"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// 粒子生命周期配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 初始出生时间的随机范围 `[0, initial_birth_window)`（秒）
    pub initial_birth_window: f32,
    /// 最短寿命（秒）
    pub lifespan_min: f32,
    /// 寿命随机增量：`lifespan = lifespan_min + rand * lifespan_jitter`
    pub lifespan_jitter: f32,
    /// 重生前的最短休眠时间（秒）
    pub respawn_delay_min: f32,
    /// 重生休眠随机增量（秒）
    pub respawn_delay_jitter: f32,
}

impl_default!(LifecycleConfig {
    initial_birth_window: 20.0,
    lifespan_min: 10.0,
    lifespan_jitter: 10.0,
    respawn_delay_min: 1.0,
    respawn_delay_jitter: 2.0,
});

impl LifecycleConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        let windows = [
            self.initial_birth_window,
            self.lifespan_jitter,
            self.respawn_delay_min,
            self.respawn_delay_jitter,
        ];
        if windows.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationError(
                "lifecycle windows must be finite and non-negative".to_string(),
            ));
        }
        if !(self.lifespan_min.is_finite() && self.lifespan_min > 0.0) {
            return Err(ConfigError::ValidationError(
                "lifespan_min must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_counts() {
        let config = SimulationConfig::default();
        assert_eq!(config.trail_length, 32);
        assert_eq!(config.num_streams, 32768);
        assert_eq!(config.total_particles(), 1 << 20);
    }

    #[test]
    fn test_delay_window() {
        let config = SimulationConfig {
            trail_length: 4,
            timestep: 0.5,
            activation_delay_factor: 5.0,
            ..Default::default()
        };
        assert!((config.delay_window() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_zero_timestep() {
        let config = SimulationConfig {
            timestep: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_window() {
        let config = LifecycleConfig {
            respawn_delay_jitter: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(LifecycleConfig::default().validate().is_ok());
    }
}
