/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和校验
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod render;
pub mod simulation;

pub use render::{RenderConfig, ReprojectionConfig, Topology};
pub use simulation::{LifecycleConfig, SimulationConfig};

use crate::flow::ParticleLayout;
use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 流场粒子系统主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    /// 模拟配置
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 生命周期配置
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// 渲染配置
    #[serde(default)]
    pub render: RenderConfig,

    /// 重投影配置
    #[serde(default)]
    pub reprojection: ReprojectionConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlowConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("FLOW_TRAIL_LENGTH") {
            if let Ok(trail_length) = val.parse() {
                self.simulation.trail_length = trail_length;
            }
        }
        if let Ok(val) = env::var("FLOW_NUM_STREAMS") {
            if let Ok(num_streams) = val.parse() {
                self.simulation.num_streams = num_streams;
            }
        }
        if let Ok(val) = env::var("FLOW_TIMESTEP") {
            if let Ok(timestep) = val.parse() {
                self.simulation.timestep = timestep;
            }
        }
        if let Ok(val) = env::var("FLOW_TOPOLOGY") {
            if let Some(topology) = Topology::parse(&val) {
                self.render.topology = topology;
            }
        }
        if let Ok(val) = env::var("FLOW_REPROJECTION_RESOLUTION") {
            if let Ok(resolution) = val.parse() {
                self.reprojection.resolution = resolution;
            }
        }
    }

    /// 验证配置，纹理边长按 WebGPU 默认上限检查
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_for_texture_limit(wgpu::Limits::default().max_texture_dimension_2d)
    }

    /// 验证配置，纹理边长按给定设备上限检查
    pub fn validate_for_texture_limit(&self, max_dimension: u32) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.lifecycle.validate()?;
        self.render.validate()?;
        self.reprojection.validate()?;

        if self.render.topology == Topology::Lines && self.simulation.trail_length < 2 {
            return Err(ConfigError::ValidationError(
                "line topology needs trail_length >= 2".to_string(),
            ));
        }
        self.validate_texture_limits(max_dimension)
    }

    /// 检查状态纹理和重投影纹理的边长不超过 `max_dimension`
    pub fn validate_texture_limits(&self, max_dimension: u32) -> ConfigResult<()> {
        let state_size = ParticleLayout::new(
            self.simulation.num_streams,
            self.simulation.trail_length,
        )
        .pot_size();
        if state_size > max_dimension {
            return Err(ConfigError::ValidationError(format!(
                "state texture side {state_size} exceeds the device limit of {max_dimension}"
            )));
        }
        if self.reprojection.resolution > max_dimension {
            return Err(ConfigError::ValidationError(format!(
                "reprojection resolution {} exceeds the device limit of {max_dimension}",
                self.reprojection.resolution
            )));
        }
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./flow.toml
    /// 2. ./flow.json
    /// 3. <用户配置目录>/velocity_flow/flow.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("flow.toml") {
            tracing::info!(target: "flow", "Loaded config from flow.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("flow.json") {
            tracing::info!(target: "flow", "Loaded config from flow.json");
            return config;
        }

        if let Some(config_path) = Self::user_config_path() {
            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "flow", path = ?config_path, "Loaded user config");
                return config;
            }
        }

        tracing::info!(target: "flow", "Using default configuration");
        Self::default()
    }

    /// 用户配置文件路径
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("velocity_flow").join("flow.toml"))
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FlowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.topology, Topology::Lines);
        assert_eq!(config.reprojection.resolution, 512);
    }

    #[test]
    fn test_toml_serialization() {
        let config = FlowConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: FlowConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.simulation.trail_length, config.simulation.trail_length);
        assert_eq!(parsed.render.topology, config.render.topology);
    }

    #[test]
    fn test_partial_toml() {
        let config = FlowConfig::from_toml_str(
            r#"
            [simulation]
            trail_length = 8
            num_streams = 16

            [render]
            topology = "points"
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.trail_length, 8);
        assert_eq!(config.simulation.num_streams, 16);
        assert_eq!(config.render.topology, Topology::Points);
        assert!((config.simulation.timestep - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(config.lifecycle.lifespan_min, 10.0);
    }

    #[test]
    fn test_json_parse() {
        let config =
            FlowConfig::from_json_str(r#"{"reprojection": {"resolution": 128}}"#).unwrap();
        assert_eq!(config.reprojection.resolution, 128);
    }

    #[test]
    fn test_parse_error() {
        let result = FlowConfig::from_toml_str("simulation = 3");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_texture_limits() {
        let limit = wgpu::Limits::default().max_texture_dimension_2d;

        let mut config = FlowConfig::default();
        config.reprojection.resolution = 16384;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
        assert!(config.validate_for_texture_limit(16384).is_ok());

        // 2^22 条流 × 32 个粒子需要 16384² 的状态纹理
        let mut config = FlowConfig::default();
        config.simulation.num_streams = 1 << 22;
        config.simulation.trail_length = 32;
        assert!(matches!(
            config.validate_texture_limits(limit),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(config.validate().is_err());
        assert!(config.validate_for_texture_limit(16384).is_ok());

        let config = FlowConfig::default();
        assert!(config.validate_texture_limits(limit).is_ok());
        assert!(config.validate_texture_limits(config.reprojection.resolution - 1).is_err());
    }

    #[test]
    fn test_line_mode_needs_two_particles() {
        let mut config = FlowConfig::default();
        config.simulation.trail_length = 1;
        assert!(config.validate().is_err());

        config.render.topology = Topology::Points;
        assert!(config.validate().is_ok());
    }
}
