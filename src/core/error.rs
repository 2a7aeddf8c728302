//! 统一错误处理模块
//!
//! 提供整个流场粒子系统的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - [`FlowError`]: 顶层错误，`setup` 等入口函数返回的类型
//! - [`RenderError`]: GPU 设备、资源和回读相关错误
//! - [`RasterError`]: 栅格、范围（extent）和速度边界的输入校验错误
//! - [`crate::config::ConfigError`]: 配置加载与校验错误

use crate::config::ConfigError;
use thiserror::Error;

/// 流场系统顶层错误类型
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Setup failed: {0}")]
    Setup(String),
}

/// 渲染系统错误
#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error("Failed to request adapter: no compatible GPU found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    DeviceRequest(String),

    #[error("Failed to read back particle state: {0}")]
    Readback(String),
}

/// 栅格输入错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Failed to decode raster image: {0}")]
    Decode(String),

    #[error("Raster data length {actual} does not match {width}x{height} RGBA ({expected} bytes)")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Raster has zero width or height")]
    EmptyRaster,

    #[error("Raster {width}x{height} exceeds the texture limit of {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },

    #[error("Invalid velocity bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Invalid service info: {0}")]
    ServiceInfo(String),
}

/// 流场系统结果类型别名
pub type FlowResult<T> = Result<T, FlowError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type RasterResult<T> = Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let raster_err = RasterError::EmptyRaster;
        let flow_err: FlowError = raster_err.into();
        assert!(matches!(flow_err, FlowError::Raster(_)));

        let config_err = ConfigError::ValidationError("timestep".to_string());
        let flow_err: FlowError = config_err.into();
        assert!(matches!(flow_err, FlowError::Config(_)));
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::NoAdapter;
        assert_eq!(
            err.to_string(),
            "Failed to request adapter: no compatible GPU found"
        );

        let err = RasterError::DimensionMismatch {
            width: 2,
            height: 2,
            expected: 16,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "Raster data length 12 does not match 2x2 RGBA (16 bytes)"
        );
    }
}
