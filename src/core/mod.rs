//! 核心模块
//!
//! 包含与具体渲染逻辑无关的基础设施：
//! - `error` - 错误类型定义
//! - `logging` - 日志初始化
//! - `macros` - 配置结构体使用的辅助宏

pub mod error;
pub mod logging;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    FlowError, FlowResult, RasterError, RasterResult, RenderError, RenderResult,
};
pub use logging::init_logging;
