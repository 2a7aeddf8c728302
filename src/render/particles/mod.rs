//! GPU 流场粒子模块
//!
//! 所有粒子状态常驻 GPU，每帧一次全屏模拟 + 一次轨迹绘制。
//!
//! ## 架构设计
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Flow Particle System                    │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Simulation (Fullscreen Fragment Pass)                │
//! │     - 读取当前状态纹理、原点纹理和速度场                   │
//! │     - 休眠 / 苏醒 / 重生 / 平流                           │
//! │     - 写入下一个状态纹理，然后交换                         │
//! │                                                          │
//! │  2. Rendering (Vertex + Fragment Shader)                 │
//! │     - 按查找坐标读取粒子状态                               │
//! │     - 重投影纹理解码出世界坐标                             │
//! │     - 淡出 alpha，按速度场着色                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod draw;
pub mod fields;
pub mod geometry;
pub mod readback;
pub mod shaders;
pub mod simulate;
pub mod store;
pub mod system;

pub use draw::{RenderStage, RenderUniforms, TargetFormats};
pub use fields::{FieldTexture, ReprojectionTextures, VelocityTexture};
pub use geometry::{GeometryBuilder, TrailVertex};
pub use simulate::{SimUniforms, SimulationStage};
pub use store::{ParticleStateStore, StateTexture};
pub use system::{ParticleSystem, ParticleSystemDesc, ParticleSystemStats};
