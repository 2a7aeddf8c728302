//! 流场粒子的 CPU 侧模型
//!
//! 不依赖 GPU 的部分：浮点编码、索引布局、粒子状态机、投影、出生点采样、
//! 场描述以及用于验证的参考模拟。GPU 管线（[`crate::render::particles`]）
//! 与本模块共享打包格式和常量。

pub mod codec;
pub mod field;
pub mod layout;
pub mod pingpong;
pub mod projection;
pub mod reference;
pub mod spawn;
pub mod state;

pub use field::{
    ReprojectionData, ReprojectionField, VelocityBounds, VelocityField, VelocityRaster,
};
pub use layout::ParticleLayout;
pub use pingpong::PingPong;
pub use projection::{Extent, SpatialReference, SphericalSurface, SurfaceProjection};
pub use reference::{Census, RasterVelocity, ReferenceSimulation, StepCensus, VelocitySampler};
pub use spawn::{InitialParticles, SphereSpawner};
pub use state::{
    advance, hash_random, LifecyclePhase, LifespanParams, ParticleTexel, TickParams, Transition,
};
