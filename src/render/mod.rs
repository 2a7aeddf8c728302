pub mod particles;
pub mod renderer;

pub use particles::{GeometryBuilder, ParticleSystem, ParticleSystemStats, TrailVertex};
pub use renderer::{ready_source, source_from_service, FlowRenderer, FlowSource};
