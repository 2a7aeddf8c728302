//! # Velocity Flow
//!
//! GPU-resident flow-field particle trails rendered over a curved geographic surface.
//!
//! ## Features
//!
//! - **Packed GPU state**: every particle is one `Rgba32Float` texel, advanced by a
//!   full-screen fragment pass with ping-pong state textures
//! - **Staggered trails**: trail particles share a birth point and activate one after
//!   another, drawing growing and fading streaks
//! - **Reprojection**: a flat domain grid is mapped onto the globe through precomputed
//!   X/Y/Z textures packed with a 4-byte float codec
//! - **CPU reference model**: the same state machine runs on the CPU for tests and
//!   diagnostics
//!
//! ## Example
//!
//! ```ignore
//! use velocity_flow::prelude::*;
//!
//! let mut host = HeadlessHost::new_blocking(1024, 768, camera)?;
//! let mut renderer = FlowRenderer::new(FlowConfig::default());
//! pollster::block_on(renderer.setup(&mut host, ready_source(source)))?;
//! while host.take_render_request() {
//!     renderer.render_frame(&mut host);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Errors, logging and shared macros
//! - [`config`]: Configuration loading and validation
//! - [`flow`]: CPU-side model (codec, layout, state machine, projection, fields)
//! - [`render`]: GPU pipeline and the frame orchestrator
//! - [`host`]: Host boundary and a headless host
//! - [`control`]: Pause / resume / single-step playback

/// Errors, logging and shared macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Playback control
pub mod control;
/// CPU-side flow model
pub mod flow;
/// Host boundary
pub mod host;
/// GPU pipeline and orchestration
pub mod render;

pub use config::FlowConfig;
pub use crate::core::error::{FlowError, FlowResult, RasterError, RenderError};

/// Common imports
pub mod prelude {
    pub use crate::config::{FlowConfig, Topology};
    pub use crate::control::{ControlCommand, PlaybackState};
    pub use crate::core::error::{FlowError, FlowResult};
    pub use crate::core::logging::init_logging;
    pub use crate::flow::{
        Extent, SpatialReference, SphericalSurface, VelocityBounds, VelocityField, VelocityRaster,
    };
    pub use crate::host::{Camera, HeadlessHost, HostContext};
    pub use crate::render::{ready_source, FlowRenderer, FlowSource};
}
