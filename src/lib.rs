//! # VPE - Vertex Particle Engine
//!
//! Turns the vertices of a mesh into a cloud of soft point sprites that
//! scatter away from the pointer and spring back home.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vpe::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Viewer::new()
//!         .with_source(MeshSource::uv_sphere(1.0, 64, 128))
//!         .with_config(
//!             EngineConfig::new()
//!                 .with_stride(2)
//!                 .with_gradient(Palette::Sunset.gradient(1), 2.0),
//!         )
//!         .run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Sampling
//!
//! A [`MeshSource`] is flattened into leaf primitives. Every `stride`-th
//! vertex of every primitive becomes one sample. Static primitives are baked
//! into the engine's local space once; skinned primitives remember which
//! samples they produced so they can be re-posed every frame.
//!
//! ### Per frame
//!
//! [`ParticleEngine::update`] runs three stages in order:
//!
//! 1. **Skinning** - skinned samples are re-posed from their skeleton. The
//!    animated pose becomes the new rest position.
//! 2. **Repulsion** - samples inside the pointer radius are pushed away,
//!    everything else is pulled home by a damped spring.
//! 3. **Vertices** - `current + displacement` is packed for the GPU.
//!
//! ### Rendering
//!
//! [`PointRenderer`] draws the vertices as camera-facing quads with a radial
//! falloff. Color comes from a flat [`ColorMode`] or a spatial
//! [`GradientSpec`]; size pulses, grows near the pointer and shrinks with
//! distance.
//!
//! ## Headless use
//!
//! The engine has no window or GPU dependency of its own. Hosts with their
//! own render loop drive it directly:
//!
//! ```ignore
//! let mut engine = ParticleEngine::from_source(&source, config)?;
//! let mut clock = FrameClock::new();
//!
//! // every frame
//! engine.update(&clock.frame_input(pointer), Some(&source));
//! renderer.prepare(&device, &queue, &engine, &camera, viewport);
//! renderer.draw(&mut pass);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod gpu;
pub mod gradient;
pub mod mesh;
pub mod particle_set;
pub mod pointer;
pub mod simulation;
pub mod skinning;
pub mod time;
pub mod viewer;
pub mod visuals;

pub use bytemuck;
pub use glam::{Mat4, Vec2, Vec3, Vec4};

pub use config::EngineConfig;
pub use engine::ParticleEngine;
pub use error::{ConfigError, GpuError, MeshError, ViewerError};
pub use extract::{extract, Bounds, Extraction, SkinnedRange};
pub use gpu::{Camera, PointRenderer, PointUniforms, PointVertex};
pub use gradient::{GradientSpec, GradientStop, Palette, MAX_GRADIENT_STOPS};
pub use mesh::{Joint, MeshHandle, MeshNode, MeshSource, Primitive, Skeleton, SkeletonId, SkinnedPrimitive};
pub use particle_set::ParticleSet;
pub use pointer::PointerTracker;
pub use simulation::{FrameInput, SimulationParams, FAR_AWAY};
pub use time::FrameClock;
pub use viewer::Viewer;
pub use visuals::ColorMode;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use vpe::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::ParticleEngine;
    pub use crate::gpu::{Camera, PointRenderer};
    pub use crate::gradient::{GradientSpec, GradientStop, Palette};
    pub use crate::mesh::{Joint, MeshNode, MeshSource, Primitive, Skeleton, SkeletonId};
    pub use crate::pointer::PointerTracker;
    pub use crate::simulation::{FrameInput, SimulationParams};
    pub use crate::time::FrameClock;
    pub use crate::viewer::Viewer;
    pub use crate::visuals::ColorMode;
    pub use crate::{Mat4, Vec2, Vec3, Vec4};
}
