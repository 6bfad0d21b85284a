//! The particle engine: lifecycle and per-frame driver.
//!
//! A [`ParticleEngine`] renders nothing until a mesh source is loaded. Loading
//! a new source rebuilds the particle set from scratch; there is no in-place
//! diffing. Each frame the host calls [`ParticleEngine::update`] and then
//! reads [`ParticleEngine::vertices`] (or hands the engine to a
//! [`PointRenderer`](crate::gpu::PointRenderer)).
//!
//! ```ignore
//! let mut engine = ParticleEngine::new(EngineConfig::new().with_stride(3))?;
//! engine.load(&source);
//!
//! // every frame
//! engine.update(&FrameInput::new(dt, elapsed, pointer), Some(&source));
//! renderer.prepare(&device, &queue, &engine, &camera, viewport);
//! ```

use glam::{Mat4, Vec3};

use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::gpu::PointVertex;
use crate::mesh::MeshSource;
use crate::particle_set::ParticleSet;
use crate::simulation::{FrameInput, SimulationParams};
use crate::visuals::{self, ColorMode, SizeInputs};

/// Owns one particle set and drives it frame by frame.
#[derive(Debug)]
pub struct ParticleEngine {
    config: EngineConfig,
    set: Option<ParticleSet>,
    vertices: Vec<PointVertex>,
    /// Bumped on every rebuild or release so renderers know to reallocate.
    generation: u64,
    elapsed_time: f32,
}

impl ParticleEngine {
    /// Engine with nothing loaded.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            set: None,
            vertices: Vec::new(),
            generation: 0,
            elapsed_time: 0.0,
        })
    }

    /// Engine built straight from a source.
    pub fn from_source(source: &MeshSource, config: EngineConfig) -> Result<Self, ConfigError> {
        let mut engine = Self::new(config)?;
        engine.load(source);
        Ok(engine)
    }

    /// Rebuild the particle set from `source`, discarding all motion state.
    pub fn load(&mut self, source: &MeshSource) {
        let set = ParticleSet::from_source(source, self.config.stride);
        log::info!(
            "particle set built: {} samples ({} skinned in {} ranges) at stride {}",
            set.len(),
            set.skinned_sample_count(),
            set.skinned_ranges().len(),
            self.config.stride
        );
        self.vertices.clear();
        self.vertices.reserve(set.len());
        self.set = Some(set);
        self.generation += 1;
        self.write_vertices();
    }

    /// Load the outcome of an asynchronous mesh load.
    ///
    /// A failed load is logged and leaves the engine empty; it never
    /// propagates into the render loop.
    pub fn load_result<E: std::fmt::Display>(&mut self, result: Result<&MeshSource, E>) {
        match result {
            Ok(source) => self.load(source),
            Err(e) => {
                log::warn!("mesh source failed to load, rendering nothing: {}", e);
                self.release();
            }
        }
    }

    /// Drop the particle set and every buffer it owned.
    pub fn release(&mut self) {
        if self.set.take().is_some() {
            log::debug!("particle set released");
            self.generation += 1;
        }
        self.vertices = Vec::new();
    }

    pub fn is_loaded(&self) -> bool {
        self.set.is_some()
    }

    /// Number of samples, 0 when nothing is loaded.
    pub fn sample_count(&self) -> usize {
        self.set.as_ref().map_or(0, ParticleSet::len)
    }

    pub fn particle_set(&self) -> Option<&ParticleSet> {
        self.set.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &SimulationParams {
        &self.config.params
    }

    pub fn color_mode(&self) -> &ColorMode {
        &self.config.color
    }

    pub fn world_transform(&self) -> Mat4 {
        self.config.world_transform
    }

    /// Move the particle set in the world. Takes effect on the next update.
    pub fn set_world_transform(&mut self, transform: Mat4) {
        self.config.world_transform = transform;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Elapsed time of the last update.
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    /// Turn the repulsion step on or off.
    ///
    /// Switching off leaves displacements frozen where they are; pair with
    /// [`ParticleEngine::reset_motion`] to send particles home at once.
    pub fn set_interactive(&mut self, enabled: bool) {
        if self.config.params.repulsion_enabled != enabled {
            log::debug!("repulsion {}", if enabled { "enabled" } else { "disabled" });
            self.config.params.repulsion_enabled = enabled;
        }
    }

    /// Zero every displacement and velocity.
    ///
    /// Disabling repulsion leaves particles where they are; hosts that want
    /// them home immediately call this.
    pub fn reset_motion(&mut self) {
        if let Some(set) = &mut self.set {
            set.reset_motion();
        }
        self.write_vertices();
    }

    /// Advance one frame: re-pose skinned samples from `source` (if given),
    /// run the repulsion step and refresh the vertex buffer.
    pub fn update(&mut self, frame: &FrameInput, source: Option<&MeshSource>) {
        self.elapsed_time = frame.elapsed_time;
        let Some(set) = &mut self.set else {
            return;
        };

        let world_from_local = self.config.world_transform;
        if let Some(source) = source {
            if !set.skinned_ranges().is_empty() {
                set.apply_skinning(source, world_from_local.inverse());
            }
        }
        set.step(frame, &self.config.params, world_from_local);
        self.write_vertices();
    }

    /// Per-sample instance data for the current frame.
    pub fn vertices(&self) -> &[PointVertex] {
        &self.vertices
    }

    /// Resolved color of sample `i`.
    pub fn sample_color(&self, i: usize) -> Option<Vec3> {
        let set = self.set.as_ref()?;
        if i >= set.len() {
            return None;
        }
        Some(self.config.color.resolve(set.normalized_position(i)))
    }

    /// Point size of sample `i` in pixels, as the shader computes it.
    pub fn sample_point_size(&self, i: usize, camera_position: Vec3, viewport_height: f32) -> Option<f32> {
        let set = self.set.as_ref()?;
        if i >= set.len() {
            return None;
        }
        let world = self.config.world_transform.transform_point3(set.rendered_position(i));
        let params = &self.config.params;
        Some(visuals::point_size(&SizeInputs {
            point_size: params.point_size,
            pulse_enabled: params.pulse_enabled,
            interactive: params.repulsion_enabled,
            elapsed_time: self.elapsed_time,
            original: set.original[i],
            proximity: set.proximity[i],
            depth: world.distance(camera_position),
            viewport_height,
        }))
    }

    fn write_vertices(&mut self) {
        self.vertices.clear();
        let Some(set) = &self.set else {
            return;
        };
        self.vertices.extend((0..set.len()).map(|i| {
            PointVertex::new(
                set.rendered_position(i),
                set.original[i],
                set.displacement[i],
                set.proximity[i],
            )
        }));
    }
}
