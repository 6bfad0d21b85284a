//! Per-sample particle storage.

use glam::Vec3;

use crate::extract::{extract, Bounds, Extraction, SkinnedRange};
use crate::mesh::MeshSource;

/// Point samples taken from a mesh source, plus their simulation state.
///
/// The sample count is fixed at construction. Swapping to a different mesh
/// means building a new set; nothing here is resized in place.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    /// Home position of each sample in local space.
    pub(crate) original: Vec<Vec3>,
    /// Position the displacement is applied to. Tracks `original` for skinned
    /// samples.
    pub(crate) current: Vec<Vec3>,
    pub(crate) displacement: Vec<Vec3>,
    pub(crate) velocity: Vec<Vec3>,
    /// `1 - dist / radius` for samples inside the repulsion radius, else 0.
    pub(crate) proximity: Vec<f32>,
    pub(crate) bounds: Bounds,
    pub(crate) skinned_ranges: Vec<SkinnedRange>,
}

impl ParticleSet {
    /// Sample `source` at `stride` and build a set at rest.
    pub fn from_source(source: &MeshSource, stride: usize) -> Self {
        Self::from_extraction(extract(source, stride))
    }

    pub fn from_extraction(extraction: Extraction) -> Self {
        let Extraction {
            positions,
            skinned_ranges,
            bounds,
        } = extraction;
        let n = positions.len();
        Self {
            current: positions.clone(),
            original: positions,
            displacement: vec![Vec3::ZERO; n],
            velocity: vec![Vec3::ZERO; n],
            proximity: vec![0.0; n],
            bounds,
            skinned_ranges,
        }
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.original.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    pub fn original_positions(&self) -> &[Vec3] {
        &self.original
    }

    pub fn current_positions(&self) -> &[Vec3] {
        &self.current
    }

    pub fn displacements(&self) -> &[Vec3] {
        &self.displacement
    }

    pub fn proximities(&self) -> &[f32] {
        &self.proximity
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn skinned_ranges(&self) -> &[SkinnedRange] {
        &self.skinned_ranges
    }

    /// Number of samples re-posed by skinning each frame.
    pub fn skinned_sample_count(&self) -> usize {
        self.skinned_ranges.iter().map(SkinnedRange::len).sum()
    }

    /// `current + displacement` for sample `i`.
    #[inline]
    pub fn rendered_position(&self, i: usize) -> Vec3 {
        self.current[i] + self.displacement[i]
    }

    /// Original position of sample `i` mapped into `[0, 1]^3`.
    #[inline]
    pub fn normalized_position(&self, i: usize) -> Vec3 {
        self.bounds.normalize(self.original[i])
    }

    /// Zero displacement and velocity for every sample.
    pub fn reset_motion(&mut self) {
        self.displacement.fill(Vec3::ZERO);
        self.velocity.fill(Vec3::ZERO);
        self.proximity.fill(0.0);
    }
}
