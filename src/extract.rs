//! Vertex extraction: turning a mesh source into point samples.
//!
//! Every leaf is visited in depth-first order and every `stride`-th vertex is
//! taken, in the order the primitive lists them. Nothing is reordered or
//! deduplicated across primitives. Static leaves have their model transform
//! baked in; skinned leaves keep bind-pose positions and are recorded as
//! [`SkinnedRange`]s so they can be re-posed every frame.

use glam::Vec3;

use crate::mesh::{MeshHandle, MeshSource, Primitive};

/// Smallest extent used when normalizing against [`Bounds`].
///
/// A mesh collapsed onto a plane or a point would otherwise divide by zero.
pub const BOUNDS_EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Bounds of a point list. An empty list yields a zero box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self { min: Vec3::ZERO, max: Vec3::ZERO };
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self { min, max }
    }

    /// Size along each axis, clamped to [`BOUNDS_EPSILON`].
    #[inline]
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min).max(Vec3::splat(BOUNDS_EPSILON))
    }

    /// Map a point into `[0, 1]^3` relative to this box.
    #[inline]
    pub fn normalize(&self, point: Vec3) -> Vec3 {
        (point - self.min) / self.extent()
    }
}

/// Samples that came from one skinned leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinnedRange {
    /// Leaf the samples were taken from.
    pub mesh: MeshHandle,
    /// Index of the first sample of this range in the particle set.
    pub first_sample: usize,
    /// Vertex index within the leaf for each sample, in sample order.
    pub vertex_indices: Vec<u32>,
}

impl SkinnedRange {
    pub fn len(&self) -> usize {
        self.vertex_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }
}

/// Output of [`extract`].
#[derive(Debug, Clone)]
pub struct Extraction {
    pub positions: Vec<Vec3>,
    pub skinned_ranges: Vec<SkinnedRange>,
    pub bounds: Bounds,
}

/// Number of samples taken from `vertex_count` vertices at `stride`.
#[inline]
pub fn sample_count(vertex_count: usize, stride: usize) -> usize {
    vertex_count.div_ceil(stride.max(1))
}

/// Sample every `stride`-th vertex of every leaf in `source`.
///
/// A stride of 0 is treated as 1.
pub fn extract(source: &MeshSource, stride: usize) -> Extraction {
    let stride = stride.max(1);
    let expected: usize = source
        .leaves()
        .iter()
        .map(|l| sample_count(l.primitive.vertex_count(), stride))
        .sum();

    let mut positions = Vec::with_capacity(expected);
    let mut skinned_ranges = Vec::new();

    for (index, leaf) in source.leaves().iter().enumerate() {
        let vertex_count = leaf.primitive.vertex_count();
        match &leaf.primitive {
            Primitive::Static { .. } => {
                positions.extend(
                    (0..vertex_count)
                        .step_by(stride)
                        .map(|v| leaf.model_transform.transform_point3(leaf.primitive.vertex(v))),
                );
            }
            Primitive::Skinned(_) => {
                let first_sample = positions.len();
                let vertex_indices: Vec<u32> = (0..vertex_count).step_by(stride).map(|v| v as u32).collect();
                positions.extend(vertex_indices.iter().map(|&v| leaf.primitive.vertex(v as usize)));
                if !vertex_indices.is_empty() {
                    skinned_ranges.push(SkinnedRange {
                        mesh: MeshHandle(index),
                        first_sample,
                        vertex_indices,
                    });
                }
            }
        }
    }

    let bounds = Bounds::from_points(&positions);
    Extraction {
        positions,
        skinned_ranges,
        bounds,
    }
}
