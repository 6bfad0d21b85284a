//! Mesh sources that particle sets are sampled from.
//!
//! A [`MeshSource`] is a flattened scene graph: every leaf geometry becomes a
//! [`Leaf`] carrying its accumulated model transform and a [`Primitive`].
//! Skinned primitives point at a [`Skeleton`] owned by the same source; hosts
//! animate them by writing joint local transforms and calling
//! [`Skeleton::update_world_matrices`] once per frame.
//!
//! # Example
//!
//! ```ignore
//! use vpe::mesh::{MeshNode, MeshSource, Primitive};
//!
//! let root = MeshNode::group("model")
//!     .with_child(MeshNode::leaf("body", Primitive::from_positions(body_positions)))
//!     .with_child(
//!         MeshNode::leaf("tail", Primitive::from_positions(tail_positions))
//!             .with_transform(Mat4::from_translation(Vec3::new(0.0, 0.2, -1.0))),
//!     );
//! let source = MeshSource::new(root, Vec::new())?;
//! ```

use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

use crate::error::MeshError;

/// Identifies a leaf primitive inside a [`MeshSource`].
///
/// Handles are assigned in depth-first order when the source is built and stay
/// valid for the lifetime of that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub(crate) usize);

impl MeshHandle {
    /// Index of the leaf in depth-first order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identifies a skeleton inside a [`MeshSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkeletonId(pub usize);

/// Leaf geometry.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// Positions that never change after load.
    Static {
        /// Flat `[x, y, z, x, y, z, ...]` buffer.
        positions: Vec<f32>,
    },
    /// Positions deformed every frame by a bone hierarchy.
    Skinned(SkinnedPrimitive),
}

impl Primitive {
    /// Static primitive from a flat position buffer.
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Primitive::Static { positions }
    }

    /// Static primitive from a list of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        Primitive::Static {
            positions: points.iter().flat_map(|p| p.to_array()).collect(),
        }
    }

    /// Flat rest-pose position buffer.
    pub fn positions(&self) -> &[f32] {
        match self {
            Primitive::Static { positions } => positions,
            Primitive::Skinned(skinned) => &skinned.positions,
        }
    }

    /// Number of whole vertices in the buffer.
    pub fn vertex_count(&self) -> usize {
        self.positions().len() / 3
    }

    /// Rest position of vertex `index`.
    pub fn vertex(&self, index: usize) -> Vec3 {
        let p = self.positions();
        Vec3::new(p[index * 3], p[index * 3 + 1], p[index * 3 + 2])
    }

    pub fn is_skinned(&self) -> bool {
        matches!(self, Primitive::Skinned(_))
    }
}

/// Geometry bound to a skeleton with up to four joint influences per vertex.
#[derive(Debug, Clone)]
pub struct SkinnedPrimitive {
    /// Flat bind-pose position buffer.
    pub positions: Vec<f32>,
    /// Joint indices per vertex.
    pub joints: Vec<[u16; 4]>,
    /// Joint weights per vertex. Expected to sum to 1.
    pub weights: Vec<[f32; 4]>,
    /// Skeleton driving this primitive.
    pub skeleton: SkeletonId,
}

/// A node of the input scene graph.
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Mat4,
    pub primitive: Option<Primitive>,
    pub children: Vec<MeshNode>,
}

impl MeshNode {
    /// Node without geometry, used to group children.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            primitive: None,
            children: Vec::new(),
        }
    }

    /// Node carrying geometry.
    pub fn leaf(name: impl Into<String>, primitive: Primitive) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            primitive: Some(primitive),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: MeshNode) -> Self {
        self.children.push(child);
        self
    }
}

/// A leaf primitive with its transform resolved against the root.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub name: String,
    /// Accumulated transform from the leaf's space into model space.
    pub model_transform: Mat4,
    pub primitive: Primitive,
}

/// One joint of a [`Skeleton`].
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    /// Parent joint; must have a lower index than this joint.
    pub parent: Option<usize>,
    /// Transform relative to the parent (or to world space for roots).
    pub local: Mat4,
    /// Maps bind-pose positions into this joint's space.
    pub inverse_bind: Mat4,
    world: Mat4,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, local: Mat4, inverse_bind: Mat4) -> Self {
        Self {
            name: name.into(),
            parent,
            local,
            inverse_bind,
            world: local,
        }
    }

    /// World transform as of the last [`Skeleton::update_world_matrices`].
    pub fn world(&self) -> Mat4 {
        self.world
    }
}

/// Joint hierarchy driving skinned primitives.
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    /// Build a skeleton, rejecting parents that do not precede their children.
    pub fn new(joints: Vec<Joint>) -> Result<Self, MeshError> {
        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= index {
                    return Err(MeshError::BadParent { joint: index, parent });
                }
            }
        }
        let mut skeleton = Self { joints };
        skeleton.update_world_matrices();
        Ok(skeleton)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Replace the local transform of a joint. Out-of-range indices are ignored.
    pub fn set_local(&mut self, joint: usize, local: Mat4) {
        if let Some(j) = self.joints.get_mut(joint) {
            j.local = local;
        }
    }

    /// Resolve world matrices from local transforms. Parents come first, so a
    /// single forward pass is enough.
    pub fn update_world_matrices(&mut self) {
        for i in 0..self.joints.len() {
            let world = match self.joints[i].parent {
                Some(parent) => self.joints[parent].world * self.joints[i].local,
                None => self.joints[i].local,
            };
            self.joints[i].world = world;
        }
    }

    /// `world * inverse_bind` for one joint.
    #[inline]
    pub fn joint_matrix(&self, joint: usize) -> Mat4 {
        let j = &self.joints[joint];
        j.world * j.inverse_bind
    }
}

/// A loaded model ready to be sampled into a particle set.
#[derive(Debug, Clone, Default)]
pub struct MeshSource {
    leaves: Vec<Leaf>,
    skeletons: Vec<Skeleton>,
}

impl MeshSource {
    /// Flatten a scene graph and validate its skin data against `skeletons`.
    pub fn new(root: MeshNode, skeletons: Vec<Skeleton>) -> Result<Self, MeshError> {
        let mut leaves = Vec::new();
        flatten(root, Mat4::IDENTITY, &mut leaves);

        for leaf in &leaves {
            let len = leaf.primitive.positions().len();
            if len % 3 != 0 {
                return Err(MeshError::RaggedPositions(len));
            }
            if let Primitive::Skinned(skinned) = &leaf.primitive {
                let vertices = len / 3;
                if skinned.joints.len() != vertices || skinned.weights.len() != vertices {
                    return Err(MeshError::SkinLengthMismatch {
                        vertices,
                        joints: skinned.joints.len(),
                        weights: skinned.weights.len(),
                    });
                }
                let skeleton = skeletons
                    .get(skinned.skeleton.0)
                    .ok_or(MeshError::UnknownSkeleton(skinned.skeleton.0))?;
                let joint_count = skeleton.joint_count();
                for (joints, weights) in skinned.joints.iter().zip(&skinned.weights) {
                    for (&joint, &weight) in joints.iter().zip(weights) {
                        // Zero-weight slots are commonly filled with joint 0.
                        if weight != 0.0 && joint as usize >= joint_count {
                            return Err(MeshError::JointOutOfRange { joint, joint_count });
                        }
                    }
                }
            }
        }

        Ok(Self { leaves, skeletons })
    }

    /// Source without any geometry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Single static leaf from a flat position buffer.
    pub fn from_positions(positions: Vec<f32>) -> Result<Self, MeshError> {
        Self::new(
            MeshNode::leaf("mesh", Primitive::from_positions(positions)),
            Vec::new(),
        )
    }

    /// Leaves in depth-first order.
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaf(&self, handle: MeshHandle) -> Option<&Leaf> {
        self.leaves.get(handle.0)
    }

    pub fn skeleton(&self, id: SkeletonId) -> Option<&Skeleton> {
        self.skeletons.get(id.0)
    }

    pub fn skeleton_mut(&mut self, id: SkeletonId) -> Option<&mut Skeleton> {
        self.skeletons.get_mut(id.0)
    }

    pub fn skeletons(&self) -> &[Skeleton] {
        &self.skeletons
    }

    /// Total number of rest-pose vertices across all leaves.
    pub fn vertex_count(&self) -> usize {
        self.leaves.iter().map(|l| l.primitive.vertex_count()).sum()
    }

    pub fn has_skinned(&self) -> bool {
        self.leaves.iter().any(|l| l.primitive.is_skinned())
    }

    // ========== Procedural Sources ==========

    /// Latitude/longitude sphere centred on the origin.
    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut points = Vec::with_capacity(((rings + 1) * segments) as usize);
        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            for seg in 0..segments {
                let theta = TAU * seg as f32 / segments as f32;
                points.push(Vec3::new(
                    radius * phi.sin() * theta.cos(),
                    radius * phi.cos(),
                    radius * phi.sin() * theta.sin(),
                ));
            }
        }
        Self::single_static("sphere", &points)
    }

    /// Torus lying in the XZ plane.
    pub fn torus(major_radius: f32, minor_radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(3);
        let segments = segments.max(3);
        let mut points = Vec::with_capacity((rings * segments) as usize);
        for ring in 0..rings {
            let u = TAU * ring as f32 / rings as f32;
            for seg in 0..segments {
                let v = TAU * seg as f32 / segments as f32;
                let r = major_radius + minor_radius * v.cos();
                points.push(Vec3::new(r * u.cos(), minor_radius * v.sin(), r * u.sin()));
            }
        }
        Self::single_static("torus", &points)
    }

    /// Flat grid in the XY plane, `size` wide, with `divisions` cells per side.
    pub fn grid(size: f32, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        let half = size * 0.5;
        let step = size / divisions as f32;
        let mut points = Vec::with_capacity(((divisions + 1) * (divisions + 1)) as usize);
        for row in 0..=divisions {
            for col in 0..=divisions {
                points.push(Vec3::new(-half + col as f32 * step, -half + row as f32 * step, 0.0));
            }
        }
        Self::single_static("grid", &points)
    }

    /// Vertical tube bound to a chain of `joint_count` joints.
    ///
    /// The chain starts at the origin and runs up +Y. Each vertex is weighted
    /// between the two joints bracketing its height, so bending the chain
    /// bends the tube smoothly. The skeleton is [`SkeletonId(0)`](SkeletonId).
    pub fn skinned_column(height: f32, radius: f32, rings: u32, segments: u32, joint_count: usize) -> Self {
        let rings = rings.max(1);
        let segments = segments.max(3);
        let joint_count = joint_count.max(1);
        let spacing = height / joint_count as f32;

        let joints: Vec<Joint> = (0..joint_count)
            .map(|j| {
                let (parent, local) = if j == 0 {
                    (None, Mat4::IDENTITY)
                } else {
                    (Some(j - 1), Mat4::from_translation(Vec3::new(0.0, spacing, 0.0)))
                };
                let inverse_bind = Mat4::from_translation(Vec3::new(0.0, -spacing * j as f32, 0.0));
                Joint::new(format!("joint_{}", j), parent, local, inverse_bind)
            })
            .collect();

        let mut positions = Vec::new();
        let mut skin_joints = Vec::new();
        let mut skin_weights = Vec::new();
        for ring in 0..=rings {
            let y = height * ring as f32 / rings as f32;
            let f = (y / spacing).clamp(0.0, (joint_count - 1) as f32);
            let j0 = (f.floor() as usize).min(joint_count - 1);
            let j1 = (j0 + 1).min(joint_count - 1);
            let t = if j0 == j1 { 0.0 } else { f - j0 as f32 };

            for seg in 0..segments {
                let theta = TAU * seg as f32 / segments as f32;
                positions.extend_from_slice(&[radius * theta.cos(), y, radius * theta.sin()]);
                skin_joints.push([j0 as u16, j1 as u16, 0, 0]);
                skin_weights.push([1.0 - t, t, 0.0, 0.0]);
            }
        }

        let primitive = Primitive::Skinned(SkinnedPrimitive {
            positions,
            joints: skin_joints,
            weights: skin_weights,
            skeleton: SkeletonId(0),
        });

        // Every parent precedes its child, so this never fails.
        let skeleton = Skeleton { joints };
        let mut source = Self {
            leaves: vec![Leaf {
                name: "column".to_string(),
                model_transform: Mat4::IDENTITY,
                primitive,
            }],
            skeletons: vec![skeleton],
        };
        if let Some(skeleton) = source.skeletons.get_mut(0) {
            skeleton.update_world_matrices();
        }
        source
    }

    fn single_static(name: &str, points: &[Vec3]) -> Self {
        Self {
            leaves: vec![Leaf {
                name: name.to_string(),
                model_transform: Mat4::IDENTITY,
                primitive: Primitive::from_points(points),
            }],
            skeletons: Vec::new(),
        }
    }
}

fn flatten(node: MeshNode, parent: Mat4, out: &mut Vec<Leaf>) {
    let model_transform = parent * node.transform;
    if let Some(primitive) = node.primitive {
        out.push(Leaf {
            name: node.name,
            model_transform,
            primitive,
        });
    }
    for child in node.children {
        flatten(child, model_transform, out);
    }
}
