//! Linear-blend skinning for skinned samples.
//!
//! Once per frame every [`SkinnedRange`](crate::extract::SkinnedRange) is
//! re-posed from the current joint matrices. The result overwrites both the
//! current and the original position of the sample, so repelled particles
//! spring back to the animated pose rather than the bind pose.

use glam::{Mat4, Vec3};

use crate::mesh::{MeshSource, Primitive, Skeleton};
use crate::particle_set::ParticleSet;

/// Skin one bind-pose vertex with up to four joint influences.
///
/// Weights are renormalized; a vertex with no weight at all keeps its bind
/// position.
#[inline]
pub fn skin_position(rest: Vec3, joints: [u16; 4], weights: [f32; 4], skeleton: &Skeleton) -> Vec3 {
    let total: f32 = weights.iter().sum();
    if total <= f32::EPSILON {
        return rest;
    }

    let mut skinned = Vec3::ZERO;
    for (&joint, &weight) in joints.iter().zip(&weights) {
        if weight == 0.0 {
            continue;
        }
        let joint = joint as usize;
        if joint >= skeleton.joint_count() {
            continue;
        }
        skinned += skeleton.joint_matrix(joint).transform_point3(rest) * weight;
    }
    skinned / total
}

impl ParticleSet {
    /// Re-pose every skinned sample from the skeletons in `source`.
    ///
    /// `local_from_world` maps skinned (world space) positions back into the
    /// set's local space. Returns the number of samples updated. Ranges whose
    /// leaf is missing or no longer skinned are skipped with a warning.
    pub fn apply_skinning(&mut self, source: &MeshSource, local_from_world: Mat4) -> usize {
        let mut updated = 0;

        for range in &self.skinned_ranges {
            let Some(leaf) = source.leaf(range.mesh) else {
                log::warn!("skinned range references missing mesh {}", range.mesh.index());
                continue;
            };
            let Primitive::Skinned(skinned) = &leaf.primitive else {
                log::warn!("mesh {} ({}) is no longer skinned", range.mesh.index(), leaf.name);
                continue;
            };
            let Some(skeleton) = source.skeleton(skinned.skeleton) else {
                log::warn!("mesh {} ({}) has no skeleton", range.mesh.index(), leaf.name);
                continue;
            };

            for (offset, &vertex) in range.vertex_indices.iter().enumerate() {
                let vertex = vertex as usize;
                let sample = range.first_sample + offset;
                if vertex >= leaf.primitive.vertex_count() || sample >= self.original.len() {
                    continue;
                }
                let world = skin_position(
                    leaf.primitive.vertex(vertex),
                    skinned.joints[vertex],
                    skinned.weights[vertex],
                    skeleton,
                );
                let local = local_from_world.transform_point3(world);
                self.current[sample] = local;
                self.original[sample] = local;
                updated += 1;
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Joint, SkeletonId};

    fn two_joints() -> Skeleton {
        Skeleton::new(vec![
            Joint::new("a", None, Mat4::IDENTITY, Mat4::IDENTITY),
            Joint::new("b", None, Mat4::from_translation(Vec3::X * 2.0), Mat4::IDENTITY),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_influence() {
        let s = two_joints();
        let p = skin_position(Vec3::Y, [1, 0, 0, 0], [1.0, 0.0, 0.0, 0.0], &s);
        assert!((p - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_blend_halfway() {
        let s = two_joints();
        let p = skin_position(Vec3::ZERO, [0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0], &s);
        assert!((p - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_weights_renormalized() {
        let s = two_joints();
        let p = skin_position(Vec3::ZERO, [0, 1, 0, 0], [1.0, 1.0, 0.0, 0.0], &s);
        assert!((p - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_zero_weight_keeps_rest() {
        let s = two_joints();
        let p = skin_position(Vec3::ONE, [1, 1, 1, 1], [0.0; 4], &s);
        assert_eq!(p, Vec3::ONE);
    }

    #[test]
    fn test_apply_skinning_tracks_pose() {
        let mut source = MeshSource::skinned_column(1.0, 0.1, 2, 4, 1);
        let mut set = ParticleSet::from_source(&source, 1);
        let before = set.original_positions().to_vec();

        let shift = Vec3::new(0.5, 0.0, 0.0);
        let skeleton = source.skeleton_mut(SkeletonId(0)).unwrap();
        skeleton.set_local(0, Mat4::from_translation(shift));
        skeleton.update_world_matrices();

        let updated = set.apply_skinning(&source, Mat4::IDENTITY);
        assert_eq!(updated, set.len());
        for (i, p) in set.original_positions().iter().enumerate() {
            assert!((*p - (before[i] + shift)).length() < 1e-5);
            assert_eq!(*p, set.current_positions()[i]);
        }
    }

    #[test]
    fn test_apply_skinning_into_local_space() {
        let source = MeshSource::skinned_column(1.0, 0.1, 1, 3, 1);
        let mut set = ParticleSet::from_source(&source, 1);
        let world_from_local = Mat4::from_translation(Vec3::Z * 4.0);
        set.apply_skinning(&source, world_from_local.inverse());
        assert!((set.original_positions()[0].z - (0.0 - 4.0)).abs() < 1e-5);
    }

    #[test]
    fn test_missing_mesh_skipped() {
        let source = MeshSource::skinned_column(1.0, 0.1, 1, 3, 1);
        let mut set = ParticleSet::from_source(&source, 1);
        let updated = set.apply_skinning(&MeshSource::empty(), Mat4::IDENTITY);
        assert_eq!(updated, 0);
    }
}
