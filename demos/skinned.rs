//! Skinned column swaying on a joint chain, with pulsing points.
//!
//! The rest pose follows the animation, so repulsion pushes particles off the
//! moving surface rather than off the bind pose.
//!
//! Run with: `cargo run --example skinned`

use vpe::prelude::*;

const JOINTS: usize = 6;
const HEIGHT: f32 = 2.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = SimulationParams::new()
        .with_point_size(0.025)
        .with_pulse(true)
        .with_repulsion(0.5, 1.0);

    let config = EngineConfig::new()
        .with_params(params)
        .with_gradient(Palette::Ocean.gradient(1), 3.0)
        .with_world_transform(Mat4::from_translation(Vec3::new(0.0, -HEIGHT * 0.5, 0.0)));

    let spacing = HEIGHT / JOINTS as f32;

    Viewer::new()
        .with_title("VPE - Skinned column")
        .with_source(MeshSource::skinned_column(HEIGHT, 0.25, 48, 32, JOINTS))
        .with_config(config)
        .with_animator(move |source, time| {
            let Some(skeleton) = source.skeleton_mut(SkeletonId(0)) else {
                return;
            };
            for joint in 1..JOINTS {
                let phase = time * 1.5 - joint as f32 * 0.4;
                let bend = Mat4::from_rotation_z(phase.sin() * 0.25) * Mat4::from_rotation_x(phase.cos() * 0.1);
                skeleton.set_local(joint, Mat4::from_translation(Vec3::new(0.0, spacing, 0.0)) * bend);
            }
        })
        .run()?;

    Ok(())
}
