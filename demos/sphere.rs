//! Static sphere with a vertical sunset gradient.
//!
//! Hover to push particles away, right-drag to orbit, scroll to zoom.
//!
//! Run with: `cargo run --example sphere`

use vpe::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = SimulationParams::new()
        .with_point_size(0.03)
        .with_repulsion(0.6, 1.5)
        .with_return_stiffness(4.0);

    let config = EngineConfig::new()
        .with_stride(2)
        .with_params(params)
        .with_gradient(Palette::Sunset.gradient(1), 2.0);

    Viewer::new()
        .with_title("VPE - Sphere")
        .with_source(MeshSource::uv_sphere(1.0, 96, 192))
        .with_config(config)
        .run()?;

    Ok(())
}
