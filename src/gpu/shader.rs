//! WGSL for the point-sprite pass.
//!
//! A single program covers every color and motion combination; the uniform
//! `flags` select the branches at runtime.

/// Gradient colouring on.
pub const FLAG_GRADIENT: u32 = 1;
/// Pulsing point size on.
pub const FLAG_PULSE: u32 = 2;
/// Pointer proximity grows points.
pub const FLAG_INTERACTIVE: u32 = 4;

/// Point-sprite vertex and fragment shader.
///
/// Vertex inputs (instance step): `@location(0)` rendered position,
/// `@location(1)` proximity, `@location(2)` original position,
/// `@location(3)` displacement.
pub const POINT_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    world: mat4x4<f32>,
    camera_pos: vec3<f32>,
    time: f32,
    flat_color: vec3<f32>,
    point_size: f32,
    bounds_min: vec3<f32>,
    blend_power: f32,
    bounds_extent: vec3<f32>,
    pad0: f32,
    viewport: vec2<f32>,
    flags: u32,
    stop_count: u32,
    stop_colors: array<vec4<f32>, 8>,
    stop_anchors: array<vec4<f32>, 8>,
};

const FLAG_GRADIENT: u32 = 1u;
const FLAG_PULSE: u32 = 2u;
const FLAG_INTERACTIVE: u32 = 4u;

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t;
    return 1.0 - inv * inv * inv;
}

fn gradient_color(original: vec3<f32>) -> vec3<f32> {
    let p = (original - uniforms.bounds_min) / uniforms.bounds_extent;
    let count = min(uniforms.stop_count, 8u);

    // Weights relative to the nearest anchor stay in (0, 1] for any power.
    var nearest = 1e30;
    for (var i = 0u; i < count; i = i + 1u) {
        nearest = min(nearest, distance(p, uniforms.stop_anchors[i].xyz));
    }

    var sum = vec3<f32>(0.0, 0.0, 0.0);
    var total = 0.0;
    for (var i = 0u; i < count; i = i + 1u) {
        let d = distance(p, uniforms.stop_anchors[i].xyz);
        let w = pow((nearest + 0.1) / (d + 0.1), uniforms.blend_power);
        sum = sum + uniforms.stop_colors[i].rgb * w;
        total = total + w;
    }
    return sum / total;
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) proximity: f32,
    @location(2) original: vec3<f32>,
    @location(3) displacement: vec3<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let corner = quad_vertices[vertex_index];

    let world_pos = uniforms.world * vec4<f32>(position, 1.0);

    var size = uniforms.point_size;
    if (uniforms.flags & FLAG_PULSE) != 0u {
        size = size * (sin(uniforms.time * 2.0 + original.x * 10.0 + original.y * 10.0) * 0.5 + 1.0);
    }
    if (uniforms.flags & FLAG_INTERACTIVE) != 0u && proximity > 0.0 {
        size = size * (1.0 + 0.5 * ease_out_cubic(min(proximity, 1.0)));
    }

    // Perspective attenuation: world size to pixels at this depth.
    let depth = max(distance(world_pos.xyz, uniforms.camera_pos), 0.001);
    let size_px = size * (uniforms.viewport.y * 0.5) / depth;

    var clip_pos = uniforms.view_proj * world_pos;
    clip_pos.x = clip_pos.x + corner.x * size_px / uniforms.viewport.x * clip_pos.w;
    clip_pos.y = clip_pos.y + corner.y * size_px / uniforms.viewport.y * clip_pos.w;

    var color = uniforms.flat_color;
    if (uniforms.flags & FLAG_GRADIENT) != 0u && uniforms.stop_count > 0u {
        color = gradient_color(original);
    }

    var out: VertexOutput;
    out.clip_position = clip_pos;
    out.color = color;
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Sprite radius: 0 at the centre, 0.5 at the inscribed circle.
    let r = length(in.uv) * 0.5;
    if r > 0.5 {
        discard;
    }
    let edge = 1.0 - 2.0 * r;
    let intensity = edge * edge;
    return vec4<f32>(in.color * intensity, intensity);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_point_shader_valid() {
        validate_wgsl(POINT_SHADER).expect("point shader should be valid");
    }

    #[test]
    fn test_flags_match_shader() {
        assert!(POINT_SHADER.contains(&format!("FLAG_GRADIENT: u32 = {}u", FLAG_GRADIENT)));
        assert!(POINT_SHADER.contains(&format!("FLAG_PULSE: u32 = {}u", FLAG_PULSE)));
        assert!(POINT_SHADER.contains(&format!("FLAG_INTERACTIVE: u32 = {}u", FLAG_INTERACTIVE)));
    }

    #[test]
    fn test_vertex_inputs_match_layout() {
        let module = naga::front::wgsl::parse_str(POINT_SHADER).unwrap();
        let vs = module.entry_points.iter().find(|e| e.name == "vs_main").unwrap();
        let locations: Vec<u32> = vs
            .function
            .arguments
            .iter()
            .filter_map(|arg| match arg.binding {
                Some(naga::Binding::Location { location, .. }) => Some(location),
                _ => None,
            })
            .collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_entry_points() {
        let module = naga::front::wgsl::parse_str(POINT_SHADER).unwrap();
        let names: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"vs_main"));
        assert!(names.contains(&"fs_main"));
    }
}
