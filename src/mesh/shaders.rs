use super::MeshKind;

/// Scene uniforms and the per-instance record every mesh kind shares (locations 0 to 6).
pub(crate) const COMMON_WGSL: &str = r#"
struct SceneUniforms {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    viewport: vec2<f32>,
    padding: vec2<f32>,
};

@group(0) @binding(0) var<uniform> u_Scene: SceneUniforms;

struct InstanceInput {
    @location(0) model_0: vec4<f32>,
    @location(1) model_1: vec4<f32>,
    @location(2) model_2: vec4<f32>,
    @location(3) model_3: vec4<f32>,
    @location(4) fill: vec4<f32>,
    @location(5) stroke: vec4<f32>,
    // x: opacity, y: line width, z: visible
    @location(6) params: vec4<f32>,
};

fn to_clip(instance: InstanceInput, local: vec2<f32>) -> vec4<f32> {
    if (instance.params.z < 0.5) {
        // Outside the depth range, so the whole instance is clipped.
        return vec4<f32>(0.0, 0.0, 2.0, 1.0);
    }
    let model = mat4x4<f32>(instance.model_0, instance.model_1, instance.model_2, instance.model_3);
    return u_Scene.projection * u_Scene.view * model * vec4<f32>(local, 0.0, 1.0);
}

fn coverage(distance: f32, aa: f32) -> f32 {
    if (aa <= 0.0) {
        return select(0.0, 1.0, distance <= 0.0);
    }
    return clamp(0.5 - distance / aa, 0.0, 1.0);
}
"#;

const SDF_WGSL: &str = r#"
struct SdfInput {
    @location(7) corner: vec2<f32>,
    @location(10) size: vec2<f32>,
    @location(11) anchor: vec2<f32>,
    // x: shape (0 circle, 1 ellipse, 2 rect), y: corner radius
    @location(12) shape: vec4<f32>,
};

struct SdfOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) half_size: vec2<f32>,
    @location(2) fill: vec4<f32>,
    @location(3) stroke: vec4<f32>,
    @location(4) params: vec4<f32>,
    @location(5) shape: vec4<f32>,
};

@vertex
fn vs_main(instance: InstanceInput, input: SdfInput) -> SdfOutput {
    let half_size = input.size * 0.5;
    let center = input.size * (vec2<f32>(0.5) - input.anchor);
    let grow = vec2<f32>(instance.params.y * 0.5 + 1.0);
    let offset = (input.corner * 2.0 - 1.0) * (half_size + grow);

    var out: SdfOutput;
    out.position = to_clip(instance, center + offset);
    out.local = offset;
    out.half_size = half_size;
    out.fill = instance.fill;
    out.stroke = instance.stroke;
    out.params = instance.params;
    out.shape = input.shape;
    return out;
}

fn sd_rounded_box(p: vec2<f32>, half_size: vec2<f32>, radius: f32) -> f32 {
    let r = min(radius, min(half_size.x, half_size.y));
    let q = abs(p) - half_size + vec2<f32>(r);
    return length(max(q, vec2<f32>(0.0))) + min(max(q.x, q.y), 0.0) - r;
}

fn sd_ellipse(p: vec2<f32>, radii: vec2<f32>) -> f32 {
    let k = length(p / radii);
    return (k - 1.0) * min(radii.x, radii.y);
}

@fragment
fn fs_main(in: SdfOutput) -> @location(0) vec4<f32> {
    var distance: f32;
    let shape = u32(in.shape.x + 0.5);
    if (shape == 2u) {
        distance = sd_rounded_box(in.local, in.half_size, in.shape.y);
    } else if (shape == 1u) {
        distance = sd_ellipse(in.local, in.half_size);
    } else {
        distance = length(in.local) - in.half_size.x;
    }

    var aa = 0.0;
    if (USE_ANTIALIAS) {
        aa = fwidth(distance);
    }
    let half_line = in.params.y * 0.5;
    let outer = coverage(distance - half_line, aa);
    let inner = coverage(distance + half_line, aa);
    var color = in.fill;
    if (half_line > 0.0) {
        color = mix(in.stroke, in.fill, inner);
    }
    let alpha = color.a * outer * in.params.x;
    if (alpha <= 0.0) {
        discard;
    }
    return vec4<f32>(color.rgb, alpha);
}
"#;

const IMAGE_WGSL: &str = r#"
@group(1) @binding(0) var u_Map: texture_2d<f32>;
@group(1) @binding(1) var u_MapSampler: sampler;

struct ImageInput {
    @location(7) corner: vec2<f32>,
    @location(10) size: vec2<f32>,
    @location(11) anchor: vec2<f32>,
};

struct ImageOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
    @location(2) opacity: f32,
};

@vertex
fn vs_main(instance: InstanceInput, input: ImageInput) -> ImageOutput {
    let local = (input.corner - input.anchor) * input.size;

    var out: ImageOutput;
    out.position = to_clip(instance, local);
    out.uv = input.corner;
    out.tint = instance.fill;
    out.opacity = instance.params.x;
    return out;
}

@fragment
fn fs_main(in: ImageOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(u_Map, u_MapSampler, in.uv) * in.tint;
    return vec4<f32>(texel.rgb, texel.a * in.opacity);
}
"#;

const LINE_WGSL: &str = r#"
struct LineInput {
    @location(7) corner: vec2<f32>,
    @location(10) endpoints: vec4<f32>,
};

struct LineOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) across: f32,
    @location(1) stroke: vec4<f32>,
    @location(2) params: vec4<f32>,
};

@vertex
fn vs_main(instance: InstanceInput, input: LineInput) -> LineOutput {
    let p0 = input.endpoints.xy;
    let p1 = input.endpoints.zw;
    let delta = p1 - p0;
    let len = max(length(delta), 1e-6);
    let normal = vec2<f32>(-delta.y, delta.x) / len;
    let half_width = instance.params.y * 0.5 + 1.0;
    let across = (input.corner.y * 2.0 - 1.0) * half_width;
    let local = p0 + delta * input.corner.x + normal * across;

    var out: LineOutput;
    out.position = to_clip(instance, local);
    out.across = across;
    out.stroke = instance.stroke;
    out.params = instance.params;
    return out;
}

@fragment
fn fs_main(in: LineOutput) -> @location(0) vec4<f32> {
    let distance = abs(in.across) - in.params.y * 0.5;
    var aa = 0.0;
    if (USE_ANTIALIAS) {
        aa = fwidth(distance);
    }
    let alpha = in.stroke.a * coverage(distance, aa) * in.params.x;
    if (alpha <= 0.0) {
        discard;
    }
    return vec4<f32>(in.stroke.rgb, alpha);
}
"#;

const FILL_WGSL: &str = r#"
struct FillInput {
    // z is 1 for stroke vertices, 0 for fill vertices.
    @location(7) position: vec3<f32>,
};

struct FillOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(instance: InstanceInput, input: FillInput) -> FillOutput {
    var out: FillOutput;
    out.position = to_clip(instance, input.position.xy);
    let color = select(instance.fill, instance.stroke, input.position.z > 0.5);
    out.color = vec4<f32>(color.rgb, color.a * instance.params.x);
    return out;
}

@fragment
fn fs_main(in: FillOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Full WGSL module for a mesh kind, without the define preamble.
pub(crate) fn build_mesh_wgsl(kind: MeshKind) -> String {
    let body = match kind {
        MeshKind::Sdf => SDF_WGSL,
        MeshKind::Image => IMAGE_WGSL,
        MeshKind::Line => LINE_WGSL,
        MeshKind::Fill => FILL_WGSL,
    };
    format!("{COMMON_WGSL}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::shader_layout::declared_bindings;

    #[test]
    fn only_images_bind_textures() {
        for kind in [MeshKind::Sdf, MeshKind::Line, MeshKind::Fill] {
            assert_eq!(declared_bindings(&build_mesh_wgsl(kind)), vec![(0, 0)]);
        }
        assert_eq!(
            declared_bindings(&build_mesh_wgsl(MeshKind::Image)),
            vec![(0, 0), (1, 0), (1, 1)]
        );
    }
}
