/// WGSL shader for lit scene geometry. `vs_main`/`fs_main` draw the colour
/// passes, multiplying the base colour factor by the material texture;
/// `vs_shadow` is the depth-only shadow map pass.
pub const SCENE_SHADER: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    // w: fog enabled
    eye: vec4<f32>,
    // xyz: unit vector toward the light, w: shadows enabled
    light_dir: vec4<f32>,
    // rgb: linear colour times intensity, w: shadow depth bias
    light_color: vec4<f32>,
    // rgb: linear colour times intensity, w: shadow map texel size
    ambient: vec4<f32>,
    fog_color: vec4<f32>,
    // x: near, y: far, z: winding mirrored
    fog_range: vec4<f32>,
    clip_plane: vec4<f32>,
};

struct Model {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

@group(1) @binding(0)
var<uniform> model: Model;

@group(2) @binding(0)
var shadow_map: texture_depth_2d;
@group(2) @binding(1)
var shadow_sampler: sampler_comparison;

@group(3) @binding(0)
var base_color_texture: texture_2d<f32>;
@group(3) @binding(1)
var base_color_sampler: sampler;

const PI: f32 = 3.141592653589793;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = model.model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (model.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    return out;
}

@vertex
fn vs_shadow(vertex: VertexInput) -> @builtin(position) vec4<f32> {
    return frame.light_view_proj * model.model * vec4<f32>(vertex.position, 1.0);
}

// 3x3 percentage-closer filter over the shadow map.
fn shadow_factor(world_position: vec3<f32>) -> f32 {
    if (frame.light_dir.w < 0.5) {
        return 1.0;
    }
    let clip = frame.light_view_proj * vec4<f32>(world_position, 1.0);
    let ndc = clip.xyz / clip.w;
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    if (any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0) {
        return 1.0;
    }
    let depth = ndc.z - frame.light_color.w;
    let texel = frame.ambient.w;
    var lit = 0.0;
    for (var x = -1; x <= 1; x++) {
        for (var y = -1; y <= 1; y++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, depth);
        }
    }
    return lit / 9.0;
}

fn apply_fog(color: vec3<f32>, world_position: vec3<f32>) -> vec3<f32> {
    if (frame.eye.w < 0.5) {
        return color;
    }
    let dist = distance(world_position, frame.eye.xyz);
    let span = max(frame.fog_range.y - frame.fog_range.x, 1e-4);
    let f = clamp((dist - frame.fog_range.x) / span, 0.0, 1.0);
    return mix(color, frame.fog_color.rgb, f);
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    // Sampled before the clip test so it stays in uniform control flow.
    let albedo = model.base_color * textureSample(base_color_texture, base_color_sampler, in.uv);
    if (dot(frame.clip_plane.xyz, in.world_position) + frame.clip_plane.w < 0.0) {
        discard;
    }

    var n = normalize(in.world_normal);
    let mirrored = frame.fog_range.z > 0.5;
    if (front_facing == mirrored) {
        n = -n;
    }

    let n_dot_l = max(dot(n, frame.light_dir.xyz), 0.0);
    let irradiance = frame.ambient.rgb
        + frame.light_color.rgb * n_dot_l * shadow_factor(in.world_position);
    let color = albedo.rgb / PI * irradiance;
    return vec4<f32>(apply_fog(color, in.world_position), albedo.a);
}
"#;

/// WGSL shader for the animated water surface.
pub const WATER_SHADER: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    fog_color: vec4<f32>,
    fog_range: vec4<f32>,
    clip_plane: vec4<f32>,
};

struct Water {
    model: mat4x4<f32>,
    mirror_view_proj: mat4x4<f32>,
    // xyz: toward the sun, w: sun terms enabled
    sun_direction: vec4<f32>,
    // w: output alpha
    sun_color: vec4<f32>,
    // w: distortion scale
    water_color: vec4<f32>,
    // x: time, y: noise scale, z: fog enabled
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

@group(1) @binding(0)
var<uniform> water: Water;

@group(2) @binding(0)
var reflection_texture: texture_2d<f32>;
@group(2) @binding(1)
var reflection_sampler: sampler;
@group(2) @binding(2)
var normal_texture: texture_2d<f32>;
@group(2) @binding(3)
var normal_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) mirror_coord: vec4<f32>,
};

@vertex
fn vs_water(vertex: VertexInput) -> VertexOutput {
    let world = water.model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world;
    out.world_position = world.xyz;
    out.mirror_coord = water.mirror_view_proj * world;
    return out;
}

// Four octaves of the normal map scrolling at unrelated rates.
fn get_noise(uv: vec2<f32>) -> vec4<f32> {
    let t = water.params.x;
    let uv0 = uv / 103.0 + vec2<f32>(t / 17.0, t / 29.0);
    let uv1 = uv / 107.0 - vec2<f32>(t / -19.0, t / 31.0);
    let uv2 = uv / vec2<f32>(8907.0, 9803.0) + vec2<f32>(t / 101.0, t / 97.0);
    let uv3 = uv / vec2<f32>(1091.0, 1027.0) - vec2<f32>(t / 109.0, t / -113.0);
    let noise = textureSample(normal_texture, normal_sampler, uv0)
        + textureSample(normal_texture, normal_sampler, uv1)
        + textureSample(normal_texture, normal_sampler, uv2)
        + textureSample(normal_texture, normal_sampler, uv3);
    return noise * 0.5 - 1.0;
}

fn apply_fog(color: vec3<f32>, world_position: vec3<f32>) -> vec3<f32> {
    if (water.params.z < 0.5 || frame.eye.w < 0.5) {
        return color;
    }
    let dist = distance(world_position, frame.eye.xyz);
    let span = max(frame.fog_range.y - frame.fog_range.x, 1e-4);
    let f = clamp((dist - frame.fog_range.x) / span, 0.0, 1.0);
    return mix(color, frame.fog_color.rgb, f);
}

@fragment
fn fs_water(in: VertexOutput) -> @location(0) vec4<f32> {
    let noise = get_noise(in.world_position.xz * water.params.y);
    let n = normalize(noise.xzy * vec3<f32>(1.5, 1.0, 1.5));

    let to_eye = frame.eye.xyz - in.world_position;
    let eye_dir = normalize(to_eye);
    let dist = length(to_eye);

    let distortion = n.xz * (0.001 + 1.0 / dist) * water.water_color.w;
    let mirror_uv = in.mirror_coord.xy / in.mirror_coord.w * vec2<f32>(0.5, -0.5)
        + vec2<f32>(0.5, 0.5);
    let reflection_sample =
        textureSample(reflection_texture, reflection_sampler, mirror_uv + distortion).rgb;

    var diffuse_light = vec3<f32>(0.0);
    var specular_light = vec3<f32>(0.0);
    if (water.sun_direction.w > 0.5) {
        let sun = water.sun_direction.xyz;
        let r = normalize(reflect(-sun, n));
        let d = max(0.0, dot(eye_dir, r));
        specular_light = pow(d, 100.0) * water.sun_color.rgb * 2.0;
        diffuse_light = max(dot(sun, n), 0.0) * water.sun_color.rgb * 0.5;
    }

    let theta = max(dot(eye_dir, n), 0.0);
    let rf0 = 0.3;
    let reflectance = rf0 + (1.0 - rf0) * pow(1.0 - theta, 5.0);
    let scatter = max(0.0, dot(n, eye_dir)) * water.water_color.rgb;
    let albedo = mix(
        water.sun_color.rgb * diffuse_light * 0.3 + scatter,
        vec3<f32>(0.1) + reflection_sample * 0.9 + reflection_sample * specular_light,
        reflectance,
    );
    return vec4<f32>(apply_fog(albedo, in.world_position), water.sun_color.w);
}
"#;
