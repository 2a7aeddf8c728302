//! 流场粒子的 WGSL 着色器
//!
//! 模拟阶段和渲染阶段共享 [`COMMON_WGSL`] 中的哈希、寿命和解码函数，
//! 保证两者对同一出生时刻算出相同的寿命。

use crate::flow::codec::DECODE_WGSL;

/// 共享函数：伪随机哈希与寿命
pub const COMMON_WGSL: &str = r#"
fn rand(co: vec2<f32>) -> f32 {
    return fract(sin(dot(co, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn lifespan(birth: f32, min_span: f32, jitter: f32) -> f32 {
    return min_span + rand(vec2<f32>(birth, -birth)) * jitter;
}
"#;

/// 模拟阶段：全屏三角形，每个片元推进一个粒子
pub const SIMULATION_WGSL: &str = r#"
struct SimUniforms {
    velocity_offset: vec2<f32>,
    velocity_scale: vec2<f32>,
    time: f32,
    timestep: f32,
    trail_length: f32,
    velocity_time_scale: f32,
    lifespan_min: f32,
    lifespan_jitter: f32,
    respawn_delay_min: f32,
    respawn_delay_jitter: f32,
    activation_delay_factor: f32,
    particle_count: u32,
    _pad0: f32,
    _pad1: f32,
}

@group(0) @binding(0) var<uniform> u: SimUniforms;
@group(0) @binding(1) var particles: texture_2d<f32>;
@group(0) @binding(2) var origins: texture_2d<f32>;
@group(0) @binding(3) var velocity_field: texture_2d<f32>;
@group(0) @binding(4) var velocity_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}

@fragment
fn fs_simulate(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let coord = vec2<i32>(floor(frag.xy));
    let particle = textureLoad(particles, coord, 0);

    let size = i32(textureDimensions(particles).x);
    let index = u32(coord.y * size + coord.x);
    if (index >= u.particle_count) {
        return particle;
    }

    // 休眠：到达苏醒时刻后记录出生时间，位置不变
    if (particle.z < 0.0) {
        if (u.time >= -particle.z) {
            return vec4<f32>(particle.xy, u.time, particle.w);
        }
        return particle;
    }

    let span = lifespan(particle.z, u.lifespan_min, u.lifespan_jitter);
    let elapsed = u.time - particle.z;
    let remaining = span - elapsed;

    if (elapsed >= span) {
        let origin = textureLoad(origins, coord, 0).xy;
        let jitter = rand(origin + vec2<f32>(u.time, u.time));
        let wake = u.time + u.respawn_delay_min + jitter * u.respawn_delay_jitter;
        return vec4<f32>(origin, -wake, particle.w);
    }

    let delay = u.timestep * u.trail_length * u.activation_delay_factor;
    let lag = 1.0 - particle.w;
    if (elapsed > lag * delay && remaining > (1.0 - lag) * delay) {
        let raw = textureSampleLevel(velocity_field, velocity_sampler, particle.xy, 0.0).xy;
        let velocity = raw * u.velocity_scale + u.velocity_offset;
        let advect = u.timestep * u.velocity_time_scale;
        return vec4<f32>(particle.xy + vec2<f32>(velocity.x, -velocity.y) * advect, particle.zw);
    }

    return particle;
}
"#;

/// 渲染阶段：按查找坐标读取粒子状态，重投影到世界坐标
pub const RENDER_WGSL: &str = r#"
struct RenderUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    velocity_offset: vec2<f32>,
    velocity_scale: vec2<f32>,
    reprojection_offset: f32,
    reprojection_scale: f32,
    time: f32,
    lifespan_min: f32,
    lifespan_jitter: f32,
    fade_window: f32,
    depth_bias: f32,
    alpha_scale: f32,
    alpha_floor: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var<uniform> u: RenderUniforms;
@group(0) @binding(1) var particles: texture_2d<f32>;
@group(0) @binding(2) var reprojection_x: texture_2d<f32>;
@group(0) @binding(3) var reprojection_y: texture_2d<f32>;
@group(0) @binding(4) var reprojection_z: texture_2d<f32>;
@group(0) @binding(5) var reprojection_sampler: sampler;
@group(0) @binding(6) var velocity_field: texture_2d<f32>;
@group(0) @binding(7) var velocity_sampler: sampler;

struct VertexInput {
    @location(0) lookup: vec2<f32>,
    @location(1) trail_weight: f32,
}

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) domain: vec2<f32>,
    @location(1) alpha: f32,
    @location(2) visibility: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let size = vec2<f32>(textureDimensions(particles));
    let particle = textureLoad(particles, vec2<i32>(in.lookup * size), 0);
    out.domain = particle.xy;

    // 休眠粒子放到裁剪体之外，同时标记为不可见
    if (particle.z < 0.0) {
        out.clip = vec4<f32>(-2.0, -2.0, -2.0, 1.0);
        out.alpha = 0.0;
        out.visibility = 0.0;
        return out;
    }

    let span = lifespan(particle.z, u.lifespan_min, u.lifespan_jitter);
    let remaining = span - (u.time - particle.z);
    out.alpha = smoothstep(0.0, u.fade_window, remaining)
        * (in.trail_weight + u.alpha_floor) * u.alpha_scale;

    let x = rgba_to_float(
        textureSampleLevel(reprojection_x, reprojection_sampler, particle.xy, 0.0)
    );
    let y = rgba_to_float(
        textureSampleLevel(reprojection_y, reprojection_sampler, particle.xy, 0.0)
    );
    let z = rgba_to_float(
        textureSampleLevel(reprojection_z, reprojection_sampler, particle.xy, 0.0)
    );
    let world = vec3<f32>(x, y, z) * u.reprojection_scale + u.reprojection_offset;

    var ndc = u.projection * u.view * vec4<f32>(world, 1.0);
    ndc.z -= u.depth_bias * ndc.w;
    out.clip = ndc;
    out.visibility = 1.0;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if (in.visibility < 1.0) {
        discard;
    }
    let color = textureSampleLevel(velocity_field, velocity_sampler, in.domain, 0.0).rgb;
    return vec4<f32>(color, in.alpha);
}
"#;

/// 拼接模拟阶段的完整着色器源码
pub fn simulation_source() -> String {
    format!("{}\n{}", COMMON_WGSL, SIMULATION_WGSL)
}

/// 拼接渲染阶段的完整着色器源码
pub fn render_source() -> String {
    format!("{}\n{}\n{}", COMMON_WGSL, DECODE_WGSL, RENDER_WGSL)
}
