/// 离屏流场演示
///
/// 用合成的涡旋速度场驱动粒子轨迹，在离屏目标上渲染若干帧，
/// 演示暂停 / 单步控制，最后打印统计信息。
use anyhow::Context;
use glam::Vec3;
use velocity_flow::flow::projection::EARTH_RADIUS;
use velocity_flow::prelude::*;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const FRAMES: u32 = 300;

/// 以 (0.5, 0.5) 为中心的涡旋，周期性叠加一个向东的分量
fn vortex_field(width: u32, height: u32, field: &VelocityField) -> anyhow::Result<VelocityRaster> {
    let mut vectors = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        let v = (row as f32 + 0.5) / height as f32;
        for col in 0..width {
            let u = (col as f32 + 0.5) / width as f32;
            let (dx, dy) = (u - 0.5, 0.5 - v);
            let east = 5.0 * (u * std::f32::consts::TAU).cos();
            vectors.push([-dy * 40.0 + east, dx * 40.0]);
        }
    }
    Ok(VelocityRaster::from_vectors(width, height, &vectors, field)?)
}

fn main() -> anyhow::Result<()> {
    let mut config = FlowConfig::load_or_default();
    config.apply_env_overrides();
    init_logging(&config.logging);

    println!("=== 流场粒子离屏演示 ===\n");

    let distance = 3.0 * EARTH_RADIUS as f32;
    let camera = Camera::looking_at_origin(Vec3::new(1.0, 0.3, 0.4), distance, WIDTH, HEIGHT);
    let mut host =
        HeadlessHost::new_blocking(WIDTH, HEIGHT, camera).context("creating headless GPU host")?;

    let bounds = VelocityBounds::new([-25.0, -25.0], [25.0, 25.0]);
    let field = VelocityField::from_bounds(&bounds);
    let source = FlowSource {
        extent: Extent::web_mercator_world(),
        velocity: vortex_field(256, 128, &field)?,
        bounds,
    };

    let mut renderer = FlowRenderer::new(config);
    pollster::block_on(renderer.setup(&mut host, ready_source(source)))
        .context("setting up flow renderer")?;

    let mut rendered = 0;
    while rendered < FRAMES && host.take_render_request() {
        renderer.render_frame(&mut host);
        rendered += 1;

        if rendered == FRAMES / 2 {
            // 暂停后单步一次，再继续
            renderer.handle(ControlCommand::Pause, &mut host);
            renderer.handle(ControlCommand::Step, &mut host);
            println!("单步后状态: {:?}", renderer.playback());
            renderer.handle(ControlCommand::Resume, &mut host);
        }
    }

    if let Some(stats) = renderer.stats() {
        println!("流数量: {}", stats.num_streams);
        println!("轨迹长度: {}", stats.trail_length);
        println!(
            "粒子总数: {} (状态纹理 {}x{})",
            stats.total_particles, stats.pot_size, stats.pot_size
        );
        println!("拓扑: {:?}, 顶点数: {}", stats.topology, stats.vertex_count);
        println!(
            "模拟时间: {:.2}s, 模拟步数: {}, 绘制帧数: {}",
            stats.time, stats.steps, stats.frames
        );
        if stats.degraded {
            println!("警告: 部分 GPU 程序创建失败");
        }
    }

    let pixels = pollster::block_on(host.read_color()).context("reading color target")?;
    let lit = pixels.chunks(4).filter(|p| p[0] > 0 || p[1] > 0 || p[2] > 0).count();
    println!("已绘制像素: {}/{}", lit, WIDTH * HEIGHT);

    Ok(())
}
