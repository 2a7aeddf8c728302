use glam::DVec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use velocity_flow::config::{FlowConfig, Topology};
use velocity_flow::flow::codec;
use velocity_flow::flow::projection::EARTH_RADIUS;
use velocity_flow::flow::*;
use velocity_flow::render::GeometryBuilder;

fn east(_: [f32; 2]) -> [f32; 2] {
    [10.0, 0.0]
}

fn swirl(uv: [f32; 2]) -> [f32; 2] {
    [(uv[1] - 0.5) * 40.0, (0.5 - uv[0]) * 40.0]
}

fn small_config(num_streams: u32, trail_length: u32) -> FlowConfig {
    let mut config = FlowConfig::default();
    config.simulation.num_streams = num_streams;
    config.simulation.trail_length = trail_length;
    config.simulation.velocity_time_scale = 0.001;
    config
}

/// 所有流从固定位置出生，出生延迟取自配置的窗口
fn simulation<S: VelocitySampler>(config: &FlowConfig, sampler: S) -> ReferenceSimulation<S> {
    let layout = ParticleLayout::new(
        config.simulation.num_streams,
        config.simulation.trail_length,
    );
    let mut rng = StdRng::seed_from_u64(2024);
    let mut stream = 0.0f32;
    let initial = InitialParticles::generate(layout, &config.lifecycle, &mut rng, |_| {
        stream += 1.0;
        [0.1 + 0.05 * stream, 0.3]
    });
    ReferenceSimulation::new(config.clone(), &initial, sampler)
}

#[test]
fn test_state_conservation() {
    let config = small_config(16, 8);
    let mut sim = simulation(&config, swirl);
    let total = sim.layout().total_particles() as usize;

    for _ in 0..40 {
        let step = sim.run(60);
        assert_eq!(step.total(), total * 60);

        let census = sim.census();
        assert_eq!(census.dormant + census.alive, total);
        for texel in &sim.state()[..total] {
            assert!(texel.trail_weight > 0.0 && texel.trail_weight <= 1.0);
        }
    }
}

#[test]
fn test_end_to_end_lifespan_twelve() {
    // 4 条流、每条 4 个粒子，全部在 t=0 出生，寿命固定为 12 秒
    let mut config = small_config(4, 4);
    config.lifecycle.initial_birth_window = 0.0;
    config.lifecycle.lifespan_min = 12.0;
    config.lifecycle.lifespan_jitter = 0.0;
    let mut sim = simulation(&config, east);

    sim.run(714);
    assert!((sim.time() - 11.9).abs() < 1e-3);
    assert_eq!(sim.census().dormant, 0);
    for stream in 0..4 {
        assert!(!sim.particle(stream, 0).is_dormant());
    }

    sim.run(12);
    assert!((sim.time() - 12.1).abs() < 1e-3);
    assert_eq!(sim.census().dormant, 16);
    for stream in 0..4 {
        assert!(sim.particle(stream, 0).lifecycle < 0.0);
    }
}

#[test]
fn test_respawn_returns_to_origin() {
    let mut config = small_config(4, 4);
    config.lifecycle.initial_birth_window = 0.0;
    config.lifecycle.lifespan_min = 2.0;
    config.lifecycle.lifespan_jitter = 0.0;
    let mut sim = simulation(&config, east);

    // 存活期间头部粒子离开原点
    sim.run(60);
    let head = sim.particle(0, 0);
    let origin = sim.origin()[sim.layout().index(0, 0) as usize];
    assert!(head.position[0] > origin.position[0]);

    // 寿命耗尽的那一步把所有粒子放回原点并进入休眠
    let mut respawned = false;
    for _ in 0..120 {
        let step = sim.step();
        if step.respawned > 0 {
            respawned = true;
            break;
        }
    }
    assert!(respawned);
    let total = sim.layout().total_particles() as usize;
    for (texel, origin) in sim.state()[..total].iter().zip(sim.origin()) {
        assert!(texel.lifecycle < 0.0);
        assert_eq!(texel.position, origin.position);
    }
}

#[test]
fn test_head_moves_before_tail() {
    let mut config = small_config(1, 8);
    config.lifecycle.initial_birth_window = 0.0;
    config.lifecycle.lifespan_min = 30.0;
    config.lifecycle.lifespan_jitter = 0.0;
    let mut sim = simulation(&config, east);

    let start: Vec<f32> = (0..8).map(|o| sim.particle(0, o).position[0]).collect();
    let mut first_move = [None; 8];
    for step in 1..=600 {
        sim.step();
        for offset in 0..8u32 {
            let slot = &mut first_move[offset as usize];
            if slot.is_none() && sim.particle(0, offset).position[0] != start[offset as usize] {
                *slot = Some(step);
            }
        }
    }

    let moves: Vec<u32> = first_move.iter().map(|m| m.expect("particle never moved")).collect();
    for pair in moves.windows(2) {
        assert!(pair[0] <= pair[1], "activation order {:?}", moves);
    }
    assert!(moves[0] < moves[7], "head must start strictly before tail: {:?}", moves);
}

#[test]
fn test_one_swap_per_step() {
    let config = small_config(8, 4);
    let mut sim = simulation(&config, east);
    for expected in 1..=25u64 {
        let before = sim.state().as_ptr();
        sim.step();
        assert_eq!(sim.swap_count(), expected);
        assert_ne!(before, sim.state().as_ptr());
    }
}

#[test]
fn test_geometry_matches_state_layout() {
    let config = small_config(6, 5);
    let layout = ParticleLayout::new(6, 5);
    let sim = simulation(&config, east);

    let vertices = GeometryBuilder::new(layout, Topology::Lines).build();
    assert_eq!(vertices.len(), 2 * 4 * 6);
    for pair in vertices.chunks(2) {
        // 查找坐标指向的纹素属于同一条流，权重与状态纹理中存储的一致
        let texel = |lookup: [f32; 2]| {
            let size = layout.pot_size() as f32;
            let x = (lookup[0] * size) as usize;
            let y = (lookup[1] * size) as usize;
            sim.state()[y * layout.pot_size() as usize + x]
        };
        let a = texel(pair[0].lookup);
        let b = texel(pair[1].lookup);
        assert_eq!(a.trail_weight, pair[0].trail_weight);
        assert_eq!(b.trail_weight, pair[1].trail_weight);
        assert_eq!(a.position, b.position);
    }
}

#[test]
fn test_spawned_particles_land_on_globe() {
    let extent = Extent::web_mercator_world();
    let surface = SphericalSurface::new(SpatialReference::WebMercator);
    let reprojection = ReprojectionData::build(&extent, &surface, 64).unwrap();
    let spawner = SphereSpawner::new(&surface, extent);
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..200 {
        let uv = spawner.sample(&mut rng);
        let world: DVec3 = reprojection.world_at([uv[0] as f64, uv[1] as f64]);
        assert!((world.length() - EARTH_RADIUS).abs() < 1.0);
    }
}

#[test]
fn test_codec_survives_reprojection_range() {
    // 地球半径范围内的坐标经编码后误差小于 1 米
    let span = 2.0 * EARTH_RADIUS;
    for i in 0..=1000 {
        let meters = -EARTH_RADIUS + span * i as f64 / 1000.0;
        let normalized = (meters + EARTH_RADIUS) / span;
        let decoded = codec::decode(codec::encode(normalized)) * span - EARTH_RADIUS;
        assert!((decoded - meters).abs() < 1.0);
    }
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.toml");

    let mut config = FlowConfig::default();
    config.simulation.trail_length = 16;
    config.simulation.seed = Some(7);
    config.render.topology = Topology::Points;
    config.reprojection.resolution = 256;
    config.save_toml(&path).unwrap();

    let loaded = FlowConfig::from_toml_file(&path).unwrap();
    assert_eq!(loaded.simulation.trail_length, 16);
    assert_eq!(loaded.simulation.seed, Some(7));
    assert_eq!(loaded.render.topology, Topology::Points);
    assert_eq!(loaded.reprojection.resolution, 256);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_velocity_raster_drives_reference() {
    let bounds = VelocityBounds::new([-20.0, -20.0], [20.0, 20.0]);
    let field = VelocityField::from_bounds(&bounds);
    let vectors = vec![[20.0, 20.0]; 16];
    let raster = VelocityRaster::from_vectors(4, 4, &vectors, &field).unwrap();

    let mut config = small_config(2, 2);
    config.lifecycle.initial_birth_window = 0.0;
    config.lifecycle.lifespan_min = 50.0;
    let mut sim = simulation(&config, RasterVelocity { raster, field });
    let start = sim.particle(0, 0).position;
    sim.run(30);
    let end = sim.particle(0, 0).position;
    // 东北向速度：u 增大，v（向南）减小
    assert!(end[0] > start[0]);
    assert!(end[1] < start[1]);
}
