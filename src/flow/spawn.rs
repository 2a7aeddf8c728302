//! 粒子出生点与初始状态
//!
//! 每条轨迹从球面上均匀分布的一点出生，该点经投影映射回域 UV 空间。
//! 同一条轨迹的所有粒子共享出生点和出生时间，只有轨迹权重不同。

use super::layout::ParticleLayout;
use super::projection::{Extent, SurfaceProjection};
use super::state::ParticleTexel;
use crate::config::LifecycleConfig;
use glam::DVec3;
use rand::Rng;
use std::f64::consts::TAU;

/// 拒绝采样的最大尝试次数
const MAX_SPAWN_ATTEMPTS: usize = 64;

/// 球面均匀出生点采样器
pub struct SphereSpawner<'a, P: SurfaceProjection + ?Sized> {
    projection: &'a P,
    extent: Extent,
}

impl<'a, P: SurfaceProjection + ?Sized> SphereSpawner<'a, P> {
    pub fn new(projection: &'a P, extent: Extent) -> Self {
        Self { projection, extent }
    }

    /// 球面上的均匀随机点（渲染坐标）
    pub fn random_point_on_sphere<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec3 {
        let theta = rng.gen::<f64>() * TAU;
        let phi = (1.0 - 2.0 * rng.gen::<f64>()).acos();
        DVec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
            * self.projection.radius()
    }

    /// 采样一个落在 `[0, 1)²` 内的域 UV 出生点
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f32; 2] {
        let mut fallback = [0.5f64, 0.5f64];
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let point = self.random_point_on_sphere(rng);
            let Some((x, y)) = self.projection.from_render(point) else {
                continue;
            };
            let uv = self.extent.to_domain(x, y);
            if (0.0..1.0).contains(&uv[0]) && (0.0..1.0).contains(&uv[1]) {
                return [to_unit(uv[0]), to_unit(uv[1])];
            }
            fallback = uv;
        }
        tracing::trace!(target: "flow", "spawn rejection sampling exhausted, clamping");
        [to_unit(fallback[0]), to_unit(fallback[1])]
    }
}

/// 转为 f32 后仍落在 `[0, 1)` 内
fn to_unit(value: f64) -> f32 {
    (value as f32).clamp(0.0, 1.0 - f32::EPSILON)
}

/// 初始粒子状态（原点纹理和第一个状态纹理使用同一份数据）
#[derive(Debug, Clone)]
pub struct InitialParticles {
    layout: ParticleLayout,
    texels: Vec<ParticleTexel>,
}

impl InitialParticles {
    /// 生成初始状态
    ///
    /// 每条流调用一次 `spawn` 获取出生点，
    /// 并抽取 `[0, initial_birth_window)` 的出生延迟。
    /// 未使用的纹素保持为零。
    pub fn generate<R, S>(
        layout: ParticleLayout,
        lifecycle: &LifecycleConfig,
        rng: &mut R,
        mut spawn: S,
    ) -> Self
    where
        R: Rng + ?Sized,
        S: FnMut(&mut R) -> [f32; 2],
    {
        let mut texels = vec![ParticleTexel::default(); layout.texel_count()];

        for stream in 0..layout.num_streams() {
            let position = spawn(rng);
            let time_to_birth = rng.gen::<f32>() * lifecycle.initial_birth_window;
            for offset in 0..layout.trail_length() {
                let index = layout.index(stream, offset) as usize;
                texels[index] =
                    ParticleTexel::new(position, -time_to_birth, layout.trail_weight(offset));
            }
        }

        Self { layout, texels }
    }

    pub fn layout(&self) -> ParticleLayout {
        self.layout
    }

    /// 全部纹素（长度为 `pot_size²`）
    pub fn texels(&self) -> &[ParticleTexel] {
        &self.texels
    }

    /// 纹素的原始字节，可直接写入 `Rgba32Float` 纹理
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::projection::{SpatialReference, SphericalSurface};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sphere_points_have_radius() {
        let surface = SphericalSurface::new(SpatialReference::WebMercator);
        let spawner = SphereSpawner::new(&surface, Extent::web_mercator_world());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let p = spawner.random_point_on_sphere(&mut rng);
            assert!((p.length() - surface.radius).abs() < 1e-3);
        }
    }

    #[test]
    fn test_spawn_inside_domain() {
        let surface = SphericalSurface::new(SpatialReference::WebMercator);
        let spawner = SphereSpawner::new(&surface, Extent::web_mercator_world());
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let uv = spawner.sample(&mut rng);
            assert!((0.0..1.0).contains(&uv[0]), "u = {}", uv[0]);
            assert!((0.0..1.0).contains(&uv[1]), "v = {}", uv[1]);
        }
    }

    #[test]
    fn test_spawn_falls_back_for_tiny_extent() {
        // 极小的范围几乎不可能被随机点命中，退化为钳制后的坐标
        let surface = SphericalSurface::new(SpatialReference::Wgs84);
        let extent = Extent::new(10.0, 10.0001, 10.0, 10.0001, SpatialReference::Wgs84);
        let spawner = SphereSpawner::new(&surface, extent);
        let mut rng = StdRng::seed_from_u64(3);
        let uv = spawner.sample(&mut rng);
        assert!((0.0..1.0).contains(&uv[0]) && (0.0..1.0).contains(&uv[1]));
    }

    #[test]
    fn test_streams_share_origin_and_birth() {
        let layout = ParticleLayout::new(4, 4);
        let lifecycle = LifecycleConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut next = 0.0f32;
        let initial = InitialParticles::generate(layout, &lifecycle, &mut rng, |_| {
            next += 0.1;
            [next, 1.0 - next]
        });

        assert_eq!(initial.texels().len(), 16);
        for stream in 0..4 {
            let head = initial.texels()[layout.index(stream, 0) as usize];
            assert!(head.lifecycle <= 0.0 && head.lifecycle > -20.0);
            assert_eq!(head.trail_weight, 1.0);
            for offset in 1..4 {
                let texel = initial.texels()[layout.index(stream, offset) as usize];
                assert_eq!(texel.position, head.position);
                assert_eq!(texel.lifecycle, head.lifecycle);
                assert_eq!(texel.trail_weight, layout.trail_weight(offset));
            }
        }
        assert_eq!(initial.as_bytes().len(), 16 * 16);
    }

    #[test]
    fn test_padding_texels_are_zero() {
        let layout = ParticleLayout::new(5, 4);
        let lifecycle = LifecycleConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let initial = InitialParticles::generate(layout, &lifecycle, &mut rng, |_| [0.5, 0.5]);
        assert_eq!(initial.texels().len(), 64);
        for texel in &initial.texels()[20..] {
            assert_eq!(*texel, ParticleTexel::default());
        }
    }
}
