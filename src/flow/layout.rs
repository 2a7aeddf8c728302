//! 粒子索引布局
//!
//! 粒子 `(stream, offset)` 按轨迹优先顺序展开为线性索引
//! `index = offset * num_streams + stream`，再按行写入 `pot_size × pot_size` 的状态纹理。
//! 写入状态纹理和生成顶点查找坐标必须使用同一映射。

/// 粒子在状态纹理中的布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleLayout {
    num_streams: u32,
    trail_length: u32,
    pot_size: u32,
}

impl ParticleLayout {
    /// 创建布局
    ///
    /// `pot_size` 为不小于 `ceil(sqrt(total))` 的最小 2 的幂。
    pub fn new(num_streams: u32, trail_length: u32) -> Self {
        let total = num_streams as u64 * trail_length as u64;
        let side = (total as f64).sqrt().ceil() as u64;
        let pot_size = side.max(1).next_power_of_two() as u32;
        Self {
            num_streams,
            trail_length,
            pot_size,
        }
    }

    /// 流数量
    pub fn num_streams(&self) -> u32 {
        self.num_streams
    }

    /// 每条轨迹的粒子数
    pub fn trail_length(&self) -> u32 {
        self.trail_length
    }

    /// 状态纹理边长
    pub fn pot_size(&self) -> u32 {
        self.pot_size
    }

    /// 粒子总数
    pub fn total_particles(&self) -> u32 {
        self.num_streams * self.trail_length
    }

    /// 状态纹理的纹素数量
    pub fn texel_count(&self) -> usize {
        self.pot_size as usize * self.pot_size as usize
    }

    /// `(stream, offset)` 对应的线性索引
    #[inline]
    pub fn index(&self, stream: u32, offset: u32) -> u32 {
        debug_assert!(stream < self.num_streams && offset < self.trail_length);
        offset * self.num_streams + stream
    }

    /// 线性索引对应的 `(stream, offset)`
    #[inline]
    pub fn stream_and_offset(&self, index: u32) -> (u32, u32) {
        (index % self.num_streams, index / self.num_streams)
    }

    /// 线性索引对应的纹素坐标
    #[inline]
    pub fn texel(&self, index: u32) -> (u32, u32) {
        (index % self.pot_size, index / self.pot_size)
    }

    /// 线性索引对应的纹素中心查找坐标
    #[inline]
    pub fn lookup_uv(&self, index: u32) -> [f32; 2] {
        let (x, y) = self.texel(index);
        let size = self.pot_size as f32;
        [(x as f32 + 0.5) / size, (y as f32 + 0.5) / size]
    }

    /// 轨迹权重：头部为 1，尾部为 `1 / trail_length`
    #[inline]
    pub fn trail_weight(&self, offset: u32) -> f32 {
        1.0 - offset as f32 / self.trail_length as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_pot_size() {
        assert_eq!(ParticleLayout::new(32768, 32).pot_size(), 1024);
        assert_eq!(ParticleLayout::new(4, 4).pot_size(), 4);
        assert_eq!(ParticleLayout::new(5, 4).pot_size(), 8);
        assert_eq!(ParticleLayout::new(1, 1).pot_size(), 1);
        assert_eq!(ParticleLayout::new(3, 3).pot_size(), 4);
    }

    #[test]
    fn test_trail_major_index() {
        let layout = ParticleLayout::new(4, 3);
        assert_eq!(layout.index(0, 0), 0);
        assert_eq!(layout.index(3, 0), 3);
        assert_eq!(layout.index(0, 1), 4);
        assert_eq!(layout.index(2, 2), 10);
        assert_eq!(layout.stream_and_offset(10), (2, 2));
    }

    #[test]
    fn test_lookup_uv_centers() {
        let layout = ParticleLayout::new(4, 4);
        assert_eq!(layout.lookup_uv(0), [0.125, 0.125]);
        assert_eq!(layout.lookup_uv(5), [0.375, 0.375]);
        assert_eq!(layout.lookup_uv(15), [0.875, 0.875]);
    }

    #[test]
    fn test_trail_weight_range() {
        let layout = ParticleLayout::new(2, 32);
        assert_eq!(layout.trail_weight(0), 1.0);
        assert!((layout.trail_weight(31) - 1.0 / 32.0).abs() < 1e-7);
        for offset in 0..32 {
            let w = layout.trail_weight(offset);
            assert!(w > 0.0 && w <= 1.0);
        }
    }

    proptest! {
        #[test]
        fn test_lookup_is_injective_prefix(streams in 1u32..64, trail in 1u32..40) {
            let layout = ParticleLayout::new(streams, trail);
            let total = layout.total_particles();
            prop_assert!(layout.texel_count() >= total as usize);

            let mut seen = HashSet::new();
            for i in 0..total {
                let (x, y) = layout.texel(i);
                prop_assert!(x < layout.pot_size() && y < layout.pot_size());
                // 连续前缀：按行展开后的位置正好是 i
                prop_assert_eq!((y * layout.pot_size() + x), i);
                let uv = layout.lookup_uv(i);
                prop_assert!(seen.insert((uv[0].to_bits(), uv[1].to_bits())));
            }
        }

        #[test]
        fn test_index_round_trip(
            streams in 1u32..100,
            trail in 1u32..40,
            s in 0u32..100,
            o in 0u32..40,
        ) {
            let (s, o) = (s % streams, o % trail);
            let layout = ParticleLayout::new(streams, trail);
            prop_assert_eq!(layout.stream_and_offset(layout.index(s, o)), (s, o));
        }
    }
}
