//! 轨迹顶点几何
//!
//! 顶点只携带粒子在状态纹理中的查找坐标和轨迹权重，位置在顶点着色器中读取。
//! 几何在初始化后不再改变。

use crate::config::Topology;
use crate::flow::ParticleLayout;

/// 轨迹顶点
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TrailVertex {
    /// 状态纹理中的纹素中心坐标
    pub lookup: [f32; 2],
    pub trail_weight: f32,
}

impl TrailVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TrailVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    fn at(layout: &ParticleLayout, stream: u32, offset: u32) -> Self {
        let index = layout.index(stream, offset);
        Self {
            lookup: layout.lookup_uv(index),
            trail_weight: layout.trail_weight(offset),
        }
    }
}

/// 生成轨迹顶点
pub struct GeometryBuilder {
    layout: ParticleLayout,
    topology: Topology,
}

impl GeometryBuilder {
    pub fn new(layout: ParticleLayout, topology: Topology) -> Self {
        Self { layout, topology }
    }

    /// 预期顶点数
    ///
    /// 点模式每个粒子一个顶点；
    /// 线模式每条轨迹 `trail_length - 1` 条线段，每段两个顶点。
    pub fn vertex_count(&self) -> u32 {
        match self.topology {
            Topology::Points => self.layout.total_particles(),
            Topology::Lines => {
                2 * self.layout.trail_length().saturating_sub(1) * self.layout.num_streams()
            }
        }
    }

    pub fn build(&self) -> Vec<TrailVertex> {
        let layout = &self.layout;
        let mut vertices = Vec::with_capacity(self.vertex_count() as usize);

        match self.topology {
            Topology::Points => {
                for index in 0..layout.total_particles() {
                    let (stream, offset) = layout.stream_and_offset(index);
                    vertices.push(TrailVertex::at(layout, stream, offset));
                }
            }
            Topology::Lines => {
                for stream in 0..layout.num_streams() {
                    for offset in 0..layout.trail_length().saturating_sub(1) {
                        vertices.push(TrailVertex::at(layout, stream, offset));
                        vertices.push(TrailVertex::at(layout, stream, offset + 1));
                    }
                }
            }
        }

        vertices
    }

    /// 创建顶点缓冲区
    pub fn create_buffer(&self, device: &wgpu::Device) -> (wgpu::Buffer, u32) {
        use wgpu::util::DeviceExt;

        let vertices = self.build();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Trail Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        (buffer, vertices.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<TrailVertex>(), 12);
        assert_eq!(TrailVertex::desc().attributes.len(), 2);
    }

    #[test]
    fn test_line_vertex_count() {
        let layout = ParticleLayout::new(4, 4);
        let builder = GeometryBuilder::new(layout, Topology::Lines);
        assert_eq!(builder.vertex_count(), 2 * 3 * 4);
        assert_eq!(builder.build().len(), 24);

        let layout = ParticleLayout::new(32768, 32);
        assert_eq!(
            GeometryBuilder::new(layout, Topology::Lines).vertex_count(),
            2 * 31 * 32768
        );
    }

    #[test]
    fn test_points_cover_every_particle() {
        let layout = ParticleLayout::new(5, 3);
        let vertices = GeometryBuilder::new(layout, Topology::Points).build();
        assert_eq!(vertices.len(), 15);
        for (index, vertex) in vertices.iter().enumerate() {
            assert_eq!(vertex.lookup, layout.lookup_uv(index as u32));
        }
    }

    #[test]
    fn test_line_segments_connect_consecutive_offsets() {
        let layout = ParticleLayout::new(3, 4);
        let vertices = GeometryBuilder::new(layout, Topology::Lines).build();
        for (segment, pair) in vertices.chunks(2).enumerate() {
            let stream = segment as u32 / 3;
            let offset = segment as u32 % 3;
            assert_eq!(pair[0].lookup, layout.lookup_uv(layout.index(stream, offset)));
            assert_eq!(pair[1].lookup, layout.lookup_uv(layout.index(stream, offset + 1)));
            assert!(pair[0].trail_weight > pair[1].trail_weight);
        }
    }

    #[test]
    fn test_single_particle_trails_have_no_lines() {
        let layout = ParticleLayout::new(10, 1);
        let builder = GeometryBuilder::new(layout, Topology::Lines);
        assert_eq!(builder.vertex_count(), 0);
        assert!(builder.build().is_empty());
    }
}
