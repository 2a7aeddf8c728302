//! 粒子状态纹理
//!
//! 原点纹理在初始化后只读；两个状态纹理组成 [`PingPong`]，
//! 模拟阶段从当前纹理读取并写入另一个，每个模拟步交换一次。

use crate::flow::{InitialParticles, ParticleLayout, PingPong};

/// 状态纹理格式：每个粒子 4 个 f32
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// 单个 `Rgba32Float` 状态纹理
pub struct StateTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: u32,
}

impl StateTexture {
    pub fn new(device: &wgpu::Device, size: u32, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    /// 写入完整的纹素数据（长度为 `size² × 16` 字节）
    pub fn upload(&self, queue: &wgpu::Queue, bytes: &[u8]) {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(16 * self.size),
                rows_per_image: Some(self.size),
            },
            wgpu::Extent3d {
                width: self.size,
                height: self.size,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// 粒子状态存储：原点纹理 + 双缓冲状态纹理
pub struct ParticleStateStore {
    layout: ParticleLayout,
    origin: StateTexture,
    states: PingPong<StateTexture>,
}

impl ParticleStateStore {
    /// 分配纹理并写入初始状态
    ///
    /// 初始数据同时写入原点纹理和当前状态纹理；
    /// 另一个状态纹理由第一次模拟完整覆盖。
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, initial: &InitialParticles) -> Self {
        let layout = initial.layout();
        let size = layout.pot_size();

        let origin = StateTexture::new(device, size, "Particle Origin Texture");
        let first = StateTexture::new(device, size, "Particle State Texture 0");
        let second = StateTexture::new(device, size, "Particle State Texture 1");

        origin.upload(queue, initial.as_bytes());
        first.upload(queue, initial.as_bytes());

        tracing::info!(
            target: "flow::render",
            streams = layout.num_streams(),
            trail_length = layout.trail_length(),
            pot_size = size,
            bytes = layout.texel_count() * 16 * 3,
            "Allocated particle state textures"
        );

        Self {
            layout,
            origin,
            states: PingPong::new(first, second),
        }
    }

    pub fn layout(&self) -> ParticleLayout {
        self.layout
    }

    pub fn origin(&self) -> &StateTexture {
        &self.origin
    }

    /// 当前状态（模拟输入与渲染输入）
    pub fn current(&self) -> &StateTexture {
        self.states.current()
    }

    /// 下一个状态（模拟输出目标）
    pub fn next(&self) -> &StateTexture {
        self.states.next()
    }

    /// 当前状态纹理所在槽位
    pub fn current_index(&self) -> usize {
        self.states.current_index()
    }

    pub fn slot(&self, index: usize) -> &StateTexture {
        self.states.slot(index)
    }

    /// 交换读写角色，每次完成模拟后恰好调用一次
    pub fn swap(&mut self) {
        self.states.swap();
    }

    /// 已发生的交换次数
    pub fn swap_count(&self) -> u64 {
        self.states.generation()
    }
}
