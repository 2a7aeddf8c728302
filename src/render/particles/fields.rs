//! 速度场与重投影场的 GPU 纹理
//!
//! 两者都是 `Rgba8Unorm` 纹理。速度场使用最近邻采样，重投影场使用线性采样；
//! U 方向重复（经度环绕），V 方向钳制。

use crate::flow::{ReprojectionData, ReprojectionField, VelocityField, VelocityRaster};

/// 场纹理格式
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// 单张 RGBA8 场纹理
pub struct FieldTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl FieldTexture {
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

fn field_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// 速度场纹理及其反归一化参数
pub struct VelocityTexture {
    pub texture: FieldTexture,
    pub sampler: wgpu::Sampler,
    pub field: VelocityField,
}

impl VelocityTexture {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        raster: &VelocityRaster,
        field: VelocityField,
    ) -> Self {
        let texture = FieldTexture::from_rgba(
            device,
            queue,
            raster.width,
            raster.height,
            &raster.rgba,
            "Velocity Field Texture",
        );
        Self {
            texture,
            sampler: field_sampler(device, "Velocity Field Sampler", wgpu::FilterMode::Nearest),
            field,
        }
    }
}

/// 重投影纹理（X / Y / Z）及其反归一化参数
pub struct ReprojectionTextures {
    pub components: [FieldTexture; 3],
    pub sampler: wgpu::Sampler,
    pub field: ReprojectionField,
}

impl ReprojectionTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, data: &ReprojectionData) -> Self {
        let res = data.resolution;
        let [x, y, z] = &data.components;
        let components = [
            FieldTexture::from_rgba(device, queue, res, res, x, "Reprojection X Texture"),
            FieldTexture::from_rgba(device, queue, res, res, y, "Reprojection Y Texture"),
            FieldTexture::from_rgba(device, queue, res, res, z, "Reprojection Z Texture"),
        ];
        Self {
            components,
            sampler: field_sampler(device, "Reprojection Sampler", wgpu::FilterMode::Linear),
            field: data.field,
        }
    }
}
