//! 纹理回读
//!
//! 把纹理复制到可映射的暂存缓冲区，等待映射完成后去掉行填充。
//! 用于校验粒子状态和读取离屏渲染结果。

use crate::core::error::{RenderError, RenderResult};
use futures::channel::oneshot;

/// 按 256 字节对齐后的每行字节数
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// 读取整张二维纹理的原始字节（紧密排列，无行填充）
pub async fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
) -> RenderResult<Vec<u8>> {
    let row_bytes = width * bytes_per_pixel;
    let padded_row = padded_bytes_per_row(width, bytes_per_pixel);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback Staging"),
        size: padded_row as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Texture Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    rx.await
        .map_err(|_| RenderError::Readback("map callback dropped".to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let mut bytes = Vec::with_capacity((row_bytes * height) as usize);
    {
        let mapped = slice.get_mapped_range();
        for row in mapped.chunks(padded_row as usize) {
            bytes.extend_from_slice(&row[..row_bytes as usize]);
        }
    }
    staging.unmap();
    Ok(bytes)
}
