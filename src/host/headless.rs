//! 离屏宿主
//!
//! 不需要窗口：颜色和深度都渲染到离屏纹理，帧请求只做计数。
//! 未被错误作用域捕获的设备错误只记录日志，不会中止进程。

use super::{Camera, HostContext, RenderTarget};
use crate::core::error::{RenderError, RenderResult};
use crate::render::particles::readback;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// 离屏宿主
pub struct HeadlessHost {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    color_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    camera: Camera,
    width: u32,
    height: u32,
    pending_requests: u32,
    total_requests: u64,
    resets: u64,
}

impl HeadlessHost {
    /// 请求适配器和设备并创建 `Rgba8Unorm` 离屏目标
    pub async fn new(width: u32, height: u32, camera: Camera) -> RenderResult<Self> {
        Self::with_color_format(width, height, camera, COLOR_FORMAT).await
    }

    /// 使用指定颜色格式创建离屏目标
    pub async fn with_color_format(
        width: u32,
        height: u32,
        camera: Camera,
        color_format: wgpu::TextureFormat,
    ) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!(
            target: "flow::render",
            adapter = %info.name,
            backend = ?info.backend,
            "Using GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: Some("Headless Flow Device"),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceRequest(e.to_string()))?;
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!(target: "flow::render", %error, "Uncaptured GPU error");
        }));

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Headless Color Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Headless Depth Target"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let host = Self {
            device,
            queue,
            color,
            color_view,
            color_format,
            depth_view,
            camera,
            width,
            height,
            pending_requests: 0,
            total_requests: 0,
            resets: 0,
        };
        host.clear(wgpu::Color::BLACK);
        Ok(host)
    }

    /// 阻塞版本的 [`HeadlessHost::new`]
    pub fn new_blocking(width: u32, height: u32, camera: Camera) -> RenderResult<Self> {
        pollster::block_on(Self::new(width, height, camera))
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 清空颜色和深度（深度清为 1.0）
    pub fn clear(&self, color: wgpu::Color) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Headless Clear Encoder"),
            });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Headless Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// 取走一个待处理的帧请求
    pub fn take_render_request(&mut self) -> bool {
        if self.pending_requests > 0 {
            self.pending_requests -= 1;
            true
        } else {
            false
        }
    }

    pub fn pending_requests(&self) -> u32 {
        self.pending_requests
    }

    /// 累计的帧请求次数
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// 累计的状态重置次数
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    /// 读回颜色目标（行优先，每像素字节数取决于颜色格式）
    pub async fn read_color(&self) -> RenderResult<Vec<u8>> {
        readback::read_texture(
            &self.device,
            &self.queue,
            &self.color,
            self.width,
            self.height,
            self.color_format.block_copy_size(None).unwrap_or(4),
        )
        .await
    }
}

impl HostContext for HeadlessHost {
    fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        Some(DEPTH_FORMAT)
    }

    fn bind_render_target(&self) -> RenderTarget<'_> {
        RenderTarget {
            color: &self.color_view,
            depth: Some(&self.depth_view),
        }
    }

    fn reset_state(&mut self) {
        self.resets += 1;
    }

    fn request_render(&mut self) {
        self.pending_requests += 1;
        self.total_requests += 1;
    }
}
