//! 宿主边界
//!
//! 粒子系统不拥有窗口、相机或帧循环，这些由宿主通过 [`HostContext`] 提供：
//! GPU 设备与队列、每帧相机、帧缓冲绑定与状态重置，以及"再请求一帧"的信号。
//! [`HeadlessHost`] 是基于离屏纹理的实现，供演示程序和 GPU 测试使用。

pub mod camera;
pub mod headless;

pub use camera::Camera;
pub use headless::HeadlessHost;

/// 宿主帧缓冲的绑定结果
#[derive(Clone, Copy)]
pub struct RenderTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: Option<&'a wgpu::TextureView>,
}

/// 宿主上下文
pub trait HostContext {
    fn device(&self) -> &wgpu::Device;

    fn queue(&self) -> &wgpu::Queue;

    /// 当前帧的相机
    fn camera(&self) -> Camera;

    /// 帧缓冲的颜色格式
    fn color_format(&self) -> wgpu::TextureFormat;

    /// 帧缓冲的深度格式，没有深度缓冲时为 `None`
    fn depth_format(&self) -> Option<wgpu::TextureFormat>;

    /// 绑定宿主帧缓冲
    fn bind_render_target(&self) -> RenderTarget<'_>;

    /// 绘制结束后恢复宿主的渲染状态
    fn reset_state(&mut self);

    /// 请求宿主再调度一帧
    fn request_render(&mut self);
}
