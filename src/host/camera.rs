use glam::{Mat4, Vec3};

/// 每帧相机参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
    /// 视口宽度（像素）
    pub full_width: u32,
    /// 视口高度（像素）
    pub full_height: u32,
}

impl Camera {
    pub fn new(view: Mat4, projection: Mat4, full_width: u32, full_height: u32) -> Self {
        Self {
            view,
            projection,
            full_width,
            full_height,
        }
    }

    /// 从 `distance` 米外注视原点（地心）的透视相机
    ///
    /// `direction` 是相机所在方向，不必归一化。
    pub fn looking_at_origin(
        direction: Vec3,
        distance: f32,
        full_width: u32,
        full_height: u32,
    ) -> Self {
        let eye = direction.normalize_or_zero() * distance;
        let up = if direction.cross(Vec3::Z).length_squared() > 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let aspect = full_width.max(1) as f32 / full_height.max(1) as f32;
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, up);
        let projection =
            Mat4::perspective_rh(45f32.to_radians(), aspect, distance * 0.01, distance * 2.0);
        Self::new(view, projection, full_width, full_height)
    }

    /// 视图投影矩阵
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
