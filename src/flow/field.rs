//! 速度场与重投影场
//!
//! 两类场都以 8 位 RGBA 栅格上传到 GPU，着色器通过 `value * scale + offset` 还原物理量：
//!
//! - 速度场：r/g 通道分别是归一化后的东向/北向速度（m/s）
//! - 重投影场：X/Y/Z 三张栅格，每个纹素用 [`codec`](super::codec) 打包一个世界坐标分量
//!
//! 栅格第 0 行是范围的北边界，与域 UV 的 v 轴方向一致。

use super::codec;
use super::projection::{Extent, SurfaceProjection};
use crate::core::error::{RasterError, RasterResult};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// 速度物理边界（每轴最小值和最大值）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityBounds {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

/// 栅格服务元数据中与速度相关的部分
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceInfo {
    min_values: Vec<f32>,
    max_values: Vec<f32>,
}

impl VelocityBounds {
    pub fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// 从栅格服务 JSON（`minValues` / `maxValues`）解析
    pub fn from_service_info_json(json: &str) -> RasterResult<Self> {
        let info: ServiceInfo =
            serde_json::from_str(json).map_err(|e| RasterError::ServiceInfo(e.to_string()))?;
        if info.min_values.len() < 2 || info.max_values.len() < 2 {
            return Err(RasterError::ServiceInfo(format!(
                "expected two bands, got {} min / {} max values",
                info.min_values.len(),
                info.max_values.len()
            )));
        }
        let bounds = Self::new(
            [info.min_values[0], info.min_values[1]],
            [info.max_values[0], info.max_values[1]],
        );
        bounds.validate()?;
        Ok(bounds)
    }

    /// 边界必须有限且 `max >= min`
    pub fn validate(&self) -> RasterResult<()> {
        for axis in 0..2 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(RasterError::InvalidBounds(format!(
                    "axis {} has non-finite bounds",
                    axis
                )));
            }
            if hi < lo {
                return Err(RasterError::InvalidBounds(format!(
                    "axis {}: max {} < min {}",
                    axis, hi, lo
                )));
            }
        }
        Ok(())
    }
}

/// 速度场的反归一化参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityField {
    pub offset_u: f32,
    pub scale_u: f32,
    pub offset_v: f32,
    pub scale_v: f32,
}

impl VelocityField {
    pub fn from_bounds(bounds: &VelocityBounds) -> Self {
        Self {
            offset_u: bounds.min[0],
            scale_u: bounds.max[0] - bounds.min[0],
            offset_v: bounds.min[1],
            scale_v: bounds.max[1] - bounds.min[1],
        }
    }

    pub fn offset(&self) -> [f32; 2] {
        [self.offset_u, self.offset_v]
    }

    pub fn scale(&self) -> [f32; 2] {
        [self.scale_u, self.scale_v]
    }

    /// 归一化通道值还原为物理速度
    #[inline]
    pub fn denormalize(&self, normalized: [f32; 2]) -> [f32; 2] {
        [
            normalized[0] * self.scale_u + self.offset_u,
            normalized[1] * self.scale_v + self.offset_v,
        ]
    }

    /// 物理速度归一化到 `[0, 1]`
    #[inline]
    pub fn normalize(&self, velocity: [f32; 2]) -> [f32; 2] {
        let norm = |value: f32, offset: f32, scale: f32| {
            if scale > 0.0 {
                ((value - offset) / scale).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        [
            norm(velocity[0], self.offset_u, self.scale_u),
            norm(velocity[1], self.offset_v, self.scale_v),
        ]
    }
}

/// 速度栅格（RGBA8，r/g 为归一化速度）
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl VelocityRaster {
    /// 从原始 RGBA 字节创建，长度必须等于 `width * height * 4`
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyRaster);
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RasterError::DimensionMismatch {
                width,
                height,
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// 从编码后的图像（PNG 等）解码
    pub fn from_image_bytes(bytes: &[u8]) -> RasterResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| RasterError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// 由物理速度向量构建，按行优先排列，第 0 行为北边界
    pub fn from_vectors(
        width: u32,
        height: u32,
        vectors: &[[f32; 2]],
        field: &VelocityField,
    ) -> RasterResult<Self> {
        let expected = width as usize * height as usize;
        if vectors.len() != expected {
            return Err(RasterError::DimensionMismatch {
                width,
                height,
                expected: expected * 4,
                actual: vectors.len() * 4,
            });
        }
        let mut rgba = Vec::with_capacity(expected * 4);
        for &velocity in vectors {
            let [u, v] = field.normalize(velocity);
            rgba.extend_from_slice(&[
                (u * 255.0).round() as u8,
                (v * 255.0).round() as u8,
                0,
                255,
            ]);
        }
        Self::from_rgba(width, height, rgba)
    }

    /// 宽高都不能超过纹理边长上限
    pub fn check_dimensions(&self, limit: u32) -> RasterResult<()> {
        if self.width > limit || self.height > limit {
            return Err(RasterError::TooLarge {
                width: self.width,
                height: self.height,
                limit,
            });
        }
        Ok(())
    }

    /// 最近邻采样归一化值（U 方向重复，V 方向钳制）
    pub fn sample_normalized(&self, uv: [f32; 2]) -> [f32; 2] {
        let u = uv[0] - uv[0].floor();
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((uv[1].clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height - 1);
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[offset] as f32 / 255.0,
            self.rgba[offset + 1] as f32 / 255.0,
        ]
    }

    /// 采样物理速度
    pub fn sample(&self, uv: [f32; 2], field: &VelocityField) -> [f32; 2] {
        field.denormalize(self.sample_normalized(uv))
    }
}

/// 重投影场的反归一化参数（三个分量共用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprojectionField {
    pub offset: f32,
    pub scale: f32,
}

impl ReprojectionField {
    pub fn from_bounds(bounds: (f64, f64)) -> Self {
        Self {
            offset: bounds.0 as f32,
            scale: (bounds.1 - bounds.0) as f32,
        }
    }
}

/// 预计算的重投影栅格
#[derive(Debug, Clone)]
pub struct ReprojectionData {
    pub resolution: u32,
    /// X / Y / Z 分量，各 `resolution² × 4` 字节
    pub components: [Vec<u8>; 3],
    pub field: ReprojectionField,
    bounds: (f64, f64),
}

impl ReprojectionData {
    /// 在纹素中心对范围采样并投影到渲染坐标
    pub fn build<P: SurfaceProjection + ?Sized>(
        extent: &Extent,
        projection: &P,
        resolution: u32,
    ) -> RasterResult<Self> {
        extent.validate()?;
        if resolution == 0 {
            return Err(RasterError::EmptyRaster);
        }

        let bounds = projection.render_bounds();
        let span = bounds.1 - bounds.0;
        let normalize = |value: f64| (value - bounds.0) / span;

        let size = resolution as usize * resolution as usize * 4;
        let mut components = [vec![0u8; size], vec![0u8; size], vec![0u8; size]];
        let res = resolution as f64;

        for row in 0..resolution {
            let y = extent.ymax - (row as f64 + 0.5) / res * extent.height();
            for col in 0..resolution {
                let x = extent.xmin + (col as f64 + 0.5) / res * extent.width();
                let point = projection.to_render(x, y);
                let offset = (row as usize * resolution as usize + col as usize) * 4;
                for (component, value) in components.iter_mut().zip(point.to_array()) {
                    codec::encode_into(normalize(value), &mut component[offset..]);
                }
            }
        }

        tracing::debug!(
            target: "flow",
            resolution,
            bytes = size * 3,
            "Built reprojection rasters"
        );

        Ok(Self {
            resolution,
            components,
            field: ReprojectionField::from_bounds(bounds),
            bounds,
        })
    }

    /// 解码给定域 UV 所在纹素的世界坐标（最近纹素，不做插值）
    pub fn world_at(&self, uv: [f64; 2]) -> DVec3 {
        let res = self.resolution as f64;
        let col = ((uv[0].clamp(0.0, 1.0) * res) as u32).min(self.resolution - 1);
        let row = ((uv[1].clamp(0.0, 1.0) * res) as u32).min(self.resolution - 1);
        let offset = (row as usize * self.resolution as usize + col as usize) * 4;
        let span = self.bounds.1 - self.bounds.0;
        let decode = |component: &[u8]| {
            let bytes = [
                component[offset],
                component[offset + 1],
                component[offset + 2],
                component[offset + 3],
            ];
            codec::decode(bytes) * span + self.bounds.0
        };
        DVec3::new(
            decode(&self.components[0]),
            decode(&self.components[1]),
            decode(&self.components[2]),
        )
    }
}
