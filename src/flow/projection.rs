//! 地理范围与曲面投影
//!
//! 模拟在平面域 UV 空间中运行，渲染发生在三维曲面（地球）上。
//! [`SurfaceProjection`] 描述地图坐标与渲染坐标（米）之间的映射，
//! 默认实现 [`SphericalSurface`] 把地图坐标投到半径 6378137 米的球面上。

use crate::core::error::{RasterError, RasterResult};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// WGS84 长半轴（米）
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Web Mercator 世界范围的半边长（米）
pub const WEB_MERCATOR_HALF_EXTENT: f64 = 20_037_508.342_788_905;

/// 空间参考
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialReference {
    /// Web Mercator（wkid 3857 / 102100），单位米
    WebMercator,
    /// 地理坐标（wkid 4326），单位度
    Wgs84,
}

impl SpatialReference {
    /// 从 wkid 解析
    pub fn from_wkid(wkid: u32) -> Option<Self> {
        match wkid {
            3857 | 102100 | 102113 | 900913 => Some(Self::WebMercator),
            4326 => Some(Self::Wgs84),
            _ => None,
        }
    }

    pub fn wkid(self) -> u32 {
        match self {
            Self::WebMercator => 102100,
            Self::Wgs84 => 4326,
        }
    }

    /// 地图坐标转经纬度（弧度）
    pub fn to_lon_lat(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::WebMercator => {
                let lon = x / EARTH_RADIUS;
                let lat = 2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2;
                (lon, lat)
            }
            Self::Wgs84 => (x.to_radians(), y.to_radians()),
        }
    }

    /// 经纬度（弧度）转地图坐标
    pub fn from_lon_lat(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::WebMercator => {
                let x = lon * EARTH_RADIUS;
                let y = EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln();
                (x, y)
            }
            Self::Wgs84 => (lon.to_degrees(), lat.to_degrees()),
        }
    }
}

/// 数据覆盖的地图范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub spatial_reference: SpatialReference,
}

impl Extent {
    pub fn new(
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
            spatial_reference,
        }
    }

    /// 覆盖全球的 Web Mercator 范围
    pub fn web_mercator_world() -> Self {
        Self::new(
            -WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
            -WEB_MERCATOR_HALF_EXTENT,
            WEB_MERCATOR_HALF_EXTENT,
            SpatialReference::WebMercator,
        )
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// 校验范围是否有限且非退化
    pub fn validate(&self) -> RasterResult<()> {
        let finite = [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(RasterError::InvalidExtent("non-finite coordinate".to_string()));
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(RasterError::InvalidExtent(format!(
                "degenerate extent {}x{}",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }

    /// 地图坐标转域 UV（v 从北边界开始向南增长）
    pub fn to_domain(&self, x: f64, y: f64) -> [f64; 2] {
        [(x - self.xmin) / self.width(), (self.ymax - y) / self.height()]
    }

    /// 域 UV 转地图坐标
    pub fn from_domain(&self, uv: [f64; 2]) -> (f64, f64) {
        (
            self.xmin + uv[0] * self.width(),
            self.ymax - uv[1] * self.height(),
        )
    }
}

/// 地图坐标与三维渲染坐标之间的映射
pub trait SurfaceProjection {
    /// 地图坐标转渲染坐标（米）
    fn to_render(&self, x: f64, y: f64) -> DVec3;

    /// 渲染坐标转地图坐标，无法表示时返回 `None`
    fn from_render(&self, point: DVec3) -> Option<(f64, f64)>;

    /// 渲染坐标各分量的取值范围，用于归一化重投影纹理
    fn render_bounds(&self) -> (f64, f64);

    /// 球面半径（用于生成出生点）
    fn radius(&self) -> f64;
}

/// 地图坐标到球面的投影
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalSurface {
    pub radius: f64,
    pub spatial_reference: SpatialReference,
}

impl SphericalSurface {
    pub fn new(spatial_reference: SpatialReference) -> Self {
        Self {
            radius: EARTH_RADIUS,
            spatial_reference,
        }
    }
}

impl SurfaceProjection for SphericalSurface {
    fn to_render(&self, x: f64, y: f64) -> DVec3 {
        let (lon, lat) = self.spatial_reference.to_lon_lat(x, y);
        DVec3::new(
            self.radius * lat.cos() * lon.cos(),
            self.radius * lat.cos() * lon.sin(),
            self.radius * lat.sin(),
        )
    }

    fn from_render(&self, point: DVec3) -> Option<(f64, f64)> {
        let r = point.length();
        if r <= f64::EPSILON {
            return None;
        }
        let lon = point.y.atan2(point.x);
        let lat = (point.z / r).clamp(-1.0, 1.0).asin();
        let (x, y) = self.spatial_reference.from_lon_lat(lon, lat);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    fn render_bounds(&self) -> (f64, f64) {
        (-self.radius, self.radius)
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}
