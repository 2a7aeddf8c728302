use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 粒子绘制拓扑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// 相邻轨迹粒子连成线段
    #[default]
    Lines,
    /// 每个粒子一个点
    Points,
}

impl Topology {
    /// 对应的 wgpu 图元拓扑
    pub fn primitive(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::Points => wgpu::PrimitiveTopology::PointList,
        }
    }

    /// 从字符串解析（配置/环境变量使用）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lines" | "line" => Some(Topology::Lines),
            "points" | "point" => Some(Topology::Points),
            _ => None,
        }
    }
}

/// 粒子渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// 绘制拓扑
    pub topology: Topology,
    /// 剩余寿命淡出窗口（秒）
    pub fade_window: f32,
    /// 朝向观察者的深度偏移（乘以裁剪空间 w）
    pub depth_bias: f32,
    /// 透明度缩放
    pub alpha_scale: f32,
    /// 轨迹权重的透明度下限偏移
    pub alpha_floor: f32,
}

impl_default!(RenderConfig {
    topology: Topology::Lines,
    fade_window: 2.0,
    depth_bias: 0.0001,
    alpha_scale: 0.75,
    alpha_floor: 0.5,
});

impl RenderConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.fade_window.is_finite() && self.fade_window > 0.0) {
            return Err(ConfigError::ValidationError(
                "fade_window must be positive".to_string(),
            ));
        }
        if !self.depth_bias.is_finite() || !self.alpha_scale.is_finite() {
            return Err(ConfigError::ValidationError(
                "depth_bias and alpha_scale must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// 重投影纹理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectionConfig {
    /// 重投影纹理边长（像素）
    pub resolution: u32,
}

impl_default!(ReprojectionConfig { resolution: 512 });

impl ReprojectionConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.resolution == 0 {
            return Err(ConfigError::ValidationError(
                "Invalid reprojection resolution".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_parse() {
        assert_eq!(Topology::parse("Lines"), Some(Topology::Lines));
        assert_eq!(Topology::parse(" points "), Some(Topology::Points));
        assert_eq!(Topology::parse("triangles"), None);
    }

    #[test]
    fn test_topology_primitive() {
        assert_eq!(
            Topology::Lines.primitive(),
            wgpu::PrimitiveTopology::LineList
        );
        assert_eq!(
            Topology::Points.primitive(),
            wgpu::PrimitiveTopology::PointList
        );
    }

    #[test]
    fn test_render_defaults_valid() {
        assert!(RenderConfig::default().validate().is_ok());
        assert!(ReprojectionConfig::default().validate().is_ok());
        let bad = ReprojectionConfig { resolution: 0 };
        assert!(bad.validate().is_err());
    }
}
