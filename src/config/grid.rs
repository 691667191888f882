use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::node::GridParameters;
use serde::{Deserialize, Serialize};

/// 网格节点配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// 变换引用路径（空路径表示单位变换）
    pub transform_path: String,

    /// 网格尺寸
    pub size: [f32; 2],

    /// 网格分辨率
    pub dims: [i32; 2],

    /// 是否记录 `grid_create` 计时
    pub profiling: bool,
}

impl_default!(GridConfig {
    transform_path: String::new(),
    size: [10.0, 10.0],
    dims: [16, 16],
    profiling: false,
});

impl GridConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dims.iter().any(|&d| d < 1) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid grid dims {:?}",
                self.dims
            )));
        }
        if self.size.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid grid size {:?}",
                self.size
            )));
        }
        Ok(())
    }

    /// 转换为节点输入
    pub fn parameters(&self) -> GridParameters {
        GridParameters::new(self.transform_path.clone(), self.size, self.dims)
    }
}
