use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::simulation::ForceModel;
use serde::{Deserialize, Serialize};

/// 粒子模拟配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 粒子数量
    pub num_particles: usize,

    /// 模拟步数
    pub steps: usize,

    /// 固定时间步长（秒）
    pub dt: f32,

    /// 初始位置随机种子
    pub seed: u64,

    /// 初始位置立方体边长（以原点为中心）
    pub spawn_extent: f32,

    /// 每步是否把位置拷贝到主机缓冲区
    pub copy_to_host: bool,

    /// 力模型
    pub force_model: ForceModel,
}

impl_default!(SimulationConfig {
    num_particles: 10_000,
    steps: 1000,
    dt: 1.0 / 60.0,
    seed: 42,
    spawn_extent: 10.0,
    copy_to_host: true,
    force_model: ForceModel::default(),
});

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid time step {}",
                self.dt
            )));
        }
        if !self.spawn_extent.is_finite() || self.spawn_extent < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid spawn extent {}",
                self.spawn_extent
            )));
        }
        self.force_model
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
