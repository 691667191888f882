//! 粒子积分内核
//!
//! 每个粒子一次调用：查询网格表面上的最近点，按力模型计算修正位移并积分。
//! 调用只读写自己的槽位，粒子之间没有相互作用。

use super::state::ParticleState;
use crate::core::{ConfigurationError, PipelineResult};
use crate::geometry::MeshQueryIndex;
use geom_engine_hardware::{launch, DeviceArrayMut, ExecutionContext, LaunchStats};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 内核名称，也是模拟计时的阶段名
pub const SIMULATE_KERNEL: &str = "simulate";

/// 默认表面吸引系数
pub const DEFAULT_ATTRACTION: f32 = 0.5;

/// 力模型
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceModel {
    /// 向最近表面点吸引：`f = (p - x) * k`，速度不变
    SurfaceAttraction { k: f32 },

    /// 在表面吸引之外施加重力，并在地面高度处按恢复系数反弹
    GravityBounce {
        k: f32,
        gravity: Vec3,
        restitution: f32,
        ground_height: f32,
    },
}

impl Default for ForceModel {
    fn default() -> Self {
        ForceModel::SurfaceAttraction {
            k: DEFAULT_ATTRACTION,
        }
    }
}

impl ForceModel {
    /// 标准重力、恢复系数 0.5、地面位于 `y = 0` 的重力反弹模型
    pub fn gravity_bounce(k: f32) -> Self {
        ForceModel::GravityBounce {
            k,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            restitution: 0.5,
            ground_height: 0.0,
        }
    }

    /// 验证参数
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |msg: String| Err(ConfigurationError::InvalidSimulation(msg));
        match *self {
            ForceModel::SurfaceAttraction { k } => {
                if !k.is_finite() {
                    return invalid(format!("attraction coefficient {} is not finite", k));
                }
            }
            ForceModel::GravityBounce {
                k,
                gravity,
                restitution,
                ground_height,
            } => {
                if !k.is_finite() || !gravity.is_finite() || !ground_height.is_finite() {
                    return invalid(format!("non-finite gravity bounce parameter in {:?}", self));
                }
                if !(0.0..=1.0).contains(&restitution) {
                    return invalid(format!("restitution {} outside [0, 1]", restitution));
                }
            }
        }
        Ok(())
    }

    /// 对单个粒子积分一步，返回新的位置和速度
    ///
    /// `p` 是网格表面上离 `x` 最近的点。
    #[inline]
    pub fn apply(&self, x: Vec3, v: Vec3, p: Vec3, dt: f32) -> (Vec3, Vec3) {
        match *self {
            ForceModel::SurfaceAttraction { k } => {
                let f = (p - x) * k;
                (x + v * dt + f * dt, v)
            }
            ForceModel::GravityBounce {
                k,
                gravity,
                restitution,
                ground_height,
            } => {
                let mut v = v + gravity * dt;
                if (x + v * dt).y < ground_height {
                    v.y = -v.y * restitution;
                }
                let f = (p - x) * k;
                (x + v * dt + f * dt, v)
            }
        }
    }
}

/// 启动粒子积分内核
///
/// 返回时所有调用均已完成；调用方仍需在读取状态前同步上下文。
pub fn simulate_launch_kernel(
    ctx: &ExecutionContext,
    state: &mut ParticleState,
    index: &MeshQueryIndex,
    model: &ForceModel,
    dt: f32,
) -> PipelineResult<LaunchStats> {
    let (positions, velocities) = state.split_mut();
    let count = positions.len();
    let positions = DeviceArrayMut::new(positions);
    let velocities = DeviceArrayMut::new(velocities);

    let stats = launch(ctx, SIMULATE_KERNEL, count, |tid| {
        // SAFETY: 每个调用只访问槽位 `tid`
        unsafe {
            let x = positions.load(tid);
            let v = velocities.load(tid);
            let p = index.nearest_point(x).point;
            let (x, v) = model.apply(x, v, p, dt);
            positions.store(tid, x);
            velocities.store(tid, v);
        }
    })?;
    Ok(stats)
}
