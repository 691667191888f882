//! 固定步长模拟循环
//!
//! 每一步：在上下文的设备上启动积分内核，同步，按需把位置拷贝到主机缓冲区，
//! 记录 `"simulate"` 阶段耗时，推进模拟时间。下一步只在上一步的启动完全退出后开始。

use super::integrator::{simulate_launch_kernel, ForceModel, SIMULATE_KERNEL};
use super::state::ParticleState;
use crate::core::{ConfigurationError, PipelineResult};
use crate::geometry::MeshQueryIndex;
use geom_engine_hardware::ExecutionContext;
use geom_engine_profiling::TimingMetrics;
use glam::Vec3;
use std::time::Instant;

/// 模拟循环
pub struct SimulationLoop<'a> {
    ctx: &'a ExecutionContext,
    index: &'a MeshQueryIndex,
    state: ParticleState,
    force_model: ForceModel,
    dt: f32,
    copy_to_host: bool,
    host_positions: Vec<Vec3>,
    metrics: TimingMetrics,
    sim_time: f64,
    steps_taken: usize,
}

impl<'a> SimulationLoop<'a> {
    pub fn new(
        ctx: &'a ExecutionContext,
        index: &'a MeshQueryIndex,
        state: ParticleState,
        force_model: ForceModel,
        dt: f32,
    ) -> PipelineResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(
                ConfigurationError::InvalidSimulation(format!("time step {} must be positive", dt)).into(),
            );
        }
        force_model.validate()?;

        let host_positions = state.positions().to_vec();
        Ok(Self {
            ctx,
            index,
            state,
            force_model,
            dt,
            copy_to_host: true,
            host_positions,
            metrics: TimingMetrics::new(),
            sim_time: 0.0,
            steps_taken: 0,
        })
    }

    /// 是否在每步之后自动拷贝位置到主机缓冲区
    pub fn with_host_copy(mut self, enabled: bool) -> Self {
        self.copy_to_host = enabled;
        self
    }

    /// 推进一步
    pub fn step(&mut self) -> PipelineResult<()> {
        if !self.state.is_empty() {
            let start = Instant::now();
            simulate_launch_kernel(self.ctx, &mut self.state, self.index, &self.force_model, self.dt)?;
            self.ctx.synchronize()?;
            self.metrics.record(SIMULATE_KERNEL, start.elapsed());
        }

        if self.copy_to_host {
            self.copy_to_host();
        }

        self.sim_time += f64::from(self.dt);
        self.steps_taken += 1;
        Ok(())
    }

    /// 推进 `steps` 步
    pub fn run(&mut self, steps: usize) -> PipelineResult<()> {
        let _scope = self.ctx.scoped();
        tracing::info!(
            target: "simulation",
            "running {} steps with {} particles on {}",
            steps,
            self.state.len(),
            self.ctx.device().alias()
        );

        for _ in 0..steps {
            self.step()?;
        }

        if let Some(stats) = self.metrics.stats(SIMULATE_KERNEL) {
            tracing::info!(
                target: "simulation",
                "simulate: mean {:?}, min {:?}, max {:?}",
                stats.mean,
                stats.min,
                stats.max
            );
        }
        Ok(())
    }

    /// 把当前位置拷贝到主机缓冲区
    pub fn copy_to_host(&mut self) {
        self.host_positions.copy_from_slice(self.state.positions());
    }

    /// 最近一次拷贝到主机的位置
    pub fn host_positions(&self) -> &[Vec3] {
        &self.host_positions
    }

    /// 主机位置的原始字节（每个点 3 个 `f32`）
    pub fn host_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.host_positions)
    }

    /// 网格变化后替换为重建的查询索引
    pub fn set_index(&mut self, index: &'a MeshQueryIndex) {
        tracing::debug!(
            target: "simulation",
            "query index replaced: mesh {} -> {}",
            self.index.mesh_id().get(),
            index.mesh_id().get()
        );
        self.index = index;
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    pub fn metrics(&self) -> &TimingMetrics {
        &self.metrics
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }
}
