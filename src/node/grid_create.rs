//! 网格创建节点
//!
//! 每次求值：
//! 1. 总是通知输出端"已变化"，并报告 `ExecutionState::Enabled`
//! 2. 输出端未就绪时跳过，不报错也不修改缓存
//! 3. 参数与快照一致且缓存有效时跳过
//! 4. 否则在设备作用域内计算拓扑、解析世界变换、生成几何并发布，最后更新快照
//!
//! 失败只作用于本次求值：记录日志并使缓存无效，下次求值必定重算。

use super::cache::{CacheEntry, NodeCache, NodeKey};
use super::change::needs_recompute;
use super::sink::{MeshSink, TransformProvider};
use super::GridParameters;
use crate::core::{ConfigurationError, PipelineError, PipelineResult};
use crate::geometry::{grid_create_launch_kernel, GridTopology, GRID_CREATE_KERNEL};
use geom_engine_hardware::ExecutionContext;
use geom_engine_profiling::{ScopedTimer, TimingMetrics};
use glam::Mat4;

/// 下游执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Disabled,
    Enabled,
}

/// 求值结果
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationStatus {
    /// 重新生成了几何
    Recomputed(GridTopology),
    /// 参数未变化，沿用已发布的几何
    Unchanged,
    /// 输出端未就绪，跳过本次求值
    SinkNotReady,
    /// 生成失败，缓存已失效
    Failed(PipelineError),
}

/// 节点输出
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutput {
    pub status: EvaluationStatus,
    pub exec_out: ExecutionState,
}

/// 求值网格创建节点
///
/// 传入 `metrics` 时把内核耗时记录到 `"grid_create"` 阶段。
pub fn evaluate(
    input: &GridParameters,
    key: &NodeKey,
    cache: &mut NodeCache,
    sink: &mut dyn MeshSink,
    transforms: &dyn TransformProvider,
    ctx: &ExecutionContext,
    metrics: Option<&mut TimingMetrics>,
) -> EvaluationOutput {
    sink.signal_changed();
    let output = |status| EvaluationOutput {
        status,
        exec_out: ExecutionState::Enabled,
    };

    if !sink.is_ready() {
        tracing::trace!(target: "grid_create", node = %key, "sink not ready, skipping");
        return output(EvaluationStatus::SinkNotReady);
    }

    let entry = cache.get(key);
    let valid = entry.map_or(false, CacheEntry::is_valid);
    if !needs_recompute(input, entry.and_then(CacheEntry::snapshot), valid) {
        return output(EvaluationStatus::Unchanged);
    }

    let result = {
        let _scope = ctx.scoped();
        compute(input, sink, transforms, ctx, metrics)
    };

    match result {
        Ok(topology) => {
            cache.put(key.clone(), CacheEntry::new(input.clone()));
            tracing::debug!(
                target: "grid_create",
                node = %key,
                "recomputed grid {:?} on {}",
                input.dims,
                ctx.device().alias()
            );
            output(EvaluationStatus::Recomputed(topology))
        }
        Err(err) => {
            tracing::error!(
                target: "grid_create",
                node = %key,
                transform_path = %input.transform_path,
                dims = ?input.dims,
                size = ?input.size,
                "grid creation failed: {}",
                err
            );
            cache.invalidate(key);
            output(EvaluationStatus::Failed(err))
        }
    }
}

fn compute(
    input: &GridParameters,
    sink: &mut dyn MeshSink,
    transforms: &dyn TransformProvider,
    ctx: &ExecutionContext,
    metrics: Option<&mut TimingMetrics>,
) -> PipelineResult<GridTopology> {
    let topology = GridTopology::from_dims(input.dims)?;
    let world_transform = resolve_transform(transforms, &input.transform_path)?;

    let mut buffers = sink.allocate(&topology.allocation_request(world_transform));
    let generated = {
        let _timer = metrics.map(|m| ScopedTimer::new(m, GRID_CREATE_KERNEL));
        grid_create_launch_kernel(ctx, &mut buffers, input.size, &topology)
            .and_then(|_| ctx.synchronize().map_err(PipelineError::from))
    };

    match generated {
        Ok(()) => {
            sink.commit(buffers, world_transform);
            Ok(topology)
        }
        Err(err) => {
            sink.discard(buffers);
            Err(err)
        }
    }
}

/// 解析变换路径，空路径为单位变换
fn resolve_transform(transforms: &dyn TransformProvider, path: &str) -> PipelineResult<Mat4> {
    if path.is_empty() {
        return Ok(Mat4::IDENTITY);
    }
    transforms.world_transform(path).ok_or_else(|| {
        ConfigurationError::UnresolvedTransform {
            path: path.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AllocationRequest, MeshBuffers};
    use crate::node::{InMemoryMeshSink, TransformMap};
    use glam::Vec3;

    struct Harness {
        key: NodeKey,
        cache: NodeCache,
        sink: InMemoryMeshSink,
        transforms: TransformMap,
        ctx: ExecutionContext,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                key: NodeKey::from("grid_create_0"),
                cache: NodeCache::new(),
                sink: InMemoryMeshSink::new(),
                transforms: TransformMap::new(),
                ctx: ExecutionContext::for_alias("parallel:2").unwrap(),
            }
        }

        fn evaluate(&mut self, input: &GridParameters) -> EvaluationOutput {
            evaluate(
                input,
                &self.key,
                &mut self.cache,
                &mut self.sink,
                &self.transforms,
                &self.ctx,
                None,
            )
        }

        fn is_valid(&self) -> bool {
            self.cache.get(&self.key).map_or(false, CacheEntry::is_valid)
        }
    }

    #[test]
    fn test_recompute_then_unchanged() {
        let mut h = Harness::new();
        let input = GridParameters::new("", [1.0, 1.0], [2, 2]);

        let out = h.evaluate(&input);
        assert_eq!(out.exec_out, ExecutionState::Enabled);
        let EvaluationStatus::Recomputed(topology) = out.status else {
            panic!("expected recompute, got {:?}", out.status);
        };
        assert_eq!(topology.point_count, 9);
        assert!(h.is_valid());

        let out = h.evaluate(&input);
        assert_eq!(out.status, EvaluationStatus::Unchanged);
        assert_eq!(h.sink.published().unwrap().version, 1);
        assert_eq!(h.ctx.launches_issued(), 1);
    }

    #[test]
    fn test_changed_parameters_recompute() {
        let mut h = Harness::new();
        h.evaluate(&GridParameters::new("", [1.0, 1.0], [2, 2]));
        let out = h.evaluate(&GridParameters::new("", [1.0, 2.0], [2, 2]));
        assert!(matches!(out.status, EvaluationStatus::Recomputed(_)));
        assert_eq!(h.sink.published().unwrap().version, 2);
    }

    #[test]
    fn test_always_signals_changed() {
        let mut h = Harness::new();
        let input = GridParameters::new("", [1.0, 1.0], [1, 1]);
        for _ in 0..3 {
            h.evaluate(&input);
            assert!(h.sink.poll_changed());
        }
    }

    #[test]
    fn test_sink_not_ready_skips() {
        let mut h = Harness::new();
        h.sink.set_ready(false);
        let out = h.evaluate(&GridParameters::new("", [1.0, 1.0], [2, 2]));
        assert_eq!(out.status, EvaluationStatus::SinkNotReady);
        assert_eq!(out.exec_out, ExecutionState::Enabled);
        assert!(h.cache.is_empty());
        assert!(h.sink.published().is_none());
        assert!(h.sink.poll_changed());
    }

    #[test]
    fn test_invalid_dims_fail_and_keep_published_mesh() {
        let mut h = Harness::new();
        h.evaluate(&GridParameters::new("", [1.0, 1.0], [2, 2]));

        let out = h.evaluate(&GridParameters::new("", [1.0, 1.0], [0, 2]));
        assert_eq!(
            out.status,
            EvaluationStatus::Failed(ConfigurationError::InvalidDims { dims: [0, 2] }.into())
        );
        assert_eq!(out.exec_out, ExecutionState::Enabled);
        assert!(!h.is_valid());
        assert_eq!(h.sink.published().unwrap().version, 1);
    }

    #[test]
    fn test_recompute_after_failure_with_unchanged_parameters() {
        let mut h = Harness::new();
        let input = GridParameters::new("/World/grid", [2.0, 2.0], [1, 1]);

        let out = h.evaluate(&input);
        assert!(matches!(
            out.status,
            EvaluationStatus::Failed(PipelineError::Configuration(
                ConfigurationError::UnresolvedTransform { .. }
            ))
        ));
        assert!(!h.is_valid());

        let translation = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        h.transforms.insert("/World/grid", translation);
        let out = h.evaluate(&input);
        assert!(matches!(out.status, EvaluationStatus::Recomputed(_)));
        assert!(h.is_valid());

        let published = h.sink.published().unwrap();
        assert_eq!(published.world_transform, translation);
        let mesh = published.world_mesh().unwrap();
        assert!(mesh.points().iter().all(|p| p.y == 5.0));
    }

    /// 返回错误大小缓冲区的输出端
    #[derive(Default)]
    struct ShortSink {
        discarded: usize,
        committed: usize,
    }

    impl MeshSink for ShortSink {
        fn is_ready(&self) -> bool {
            true
        }

        fn signal_changed(&mut self) {}

        fn allocate(&mut self, request: &AllocationRequest) -> MeshBuffers {
            MeshBuffers::with_counts(request.point_count - 1, request.vertex_count, request.face_count)
        }

        fn commit(&mut self, _buffers: MeshBuffers, _world_transform: Mat4) {
            self.committed += 1;
        }

        fn discard(&mut self, _buffers: MeshBuffers) {
            self.discarded += 1;
        }
    }

    #[test]
    fn test_generation_failure_discards_buffers() {
        let key = NodeKey::from("short");
        let mut cache = NodeCache::new();
        let mut sink = ShortSink::default();
        let ctx = ExecutionContext::for_alias("cpu").unwrap();
        let mut metrics = TimingMetrics::new();

        let out = evaluate(
            &GridParameters::new("", [1.0, 1.0], [2, 2]),
            &key,
            &mut cache,
            &mut sink,
            &TransformMap::new(),
            &ctx,
            Some(&mut metrics),
        );
        assert!(matches!(out.status, EvaluationStatus::Failed(_)));
        assert_eq!(sink.discarded, 1);
        assert_eq!(sink.committed, 0);
        assert!(cache.get(&key).is_none());
        assert_eq!(metrics.samples(GRID_CREATE_KERNEL).len(), 1);
    }

    #[test]
    fn test_profiling_records_grid_create() {
        let mut h = Harness::new();
        let mut metrics = TimingMetrics::new();
        evaluate(
            &GridParameters::new("", [1.0, 1.0], [8, 8]),
            &h.key,
            &mut h.cache,
            &mut h.sink,
            &h.transforms,
            &h.ctx,
            Some(&mut metrics),
        );
        assert_eq!(metrics.samples("grid_create").len(), 1);
    }
}
