//! 网格节点
//!
//! 把"每次图求值执行一次"的节点表达为纯函数 [`evaluate`]：输入参数快照、
//! 按节点实例键寻址的缓存、输出端和变换提供者都由调用方显式传入。

pub mod cache;
pub mod change;
pub mod grid_create;
pub mod sink;

pub use cache::{CacheEntry, NodeCache, NodeKey};
pub use change::needs_recompute;
pub use grid_create::{evaluate, EvaluationOutput, EvaluationStatus, ExecutionState};
pub use sink::{InMemoryMeshSink, MeshSink, PublishedMesh, TransformMap, TransformProvider};

use serde::{Deserialize, Serialize};

/// 网格节点输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParameters {
    /// 变换引用路径，空路径表示单位变换
    pub transform_path: String,
    /// 网格在两个轴上的尺寸
    pub size: [f32; 2],
    /// 每个轴上的单元数
    pub dims: [i32; 2],
}

impl GridParameters {
    pub fn new(transform_path: impl Into<String>, size: [f32; 2], dims: [i32; 2]) -> Self {
        Self {
            transform_path: transform_path.into(),
            size,
            dims,
        }
    }
}
