//! 节点的外部协作者
//!
//! - `MeshSink` - 输出端，负责分配和持有网格缓冲区
//! - `TransformProvider` - 把变换引用路径解析为世界变换

use crate::core::PipelineResult;
use crate::geometry::{AllocationRequest, Mesh, MeshBuffers};
use glam::Mat4;
use std::collections::HashMap;

/// 网格输出端
///
/// 节点先在 `allocate` 返回的缓冲区中生成完整几何，再通过 `commit` 一次性发布，
/// 读取方永远看不到写了一半的缓冲区。
pub trait MeshSink {
    /// 输出端是否可以接收数据
    fn is_ready(&self) -> bool;

    /// 通知下游输出已变化（每次求值都会调用）
    fn signal_changed(&mut self);

    /// 分配与请求计数一致的缓冲区
    fn allocate(&mut self, request: &AllocationRequest) -> MeshBuffers;

    /// 发布已完整写入的缓冲区
    fn commit(&mut self, buffers: MeshBuffers, world_transform: Mat4);

    /// 归还生成失败的缓冲区
    fn discard(&mut self, _buffers: MeshBuffers) {}
}

/// 已发布的网格
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMesh {
    pub buffers: MeshBuffers,
    pub world_transform: Mat4,
    /// 每次发布递增
    pub version: u64,
}

impl PublishedMesh {
    /// 三角化为世界空间的查询网格
    pub fn world_mesh(&self) -> PipelineResult<Mesh> {
        self.buffers.triangulate_with(self.world_transform)
    }
}

/// 内存输出端
///
/// 双缓冲：发布时旧缓冲区成为备用，计数不变时下次分配直接复用。
#[derive(Debug)]
pub struct InMemoryMeshSink {
    ready: bool,
    changed: bool,
    published: Option<PublishedMesh>,
    spare: Option<MeshBuffers>,
    allocations: usize,
    version: u64,
}

impl Default for InMemoryMeshSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMeshSink {
    pub fn new() -> Self {
        Self {
            ready: true,
            changed: false,
            published: None,
            spare: None,
            allocations: 0,
            version: 0,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// 读取并清除变化通知
    pub fn poll_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn published(&self) -> Option<&PublishedMesh> {
        self.published.as_ref()
    }

    /// 实际新分配缓冲区的次数
    pub fn allocations(&self) -> usize {
        self.allocations
    }
}

impl MeshSink for InMemoryMeshSink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn signal_changed(&mut self) {
        self.changed = true;
    }

    fn allocate(&mut self, request: &AllocationRequest) -> MeshBuffers {
        let counts = (request.point_count, request.vertex_count, request.face_count);
        match self.spare.take() {
            Some(buffers) if buffers.has_counts(counts.0, counts.1, counts.2) => buffers,
            _ => {
                self.allocations += 1;
                MeshBuffers::with_counts(counts.0, counts.1, counts.2)
            }
        }
    }

    fn commit(&mut self, buffers: MeshBuffers, world_transform: Mat4) {
        self.version += 1;
        let previous = self.published.replace(PublishedMesh {
            buffers,
            world_transform,
            version: self.version,
        });
        self.spare = previous.map(|p| p.buffers);
    }

    fn discard(&mut self, buffers: MeshBuffers) {
        self.spare = Some(buffers);
    }
}

/// 变换提供者
pub trait TransformProvider {
    /// 解析路径对应的世界变换，路径不存在时返回 `None`
    fn world_transform(&self, path: &str) -> Option<Mat4>;
}

/// 路径到变换的映射表
#[derive(Debug, Clone, Default)]
pub struct TransformMap {
    transforms: HashMap<String, Mat4>,
}

impl TransformMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, transform: Mat4) {
        self.transforms.insert(path.into(), transform);
    }
}

impl TransformProvider for TransformMap {
    fn world_transform(&self, path: &str) -> Option<Mat4> {
        self.transforms.get(path).copied()
    }
}
