//! 网格拓扑
//!
//! 由网格维度推导面、面顶点和点的数量，以及交给输出端的分配请求。

use crate::core::ConfigurationError;
use glam::Mat4;

/// 点数和面顶点数的上限
///
/// 面顶点索引以 `i32` 存储，每个点编号都必须能用 `i32` 表示。
pub const MAX_GRID_ELEMENTS: usize = i32::MAX as usize;

/// 网格拓扑计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTopology {
    /// 每个轴上的单元数
    pub dims: [usize; 2],
    pub face_count: usize,
    pub vertex_count: usize,
    pub point_count: usize,
}

impl GridTopology {
    /// 由网格维度计算拓扑计数
    ///
    /// `face_count = x*y`，`vertex_count = 4*face_count`，`point_count = (x+1)*(y+1)`。
    /// 点数或面顶点数超过 [`MAX_GRID_ELEMENTS`] 时返回 `InvalidDims`。
    pub fn from_dims(dims: [i32; 2]) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidDims { dims };
        if dims[0] < 1 || dims[1] < 1 {
            return Err(invalid());
        }

        let (x, y) = (dims[0] as usize, dims[1] as usize);
        let face_count = x.checked_mul(y).ok_or_else(invalid)?;
        let vertex_count = face_count.checked_mul(4).ok_or_else(invalid)?;
        let point_count = (x + 1).checked_mul(y + 1).ok_or_else(invalid)?;
        if point_count > MAX_GRID_ELEMENTS || vertex_count > MAX_GRID_ELEMENTS {
            return Err(invalid());
        }

        Ok(Self {
            dims: [x, y],
            face_count,
            vertex_count,
            point_count,
        })
    }

    /// 生成输出端的分配请求
    pub fn allocation_request(&self, world_transform: Mat4) -> AllocationRequest {
        AllocationRequest {
            point_count: self.point_count,
            vertex_count: self.vertex_count,
            face_count: self.face_count,
            world_transform,
        }
    }
}

/// 输出端分配请求
///
/// 核心只计算所需大小并提供解析后的世界变换，存储由输出端负责。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationRequest {
    pub point_count: usize,
    pub vertex_count: usize,
    pub face_count: usize,
    pub world_transform: Mat4,
}
