//! 网格生成内核
//!
//! 每个单元 `(i, j)` 一次调用。单元写入自己的面计数、四个面顶点的索引、法线和 UV，
//! 以及它拥有的角点。角点归属保证每个点恰好被一个单元写入：
//!
//! - 单元 `(i, j)` 拥有角点 `(i+1, j+1)`
//! - `i == 0` 的单元还拥有 `(0, j+1)`
//! - `j == 0` 的单元还拥有 `(i+1, 0)`
//! - 单元 `(0, 0)` 还拥有 `(0, 0)`

use super::mesh::MeshBuffers;
use super::topology::{GridTopology, MAX_GRID_ELEMENTS};
use crate::core::{ConfigurationError, PipelineResult};
use geom_engine_hardware::{launch_2d, DeviceArrayMut, ExecutionContext, LaunchStats};
use glam::{Vec2, Vec3};

/// 内核名称（用于日志和启动错误）
pub const GRID_CREATE_KERNEL: &str = "grid_create";

/// 网格法线（`+Y`）
const GRID_NORMAL: Vec3 = Vec3::Y;

/// 单元 `(i, j)` 拥有的角点，未使用的槽位为 `None`
#[inline]
fn owned_corners(i: usize, j: usize) -> [Option<(usize, usize)>; 4] {
    [
        Some((i + 1, j + 1)),
        (i == 0).then_some((0, j + 1)),
        (j == 0).then_some((i + 1, 0)),
        (i == 0 && j == 0).then_some((0, 0)),
    ]
}

/// 在预分配的缓冲区中生成网格几何
///
/// 缓冲区长度必须与 `topology` 完全一致，否则返回
/// `ConfigurationError::BufferSizeMismatch`，缓冲区保持不变。
pub fn grid_create_launch_kernel(
    ctx: &ExecutionContext,
    buffers: &mut MeshBuffers,
    size: [f32; 2],
    topology: &GridTopology,
) -> PipelineResult<LaunchStats> {
    if topology.point_count > MAX_GRID_ELEMENTS || topology.vertex_count > MAX_GRID_ELEMENTS {
        let dims = topology.dims.map(|d| i32::try_from(d).unwrap_or(i32::MAX));
        return Err(ConfigurationError::InvalidDims { dims }.into());
    }
    check_len("points", topology.point_count, buffers.points.len())?;
    check_len("face_vertex_counts", topology.face_count, buffers.face_vertex_counts.len())?;
    check_len("face_vertex_indices", topology.vertex_count, buffers.face_vertex_indices.len())?;
    check_len("normals", topology.vertex_count, buffers.normals.len())?;
    check_len("uvs", topology.vertex_count, buffers.uvs.len())?;

    let [nx, ny] = topology.dims;
    let (fx, fy) = (nx as f32, ny as f32);
    let half = Vec2::new(size[0], size[1]) * 0.5;
    let corner_position = |ci: usize, cj: usize| {
        Vec3::new(
            ci as f32 * size[0] / fx - half.x,
            0.0,
            cj as f32 * size[1] / fy - half.y,
        )
    };
    let point_id = |ci: usize, cj: usize| cj * (nx + 1) + ci;
    // 点数已限制在 `MAX_GRID_ELEMENTS` 内，编号不会溢出 `i32`
    let point_index = |ci: usize, cj: usize| {
        let id = point_id(ci, cj);
        debug_assert!(id <= MAX_GRID_ELEMENTS);
        id as i32
    };

    let points = DeviceArrayMut::new(&mut buffers.points);
    let counts = DeviceArrayMut::new(&mut buffers.face_vertex_counts);
    let indices = DeviceArrayMut::new(&mut buffers.face_vertex_indices);
    let normals = DeviceArrayMut::new(&mut buffers.normals);
    let uvs = DeviceArrayMut::new(&mut buffers.uvs);

    let stats = launch_2d(ctx, GRID_CREATE_KERNEL, (nx, ny), |i, j| {
        let cell = j * nx + i;
        let quad = [(i, j), (i, j + 1), (i + 1, j + 1), (i + 1, j)];

        // SAFETY: 面 `cell` 独占 `counts[cell]` 和 `[cell*4, cell*4+4)`，
        // 角点按 `owned_corners` 划分，任意两个调用的写入互不重叠
        unsafe {
            counts.store(cell, 4);
            for (k, &(ci, cj)) in quad.iter().enumerate() {
                let vertex = cell * 4 + k;
                indices.store(vertex, point_index(ci, cj));
                normals.store(vertex, GRID_NORMAL);
                uvs.store(vertex, Vec2::new(ci as f32 / fx, cj as f32 / fy));
            }
            for &(ci, cj) in owned_corners(i, j).iter().flatten() {
                points.store(point_id(ci, cj), corner_position(ci, cj));
            }
        }
    })?;

    tracing::debug!(
        target: "grid_create",
        "generated {}x{} grid: {} points, {} faces in {:?}",
        nx,
        ny,
        topology.point_count,
        topology.face_count,
        stats.elapsed
    );
    Ok(stats)
}

fn check_len(buffer: &'static str, expected: usize, actual: usize) -> PipelineResult<()> {
    if expected != actual {
        return Err(ConfigurationError::BufferSizeMismatch {
            buffer,
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}
