//! 网格数据
//!
//! `MeshBuffers` 是网格节点写入的多边形网格缓冲区（面顶点布局），
//! `Mesh` 是最近点查询使用的不可变三角网格。

use crate::core::{ConfigurationError, PipelineResult};
use glam::{Mat4, Vec2, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};

/// 多边形网格缓冲区
///
/// 法线和 UV 按面顶点存储，长度与 `face_vertex_indices` 相同。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    pub points: Vec<Vec3>,
    pub face_vertex_counts: Vec<i32>,
    pub face_vertex_indices: Vec<i32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
}

impl MeshBuffers {
    /// 按拓扑计数分配零初始化的缓冲区
    pub fn with_counts(point_count: usize, vertex_count: usize, face_count: usize) -> Self {
        Self {
            points: vec![Vec3::ZERO; point_count],
            face_vertex_counts: vec![0; face_count],
            face_vertex_indices: vec![0; vertex_count],
            normals: vec![Vec3::ZERO; vertex_count],
            uvs: vec![Vec2::ZERO; vertex_count],
        }
    }

    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// 缓冲区长度是否与给定计数一致
    pub fn has_counts(&self, point_count: usize, vertex_count: usize, face_count: usize) -> bool {
        self.points.len() == point_count
            && self.face_vertex_counts.len() == face_count
            && self.face_vertex_indices.len() == vertex_count
            && self.normals.len() == vertex_count
            && self.uvs.len() == vertex_count
    }

    /// 扇形三角化为查询用网格
    pub fn triangulate(&self) -> PipelineResult<Mesh> {
        self.triangulate_with(Mat4::IDENTITY)
    }

    /// 以给定变换把点变换到世界空间后三角化
    pub fn triangulate_with(&self, transform: Mat4) -> PipelineResult<Mesh> {
        let expected: usize = self
            .face_vertex_counts
            .iter()
            .map(|&c| c.max(0) as usize)
            .sum();
        if expected != self.face_vertex_indices.len() {
            return Err(ConfigurationError::BufferSizeMismatch {
                buffer: "face_vertex_indices",
                expected,
                actual: self.face_vertex_indices.len(),
            }
            .into());
        }

        let mut indices = Vec::with_capacity(expected.saturating_sub(2 * self.face_count()) * 3);
        let mut offset = 0;
        for &count in &self.face_vertex_counts {
            let count = count.max(0) as usize;
            let face = &self.face_vertex_indices[offset..offset + count];
            for k in 1..count.saturating_sub(1) {
                for &vertex in &[face[0], face[k], face[k + 1]] {
                    let vertex = u32::try_from(vertex).map_err(|_| {
                        ConfigurationError::InvalidMesh(format!("negative vertex index {}", vertex))
                    })?;
                    indices.push(vertex);
                }
            }
            offset += count;
        }

        let points = self
            .points
            .iter()
            .map(|&p| transform.transform_point3(p))
            .collect();
        Mesh::new(points, indices)
    }
}

/// 网格版本标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// 三角网格
///
/// 构建后不可变；任何修改都需要创建新的 `Mesh`（新的 `MeshId`）并重建依赖它的查询索引。
#[derive(Debug, Clone)]
pub struct Mesh {
    points: Vec<Vec3>,
    indices: Vec<u32>,
    id: MeshId,
}

impl Mesh {
    /// 创建三角网格，`indices` 每三个一组构成一个三角形
    pub fn new(points: Vec<Vec3>, indices: Vec<u32>) -> PipelineResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(ConfigurationError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            ))
            .into());
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= points.len()) {
            return Err(ConfigurationError::InvalidMesh(format!(
                "index {} out of range for {} points",
                bad,
                points.len()
            ))
            .into());
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(ConfigurationError::InvalidMesh("non-finite point".to_string()).into());
        }

        Ok(Self {
            points,
            indices,
            id: MeshId::next(),
        })
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 第 `t` 个三角形的三个顶点
    #[inline]
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let i = &self.indices[t * 3..t * 3 + 3];
        [
            self.points[i[0] as usize],
            self.points[i[1] as usize],
            self.points[i[2] as usize],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineError;

    fn unit_quad() -> MeshBuffers {
        MeshBuffers {
            points: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
            ],
            face_vertex_counts: vec![4],
            face_vertex_indices: vec![0, 2, 3, 1],
            normals: vec![Vec3::Y; 4],
            uvs: vec![Vec2::ZERO; 4],
        }
    }

    #[test]
    fn test_with_counts() {
        let buffers = MeshBuffers::with_counts(9, 16, 4);
        assert!(buffers.has_counts(9, 16, 4));
        assert!(!buffers.has_counts(9, 16, 5));
    }

    #[test]
    fn test_triangulate_quad() {
        let mesh = unit_quad().triangulate().unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices(), &[0, 2, 3, 0, 3, 1]);
    }

    #[test]
    fn test_triangulate_with_transform() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let mesh = unit_quad().triangulate_with(transform).unwrap();
        assert!(mesh.points().iter().all(|p| p.y == 2.0));
    }

    #[test]
    fn test_triangulate_rejects_bad_counts() {
        let mut buffers = unit_quad();
        buffers.face_vertex_counts = vec![5];
        assert!(matches!(
            buffers.triangulate(),
            Err(PipelineError::Configuration(
                ConfigurationError::BufferSizeMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_mesh_validation() {
        let points = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        assert!(Mesh::new(points.clone(), vec![0, 1, 2]).is_ok());
        assert!(Mesh::new(points.clone(), vec![0, 1]).is_err());
        assert!(Mesh::new(points, vec![0, 1, 3]).is_err());
    }

    #[test]
    fn test_mesh_ids_are_unique() {
        let a = Mesh::new(vec![Vec3::ZERO], vec![]).unwrap();
        let b = Mesh::new(vec![Vec3::ZERO], vec![]).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
