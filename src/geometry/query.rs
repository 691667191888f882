//! 最近点查询
//!
//! `MeshQueryIndex` 是构建在三角形包围盒上的 BVH，节点以深度优先顺序平铺存储。
//! 索引不检测网格的修改；网格变化后由调用方重建索引（`mesh_id` 用于比对版本），
//! 对过期索引的查询结果未定义。

use super::mesh::{Mesh, MeshId};
use crate::core::{ConfigurationError, PipelineResult};
use glam::Vec3;
use rayon::prelude::*;

/// 叶节点最多包含的三角形数
const MAX_LEAF_TRIANGLES: usize = 4;

/// 最近点遍历栈的容量
const TRAVERSAL_STACK: usize = 64;

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_triangle(tri: &[Vec3; 3]) -> Self {
        Self {
            min: tri[0].min(tri[1]).min(tri[2]),
            max: tri[0].max(tri[1]).max(tri[2]),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn grow(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// 点到包围盒的平方距离（点在盒内时为 0）
    #[inline]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        (p.clamp(self.min, self.max) - p).length_squared()
    }

    fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }
}

/// 最近点查询结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// 网格表面上的最近点
    pub point: Vec3,
    /// 最近点所在三角形的编号
    pub triangle: usize,
    /// 查询点到最近点的距离
    pub distance: f32,
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    aabb: Aabb,
    /// 叶节点：`order` 中的起始位置；内部节点：右子节点编号（左子节点紧随其后）
    offset: u32,
    /// 叶节点的三角形数，内部节点为 0
    count: u32,
}

impl BvhNode {
    fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// 三角网格最近点查询索引
#[derive(Debug, Clone)]
pub struct MeshQueryIndex {
    nodes: Vec<BvhNode>,
    order: Vec<u32>,
    triangles: Vec<[Vec3; 3]>,
    mesh_id: MeshId,
}

impl MeshQueryIndex {
    /// 为网格构建索引
    ///
    /// 没有三角形的网格无法回答最近点查询，返回 `ConfigurationError::InvalidMesh`。
    pub fn build(mesh: &Mesh) -> PipelineResult<Self> {
        if mesh.triangle_count() == 0 {
            return Err(ConfigurationError::InvalidMesh(
                "cannot build a query index over a mesh without triangles".to_string(),
            )
            .into());
        }

        let points = mesh.points();
        let triangles: Vec<[Vec3; 3]> = mesh
            .indices()
            .par_chunks_exact(3)
            .map(|t| [points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]])
            .collect();
        let bounds: Vec<(Aabb, Vec3)> = triangles
            .par_iter()
            .map(|tri| (Aabb::from_triangle(tri), (tri[0] + tri[1] + tri[2]) / 3.0))
            .collect();

        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / MAX_LEAF_TRIANGLES + 1);
        build_node(&mut nodes, &bounds, &mut order, 0);

        tracing::debug!(
            target: "mesh_query",
            "built BVH for mesh {}: {} triangles, {} nodes",
            mesh.id().get(),
            triangles.len(),
            nodes.len()
        );

        Ok(Self {
            nodes,
            order,
            triangles,
            mesh_id: mesh.id(),
        })
    }

    /// 构建索引时的网格版本
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// 根节点包围盒
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].aabb
    }

    /// 查询网格表面上离 `query` 最近的点
    pub fn nearest_point(&self, query: Vec3) -> NearestHit {
        let mut best = NearestHit {
            point: query,
            triangle: 0,
            distance: f32::INFINITY,
        };
        let mut best_sq = f32::INFINITY;

        // 中位数划分使深度不超过 32，遍历栈最多同时持有 depth + 1 个节点
        let mut stack = [0u32; TRAVERSAL_STACK];
        let mut top = 1;
        while top > 0 {
            top -= 1;
            let id = stack[top];
            let node = &self.nodes[id as usize];
            if node.aabb.distance_squared(query) >= best_sq {
                continue;
            }

            if node.is_leaf() {
                let start = node.offset as usize;
                for &t in &self.order[start..start + node.count as usize] {
                    let point = closest_point_on_triangle(query, &self.triangles[t as usize]);
                    let d = (point - query).length_squared();
                    if d < best_sq {
                        best_sq = d;
                        best.point = point;
                        best.triangle = t as usize;
                    }
                }
                continue;
            }

            // 先访问较近的子节点
            let (left, right) = (id + 1, node.offset);
            let dl = self.nodes[left as usize].aabb.distance_squared(query);
            let dr = self.nodes[right as usize].aabb.distance_squared(query);
            let (near, far) = if dl <= dr { (left, right) } else { (right, left) };
            debug_assert!(top + 2 <= TRAVERSAL_STACK);
            stack[top] = far;
            stack[top + 1] = near;
            top += 2;
        }

        best.distance = best_sq.sqrt();
        best
    }
}

fn build_node(nodes: &mut Vec<BvhNode>, bounds: &[(Aabb, Vec3)], order: &mut [u32], start: usize) -> u32 {
    let aabb = order
        .iter()
        .fold(Aabb::EMPTY, |acc, &t| acc.union(&bounds[t as usize].0));
    let id = nodes.len() as u32;
    nodes.push(BvhNode {
        aabb,
        offset: start as u32,
        count: order.len() as u32,
    });

    if order.len() <= MAX_LEAF_TRIANGLES {
        return id;
    }

    // 按质心包围盒的最长轴做中位数划分
    let centroid_bounds = order
        .iter()
        .fold(Aabb::EMPTY, |acc, &t| acc.grow(bounds[t as usize].1));
    let axis = centroid_bounds.longest_axis();
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        bounds[a as usize].1[axis].total_cmp(&bounds[b as usize].1[axis])
    });

    let (left, right) = order.split_at_mut(mid);
    build_node(nodes, bounds, left, start);
    let right_id = build_node(nodes, bounds, right, start + mid);

    let node = &mut nodes[id as usize];
    node.offset = right_id;
    node.count = 0;
    id
}

/// 三角形上离 `p` 最近的点
///
/// 按顶点、边、面区域依次判断（Ericson, *Real-Time Collision Detection* 5.1.5）。
/// 退化三角形退回到三条边上的最近点。
pub fn closest_point_on_triangle(p: Vec3, tri: &[Vec3; 3]) -> Vec3 {
    let [a, b, c] = *tri;
    let ab = b - a;
    let ac = c - a;

    if ab.cross(ac).length_squared() <= f32::EPSILON * ab.length_squared() * ac.length_squared() {
        return closest_point_on_degenerate(p, tri);
    }

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

fn closest_point_on_degenerate(p: Vec3, tri: &[Vec3; 3]) -> Vec3 {
    [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
        .into_iter()
        .map(|(a, b)| closest_point_on_segment(p, a, b))
        .min_by(|x, y| (*x - p).length_squared().total_cmp(&(*y - p).length_squared()))
        .unwrap_or(tri[0])
}

fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    a + ab * ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}
