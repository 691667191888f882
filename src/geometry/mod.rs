//! 几何模块
//!
//! - `mesh` - 网格缓冲区和查询用三角网格
//! - `topology` - 由网格维度推导缓冲区大小
//! - `grid_kernel` - 生成网格几何的数据并行内核
//! - `query` - 三角形 BVH 最近点查询

pub mod grid_kernel;
pub mod mesh;
pub mod query;
pub mod topology;

pub use grid_kernel::{grid_create_launch_kernel, GRID_CREATE_KERNEL};
pub use mesh::{Mesh, MeshBuffers, MeshId};
pub use query::{closest_point_on_triangle, Aabb, MeshQueryIndex, NearestHit};
pub use topology::{AllocationRequest, GridTopology, MAX_GRID_ELEMENTS};
