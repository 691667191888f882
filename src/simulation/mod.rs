//! 粒子模拟模块
//!
//! - `state` - 粒子位置和速度
//! - `integrator` - 力模型和粒子积分内核
//! - `sim_loop` - 固定步长模拟循环

pub mod integrator;
pub mod sim_loop;
pub mod state;

pub use integrator::{simulate_launch_kernel, ForceModel, DEFAULT_ATTRACTION, SIMULATE_KERNEL};
pub use sim_loop::SimulationLoop;
pub use state::ParticleState;
