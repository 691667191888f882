use crate::core::{ConfigurationError, PipelineResult};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 粒子状态
///
/// 位置和速度是等长的并行数组，每步原地更新。
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl ParticleState {
    pub fn new(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> PipelineResult<Self> {
        if positions.len() != velocities.len() {
            return Err(ConfigurationError::BufferSizeMismatch {
                buffer: "velocities",
                expected: positions.len(),
                actual: velocities.len(),
            }
            .into());
        }
        Ok(Self {
            positions,
            velocities,
        })
    }

    /// 全部位于原点、速度为零的粒子
    pub fn zeros(count: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; count],
            velocities: vec![Vec3::ZERO; count],
        }
    }

    /// 在以原点为中心、边长为 `extent` 的立方体内均匀随机放置粒子，速度为零
    ///
    /// 相同的种子生成相同的初始状态。
    pub fn random_cube(count: usize, extent: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = (0..count)
            .map(|_| (Vec3::new(rng.gen(), rng.gen(), rng.gen()) - Vec3::splat(0.5)) * extent)
            .collect();
        Self {
            positions,
            velocities: vec![Vec3::ZERO; count],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// 同时可变借用两个数组
    pub(crate) fn split_mut(&mut self) -> (&mut [Vec3], &mut [Vec3]) {
        (&mut self.positions, &mut self.velocities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        assert!(ParticleState::new(vec![Vec3::ZERO; 2], vec![Vec3::ZERO; 3]).is_err());
        assert_eq!(
            ParticleState::new(vec![Vec3::X; 2], vec![Vec3::ZERO; 2])
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_random_cube() {
        let state = ParticleState::random_cube(1000, 10.0, 42);
        assert_eq!(state.len(), 1000);
        assert!(state
            .positions()
            .iter()
            .all(|p| p.abs().max_element() <= 5.0));
        assert!(state.velocities().iter().all(|&v| v == Vec3::ZERO));

        assert_eq!(state, ParticleState::random_cube(1000, 10.0, 42));
        assert_ne!(state, ParticleState::random_cube(1000, 10.0, 43));
    }

    #[test]
    fn test_empty() {
        assert!(ParticleState::zeros(0).is_empty());
        assert!(ParticleState::random_cube(0, 10.0, 1).is_empty());
    }
}
