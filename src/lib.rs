//! # Geom Engine
//!
//! Change-gated parametric grid mesh generation and surface-attracted particle
//! simulation on data-parallel kernels.
//!
//! ## Features
//!
//! - **Grid node**: incremental quad-grid generation, recomputed only when its parameters change
//! - **Nearest-point queries**: BVH over mesh triangles
//! - **Particle simulation**: fixed-timestep integration against a mesh surface with selectable force models
//! - **Compute devices**: sequential `cpu` or rayon-backed `parallel[:N]` kernel launches
//!
//! ### Example
//!
//! ```rust
//! use geom_engine::geometry::MeshQueryIndex;
//! use geom_engine::node::{evaluate, GridParameters, InMemoryMeshSink, NodeCache, NodeKey, TransformMap};
//! use geom_engine::simulation::{ForceModel, ParticleState, SimulationLoop};
//! use geom_engine_hardware::ExecutionContext;
//!
//! let ctx = ExecutionContext::for_alias("parallel").unwrap();
//! let mut cache = NodeCache::new();
//! let mut sink = InMemoryMeshSink::new();
//! let input = GridParameters::new("", [10.0, 10.0], [8, 8]);
//! evaluate(&input, &NodeKey::from("grid"), &mut cache, &mut sink, &TransformMap::new(), &ctx, None);
//!
//! let mesh = sink.published().unwrap().world_mesh().unwrap();
//! let index = MeshQueryIndex::build(&mesh).unwrap();
//! let state = ParticleState::random_cube(100, 10.0, 42);
//! let mut sim = SimulationLoop::new(&ctx, &index, state, ForceModel::default(), 1.0 / 60.0).unwrap();
//! sim.run(10).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Error types and shared macros
//! - [`config`]: Pipeline configuration
//! - [`geometry`]: Mesh buffers, grid kernel and query index
//! - [`node`]: Grid creation node with change detection
//! - [`simulation`]: Particle integrator and simulation loop

/// Error types and shared macros
pub mod core;
/// Configuration system
pub mod config;
/// Mesh data, grid generation and nearest-point queries
pub mod geometry;
/// Grid creation node
pub mod node;
/// Particle simulation
pub mod simulation;

pub use crate::core::{ConfigurationError, PipelineError, PipelineResult};
pub use config::PipelineConfig;
