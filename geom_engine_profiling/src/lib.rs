//! # Geom Engine Profiling
//!
//! Per-phase timing metrics for geom_engine.
//!
//! ## Example
//!
//! ```rust
//! use geom_engine_profiling::{ScopedTimer, TimingMetrics};
//!
//! let mut metrics = TimingMetrics::new();
//! {
//!     let _timer = ScopedTimer::new(&mut metrics, "simulate");
//!     // ... do work ...
//! }
//! assert_eq!(metrics.samples("simulate").len(), 1);
//! ```

pub mod timing;

// Re-export public APIs
pub use timing::{PhaseStats, ScopedTimer, TimingMetrics};
