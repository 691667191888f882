//! 统一错误处理模块
//!
//! ## 错误类型分层
//!
//! - **配置错误** (`ConfigurationError`): 网格维度、变换路径、网格数据、模拟参数等输入问题
//! - **设备错误** (`geom_engine_hardware::HardwareError`): 设备查找、线程池创建、内核启动失败
//!
//! `PipelineError` 同时承载两类错误。错误只作用于当前求值，
//! 在 `node::evaluate` 的外层边界被捕获并记录。

use geom_engine_hardware::HardwareError;
use thiserror::Error;

/// 管线错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Device error: {0}")]
    Device(#[from] HardwareError),
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid grid dims {dims:?}: every axis must be >= 1")]
    InvalidDims { dims: [i32; 2] },

    #[error("Unresolved transform reference path: {path}")]
    UnresolvedTransform { path: String },

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid simulation parameter: {0}")]
    InvalidSimulation(String),

    #[error("Buffer size mismatch for {buffer}: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// 管线结果类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;
