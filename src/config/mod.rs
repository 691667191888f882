/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和配置校验
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod grid;
pub mod simulation;

pub use grid::GridConfig;
pub use simulation::SimulationConfig;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 管线主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 计算设备别名（`cpu`、`parallel`、`parallel:N`）
    pub device: String,

    /// 网格配置
    #[serde(default)]
    pub grid: GridConfig,

    /// 模拟配置
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl_default!(PipelineConfig {
    device: geom_engine_hardware::PARALLEL_DEVICE.to_string(),
    grid: GridConfig::default(),
    simulation: SimulationConfig::default(),
    logging: LoggingConfig::default(),
});

impl PipelineConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("GEOM_ENGINE_DEVICE") {
            self.device = val;
        }

        // 模拟配置
        if let Ok(val) = env::var("GEOM_ENGINE_SIM_STEPS") {
            if let Ok(steps) = val.parse() {
                self.simulation.steps = steps;
            }
        }
        if let Ok(val) = env::var("GEOM_ENGINE_SIM_PARTICLES") {
            if let Ok(count) = val.parse() {
                self.simulation.num_particles = count;
            }
        }
        if let Ok(val) = env::var("GEOM_ENGINE_SIM_DT") {
            if let Ok(dt) = val.parse() {
                self.simulation.dt = dt;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        geom_engine_hardware::get_device(&self.device)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.grid.validate()?;
        self.simulation.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./geom_engine.toml
    /// 2. ./geom_engine.json
    /// 3. ~/.config/geom_engine/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("geom_engine.toml") {
            tracing::info!(target: "config", "Loaded config from geom_engine.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("geom_engine.json") {
            tracing::info!(target: "config", "Loaded config from geom_engine.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("geom_engine")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 未设置时使用）
    pub level: LogLevel,

    /// 是否输出日志目标
    pub with_target: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    with_target: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 转换为 `EnvFilter` 指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
