//! 计算设备检测与选择
//!
//! 设备通过别名选择：
//! - `cpu`: 在调用线程上顺序执行每个内核调用
//! - `parallel`: 使用全部逻辑核心的 rayon 线程池
//! - `parallel:N`: 使用 N 个工作线程的 rayon 线程池
//!
//! 同一别名在进程内只创建一次线程池，之后从注册表中复用。

use crate::error::{ErrorContext, HardwareError, HardwareResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// 顺序执行设备别名
pub const CPU_DEVICE: &str = "cpu";

/// 并行执行设备别名
pub const PARALLEL_DEVICE: &str = "parallel";

/// 设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// 在调用线程上顺序执行
    Cpu,
    /// 在专用线程池上数据并行执行
    Parallel,
}

/// 计算设备
///
/// 克隆开销很小，线程池通过 `Arc` 共享。
#[derive(Clone)]
pub struct ComputeDevice {
    alias: String,
    kind: DeviceKind,
    threads: usize,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl ComputeDevice {
    /// 创建顺序执行设备
    pub fn cpu() -> Self {
        Self {
            alias: CPU_DEVICE.to_string(),
            kind: DeviceKind::Cpu,
            threads: 1,
            pool: None,
        }
    }

    /// 创建拥有 `threads` 个工作线程的并行设备
    pub fn parallel(alias: impl Into<String>, threads: usize) -> HardwareResult<Self> {
        let alias = alias.into();
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name({
                let alias = alias.clone();
                move |i| format!("{}-worker-{}", alias, i)
            })
            .build()
            .map_err(|e| HardwareError::ThreadPoolCreation {
                alias: alias.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            alias,
            kind: DeviceKind::Parallel,
            threads,
            pool: Some(Arc::new(pool)),
        })
    }

    /// 设备别名
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// 设备类型
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// 工作线程数
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub(crate) fn pool(&self) -> Option<&rayon::ThreadPool> {
        self.pool.as_deref()
    }
}

impl PartialEq for ComputeDevice {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
    }
}

impl Eq for ComputeDevice {}

impl fmt::Debug for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeDevice")
            .field("alias", &self.alias)
            .field("kind", &self.kind)
            .field("threads", &self.threads)
            .finish()
    }
}

/// 设备描述（用于日志和配置校验）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub alias: String,
    pub kind: DeviceKind,
    pub threads: usize,
}

/// 检测可用设备
pub fn detect_devices() -> Vec<DeviceInfo> {
    vec![
        DeviceInfo {
            alias: CPU_DEVICE.to_string(),
            kind: DeviceKind::Cpu,
            threads: 1,
        },
        DeviceInfo {
            alias: PARALLEL_DEVICE.to_string(),
            kind: DeviceKind::Parallel,
            threads: num_cpus::get(),
        },
    ]
}

/// 全局设备注册表
static DEVICE_REGISTRY: OnceLock<Mutex<HashMap<String, ComputeDevice>>> = OnceLock::new();

/// 按别名获取设备（缓存）
pub fn get_device(alias: &str) -> HardwareResult<ComputeDevice> {
    let threads = parse_alias(alias)?;

    let registry = DEVICE_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut devices = registry.lock().context("锁定设备注册表")?;

    if let Some(device) = devices.get(alias) {
        return Ok(device.clone());
    }

    let device = match threads {
        None => ComputeDevice::cpu(),
        Some(n) => ComputeDevice::parallel(alias, n)?,
    };
    tracing::debug!(
        target: "device",
        "Registered device {} ({:?}, {} threads)",
        device.alias(),
        device.kind(),
        device.threads()
    );
    devices.insert(alias.to_string(), device.clone());
    Ok(device)
}

/// 解析设备别名，返回并行线程数（`None` 表示顺序设备）
fn parse_alias(alias: &str) -> HardwareResult<Option<usize>> {
    let not_found = || HardwareError::DeviceNotFound {
        alias: alias.to_string(),
        available: detect_devices().into_iter().map(|d| d.alias).collect(),
    };

    match alias {
        CPU_DEVICE => Ok(None),
        PARALLEL_DEVICE => Ok(Some(num_cpus::get())),
        _ => {
            let count = alias
                .strip_prefix("parallel:")
                .ok_or_else(not_found)?
                .parse::<usize>()
                .map_err(|_| not_found())?;
            if count == 0 {
                return Err(not_found());
            }
            Ok(Some(count))
        }
    }
}

/// 打印设备信息
pub fn print_device_info() {
    for info in detect_devices() {
        tracing::info!(
            target: "device",
            "设备 {}: {:?}, {} 线程",
            info.alias,
            info.kind,
            info.threads
        );
    }
}
