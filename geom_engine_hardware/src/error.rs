/// 计算设备错误处理
///
/// 设备查找、线程池创建和内核启动失败都归入 `HardwareError`

use thiserror::Error;

/// 计算设备错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    /// 设备别名无法识别
    #[error("设备未找到: {alias}。可用设备: {available:?}")]
    DeviceNotFound {
        alias: String,
        available: Vec<String>,
    },

    /// 线程池创建失败
    #[error("线程池创建失败 ({alias}): {reason}")]
    ThreadPoolCreation {
        alias: String,
        reason: String,
    },

    /// 内核启动失败
    #[error("内核启动失败 ({kernel}, dim={dim}): {reason}")]
    LaunchFailed {
        kernel: String,
        dim: usize,
        reason: String,
    },

    /// 启动目标与当前线程的设备作用域不一致
    #[error("设备作用域不匹配: 作用域为 {scoped}，启动目标为 {requested}")]
    ScopeMismatch {
        scoped: String,
        requested: String,
    },

    /// 其他错误
    #[error("计算设备错误: {0}")]
    Other(String),
}

/// 计算设备结果类型
pub type HardwareResult<T> = Result<T, HardwareError>;

/// 错误上下文扩展
pub trait ErrorContext<T> {
    /// 添加上下文信息
    fn context(self, context: &str) -> HardwareResult<T>;
}

impl<T, E: std::fmt::Display> ErrorContext<T> for Result<T, E> {
    fn context(self, context: &str) -> HardwareResult<T> {
        self.map_err(|e| HardwareError::Other(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HardwareError::DeviceNotFound {
            alias: "cuda:0".to_string(),
            available: vec!["cpu".to_string(), "parallel".to_string()],
        };

        assert!(error.to_string().contains("设备未找到"));
        assert!(error.to_string().contains("cuda:0"));
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "文件不存在",
        ));

        let hardware_result = result.context("读取设备配置");

        match hardware_result {
            Err(HardwareError::Other(msg)) => assert!(msg.contains("读取设备配置")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
