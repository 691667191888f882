//! 计算设备模块
//!
//! 提供计算设备选择、作用域执行上下文和数据并行内核启动。

pub mod array;
pub mod context;
pub mod device;
pub mod error;
pub mod launch;

// Re-export public API
pub use array::DeviceArrayMut;
pub use context::{current_device, ExecutionContext, ScopedDevice};
pub use device::{
    detect_devices, get_device, print_device_info, ComputeDevice, DeviceInfo, DeviceKind,
    CPU_DEVICE, PARALLEL_DEVICE,
};
pub use error::{ErrorContext, HardwareError, HardwareResult};
pub use launch::{launch, launch_2d, LaunchStats};
