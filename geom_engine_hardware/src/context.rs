//! 执行上下文
//!
//! `ExecutionContext` 是显式传入每次内核启动的值，绑定一个计算设备和一条
//! 启动流。`ExecutionContext::scoped` 返回 RAII 守卫，在守卫存活期间把设备
//! 压入线程局部的设备栈；守卫析构（包括 panic 展开）时恢复之前的设备。
//! 作用域可以嵌套。作用域存活期间，`launch` 拒绝以其他设备为目标的启动。
//!
//! 上下文的克隆共享同一条启动流，`synchronize` 阻塞到流上的全部启动退出。

use crate::device::{get_device, ComputeDevice};
use crate::error::HardwareResult;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

thread_local! {
    static DEVICE_STACK: RefCell<Vec<ComputeDevice>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Default, Clone, Copy)]
struct StreamCounts {
    issued: u64,
    retired: u64,
}

/// 启动流
///
/// 每次启动先 `issue`，退出时 `retire`；`retire` 唤醒所有等待排空的线程。
#[derive(Debug, Default)]
pub(crate) struct LaunchStream {
    counts: Mutex<StreamCounts>,
    drained: Condvar,
}

impl LaunchStream {
    // 计数只在持锁时整体更新，锁中毒后数据仍然一致
    fn lock(&self) -> MutexGuard<'_, StreamCounts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn issue(&self) {
        self.lock().issued += 1;
    }

    pub(crate) fn retire(&self) {
        self.lock().retired += 1;
        self.drained.notify_all();
    }

    fn issued(&self) -> u64 {
        self.lock().issued
    }

    /// 阻塞到 `retired == issued`，返回已退出的启动数
    fn wait_drained(&self) -> u64 {
        let counts = self
            .drained
            .wait_while(self.lock(), |c| c.retired < c.issued)
            .unwrap_or_else(PoisonError::into_inner);
        counts.retired
    }
}

/// 执行上下文
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    device: ComputeDevice,
    stream: Arc<LaunchStream>,
}

impl ExecutionContext {
    /// 为指定设备创建上下文
    pub fn new(device: ComputeDevice) -> Self {
        Self {
            device,
            stream: Arc::new(LaunchStream::default()),
        }
    }

    /// 按设备别名创建上下文
    pub fn for_alias(alias: &str) -> HardwareResult<Self> {
        Ok(Self::new(get_device(alias)?))
    }

    /// 绑定的设备
    pub fn device(&self) -> &ComputeDevice {
        &self.device
    }

    /// 进入设备作用域
    pub fn scoped(&self) -> ScopedDevice {
        ScopedDevice::enter(self.device.clone())
    }

    /// 已发出的启动数
    pub fn launches_issued(&self) -> u64 {
        self.stream.issued()
    }

    /// 等待该上下文（及其克隆）上发出的全部启动完成
    ///
    /// 其他线程正在进行的启动也会被等待。
    pub fn synchronize(&self) -> HardwareResult<()> {
        let retired = self.stream.wait_drained();
        tracing::trace!(target: "device", "synchronize {}: {} launches retired", self.device.alias(), retired);
        Ok(())
    }

    pub(crate) fn stream(&self) -> &LaunchStream {
        &self.stream
    }
}

/// 设备作用域守卫
///
/// 不可跨线程移动，必须在进入作用域的线程上析构。
#[must_use = "the device scope ends when the guard is dropped"]
pub struct ScopedDevice {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl ScopedDevice {
    fn enter(device: ComputeDevice) -> Self {
        let depth = DEVICE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(device);
            stack.len()
        });
        Self {
            depth,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopedDevice {
    fn drop(&mut self) {
        DEVICE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            // 守卫按 LIFO 析构，栈深度必然等于进入时的深度
            debug_assert_eq!(stack.len(), self.depth);
            stack.truncate(self.depth - 1);
        });
    }
}

/// 当前线程作用域内的设备
pub fn current_device() -> Option<ComputeDevice> {
    DEVICE_STACK.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_scoped_device_restores_previous() {
        let outer = ExecutionContext::for_alias("cpu").unwrap();
        let inner = ExecutionContext::for_alias("parallel:2").unwrap();

        assert!(current_device().is_none());
        {
            let _outer = outer.scoped();
            assert_eq!(current_device().unwrap().alias(), "cpu");
            {
                let _inner = inner.scoped();
                assert_eq!(current_device().unwrap().alias(), "parallel:2");
            }
            assert_eq!(current_device().unwrap().alias(), "cpu");
        }
        assert!(current_device().is_none());
    }

    #[test]
    fn test_scoped_device_restores_after_panic() {
        let outer = ExecutionContext::for_alias("cpu").unwrap();
        let inner = ExecutionContext::for_alias("parallel:2").unwrap();

        let _outer = outer.scoped();
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _inner = inner.scoped();
            panic!("kernel exploded");
        }));

        assert!(result.is_err());
        assert_eq!(current_device().unwrap().alias(), "cpu");
    }

    #[test]
    fn test_synchronize_waits_for_launch_on_other_thread() {
        use crate::launch::launch;
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
        use std::thread;
        use std::time::{Duration, Instant};

        let ctx = ExecutionContext::for_alias("parallel:2").unwrap();
        let worker_ctx = ctx.clone();
        let started = AtomicBool::new(false);
        let finished = AtomicUsize::new(0);

        thread::scope(|s| {
            s.spawn(|| {
                launch(&worker_ctx, "slow", 2, |_| {
                    started.store(true, Ordering::Release);
                    thread::sleep(Duration::from_millis(300));
                    finished.fetch_add(1, Ordering::AcqRel);
                })
                .unwrap();
            });

            while !started.load(Ordering::Acquire) {
                thread::yield_now();
            }
            let start = Instant::now();
            ctx.synchronize().unwrap();

            assert_eq!(finished.load(Ordering::Acquire), 2);
            assert!(start.elapsed() >= Duration::from_millis(100));
            assert_eq!(ctx.launches_issued(), 1);
        });
    }

    #[test]
    fn test_synchronize_idle_context() {
        let ctx = ExecutionContext::for_alias("cpu").unwrap();
        assert_eq!(ctx.launches_issued(), 0);
        assert!(ctx.synchronize().is_ok());
    }
}
