//! 数据并行内核启动
//!
//! 一次启动对索引区间 `[0, dim)` 中的每个索引调用一次内核。启动在所有调用
//! 完成后才返回；内核中的 panic 被捕获并转换为 `HardwareError::LaunchFailed`。
//! 调用线程处于设备作用域内时，启动目标必须是作用域的设备。

use crate::context::{current_device, ExecutionContext};
use crate::device::DeviceKind;
use crate::error::{HardwareError, HardwareResult};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// 启动统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchStats {
    /// 调用次数
    pub invocations: usize,
    /// 启动耗时
    pub elapsed: Duration,
}

/// 一维启动
pub fn launch<F>(ctx: &ExecutionContext, kernel: &str, dim: usize, f: F) -> HardwareResult<LaunchStats>
where
    F: Fn(usize) + Sync + Send,
{
    let device = ctx.device();
    if let Some(scoped) = current_device() {
        if scoped != *device {
            return Err(HardwareError::ScopeMismatch {
                scoped: scoped.alias().to_string(),
                requested: device.alias().to_string(),
            });
        }
    }

    let stream = ctx.stream();
    stream.issue();
    let start = Instant::now();

    let result = panic::catch_unwind(AssertUnwindSafe(|| match (device.kind(), device.pool()) {
        (DeviceKind::Parallel, Some(pool)) => {
            pool.install(|| (0..dim).into_par_iter().for_each(|tid| f(tid)))
        }
        _ => (0..dim).for_each(|tid| f(tid)),
    }));

    // 无论成功与否，返回时启动都已退出
    stream.retire();

    match result {
        Ok(()) => {
            let stats = LaunchStats {
                invocations: dim,
                elapsed: start.elapsed(),
            };
            tracing::trace!(
                target: "device",
                "launch {} on {}: {} invocations in {:?}",
                kernel,
                device.alias(),
                dim,
                stats.elapsed
            );
            Ok(stats)
        }
        Err(payload) => Err(HardwareError::LaunchFailed {
            kernel: kernel.to_string(),
            dim,
            reason: panic_message(payload.as_ref()),
        }),
    }
}

/// 二维启动，调用 `f(i, j)`，`i` 变化最快
pub fn launch_2d<F>(
    ctx: &ExecutionContext,
    kernel: &str,
    dim: (usize, usize),
    f: F,
) -> HardwareResult<LaunchStats>
where
    F: Fn(usize, usize) + Sync + Send,
{
    let (nx, ny) = dim;
    launch(ctx, kernel, nx * ny, |tid| f(tid % nx, tid / nx))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "kernel panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DeviceArrayMut;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn contexts() -> Vec<ExecutionContext> {
        vec![
            ExecutionContext::for_alias("cpu").unwrap(),
            ExecutionContext::for_alias("parallel:4").unwrap(),
        ]
    }

    #[test]
    fn test_launch_visits_every_index_once() {
        for ctx in contexts() {
            let mut out = vec![0usize; 1000];
            let array = DeviceArrayMut::new(&mut out);
            let stats = launch(&ctx, "iota", 1000, |tid| {
                // SAFETY: each invocation writes only its own slot
                unsafe { array.store(tid, tid + 1) };
            })
            .unwrap();

            assert_eq!(stats.invocations, 1000);
            assert!(out.iter().enumerate().all(|(i, &v)| v == i + 1));
            assert!(ctx.synchronize().is_ok());
        }
    }

    #[test]
    fn test_launch_2d_ordering() {
        let ctx = ExecutionContext::for_alias("parallel:2").unwrap();
        let mut out = vec![(0usize, 0usize); 12];
        let array = DeviceArrayMut::new(&mut out);
        launch_2d(&ctx, "coords", (4, 3), |i, j| {
            // SAFETY: cell j*4+i is owned by invocation (i, j)
            unsafe { array.store(j * 4 + i, (i, j)) };
        })
        .unwrap();

        assert_eq!(out[0], (0, 0));
        assert_eq!(out[5], (1, 1));
        assert_eq!(out[11], (3, 2));
    }

    #[test]
    fn test_zero_dim_launch() {
        let ctx = ExecutionContext::for_alias("parallel:2").unwrap();
        let calls = AtomicUsize::new(0);
        let stats = launch(&ctx, "noop", 0, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(stats.invocations, 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_panicking_kernel_reports_launch_failure() {
        for ctx in contexts() {
            let err = launch(&ctx, "boom", 16, |tid| {
                if tid == 7 {
                    panic!("bad index {}", tid);
                }
            })
            .unwrap_err();

            match err {
                HardwareError::LaunchFailed { kernel, dim, reason } => {
                    assert_eq!(kernel, "boom");
                    assert_eq!(dim, 16);
                    assert!(reason.contains("bad index 7"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
            // 失败的启动也已退出
            assert!(ctx.synchronize().is_ok());
        }
    }

    #[test]
    fn test_launch_respects_device_scope() {
        let cpu = ExecutionContext::for_alias("cpu").unwrap();
        let parallel = ExecutionContext::for_alias("parallel:2").unwrap();

        let _scope = cpu.scoped();
        assert!(launch(&cpu, "same_device", 4, |_| {}).is_ok());

        let err = launch(&parallel, "other_device", 4, |_| {}).unwrap_err();
        assert_eq!(
            err,
            HardwareError::ScopeMismatch {
                scoped: "cpu".to_string(),
                requested: "parallel:2".to_string(),
            }
        );
        // 被拒绝的启动不进入流
        assert_eq!(parallel.launches_issued(), 0);
    }
}
