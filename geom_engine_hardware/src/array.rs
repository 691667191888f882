//! 内核输出数组
//!
//! 数据并行内核中每个调用写入互不重叠的槽位。`DeviceArrayMut` 把独占借用的
//! 切片共享给同一次启动中的所有调用，槽位归属由调用方保证。

use std::marker::PhantomData;

/// 内核可写数组视图
pub struct DeviceArrayMut<'a, T: Copy> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// 独占借用在启动期间被拆分成互不重叠的槽位写入
unsafe impl<T: Copy + Send> Send for DeviceArrayMut<'_, T> {}
unsafe impl<T: Copy + Send> Sync for DeviceArrayMut<'_, T> {}

impl<'a, T: Copy> DeviceArrayMut<'a, T> {
    /// 从独占切片创建视图
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// 读取槽位
    ///
    /// # Safety
    ///
    /// 同一次启动中不得有其他调用同时写入 `index`。
    #[inline]
    pub unsafe fn load(&self, index: usize) -> T {
        assert!(index < self.len, "load out of bounds: {} >= {}", index, self.len);
        self.ptr.add(index).read()
    }

    /// 写入槽位
    ///
    /// # Safety
    ///
    /// 同一次启动中 `index` 只能被一个调用访问。
    #[inline]
    pub unsafe fn store(&self, index: usize, value: T) {
        assert!(index < self.len, "store out of bounds: {} >= {}", index, self.len);
        self.ptr.add(index).write(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_store() {
        let mut data = vec![0u32; 4];
        {
            let array = DeviceArrayMut::new(&mut data);
            for i in 0..4 {
                // SAFETY: single-threaded, one access at a time
                unsafe {
                    array.store(i, i as u32 * 10);
                    assert_eq!(array.load(i), i as u32 * 10);
                }
            }
        }
        assert_eq!(data, vec![0, 10, 20, 30]);
    }

    #[test]
    #[should_panic(expected = "store out of bounds")]
    fn test_store_out_of_bounds() {
        let mut data = vec![0u32; 2];
        let array = DeviceArrayMut::new(&mut data);
        // SAFETY: bounds check panics before any write
        unsafe { array.store(2, 1) };
    }
}
