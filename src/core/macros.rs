//! 核心宏定义
//!
//! 提供统一的宏来减少代码重复

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// struct SolverSettings {
///     steps: usize,
///     dt: f32,
/// }
///
/// geom_engine::impl_default!(SolverSettings {
///     steps: 1000,
///     dt: 1.0 / 60.0,
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct StepSettings {
        steps: usize,
        label: String,
    }

    impl_default!(StepSettings {
        steps: 1000,
        label: "simulate".to_string(),
    });

    #[test]
    fn test_impl_default() {
        let s = StepSettings::default();

        assert_eq!(s.steps, 1000);
        assert_eq!(s.label, "simulate");
    }
}
