//! 变更检测
//!
//! 比较节点输入与上次成功生成时的快照，决定是否重新生成网格。

use super::GridParameters;

/// 判断缓存的几何是否需要重新生成
///
/// 缓存无效、或路径、`size`、`dims` 任一分量与快照不同时返回 `true`。
/// 浮点数按 `==` 精确比较，不使用容差；NaN 与任何值都不相等，因此总会触发重算。
pub fn needs_recompute(new: &GridParameters, snapshot: Option<&GridParameters>, valid: bool) -> bool {
    let Some(old) = snapshot else {
        return true;
    };
    !valid
        || new.transform_path != old.transform_path
        || new.size.iter().zip(&old.size).any(|(a, b)| a != b)
        || new.dims != old.dims
}
