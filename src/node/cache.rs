//! 节点缓存
//!
//! 每个节点实例的上次参数快照和有效标志，按稳定的节点实例键存放。

use super::GridParameters;
use std::collections::HashMap;
use std::fmt;

/// 节点实例键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 缓存条目
///
/// 快照是参数的深拷贝，不与调用方的数据共享。失败后条目被标记为无效但保留。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    snapshot: Option<GridParameters>,
    valid: bool,
}

impl CacheEntry {
    /// 成功计算后的有效条目
    pub fn new(snapshot: GridParameters) -> Self {
        Self {
            snapshot: Some(snapshot),
            valid: true,
        }
    }

    pub fn snapshot(&self) -> Option<&GridParameters> {
        self.snapshot.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// 节点缓存存储
#[derive(Debug, Default)]
pub struct NodeCache {
    entries: HashMap<NodeKey, CacheEntry>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NodeKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: NodeKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// 清除有效标志，保留快照
    ///
    /// 从未成功生成过的键没有条目，这里不会创建。
    pub fn invalidate(&mut self, key: &NodeKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.valid = false;
        }
    }

    pub fn remove(&mut self, key: &NodeKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_invalidate() {
        let mut cache = NodeCache::new();
        let key = NodeKey::from("grid_0");
        assert!(cache.get(&key).is_none());

        let params = GridParameters::new("", [1.0, 1.0], [2, 2]);
        cache.put(key.clone(), CacheEntry::new(params.clone()));
        assert!(cache.get(&key).unwrap().is_valid());

        cache.invalidate(&key);
        let entry = cache.get(&key).unwrap();
        assert!(!entry.is_valid());
        assert_eq!(entry.snapshot(), Some(&params));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_unknown_key() {
        let mut cache = NodeCache::new();
        let key = NodeKey::new("never_computed");
        cache.invalidate(&key);
        // 条目只在第一次成功生成时创建
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let mut cache = NodeCache::new();
        let a = NodeKey::from("a");
        let b = NodeKey::from("b");
        cache.put(a.clone(), CacheEntry::new(GridParameters::new("", [1.0, 1.0], [1, 1])));
        cache.put(b.clone(), CacheEntry::new(GridParameters::new("", [2.0, 2.0], [1, 1])));
        cache.invalidate(&a);
        assert!(!cache.get(&a).unwrap().is_valid());
        assert!(cache.get(&b).unwrap().is_valid());

        assert!(cache.remove(&a).is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(b.to_string(), "b");
    }
}
