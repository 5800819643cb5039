use std::collections::HashSet;

use super::encoding::EncodedKey;
use crate::utils::Recycle;

/// 超过该长度后改用哈希索引去重
const LINEAR_SCAN_LIMIT: usize = 16;

/// 单个文档在单个层级上的候选键集合
///
/// 保持插入顺序并去重；逐文档清空复用，不释放容量。
/// 空组不占用键值域，由 `missing` 单独标记
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<EncodedKey>,
    index: HashSet<EncodedKey>,
    missing: bool,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入键，已存在时返回 false
    pub fn insert(&mut self, key: EncodedKey) -> bool {
        if self.keys.len() < LINEAR_SCAN_LIMIT {
            if self.keys.contains(&key) {
                return false;
            }
            self.keys.push(key);
            if self.keys.len() == LINEAR_SCAN_LIMIT {
                self.index.extend(self.keys.iter().copied());
            }
            return true;
        }
        if !self.index.insert(key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: EncodedKey) -> bool {
        if self.keys.len() < LINEAR_SCAN_LIMIT {
            self.keys.contains(&key)
        } else {
            self.index.contains(&key)
        }
    }

    /// 标记该集合包含保留空组
    pub fn mark_missing(&mut self) {
        self.missing = true;
    }

    pub fn is_missing(&self) -> bool {
        self.missing
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.index.clear();
        self.missing = false;
    }

    /// 键的数量，空组计为一个
    pub fn len(&self) -> usize {
        self.keys.len() + usize::from(self.missing)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && !self.missing
    }

    /// 只含真实键，不含空组
    pub fn iter(&self) -> impl Iterator<Item = EncodedKey> + '_ {
        self.keys.iter().copied()
    }

    /// 建树用的键：空组为 `None`，排在最前
    pub fn raw_keys(&self) -> impl Iterator<Item = Option<EncodedKey>> + '_ {
        self.missing
            .then_some(None)
            .into_iter()
            .chain(self.keys.iter().copied().map(Some))
    }

    pub fn as_slice(&self) -> &[EncodedKey] {
        &self.keys
    }
}

impl Recycle for KeySet {
    fn recycle(&mut self) {
        self.clear();
    }
}

impl FromIterator<EncodedKey> for KeySet {
    fn from_iter<T: IntoIterator<Item = EncodedKey>>(iter: T) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}
