use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// 分组的规范比较键
///
/// 变体顺序即比较顺序：空组小于一切
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalKey {
    Null,
    Int(i64),
    Text(String),
}

/// 已解析的分组标识：展示名 + 规范比较键
///
/// 相等与排序只看规范键，与产生它的收集器无关
#[derive(Debug, Clone)]
pub struct GroupKey {
    display: String,
    canonical: CanonicalKey,
}

impl GroupKey {
    /// 保留的空组
    pub fn null(label: impl Into<String>) -> Self {
        Self {
            display: label.into(),
            canonical: CanonicalKey::Null,
        }
    }

    /// 数值、日期等按原始可比较形式排序的键
    pub fn numeric(display: impl Into<String>, key: i64) -> Self {
        Self {
            display: display.into(),
            canonical: CanonicalKey::Int(key),
        }
    }

    /// 文本键，比较时忽略大小写
    pub fn text(display: impl Into<String>) -> Self {
        let display = display.into();
        let canonical = CanonicalKey::Text(display.to_lowercase());
        Self { display, canonical }
    }

    /// 区分大小写的文本键，用于对象标识
    pub fn exact(display: impl Into<String>) -> Self {
        let display = display.into();
        let canonical = CanonicalKey::Text(display.clone());
        Self { display, canonical }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn canonical(&self) -> &CanonicalKey {
        &self.canonical
    }

    pub fn is_null(&self) -> bool {
        self.canonical == CanonicalKey::Null
    }

    /// 展示名统一为小写
    pub fn folded(self) -> Self {
        match self.canonical {
            CanonicalKey::Text(text) => {
                let lower = text.to_lowercase();
                Self {
                    display: lower.clone(),
                    canonical: CanonicalKey::Text(lower),
                }
            }
            canonical => Self {
                display: self.display.to_lowercase(),
                canonical,
            },
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}
