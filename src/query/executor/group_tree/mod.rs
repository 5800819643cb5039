//! 分组树
//!
//! 扫描阶段构建以 `EncodedKey` 为键的 `RawNode` 树，物化阶段解析为 `Group` 树，
//! 分片间与线程间的结果通过 `merge` 归并

pub mod group;
pub mod group_key;
pub mod materializer;
pub mod raw_tree;
pub mod tokenizer;

pub use group::{merge, merge_into, sort_and_dedup, Group};
pub use group_key::{CanonicalKey, GroupKey};
pub use materializer::{GroupTreeMaterializer, LevelTransform};
pub use raw_tree::{RawKey, RawNode, RawTreeBuilder};
pub use tokenizer::Tokenizer;
