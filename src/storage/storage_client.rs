//! 分片搜索器接口
//!
//! 列存储与段格式由外部实现，聚合引擎只通过这里的 trait 读取数据

use std::sync::Arc;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::core::{DocId, FieldInfo, ShardId, StorageResult};

/// 文档成员位图
pub type DocSet = RoaringBitmap;

/// 不透明的过滤条件句柄，由搜索器求值为 `DocSet`
///
/// 相等性按表达式文本判定
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    pub fn expression(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 单个分片的只读列索引句柄
///
/// 所有字段值以 `i64` 原始形式读出：布尔为 0/1，整数原样，
/// 单精度为 32 位 IEEE 位模式，双精度为 64 位位模式，日期为 epoch 毫秒，
/// 文本为字典序号，关系字段为同一分片内的目标文档序号
pub trait ShardSearcher: Send + Sync {
    fn shard_id(&self) -> ShardId;

    /// 当前段内未删除的文档
    fn live_docs(&self) -> StorageResult<DocSet>;

    fn field_info(&self, field: &str) -> Option<FieldInfo>;

    /// 将文档在某字段上的所有原始值追加到 `out`
    fn read_values(&self, field: &str, doc: DocId, out: &mut Vec<i64>) -> StorageResult<()>;

    fn dictionary_term(&self, field: &str, ordinal: i64) -> StorageResult<Option<String>>;

    /// 对象的展示标识
    fn object_label(&self, doc: DocId) -> StorageResult<String>;

    fn search(&self, query: &Query) -> StorageResult<DocSet>;
}

/// 列存储句柄，按分片提供搜索器
pub trait ColumnStore: Send + Sync {
    fn searcher(&self, shard: ShardId) -> StorageResult<Arc<dyn ShardSearcher>>;
}
