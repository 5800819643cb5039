//! 存储层错误类型
//!
//! 涵盖分片搜索器在读取列数据、求值过滤条件时产生的错误

use thiserror::Error;

use crate::core::schema::ShardId;

/// 存储层结果类型
pub type StorageResult<T> = Result<T, StorageError>;

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 后台合并替换了分片段，当前搜索器句柄已失效
    #[error("分片 {shard} 的段已被并发替换")]
    SegmentReplaced { shard: ShardId },
    #[error("分片未找到: {0}")]
    ShardNotFound(ShardId),
    #[error("字段未找到: {0}")]
    UnknownField(String),
    #[error("存储后端错误: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::SegmentReplaced { .. })
    }
}

impl From<String> for StorageError {
    fn from(s: String) -> Self {
        StorageError::Backend(s)
    }
}

impl From<&str> for StorageError {
    fn from(s: &str) -> Self {
        StorageError::Backend(s.to_string())
    }
}
