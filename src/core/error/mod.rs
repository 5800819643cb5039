//! 统一错误处理系统 for PivotDB
//!
//! ## 设计理念
//!
//! 1. **分层转换**：存储层错误通过 `#[from]` 自动转换为 `DBError`
//! 2. **请求级失败**：配置错误在扫描任何文档前即返回 `InvalidRequest`
//! 3. **统一接口**：`DBResult<T>` 提供统一的返回类型，简化错误传播

use thiserror::Error;

pub mod storage;

pub use storage::{StorageError, StorageResult};

/// 统一的聚合引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum DBError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    #[error("任务执行失败: {0}")]
    Task(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type DBResult<T> = Result<T, DBError>;

impl DBError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        DBError::InvalidRequest(msg.into())
    }

    /// 是否可以通过重新获取分片句柄来重试
    pub fn is_retryable(&self) -> bool {
        match self {
            DBError::Storage(se) => se.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for DBError {
    fn from(err: serde_json::Error) -> Self {
        DBError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dberror_from_storage() {
        let storage_err = StorageError::SegmentReplaced { shard: 3 };
        let db_err: DBError = storage_err.into();
        assert!(matches!(db_err, DBError::Storage(_)));
        assert!(db_err.is_retryable());
    }

    #[test]
    fn test_invalid_request_not_retryable() {
        let err = DBError::invalid_request("unknown field");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("unknown field"));
    }
}
