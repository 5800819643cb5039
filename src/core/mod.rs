pub mod error;
pub mod schema;

// 错误和结果类型
pub use error::{DBError, DBResult, StorageError, StorageResult};

// 核心数据类型
pub use schema::{DocId, FieldInfo, FieldType, ShardId};
