use serde::{Deserialize, Serialize};

/// 分片内文档序号
pub type DocId = u32;

/// 分片标识
pub type ShardId = u32;

/// 列字段的存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    /// epoch 毫秒 (UTC)
    Date,
    /// 字典序号，通过 `dictionary_term` 解析
    Text,
    /// 指向同一分片内其他文档的序号
    Link,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Long | FieldType::Float | FieldType::Double
        )
    }
}

/// Schema information for a single column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub field_type: FieldType,
    pub multi_valued: bool,
}

impl FieldInfo {
    pub fn single(field_type: FieldType) -> Self {
        Self {
            field_type,
            multi_valued: false,
        }
    }

    pub fn multi(field_type: FieldType) -> Self {
        Self {
            field_type,
            multi_valued: true,
        }
    }
}
