use chrono::DateTime;

use super::encoding::{raw_to_f64, EncodedKey};
use super::{CollectContext, KeyCollector, KeySet};
use crate::core::error::{DBError, DBResult};
use crate::core::{DocId, FieldType};
use crate::query::executor::group_tree::GroupKey;
use crate::storage::ShardSearcher;

/// 数值/日期分段收集器
///
/// N 个升序边界划分出 N+1 个区间，键为区间下标。值等于边界时归入上一个区间
#[derive(Debug)]
pub struct BatchCollector {
    field: String,
    field_type: FieldType,
    boundaries: Vec<f64>,
    multi_valued: bool,
}

impl BatchCollector {
    pub fn new(
        field: impl Into<String>,
        field_type: FieldType,
        boundaries: Vec<f64>,
        multi_valued: bool,
    ) -> DBResult<Self> {
        let field = field.into();
        if !(field_type.is_numeric() || field_type == FieldType::Date) {
            return Err(DBError::invalid_request(format!(
                "分段字段 {} 必须是数值或日期类型: {:?}",
                field, field_type
            )));
        }
        if boundaries.is_empty() {
            return Err(DBError::invalid_request(format!("分段字段 {} 缺少边界", field)));
        }
        Ok(Self {
            field,
            field_type,
            boundaries,
            multi_valued,
        })
    }

    /// 值所属区间下标
    pub fn bucket_of(&self, value: f64) -> usize {
        self.boundaries.partition_point(|b| *b <= value)
    }

    fn format_boundary(&self, boundary: f64) -> String {
        if self.field_type == FieldType::Date {
            if let Some(dt) = DateTime::from_timestamp_millis(boundary as i64) {
                return dt.format("%Y-%m-%d").to_string();
            }
        }
        boundary.to_string()
    }
}

impl KeyCollector for BatchCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let values = ctx.read_values(&self.field, doc)?;
        let take = if self.multi_valued { values.len() } else { 1 };
        for &raw in values.iter().take(take) {
            match raw_to_f64(self.field_type, raw) {
                Some(value) if !value.is_nan() => {
                    out.insert(self.bucket_of(value) as EncodedKey);
                }
                _ => {}
            }
        }
        ctx.release_values(values);
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let index = usize::try_from(key)
            .ok()
            .filter(|i| *i <= self.boundaries.len())
            .ok_or_else(|| DBError::Internal(format!("无效的分段键: {}", key)))?;
        let last = self.boundaries.len();
        let display = if index == 0 {
            format!("< {}", self.format_boundary(self.boundaries[0]))
        } else if index == last {
            format!(">= {}", self.format_boundary(self.boundaries[last - 1]))
        } else {
            format!(
                "{} - {}",
                self.format_boundary(self.boundaries[index - 1]),
                self.format_boundary(self.boundaries[index])
            )
        };
        Ok(GroupKey::numeric(display, key))
    }

    fn collect_empty_groups(&self, out: &mut KeySet) {
        for index in 0..=self.boundaries.len() {
            out.insert(index as EncodedKey);
        }
    }
}
