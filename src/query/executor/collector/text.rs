use super::encoding::EncodedKey;
use super::{CollectContext, KeyCollector, KeySet};
use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::ShardSearcher;

/// 文本字段收集器，键为字典序号
///
/// 字典序号只在分片内有意义，解析后需按文本重新排序
#[derive(Debug)]
pub struct TextCollector {
    field: String,
    multi_valued: bool,
}

impl TextCollector {
    pub fn new(field: impl Into<String>, multi_valued: bool) -> Self {
        Self {
            field: field.into(),
            multi_valued,
        }
    }
}

impl KeyCollector for TextCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let values = ctx.read_values(&self.field, doc)?;
        let take = if self.multi_valued { values.len() } else { 1 };
        for &ordinal in values.iter().take(take) {
            out.insert(ordinal);
        }
        ctx.release_values(values);
        Ok(())
    }

    fn resolve(&self, searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let term = searcher.dictionary_term(&self.field, key)?.ok_or_else(|| {
            DBError::Internal(format!("字段 {} 的字典中不存在序号 {}", self.field, key))
        })?;
        Ok(GroupKey::text(term))
    }

    fn requires_ordering(&self) -> bool {
        true
    }
}
