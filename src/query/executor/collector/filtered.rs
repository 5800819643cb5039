use super::encoding::EncodedKey;
use super::{CollectContext, FieldCollector, KeyCollector, KeySet};
use crate::core::error::DBResult;
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::{DocSet, ShardSearcher};

/// 只有属于过滤集合的文档才交给内层收集器
#[derive(Debug)]
pub struct FilteredCollector {
    filter: DocSet,
    inner: Box<FieldCollector>,
}

impl FilteredCollector {
    pub fn new(filter: DocSet, inner: FieldCollector) -> Self {
        Self {
            filter,
            inner: Box::new(inner),
        }
    }
}

impl KeyCollector for FilteredCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        if self.filter.contains(doc) {
            self.inner.collect(ctx, doc, out)?;
        }
        Ok(())
    }

    fn resolve(&self, searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        self.inner.resolve(searcher, key)
    }

    fn collect_empty_groups(&self, out: &mut KeySet) {
        self.inner.collect_empty_groups(out)
    }

    fn requires_ordering(&self) -> bool {
        self.inner.requires_ordering()
    }
}
