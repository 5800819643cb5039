//! 关系跳转收集器
//!
//! 关系字段的原始值是同一分片内的目标文档序号，收集器沿关系到达目标对象后
//! 交给内层收集器产生键

use super::encoding::EncodedKey;
use super::{CollectContext, FieldCollector, KeyCollector, KeySet};
use crate::core::error::DBResult;
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::{DocSet, ShardSearcher};

fn target_of(raw: i64) -> Option<DocId> {
    DocId::try_from(raw).ok()
}

/// 单跳关系
#[derive(Debug)]
pub struct LinkCollector {
    field: String,
    filter: Option<DocSet>,
    inner: Box<FieldCollector>,
}

impl LinkCollector {
    pub fn new(field: impl Into<String>, filter: Option<DocSet>, inner: FieldCollector) -> Self {
        Self {
            field: field.into(),
            filter,
            inner: Box::new(inner),
        }
    }

    pub fn inner(&self) -> &FieldCollector {
        &self.inner
    }
}

impl KeyCollector for LinkCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let targets = ctx.read_values(&self.field, doc)?;
        let mut result = Ok(());
        for target in targets.iter().copied().filter_map(target_of) {
            if self.filter.as_ref().is_some_and(|f| !f.contains(target)) {
                continue;
            }
            result = self.inner.collect(ctx, target, out);
            if result.is_err() {
                break;
            }
        }
        ctx.release_values(targets);
        result
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

/// 传递关系：从种子文档出发按广度优先展开
///
/// 种子本身不计入；未通过子过滤的对象既不产生键也不继续展开
#[derive(Debug)]
pub struct TransitiveLinkCollector {
    field: String,
    max_depth: u32,
    filter: Option<DocSet>,
    inner: Box<FieldCollector>,
}

impl TransitiveLinkCollector {
    pub fn new(
        field: impl Into<String>,
        max_depth: u32,
        filter: Option<DocSet>,
        inner: FieldCollector,
    ) -> Self {
        Self {
            field: field.into(),
            max_depth,
            filter,
            inner: Box::new(inner),
        }
    }

    fn accepts(&self, doc: DocId) -> bool {
        self.filter.as_ref().map_or(true, |f| f.contains(doc))
    }

    /// 按访问顺序写出可达对象
    fn reachable(&self, ctx: &mut CollectContext<'_>, seed: DocId, reached: &mut KeySet) -> DBResult<()> {
        let mut visited = ctx.acquire_keys();
        let mut frontier = ctx.acquire_keys();
        let mut next = ctx.acquire_keys();
        visited.insert(i64::from(seed));
        frontier.insert(i64::from(seed));

        let mut result = Ok(());
        let mut depth = 0;
        while depth < self.max_depth && !frontier.is_empty() {
            for node in frontier.iter().filter_map(target_of) {
                let targets = match ctx.read_values(&self.field, node) {
                    Ok(targets) => targets,
                    Err(e) => {
                        result = Err(e);
                        break;
                    }
                };
                for target in targets.iter().copied().filter_map(target_of) {
                    if !visited.insert(i64::from(target)) || !self.accepts(target) {
                        continue;
                    }
                    reached.insert(i64::from(target));
                    next.insert(i64::from(target));
                }
                ctx.release_values(targets);
            }
            if result.is_err() {
                break;
            }
            std::mem::swap(&mut frontier, &mut next);
            next.clear();
            depth += 1;
        }

        ctx.release_keys(visited);
        ctx.release_keys(frontier);
        ctx.release_keys(next);
        result
    }
}

impl KeyCollector for TransitiveLinkCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let mut reached = ctx.acquire_keys();
        let mut result = self.reachable(ctx, doc, &mut reached);
        if result.is_ok() {
            for target in reached.iter().filter_map(target_of) {
                result = self.inner.collect(ctx, target, out);
                if result.is_err() {
                    break;
                }
            }
        }
        ctx.release_keys(reached);
        result
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
