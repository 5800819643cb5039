//! 公共路径优化
//!
//! 多个 Part 的第一层共享相同的关系路径前缀时，前缀对每个文档只求值一次，
//! 各 Part 再从到达的对象继续收集自己的剩余路径

use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::executor::collector::{
    CollectContext, CollectorFactory, FieldCollector, KeyCollector, KeySet, LevelCollector,
};
use crate::query::request::{AggregationRequest, PathStep};

/// 检测第一层的公共路径前缀
///
/// 仅在至少两个 Part、均无 Part 过滤且前缀非空时生效。比较包含每跳的子过滤
pub fn detect(request: &AggregationRequest) -> Option<Vec<PathStep>> {
    if request.parts.len() < 2 || request.parts.iter().any(|p| p.filter.is_some()) {
        return None;
    }
    let mut paths = Vec::with_capacity(request.parts.len());
    for part in &request.parts {
        paths.push(part.levels.first()?.path.as_slice());
    }
    let (first, rest) = paths.split_first()?;
    let shared = first
        .iter()
        .enumerate()
        .take_while(|(i, step)| rest.iter().all(|p| p.get(*i) == Some(*step)))
        .count();
    if shared == 0 {
        return None;
    }
    Some(first[..shared].to_vec())
}

/// 已编译的公共前缀
#[derive(Debug)]
pub struct CommonPathPlan {
    prefix: FieldCollector,
    len: usize,
}

impl CommonPathPlan {
    pub fn compile(factory: &CollectorFactory<'_>, steps: &[PathStep]) -> DBResult<Self> {
        Ok(Self {
            prefix: factory.compile_prefix(steps)?,
            len: steps.len(),
        })
    }

    /// 前缀跳数，各 Part 第一层编译时跳过
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 写出文档经前缀到达的对象序号
    pub fn reach(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        self.prefix.collect(ctx, doc, out)
    }

    /// 在每个到达对象上运行某个 Part 的剩余路径收集器
    pub fn collect_suffix(
        level: &LevelCollector,
        ctx: &mut CollectContext<'_>,
        reached: &KeySet,
        out: &mut KeySet,
    ) -> DBResult<()> {
        // 前缀以 Id 收尾，到达的键都是本分片的文档序号
        for ordinal in reached.iter() {
            let target = DocId::try_from(ordinal)
                .map_err(|_| DBError::Internal(format!("公共路径产生了无效的对象序号: {}", ordinal)))?;
            level.collect(ctx, target, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::metric::MetricSpec;
    use crate::query::request::{AggregationPart, GroupingLevelSpec};
    use crate::query::executor::collector::NullCollector;
    use crate::storage::{MemoryShard, Query};

    fn part(level: GroupingLevelSpec) -> AggregationPart {
        AggregationPart::new(vec![level], vec![MetricSpec::Count])
    }

    #[test]
    fn test_detects_shared_prefix() {
        let request = AggregationRequest::paired(
            vec![
                part(
                    GroupingLevelSpec::field("name")
                        .via(PathStep::link("author"))
                        .via(PathStep::link("employer")),
                ),
                part(
                    GroupingLevelSpec::field("city")
                        .via(PathStep::link("author"))
                        .via(PathStep::link("home")),
                ),
            ],
            vec![0],
        );
        let prefix = detect(&request).expect("prefix");
        assert_eq!(prefix, vec![PathStep::link("author")]);
    }

    #[test]
    fn test_no_prefix_for_single_part_or_filters() {
        let level = || GroupingLevelSpec::field("name").via(PathStep::link("author"));
        let single = AggregationRequest::new(part(level()), vec![0]);
        assert!(detect(&single).is_none());

        let filtered = AggregationRequest::paired(
            vec![part(level()).with_filter(Query::new("q")), part(level())],
            vec![0],
        );
        assert!(detect(&filtered).is_none());
    }

    #[test]
    fn test_step_filters_must_match() {
        let request = AggregationRequest::paired(
            vec![
                part(GroupingLevelSpec::field("name").via(PathStep::link("author"))),
                part(
                    GroupingLevelSpec::field("name")
                        .via(PathStep::link("author").with_filter(Query::new("q"))),
                ),
            ],
            vec![0],
        );
        assert!(detect(&request).is_none());
    }

    #[test]
    fn test_suffix_rejects_invalid_ordinal() {
        let shard = MemoryShard::new(0);
        let mut ctx = CollectContext::new(&shard);
        let level = LevelCollector::new(FieldCollector::Null(NullCollector::new("*")), false, "");
        let reached: KeySet = [-1].into_iter().collect();
        let mut out = KeySet::new();
        let result = CommonPathPlan::collect_suffix(&level, &mut ctx, &reached, &mut out);
        assert!(matches!(result, Err(DBError::Internal(_))));
    }
}
