use super::encoding::EncodedKey;
use super::{CollectContext, KeyCollector, KeySet};
use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::{DocSet, ShardSearcher};

/// 谓词分桶收集器
///
/// 每个命名子查询预先求值为 `DocSet`，键为文档满足的所有子查询下标，
/// 分组按声明顺序排列
#[derive(Debug)]
pub struct PredicateBucketCollector {
    aliases: Vec<String>,
    members: Vec<DocSet>,
}

impl PredicateBucketCollector {
    pub fn new(aliases: Vec<String>, members: Vec<DocSet>) -> DBResult<Self> {
        if aliases.len() != members.len() {
            return Err(DBError::invalid_request(format!(
                "分桶别名数 {} 与子查询数 {} 不一致",
                aliases.len(),
                members.len()
            )));
        }
        Ok(Self { aliases, members })
    }
}

impl KeyCollector for PredicateBucketCollector {
    fn collect(&self, _ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        for (index, members) in self.members.iter().enumerate() {
            if members.contains(doc) {
                out.insert(index as EncodedKey);
            }
        }
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let alias = usize::try_from(key)
            .ok()
            .and_then(|i| self.aliases.get(i))
            .ok_or_else(|| DBError::Internal(format!("无效的分桶键: {}", key)))?;
        Ok(GroupKey::numeric(alias.as_str(), key))
    }

    fn collect_empty_groups(&self, out: &mut KeySet) {
        for index in 0..self.aliases.len() {
            out.insert(index as EncodedKey);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryShard;

    #[test]
    fn test_document_in_multiple_buckets() {
        let shard = MemoryShard::new(0);
        let collector = PredicateBucketCollector::new(
            vec!["cheap".into(), "popular".into(), "new".into()],
            vec![
                [0u32, 1].into_iter().collect(),
                [1u32].into_iter().collect(),
                DocSet::new(),
            ],
        )
        .expect("collector");

        let mut ctx = CollectContext::new(&shard);
        let mut out = KeySet::new();
        collector.collect(&mut ctx, 1, &mut out).expect("collect");
        assert_eq!(out.as_slice(), &[0, 1]);
        assert_eq!(collector.resolve(&shard, 1).expect("resolve").display(), "popular");

        let mut empty = KeySet::new();
        collector.collect_empty_groups(&mut empty);
        assert_eq!(empty.len(), 3);
    }

    #[test]
    fn test_alias_count_mismatch_is_invalid_request() {
        let result = PredicateBucketCollector::new(vec!["cheap".into(), "new".into()], vec![DocSet::new()]);
        assert!(matches!(result, Err(DBError::InvalidRequest(_))));
    }
}
