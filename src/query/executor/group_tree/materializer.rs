//! 分组树物化
//!
//! 逐层把 `RawNode` 的键解析为 `GroupKey`。解析结果按层缓存，
//! 同一分片内每个不同的键只解析一次

use std::collections::{BTreeMap, HashMap};

use super::{sort_and_dedup, Group, GroupKey, RawKey, RawNode, Tokenizer};
use crate::core::error::DBResult;
use crate::query::executor::collector::LevelCollector;
use crate::query::request::GroupingLevelSpec;
use crate::storage::ShardSearcher;

/// 层级的名称变换：分词与大小写折叠
#[derive(Debug, Clone, Default)]
pub struct LevelTransform {
    tokenizer: Option<Tokenizer>,
    case_insensitive: bool,
}

impl LevelTransform {
    pub fn from_spec(spec: &GroupingLevelSpec) -> DBResult<Self> {
        let tokenizer = match &spec.stop_words {
            Some(words) => Some(Tokenizer::new(words)?),
            None => None,
        };
        Ok(Self {
            tokenizer,
            case_insensitive: spec.case_insensitive,
        })
    }

    pub fn from_specs(specs: &[GroupingLevelSpec]) -> DBResult<Vec<Self>> {
        specs.iter().map(Self::from_spec).collect()
    }

    pub fn is_identity(&self) -> bool {
        self.tokenizer.is_none() && !self.case_insensitive
    }

    fn apply(&self, mut groups: Vec<Group>) -> Vec<Group> {
        if let Some(tokenizer) = &self.tokenizer {
            groups = tokenizer.split(groups);
        }
        if self.case_insensitive {
            for group in &mut groups {
                group.key = std::mem::replace(&mut group.key, GroupKey::null("")).folded();
            }
        }
        groups
    }
}

pub struct GroupTreeMaterializer<'a> {
    searcher: &'a dyn ShardSearcher,
    levels: &'a [LevelCollector],
    transforms: &'a [LevelTransform],
    memo: Vec<HashMap<RawKey, GroupKey>>,
}

impl<'a> GroupTreeMaterializer<'a> {
    pub fn new(
        searcher: &'a dyn ShardSearcher,
        levels: &'a [LevelCollector],
        transforms: &'a [LevelTransform],
    ) -> Self {
        Self {
            searcher,
            levels,
            transforms,
            memo: vec![HashMap::new(); levels.len()],
        }
    }

    pub fn materialize(&mut self, root: RawNode, root_key: GroupKey) -> DBResult<Group> {
        let children = self.children(0, root.children)?;
        Ok(Group {
            key: root_key,
            doc_count: root.doc_count,
            metrics: root.metrics,
            children,
        })
    }

    /// 某层已解析的不同键数量
    pub fn resolved_count(&self, level: usize) -> usize {
        self.memo.get(level).map_or(0, HashMap::len)
    }

    fn children(&mut self, level: usize, raw: BTreeMap<RawKey, RawNode>) -> DBResult<Vec<Group>> {
        let Some(collector) = self.levels.get(level) else {
            return Ok(Vec::new());
        };
        let requires_ordering = collector.requires_ordering();

        let mut groups = Vec::with_capacity(raw.len());
        for (key, node) in raw {
            let group_key = self.resolve(level, key)?;
            let children = self.children(level + 1, node.children)?;
            groups.push(Group {
                key: group_key,
                doc_count: node.doc_count,
                metrics: node.metrics,
                children,
            });
        }

        let transform = self.transforms.get(level);
        let transformed = transform.is_some_and(|t| !t.is_identity());
        if let Some(transform) = transform {
            groups = transform.apply(groups);
        }
        if requires_ordering || transformed {
            sort_and_dedup(&mut groups);
        }
        Ok(groups)
    }

    fn resolve(&mut self, level: usize, key: RawKey) -> DBResult<GroupKey> {
        if let Some(resolved) = self.memo[level].get(&key) {
            return Ok(resolved.clone());
        }
        let resolved = self.levels[level].resolve(self.searcher, key)?;
        self.memo[level].insert(key, resolved.clone());
        Ok(resolved)
    }
}
