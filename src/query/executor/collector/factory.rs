//! 收集器工厂
//!
//! 把层级定义编译为绑定到某个分片的收集器。字段不存在、类型不匹配、
//! 路径中出现非关系字段等配置错误都在这里以 `InvalidRequest` 返回，
//! 早于任何文档扫描

use super::{
    BatchCollector, DateCollector, DateSubFieldCollector, FieldCollector, FilteredCollector,
    IdCollector, LevelCollector, LinkCollector, NullCollector, PredicateBucketCollector,
    ScalarCollector, ScalarKind, TextCollector, TransitiveLinkCollector,
};
use crate::config::Config;
use crate::core::error::{DBError, DBResult};
use crate::core::{FieldInfo, FieldType};
use crate::query::request::{GroupTarget, GroupingLevelSpec, PathStep, Traversal};
use crate::storage::{DocSet, Query, ShardSearcher};

pub struct CollectorFactory<'a> {
    searcher: &'a dyn ShardSearcher,
    config: &'a Config,
}

impl<'a> CollectorFactory<'a> {
    pub fn new(searcher: &'a dyn ShardSearcher, config: &'a Config) -> Self {
        Self { searcher, config }
    }

    /// 编译完整层级
    pub fn compile_level(&self, spec: &GroupingLevelSpec) -> DBResult<LevelCollector> {
        self.compile_suffix(spec, 0)
    }

    /// 跳过路径前 `skip` 跳后编译层级，供公共路径使用
    pub fn compile_suffix(&self, spec: &GroupingLevelSpec, skip: usize) -> DBResult<LevelCollector> {
        let steps = spec.path.get(skip..).ok_or_else(|| {
            DBError::Internal(format!("路径长度 {} 小于跳过数 {}", spec.path.len(), skip))
        })?;
        let mut terminal = self.compile_terminal(spec)?;
        if let Some(filter) = &spec.filter {
            terminal = FieldCollector::Filtered(FilteredCollector::new(self.evaluate(filter)?, terminal));
        }
        let collector = self.compile_path(steps, terminal)?;
        Ok(LevelCollector::new(
            collector,
            spec.include_missing,
            self.config.null_group_label.as_str(),
        ))
    }

    /// 公共路径前缀：键为到达对象的文档序号
    pub fn compile_prefix(&self, steps: &[PathStep]) -> DBResult<FieldCollector> {
        self.compile_path(steps, FieldCollector::Id(IdCollector))
    }

    /// 从最后一跳向前逐层包装
    pub fn compile_path(&self, steps: &[PathStep], terminal: FieldCollector) -> DBResult<FieldCollector> {
        let mut collector = terminal;
        for step in steps.iter().rev() {
            let info = self.field(&step.link)?;
            if info.field_type != FieldType::Link {
                return Err(DBError::invalid_request(format!(
                    "路径字段 {} 不是关系类型: {:?}",
                    step.link, info.field_type
                )));
            }
            let filter = step.filter.as_ref().map(|q| self.evaluate(q)).transpose()?;
            collector = match step.traversal {
                Traversal::Direct => {
                    FieldCollector::Link(LinkCollector::new(step.link.as_str(), filter, collector))
                }
                Traversal::Transitive { max_depth } => {
                    FieldCollector::TransitiveLink(TransitiveLinkCollector::new(
                        step.link.as_str(),
                        max_depth.unwrap_or(self.config.max_transitive_depth),
                        filter,
                        collector,
                    ))
                }
            };
        }
        Ok(collector)
    }

    fn compile_terminal(&self, spec: &GroupingLevelSpec) -> DBResult<FieldCollector> {
        match &spec.target {
            GroupTarget::All => Ok(FieldCollector::Null(NullCollector::new(
                self.config.all_group_label.as_str(),
            ))),
            GroupTarget::Id => Ok(FieldCollector::Id(IdCollector)),
            GroupTarget::Buckets(buckets) => {
                let mut aliases = Vec::with_capacity(buckets.len());
                let mut members = Vec::with_capacity(buckets.len());
                for bucket in buckets {
                    aliases.push(bucket.alias.clone());
                    members.push(self.evaluate(&bucket.query)?);
                }
                Ok(FieldCollector::PredicateBucket(PredicateBucketCollector::new(
                    aliases, members,
                )?))
            }
            GroupTarget::Field(name) => self.compile_field(name, spec),
        }
    }

    fn compile_field(&self, name: &str, spec: &GroupingLevelSpec) -> DBResult<FieldCollector> {
        let info = self.field(name)?;
        let multi = info.multi_valued;

        if (spec.date_unit.is_some() || spec.date_sub_field.is_some())
            && info.field_type != FieldType::Date
        {
            return Err(DBError::invalid_request(format!(
                "字段 {} 不是日期类型，不能截断或取子字段: {:?}",
                name, info.field_type
            )));
        }

        if let Some(boundaries) = &spec.boundaries {
            return Ok(FieldCollector::NumBatch(BatchCollector::new(
                name,
                info.field_type,
                boundaries.clone(),
                multi,
            )?));
        }

        let collector = match info.field_type {
            FieldType::Boolean => FieldCollector::Scalar(
                ScalarCollector::new(name, ScalarKind::Boolean, multi)
                    .with_bool_labels(self.config.true_label.as_str(), self.config.false_label.as_str()),
            ),
            FieldType::Integer | FieldType::Long => {
                FieldCollector::Scalar(ScalarCollector::new(name, ScalarKind::Long, multi))
            }
            FieldType::Float => {
                FieldCollector::Scalar(ScalarCollector::new(name, ScalarKind::Float, multi))
            }
            FieldType::Double => {
                FieldCollector::Scalar(ScalarCollector::new(name, ScalarKind::Double, multi))
            }
            FieldType::Date => match spec.date_sub_field {
                Some(sub_field) => {
                    FieldCollector::DateSubField(DateSubFieldCollector::new(name, sub_field, multi))
                }
                None => FieldCollector::Date(DateCollector::new(name, spec.date_unit, multi)),
            },
            FieldType::Text => FieldCollector::Text(TextCollector::new(name, multi)),
            // 直接按关系字段分组即按目标对象分组
            FieldType::Link => FieldCollector::Link(LinkCollector::new(
                name,
                None,
                FieldCollector::Id(IdCollector),
            )),
        };
        Ok(collector)
    }

    fn field(&self, name: &str) -> DBResult<FieldInfo> {
        self.searcher
            .field_info(name)
            .ok_or_else(|| DBError::invalid_request(format!("未知字段: {}", name)))
    }

    fn evaluate(&self, query: &Query) -> DBResult<DocSet> {
        Ok(self.searcher.search(query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::executor::collector::{CollectContext, KeyCollector, KeySet};
    use crate::query::request::PredicateBucket;
    use crate::storage::MemoryShard;

    fn shard() -> MemoryShard {
        let mut shard = MemoryShard::new(0);
        shard
            .define_field("active", FieldInfo::single(FieldType::Boolean))
            .define_field("name", FieldInfo::single(FieldType::Text))
            .define_field("owner", FieldInfo::single(FieldType::Link))
            .define_field("created", FieldInfo::single(FieldType::Date));
        let a = shard.add_doc("alice");
        let b = shard.add_doc("bob");
        shard.set_bools(a, "active", &[true]).expect("set");
        shard.set_texts(a, "name", &["Alice"]).expect("set");
        shard.set_texts(b, "name", &["Bob"]).expect("set");
        shard.set_links(b, "owner", &[a]).expect("set");
        shard.define_query(Query::new("is_bob"), [b]);
        shard
    }

    #[test]
    fn test_boolean_level_registers_empty_groups() {
        let shard = shard();
        let config = Config::default();
        let factory = CollectorFactory::new(&shard, &config);
        let level = factory
            .compile_level(&GroupingLevelSpec::field("active"))
            .expect("compile");
        assert_eq!(level.empty_groups().as_slice(), &[0, 1]);
        assert!(!level.requires_ordering());
    }

    #[test]
    fn test_path_collects_through_link() {
        let shard = shard();
        let config = Config::default();
        let factory = CollectorFactory::new(&shard, &config);
        let level = factory
            .compile_level(&GroupingLevelSpec::field("name").via(PathStep::link("owner")))
            .expect("compile");
        assert!(level.requires_ordering());

        let mut ctx = CollectContext::new(&shard);
        let mut out = KeySet::new();
        level.collect(&mut ctx, 1, &mut out).expect("collect");
        let key = level.resolve(&shard, Some(out.as_slice()[0])).expect("resolve");
        assert_eq!(key.display(), "Alice");
    }

    #[test]
    fn test_terminal_filter_wraps_collector() {
        let shard = shard();
        let config = Config::default();
        let factory = CollectorFactory::new(&shard, &config);
        let level = factory
            .compile_level(&GroupingLevelSpec::field("name").with_filter(Query::new("is_bob")))
            .expect("compile");
        assert!(matches!(level.collector(), FieldCollector::Filtered(_)));

        let mut ctx = CollectContext::new(&shard);
        let mut out = KeySet::new();
        level.collect(&mut ctx, 0, &mut out).expect("collect");
        assert!(out.is_empty());
        level.collect(&mut ctx, 1, &mut out).expect("collect");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_configuration_errors() {
        let shard = shard();
        let config = Config::default();
        let factory = CollectorFactory::new(&shard, &config);

        let unknown = factory.compile_level(&GroupingLevelSpec::field("missing"));
        assert!(matches!(unknown, Err(DBError::InvalidRequest(_))));

        let not_link = factory.compile_level(&GroupingLevelSpec::field("name").via(PathStep::link("active")));
        assert!(matches!(not_link, Err(DBError::InvalidRequest(_))));

        let batch_text = factory.compile_level(&GroupingLevelSpec::field("name").batch(vec![1.0]));
        assert!(matches!(batch_text, Err(DBError::InvalidRequest(_))));

        let truncate_text = factory.compile_level(
            &GroupingLevelSpec::field("name").truncate(crate::query::request::DateUnit::Day),
        );
        assert!(matches!(truncate_text, Err(DBError::InvalidRequest(_))));
    }

    #[test]
    fn test_buckets_evaluate_queries() {
        let shard = shard();
        let config = Config::default();
        let factory = CollectorFactory::new(&shard, &config);
        let level = factory
            .compile_level(&GroupingLevelSpec::buckets(vec![PredicateBucket::new(
                "bobs",
                Query::new("is_bob"),
            )]))
            .expect("compile");
        assert_eq!(level.empty_groups().len(), 1);
    }
}
