//! 单分片聚合
//!
//! 编译各 Part 的收集器，扫描其文档集合，构建未解析分组树并物化。
//! 所有 Part 的结果按 `GroupKey` 合并成一棵共享的树

use log::debug;

use super::collector::{CollectContext, CollectorFactory, KeySet, LevelCollector};
use super::common_path::{self, CommonPathPlan};
use super::group_tree::{merge, Group, GroupKey, GroupTreeMaterializer, LevelTransform, RawTreeBuilder};
use crate::config::Config;
use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::metric::{MetricCollector, MetricValueSet};
use crate::query::request::{AggregationPart, AggregationRequest};
use crate::storage::{DocSet, ShardSearcher};

struct PartPlan {
    docs: DocSet,
    levels: Vec<LevelCollector>,
    metrics: MetricCollector,
}

/// 绑定到某个分片的执行计划
pub struct ShardPlan {
    parts: Vec<PartPlan>,
    common: Option<CommonPathPlan>,
    transforms: Vec<LevelTransform>,
}

/// 只编译收集器与指标定义，不读取任何文档
///
/// 在扫描前对第一个分片调用，让配置错误尽早失败
pub fn validate_against(
    searcher: &dyn ShardSearcher,
    config: &Config,
    request: &AggregationRequest,
) -> DBResult<()> {
    let factory = CollectorFactory::new(searcher, config);
    for part in &request.parts {
        for level in &part.levels {
            factory.compile_level(level)?;
        }
        MetricCollector::compile(&part.metrics, searcher)?;
    }
    LevelTransform::from_specs(request.levels())?;
    Ok(())
}

impl ShardPlan {
    pub fn compile(
        searcher: &dyn ShardSearcher,
        config: &Config,
        request: &AggregationRequest,
    ) -> DBResult<Self> {
        let factory = CollectorFactory::new(searcher, config);

        let common = match common_path::detect(request) {
            Some(steps) => Some(CommonPathPlan::compile(&factory, &steps)?),
            None => None,
        };
        let skip = common.as_ref().map_or(0, CommonPathPlan::len);

        let live = searcher.live_docs()?;
        let mut parts = Vec::with_capacity(request.parts.len());
        for part in &request.parts {
            parts.push(Self::compile_part(&factory, searcher, part, &live, skip)?);
        }

        Ok(Self {
            parts,
            common,
            transforms: LevelTransform::from_specs(request.levels())?,
        })
    }

    fn compile_part(
        factory: &CollectorFactory<'_>,
        searcher: &dyn ShardSearcher,
        part: &AggregationPart,
        live: &DocSet,
        skip: usize,
    ) -> DBResult<PartPlan> {
        let docs = match &part.filter {
            Some(filter) => searcher.search(filter)? & live,
            None => live.clone(),
        };
        let mut levels = Vec::with_capacity(part.levels.len());
        for (i, level) in part.levels.iter().enumerate() {
            let compiled = if i == 0 && skip > 0 {
                factory.compile_suffix(level, skip)?
            } else {
                factory.compile_level(level)?
            };
            levels.push(compiled);
        }
        Ok(PartPlan {
            docs,
            levels,
            metrics: MetricCollector::compile(&part.metrics, searcher)?,
        })
    }

    pub fn uses_common_path(&self) -> bool {
        self.common.is_some()
    }

    pub fn doc_count(&self) -> u64 {
        self.parts.iter().map(|p| p.docs.len()).sum()
    }
}

/// 单分片的完整聚合
pub fn aggregate_shard(
    searcher: &dyn ShardSearcher,
    config: &Config,
    request: &AggregationRequest,
) -> DBResult<Group> {
    let shard = searcher.shard_id();
    let mut plan = ShardPlan::compile(searcher, config, request)?;
    debug!(
        "分片 {} 开始聚合: {} 个 Part, {} 个候选文档, 公共路径: {}",
        shard,
        plan.parts.len(),
        plan.doc_count(),
        plan.uses_common_path()
    );

    let root_key = GroupKey::text(config.all_group_label.as_str());
    let group = if request.is_ungrouped() {
        aggregate_ungrouped(searcher, &mut plan, root_key)?
    } else {
        aggregate_grouped(searcher, &mut plan, root_key)?
    };

    debug!("分片 {} 聚合完成: {} 个文档, {} 个顶层分组", shard, group.doc_count, group.children.len());
    Ok(group)
}

/// 无分组字段时只累计根节点
fn aggregate_ungrouped(
    searcher: &dyn ShardSearcher,
    plan: &mut ShardPlan,
    root_key: GroupKey,
) -> DBResult<Group> {
    let mut total: Option<Group> = None;
    for part in &mut plan.parts {
        let mut root = Group::new(root_key.clone(), part.metrics.zero());
        let mut contribution = part.metrics.zero();
        for doc in part.docs.iter() {
            part.metrics.accumulate(searcher, doc, &mut contribution)?;
            root.doc_count += 1;
            root.metrics.merge(&contribution);
        }
        total = merge(total, Some(root));
    }
    total.ok_or_else(|| DBError::Internal("请求没有 Part".to_string()))
}

fn aggregate_grouped(
    searcher: &dyn ShardSearcher,
    plan: &mut ShardPlan,
    root_key: GroupKey,
) -> DBResult<Group> {
    let mut ctx = CollectContext::new(searcher);
    let level_count = plan.transforms.len();
    let mut key_sets: Vec<KeySet> = (0..level_count).map(|_| KeySet::new()).collect();
    let mut scratch: Vec<MetricValueSet> = plan.parts.iter().map(|p| p.metrics.zero()).collect();

    let mut builders: Vec<RawTreeBuilder> = plan
        .parts
        .iter()
        .map(|part| {
            let mut builder = RawTreeBuilder::new(part.metrics.zero());
            if let Some(top) = part.levels.first() {
                builder.seed_empty_groups(top.empty_groups());
            }
            builder
        })
        .collect();

    match &plan.common {
        Some(common) => {
            // 无 Part 过滤时各 Part 的文档集合都等于存活文档
            let docs = plan.parts.first().map(|p| p.docs.clone()).unwrap_or_default();
            let mut reached = KeySet::new();
            for doc in docs.iter() {
                reached.clear();
                common.reach(&mut ctx, doc, &mut reached)?;
                for ((part, builder), contribution) in plan
                    .parts
                    .iter_mut()
                    .zip(builders.iter_mut())
                    .zip(scratch.iter_mut())
                {
                    scan_doc(
                        searcher,
                        &mut ctx,
                        &part.levels,
                        &mut part.metrics,
                        doc,
                        Some(&reached),
                        &mut key_sets,
                        contribution,
                    )?;
                    builder.add_document(&key_sets, contribution);
                }
            }
        }
        None => {
            for ((part, builder), contribution) in plan
                .parts
                .iter_mut()
                .zip(builders.iter_mut())
                .zip(scratch.iter_mut())
            {
                let PartPlan { docs, levels, metrics } = part;
                for doc in docs.iter() {
                    scan_doc(searcher, &mut ctx, levels, metrics, doc, None, &mut key_sets, contribution)?;
                    builder.add_document(&key_sets, contribution);
                }
            }
        }
    }

    let mut total: Option<Group> = None;
    for (part, builder) in plan.parts.iter().zip(builders) {
        let mut materializer = GroupTreeMaterializer::new(searcher, &part.levels, &plan.transforms);
        let group = materializer.materialize(builder.finish(), root_key.clone())?;
        total = merge(total, Some(group));
    }
    total.ok_or_else(|| DBError::Internal("请求没有 Part".to_string()))
}

/// 计算单个文档的指标贡献与每层键集合
#[allow(clippy::too_many_arguments)]
fn scan_doc(
    searcher: &dyn ShardSearcher,
    ctx: &mut CollectContext<'_>,
    levels: &[LevelCollector],
    metrics: &mut MetricCollector,
    doc: DocId,
    reached: Option<&KeySet>,
    key_sets: &mut [KeySet],
    contribution: &mut MetricValueSet,
) -> DBResult<()> {
    metrics.accumulate(searcher, doc, contribution)?;
    for (i, (level, out)) in levels.iter().zip(key_sets.iter_mut()).enumerate() {
        out.clear();
        match reached {
            Some(reached) if i == 0 => CommonPathPlan::collect_suffix(level, ctx, reached, out)?,
            _ => level.collect(ctx, doc, out)?,
        }
        level.finish(out);
    }
    Ok(())
}
