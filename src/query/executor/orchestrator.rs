//! 多分片聚合入口
//!
//! 每个分片独立产生一棵分组树，顺序执行或交给共享线程池，
//! 全部完成后归并为一棵树并整形

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::group_tree::{merge, Group, GroupKey};
use super::result_shaper::{AggregationResultTree, ResultShaper};
use super::shard_aggregator::{aggregate_shard, validate_against};
use crate::config::Config;
use crate::core::error::{DBError, DBResult};
use crate::core::ShardId;
use crate::query::metric::MetricValueSet;
use crate::query::request::AggregationRequest;
use crate::storage::ColumnStore;
use crate::utils::{retry_with_policy, RetryConfig};

/// 调用方提供的运行环境
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub pool: Option<Arc<rayon::ThreadPool>>,
}

impl AppContext {
    /// 按配置创建线程池
    pub fn new(config: Config) -> DBResult<Self> {
        let pool = config.build_thread_pool()?;
        Ok(Self {
            config: Arc::new(config),
            pool,
        })
    }

    pub fn sequential(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            pool: None,
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("pool_threads", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish()
    }
}

/// 执行聚合请求
pub fn aggregate(
    store: &dyn ColumnStore,
    ctx: &AppContext,
    request: &AggregationRequest,
) -> DBResult<AggregationResultTree> {
    let started = Instant::now();
    let config = ctx.config.as_ref();
    request.validate()?;

    if let Some(&first) = request.shards.first() {
        let searcher = store.searcher(first)?;
        validate_against(searcher.as_ref(), config, request)?;
    }

    let results = match &ctx.pool {
        Some(pool) if request.shards.len() > 1 => {
            debug!(
                "{} 个分片交给线程池 ({} 线程)",
                request.shards.len(),
                pool.current_num_threads()
            );
            run_pooled(pool, store, config, request)
        }
        _ => run_sequential(store, config, request)?,
    };

    let mut total: Option<Group> = None;
    for result in results {
        total = merge(total, Some(result?));
    }
    let root = total.unwrap_or_else(|| empty_root(config, request));

    let tree = ResultShaper::for_request(request, config).build(root);
    info!(
        "聚合完成: {} 个分片, {} 个文档, {} 个顶层分组, 耗时 {:?}",
        request.shards.len(),
        tree.doc_count(),
        tree.groups().len(),
        started.elapsed()
    );
    Ok(tree)
}

fn empty_root(config: &Config, request: &AggregationRequest) -> Group {
    let metrics = request
        .parts
        .first()
        .map(|p| MetricValueSet::new(&p.metrics))
        .unwrap_or_else(|| MetricValueSet::new(&[]));
    Group::new(GroupKey::text(config.all_group_label.as_str()), metrics)
}

/// 单分片任务，段被替换时重新获取搜索器重试
fn shard_task(
    store: &dyn ColumnStore,
    config: &Config,
    request: &AggregationRequest,
    shard: ShardId,
) -> DBResult<Group> {
    let policy = RetryConfig::from_retries(config.shard_retry_attempts)
        .with_delay(config.shard_retry_delay_ms);
    retry_with_policy(
        &policy,
        |attempt, err| warn!("分片 {} 第 {} 次执行失败，重试: {}", shard, attempt, err),
        || {
            let searcher = store.searcher(shard)?;
            aggregate_shard(searcher.as_ref(), config, request)
        },
    )
}

fn run_sequential(
    store: &dyn ColumnStore,
    config: &Config,
    request: &AggregationRequest,
) -> DBResult<Vec<DBResult<Group>>> {
    let mut results = Vec::with_capacity(request.shards.len());
    for &shard in &request.shards {
        results.push(Ok(shard_task(store, config, request, shard)?));
    }
    Ok(results)
}

fn run_pooled(
    pool: &rayon::ThreadPool,
    store: &dyn ColumnStore,
    config: &Config,
    request: &AggregationRequest,
) -> Vec<DBResult<Group>> {
    let results = Mutex::new(Vec::with_capacity(request.shards.len()));
    pool.scope(|scope| {
        for &shard in &request.shards {
            let results = &results;
            scope.spawn(move |_| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    shard_task(store, config, request, shard)
                }))
                .unwrap_or_else(|payload| {
                    Err(DBError::Task(format!(
                        "分片 {} 任务异常终止: {}",
                        shard,
                        panic_message(payload.as_ref())
                    )))
                });
                results.lock().push(outcome);
            });
        }
    });
    results.into_inner()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知错误".to_string()
    }
}
