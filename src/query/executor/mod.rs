// 聚合执行器
//
// 收集器 -> 未解析分组树 -> 物化 -> 分片归并 -> 整形

pub mod collector;
pub mod common_path;
pub mod group_tree;
pub mod orchestrator;
pub mod result_shaper;
pub mod shard_aggregator;

pub use group_tree::{Group, GroupKey};
pub use orchestrator::{aggregate, AppContext};
pub use result_shaper::{AggregationResultTree, LevelSelection, ResultShaper};
pub use shard_aggregator::{aggregate_shard, ShardPlan};
