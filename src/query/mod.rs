// Query module for the aggregation engine
//
// - request: 聚合请求模型
// - metric: 指标累加器
// - executor: 收集、建树、归并与整形

pub mod executor;
pub mod metric;
pub mod request;

pub use executor::{aggregate, AggregationResultTree, AppContext, Group, GroupKey};
pub use metric::{MetricSpec, MetricValue, MetricValueSet};
pub use request::{
    AggregationPart, AggregationRequest, DateSubField, DateUnit, GroupTarget, GroupingLevelSpec,
    PathStep, PredicateBucket, Selection, Traversal,
};
