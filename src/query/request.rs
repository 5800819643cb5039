//! 聚合请求模型
//!
//! 一个请求包含一个或多个 Part（多个仅用于成对/双角色查询），
//! 每个 Part 由过滤条件、分组层级链和指标组成

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{DBError, DBResult};
use crate::core::ShardId;
use crate::query::metric::MetricSpec;
use crate::storage::Query;

/// 每层的结果选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    None,
    Top,
    Bottom,
    First,
    Last,
}

impl FromStr for Selection {
    type Err = DBError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Selection::None),
            "top" => Ok(Selection::Top),
            "bottom" => Ok(Selection::Bottom),
            "first" => Ok(Selection::First),
            "last" => Ok(Selection::Last),
            other => Err(DBError::invalid_request(format!("未知的选择策略: {}", other))),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Selection::None => "none",
            Selection::Top => "top",
            Selection::Bottom => "bottom",
            Selection::First => "first",
            Selection::Last => "last",
        };
        f.write_str(name)
    }
}

/// 日期截断单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// 日期子字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateSubField {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

/// 关系遍历方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Traversal {
    #[default]
    Direct,
    /// 广度优先传递遍历，`max_depth` 为空时使用配置上限
    Transitive { max_depth: Option<u32> },
}

/// 字段链中的一跳关系
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    pub link: String,
    pub traversal: Traversal,
    /// 对被遍历对象的子过滤
    pub filter: Option<Query>,
}

impl PathStep {
    pub fn link(name: impl Into<String>) -> Self {
        Self {
            link: name.into(),
            traversal: Traversal::Direct,
            filter: None,
        }
    }

    pub fn transitive(name: impl Into<String>, max_depth: Option<u32>) -> Self {
        Self {
            link: name.into(),
            traversal: Traversal::Transitive { max_depth },
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// 谓词分桶：命名的布尔子查询
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateBucket {
    pub alias: String,
    pub query: Query,
}

impl PredicateBucket {
    pub fn new(alias: impl Into<String>, query: Query) -> Self {
        Self {
            alias: alias.into(),
            query,
        }
    }
}

/// 字段链末端的分组目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GroupTarget {
    /// 所有文档归入同一个 "*" 组
    All,
    Field(String),
    /// 按到达的对象本身分组
    Id,
    Buckets(Vec<PredicateBucket>),
}

/// 单个分组层级的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingLevelSpec {
    pub path: Vec<PathStep>,
    pub target: GroupTarget,
    /// 对末端对象的子过滤
    pub filter: Option<Query>,
    pub date_unit: Option<DateUnit>,
    pub date_sub_field: Option<DateSubField>,
    /// 升序的分段边界
    pub boundaries: Option<Vec<f64>>,
    /// 非空时对展示名分词
    pub stop_words: Option<BTreeSet<String>>,
    pub case_insensitive: bool,
    /// 为无值文档保留空组
    pub include_missing: bool,
    pub selection: Selection,
    pub selection_value: usize,
}

impl GroupingLevelSpec {
    pub fn new(target: GroupTarget) -> Self {
        Self {
            path: Vec::new(),
            target,
            filter: None,
            date_unit: None,
            date_sub_field: None,
            boundaries: None,
            stop_words: None,
            case_insensitive: false,
            include_missing: false,
            selection: Selection::None,
            selection_value: 0,
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(GroupTarget::Field(name.into()))
    }

    pub fn id() -> Self {
        Self::new(GroupTarget::Id)
    }

    pub fn all() -> Self {
        Self::new(GroupTarget::All)
    }

    pub fn buckets(buckets: Vec<PredicateBucket>) -> Self {
        Self::new(GroupTarget::Buckets(buckets))
    }

    pub fn via(mut self, step: PathStep) -> Self {
        self.path.push(step);
        self
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn truncate(mut self, unit: DateUnit) -> Self {
        self.date_unit = Some(unit);
        self
    }

    pub fn sub_field(mut self, sub_field: DateSubField) -> Self {
        self.date_sub_field = Some(sub_field);
        self
    }

    pub fn batch(mut self, boundaries: Vec<f64>) -> Self {
        self.boundaries = Some(boundaries);
        self
    }

    pub fn tokenize<I, S>(mut self, stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = Some(stop_words.into_iter().map(Into::into).collect());
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn include_missing(mut self) -> Self {
        self.include_missing = true;
        self
    }

    pub fn select(mut self, selection: Selection, value: usize) -> Self {
        self.selection = selection;
        self.selection_value = value;
        self
    }

    pub fn top(self, n: usize) -> Self {
        self.select(Selection::Top, n)
    }

    pub fn bottom(self, n: usize) -> Self {
        self.select(Selection::Bottom, n)
    }

    pub fn first(self, n: usize) -> Self {
        self.select(Selection::First, n)
    }

    pub fn last(self, n: usize) -> Self {
        self.select(Selection::Last, n)
    }

    fn validate(&self, part: usize, level: usize) -> DBResult<()> {
        let at = || format!("part {} level {}", part, level);
        if self.date_unit.is_some() && self.date_sub_field.is_some() {
            return Err(DBError::invalid_request(format!(
                "{}: 日期截断与日期子字段不能同时指定",
                at()
            )));
        }
        if let Some(boundaries) = &self.boundaries {
            if boundaries.iter().any(|b| !b.is_finite()) {
                return Err(DBError::invalid_request(format!("{}: 分段边界必须为有限值", at())));
            }
            if boundaries.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DBError::invalid_request(format!("{}: 分段边界必须严格升序", at())));
            }
        }
        if let GroupTarget::Buckets(buckets) = &self.target {
            if buckets.is_empty() {
                return Err(DBError::invalid_request(format!("{}: 谓词分桶列表为空", at())));
            }
        }
        Ok(())
    }
}

/// 请求中的一个部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPart {
    pub filter: Option<Query>,
    pub levels: Vec<GroupingLevelSpec>,
    pub metrics: Vec<MetricSpec>,
}

impl AggregationPart {
    pub fn new(levels: Vec<GroupingLevelSpec>, metrics: Vec<MetricSpec>) -> Self {
        Self {
            filter: None,
            levels,
            metrics,
        }
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// 聚合请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub parts: Vec<AggregationPart>,
    pub shards: Vec<ShardId>,
    /// 扁平模式下二级分组的总数上限
    pub flat_limit: Option<usize>,
}

impl AggregationRequest {
    pub fn new(part: AggregationPart, shards: Vec<ShardId>) -> Self {
        Self {
            parts: vec![part],
            shards,
            flat_limit: None,
        }
    }

    pub fn paired(parts: Vec<AggregationPart>, shards: Vec<ShardId>) -> Self {
        Self {
            parts,
            shards,
            flat_limit: None,
        }
    }

    pub fn with_flat_limit(mut self, limit: usize) -> Self {
        self.flat_limit = Some(limit);
        self
    }

    /// 层级定义（变换与选择策略）取自第一个 Part
    pub fn levels(&self) -> &[GroupingLevelSpec] {
        self.parts
            .first()
            .map(|p| p.levels.as_slice())
            .unwrap_or(&[])
    }

    pub fn level_count(&self) -> usize {
        self.levels().len()
    }

    /// 请求没有任何分组字段
    pub fn is_ungrouped(&self) -> bool {
        self.parts.iter().all(|p| p.levels.is_empty())
    }

    /// 结构校验，在扫描任何文档前执行
    pub fn validate(&self) -> DBResult<()> {
        let first = self
            .parts
            .first()
            .ok_or_else(|| DBError::invalid_request("请求至少需要一个 Part"))?;

        for (i, part) in self.parts.iter().enumerate() {
            if part.levels.len() != first.levels.len() {
                return Err(DBError::invalid_request(format!(
                    "part {} 的层级数 {} 与 part 0 的 {} 不一致",
                    i,
                    part.levels.len(),
                    first.levels.len()
                )));
            }
            if part.metrics.len() != first.metrics.len() {
                return Err(DBError::invalid_request(format!(
                    "part {} 的指标数与 part 0 不一致",
                    i
                )));
            }
            // 字段可以不同，种类必须逐个一致才能合并到同一棵树
            for (m, (metric, expected)) in part.metrics.iter().zip(&first.metrics).enumerate() {
                if std::mem::discriminant(metric) != std::mem::discriminant(expected) {
                    return Err(DBError::invalid_request(format!(
                        "part {} 的第 {} 个指标 {:?} 与 part 0 的 {:?} 种类不一致",
                        i, m, metric, expected
                    )));
                }
            }
            for (l, level) in part.levels.iter().enumerate() {
                level.validate(i, l)?;
            }
        }

        if self.flat_limit.is_some() && first.levels.len() != 2 {
            return Err(DBError::invalid_request("扁平模式要求恰好两个分组层级"));
        }
        Ok(())
    }
}
