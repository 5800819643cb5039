//! 指标累加器
//!
//! 分组树的每个节点持有一个 `MetricValueSet`。文档贡献先累加到临时值，
//! 再原样合并进扇出的每个节点。排序比较只看第一个指标。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::error::{DBError, DBResult};
use crate::core::{DocId, FieldType};
use crate::query::executor::collector::encoding::raw_to_f64;
use crate::storage::ShardSearcher;

/// 指标定义
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricSpec {
    Count,
    Sum(String),
    Min(String),
    Max(String),
    Avg(String),
}

impl MetricSpec {
    fn field(&self) -> Option<&str> {
        match self {
            MetricSpec::Count => None,
            MetricSpec::Sum(f) | MetricSpec::Min(f) | MetricSpec::Max(f) | MetricSpec::Avg(f) => {
                Some(f)
            }
        }
    }

    fn zero(&self) -> MetricValue {
        match self {
            MetricSpec::Count => MetricValue::Count(0),
            MetricSpec::Sum(_) => MetricValue::Sum(0.0),
            MetricSpec::Min(_) => MetricValue::Min(None),
            MetricSpec::Max(_) => MetricValue::Max(None),
            MetricSpec::Avg(_) => MetricValue::Avg { sum: 0.0, count: 0 },
        }
    }
}

/// 单个指标的累加状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricValue {
    Count(u64),
    Sum(f64),
    Min(Option<f64>),
    Max(Option<f64>),
    Avg { sum: f64, count: u64 },
}

impl MetricValue {
    /// 最终值，退化值返回 `None`
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Count(c) => Some(*c as f64),
            MetricValue::Sum(s) => Some(*s),
            MetricValue::Min(v) | MetricValue::Max(v) => *v,
            MetricValue::Avg { count: 0, .. } => None,
            MetricValue::Avg { sum, count } => Some(sum / *count as f64),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.value().map_or(true, f64::is_nan)
    }

    fn reset(&mut self) {
        *self = match self {
            MetricValue::Count(_) => MetricValue::Count(0),
            MetricValue::Sum(_) => MetricValue::Sum(0.0),
            MetricValue::Min(_) => MetricValue::Min(None),
            MetricValue::Max(_) => MetricValue::Max(None),
            MetricValue::Avg { .. } => MetricValue::Avg { sum: 0.0, count: 0 },
        };
    }

    fn add_sample(&mut self, sample: f64) {
        match self {
            MetricValue::Count(_) => {}
            MetricValue::Sum(s) => *s += sample,
            MetricValue::Min(v) => *v = Some(v.map_or(sample, |m| m.min(sample))),
            MetricValue::Max(v) => *v = Some(v.map_or(sample, |m| m.max(sample))),
            MetricValue::Avg { sum, count } => {
                *sum += sample;
                *count += 1;
            }
        }
    }

    fn merge(&mut self, other: &MetricValue) {
        match (self, other) {
            (MetricValue::Count(a), MetricValue::Count(b)) => *a += b,
            (MetricValue::Sum(a), MetricValue::Sum(b)) => *a += b,
            (MetricValue::Min(a), MetricValue::Min(b)) => {
                if let Some(b) = b {
                    *a = Some(a.map_or(*b, |m| m.min(*b)));
                }
            }
            (MetricValue::Max(a), MetricValue::Max(b)) => {
                if let Some(b) = b {
                    *a = Some(a.map_or(*b, |m| m.max(*b)));
                }
            }
            (
                MetricValue::Avg { sum, count },
                MetricValue::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            // validate 已保证各 Part 指标种类逐个一致
            _ => {}
        }
    }
}

/// 一个节点上的全部指标
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricValueSet {
    values: Vec<MetricValue>,
}

impl MetricValueSet {
    pub fn new(specs: &[MetricSpec]) -> Self {
        Self {
            values: specs.iter().map(MetricSpec::zero).collect(),
        }
    }

    pub fn from_values(values: Vec<MetricValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[MetricValue] {
        &self.values
    }

    pub fn primary(&self) -> Option<f64> {
        self.values.first().and_then(MetricValue::value)
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(MetricValue::reset);
    }

    pub fn merge(&mut self, other: &MetricValueSet) {
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            a.merge(b);
        }
    }

    /// 第一个指标是否退化（如无样本的平均值）
    pub fn is_degenerate(&self) -> bool {
        self.values.first().is_some_and(MetricValue::is_degenerate)
    }

    /// 按第一个指标比较，退化值按 `None` 处理为最小
    pub fn compare(&self, other: &MetricValueSet) -> Ordering {
        match (self.primary(), other.primary()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        }
    }
}

/// 已绑定到分片字段类型的指标计算器
#[derive(Debug)]
pub struct MetricCollector {
    specs: Vec<MetricSpec>,
    field_types: Vec<Option<FieldType>>,
    scratch: Vec<i64>,
}

impl MetricCollector {
    /// 校验指标字段存在且为数值类型
    pub fn compile(specs: &[MetricSpec], searcher: &dyn ShardSearcher) -> DBResult<Self> {
        let mut field_types = Vec::with_capacity(specs.len());
        for spec in specs {
            let field_type = match spec.field() {
                None => None,
                Some(field) => {
                    let info = searcher.field_info(field).ok_or_else(|| {
                        DBError::invalid_request(format!("指标字段不存在: {}", field))
                    })?;
                    if !(info.field_type.is_numeric() || info.field_type == FieldType::Date) {
                        return Err(DBError::invalid_request(format!(
                            "指标字段 {} 不是数值类型: {:?}",
                            field, info.field_type
                        )));
                    }
                    Some(info.field_type)
                }
            };
            field_types.push(field_type);
        }
        Ok(Self {
            specs: specs.to_vec(),
            field_types,
            scratch: Vec::new(),
        })
    }

    pub fn zero(&self) -> MetricValueSet {
        MetricValueSet::new(&self.specs)
    }

    /// 计算单个文档的贡献，写入已重置的 `into`
    pub fn accumulate(
        &mut self,
        searcher: &dyn ShardSearcher,
        doc: DocId,
        into: &mut MetricValueSet,
    ) -> DBResult<()> {
        into.reset();
        for ((spec, field_type), value) in self
            .specs
            .iter()
            .zip(&self.field_types)
            .zip(into.values.iter_mut())
        {
            match (spec.field(), field_type) {
                (Some(field), Some(field_type)) => {
                    self.scratch.clear();
                    searcher.read_values(field, doc, &mut self.scratch)?;
                    for &raw in &self.scratch {
                        if let Some(sample) = raw_to_f64(*field_type, raw) {
                            value.add_sample(sample);
                        }
                    }
                }
                _ => {
                    if let MetricValue::Count(c) = value {
                        *c += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
