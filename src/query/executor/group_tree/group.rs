use std::cmp::Ordering;

use serde::Serialize;

use super::GroupKey;
use crate::query::metric::MetricValueSet;

/// 已物化的分组节点
///
/// `children` 始终按键升序且键唯一
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    pub doc_count: u64,
    pub metrics: MetricValueSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Group>,
}

impl Group {
    pub fn new(key: GroupKey, metrics: MetricValueSet) -> Self {
        Self {
            key,
            doc_count: 0,
            metrics,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Group>) -> Self {
        self.children = children;
        self
    }

    /// 按展示名查找子分组
    pub fn child(&self, display: &str) -> Option<&Group> {
        self.children.iter().find(|c| c.key.display() == display)
    }
}

/// 合并两棵树，任一侧缺失时返回另一侧
pub fn merge(a: Option<Group>, b: Option<Group>) -> Option<Group> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(mut a), Some(b)) => {
            merge_into(&mut a, b);
            Some(a)
        }
    }
}

/// 将 `other` 并入 `target`：指标相加，子分组按键有序归并
pub fn merge_into(target: &mut Group, other: Group) {
    target.doc_count += other.doc_count;
    target.metrics.merge(&other.metrics);
    if other.children.is_empty() {
        return;
    }
    let mine = std::mem::take(&mut target.children);
    target.children = merge_sorted(mine, other.children);
}

fn merge_sorted(left: Vec<Group>, right: Vec<Group>) -> Vec<Group> {
    let mut merged = Vec::with_capacity(left.len().max(right.len()));
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let order = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l.key.cmp(&r.key),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => merged.extend(left.next()),
            Ordering::Greater => merged.extend(right.next()),
            Ordering::Equal => {
                if let (Some(mut l), Some(r)) = (left.next(), right.next()) {
                    merge_into(&mut l, r);
                    merged.push(l);
                }
            }
        }
    }
    merged
}

/// 稳定排序后合并相邻的相同键，保留首次出现者的展示名
pub fn sort_and_dedup(groups: &mut Vec<Group>) {
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    let mut deduped: Vec<Group> = Vec::with_capacity(groups.len());
    for group in groups.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.key == group.key => merge_into(last, group),
            _ => deduped.push(group),
        }
    }
    *groups = deduped;
}
