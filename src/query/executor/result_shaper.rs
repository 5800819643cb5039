//! 结果整形
//!
//! 按每层的选择策略排序并截取子分组，最后包装为带汇总节点的结果树。
//! Top/Bottom 在 N 较小时使用容量为 N 的有界堆

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use super::group_tree::{Group, GroupKey};
use crate::config::Config;
use crate::core::error::DBResult;
use crate::query::metric::MetricValueSet;
use crate::query::request::{AggregationRequest, GroupingLevelSpec, Selection};

/// 单层选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSelection {
    pub selection: Selection,
    pub limit: usize,
}

impl LevelSelection {
    pub fn new(selection: Selection, limit: usize) -> Self {
        Self { selection, limit }
    }

    pub fn from_spec(spec: &GroupingLevelSpec) -> Self {
        Self::new(spec.selection, spec.selection_value)
    }

    /// 需要返回的数量，`None` 表示全部
    fn bound(&self, len: usize) -> Option<usize> {
        match self.selection {
            Selection::None => None,
            _ if self.limit == 0 || self.limit >= len => None,
            _ => Some(self.limit),
        }
    }

    /// 排序比较，`Less` 表示更靠前
    pub fn compare(&self, a: &Group, b: &Group) -> Ordering {
        match self.selection {
            Selection::None | Selection::First => a.key.cmp(&b.key),
            Selection::Last => b.key.cmp(&a.key),
            Selection::Top => by_metric(a, b, true),
            Selection::Bottom => by_metric(a, b, false),
        }
    }

    /// 排序并截取
    pub fn select(&self, mut groups: Vec<Group>) -> Vec<Group> {
        match self.bound(groups.len()) {
            None => {
                groups.sort_by(|a, b| self.compare(a, b));
                groups
            }
            Some(n) => {
                let mut heap = BinaryHeap::with_capacity(n + 1);
                for group in groups {
                    heap.push(Ranked {
                        group,
                        selection: *self,
                    });
                    if heap.len() > n {
                        heap.pop();
                    }
                }
                heap.into_sorted_vec().into_iter().map(|r| r.group).collect()
            }
        }
    }
}

/// 退化值总是排在最后，其余按指标排序，相同时按键升序
fn by_metric(a: &Group, b: &Group, descending: bool) -> Ordering {
    let degenerate = a.metrics.is_degenerate().cmp(&b.metrics.is_degenerate());
    if degenerate != Ordering::Equal {
        return degenerate;
    }
    let metric = if descending {
        b.metrics.compare(&a.metrics)
    } else {
        a.metrics.compare(&b.metrics)
    };
    metric.then_with(|| a.key.cmp(&b.key))
}

/// 堆元素：越差越大，堆顶即当前最差者
struct Ranked {
    group: Group,
    selection: LevelSelection,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.selection.compare(&self.group, &other.group)
    }
}

/// 整形后的聚合结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResultTree {
    pub summary: Group,
}

impl AggregationResultTree {
    /// 参与聚合的文档总数
    pub fn doc_count(&self) -> u64 {
        self.summary.doc_count
    }

    /// 总计指标
    pub fn total(&self) -> &MetricValueSet {
        &self.summary.metrics
    }

    pub fn groups(&self) -> &[Group] {
        &self.summary.children
    }

    pub fn to_json(&self) -> DBResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct ResultShaper {
    levels: Vec<LevelSelection>,
    flat_limit: Option<usize>,
    all_label: String,
}

impl ResultShaper {
    pub fn new(levels: Vec<LevelSelection>, flat_limit: Option<usize>, all_label: impl Into<String>) -> Self {
        Self {
            levels,
            flat_limit,
            all_label: all_label.into(),
        }
    }

    pub fn for_request(request: &AggregationRequest, config: &Config) -> Self {
        Self::new(
            request.levels().iter().map(LevelSelection::from_spec).collect(),
            request.flat_limit,
            config.all_group_label.as_str(),
        )
    }

    /// 整形并包装根节点
    ///
    /// 没有分组层级时输出单个 "*" 分组
    pub fn build(&self, mut root: Group) -> AggregationResultTree {
        if self.levels.is_empty() {
            let all = Group {
                key: GroupKey::text(self.all_label.as_str()),
                doc_count: root.doc_count,
                metrics: root.metrics.clone(),
                children: Vec::new(),
            };
            root.children = vec![all];
        } else {
            let children = std::mem::take(&mut root.children);
            root.children = self.shape(children, 0);
            if let Some(limit) = self.flat_limit {
                flatten(&mut root.children, limit);
            }
        }
        AggregationResultTree { summary: root }
    }

    fn shape(&self, groups: Vec<Group>, level: usize) -> Vec<Group> {
        let Some(selection) = self.levels.get(level) else {
            return groups;
        };
        let mut selected = selection.select(groups);
        for group in &mut selected {
            let children = std::mem::take(&mut group.children);
            group.children = self.shape(children, level + 1);
        }
        selected
    }
}

/// 按顶层顺序累计二级分组数，超过上限的部分截断，之后的顶层分组全部丢弃
pub fn flatten(groups: &mut Vec<Group>, limit: usize) {
    let mut remaining = limit;
    let mut keep = 0;
    for group in groups.iter_mut() {
        if remaining == 0 {
            break;
        }
        if group.children.len() > remaining {
            group.children.truncate(remaining);
        }
        remaining -= group.children.len();
        keep += 1;
    }
    groups.truncate(keep);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::metric::MetricValue;

    fn counted(name: &str, count: u64) -> Group {
        let mut group = Group::new(
            GroupKey::text(name),
            MetricValueSet::from_values(vec![MetricValue::Count(count)]),
        );
        group.doc_count = count;
        group
    }

    fn averaged(name: &str, avg: Option<f64>) -> Group {
        let value = match avg {
            Some(v) => MetricValue::Avg { sum: v, count: 1 },
            None => MetricValue::Avg { sum: 0.0, count: 0 },
        };
        Group::new(GroupKey::text(name), MetricValueSet::from_values(vec![value]))
    }

    fn names(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.key.display()).collect()
    }

    /// g0..g9，计数互不相同且与键序无关
    fn ten() -> Vec<Group> {
        [3, 9, 1, 7, 5, 8, 2, 6, 4, 0]
            .iter()
            .enumerate()
            .map(|(i, &c)| counted(&format!("g{}", i), c))
            .collect()
    }

    #[test]
    fn test_top_n_equals_prefix_of_full_sort() {
        let full = LevelSelection::new(Selection::Top, 0).select(ten());
        let counts: Vec<u64> = full.iter().map(|g| g.doc_count).collect();
        assert_eq!(counts, vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);

        let top3 = LevelSelection::new(Selection::Top, 3).select(ten());
        assert_eq!(names(&top3), names(&full[..3]));
        assert_eq!(names(&top3), vec!["g1", "g5", "g3"]);

        let all = LevelSelection::new(Selection::Top, 10).select(ten());
        assert_eq!(names(&all), names(&full));
    }

    #[test]
    fn test_bottom_and_ties_break_by_key() {
        let groups = vec![counted("b", 1), counted("a", 1), counted("c", 5)];
        let bottom = LevelSelection::new(Selection::Bottom, 2).select(groups.clone());
        assert_eq!(names(&bottom), vec!["a", "b"]);
        let top = LevelSelection::new(Selection::Top, 0).select(groups);
        assert_eq!(names(&top), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_degenerate_always_last() {
        let groups = || vec![averaged("x", None), averaged("y", Some(-5.0)), averaged("z", Some(3.0))];
        let top = LevelSelection::new(Selection::Top, 0).select(groups());
        assert_eq!(names(&top), vec!["z", "y", "x"]);
        let bottom = LevelSelection::new(Selection::Bottom, 0).select(groups());
        assert_eq!(names(&bottom), vec!["y", "z", "x"]);
        let bottom2 = LevelSelection::new(Selection::Bottom, 2).select(groups());
        assert_eq!(names(&bottom2), vec!["y", "z"]);
    }

    #[test]
    fn test_key_ordered_selections() {
        let first = LevelSelection::new(Selection::First, 2).select(ten());
        assert_eq!(names(&first), vec!["g0", "g1"]);
        let last = LevelSelection::new(Selection::Last, 2).select(ten());
        assert_eq!(names(&last), vec!["g9", "g8"]);
        let none = LevelSelection::new(Selection::None, 2).select(ten());
        assert_eq!(none.len(), 10);
    }

    #[test]
    fn test_flatten_truncates_last_kept_group() {
        let parent = |name: &str| {
            let children = (0..4).map(|i| counted(&format!("{}{}", name, i), 1)).collect();
            counted(name, 4).with_children(children)
        };
        let mut groups = vec![parent("a"), parent("b"), parent("c"), parent("d")];
        flatten(&mut groups, 10);
        assert_eq!(names(&groups), vec!["a", "b", "c"]);
        let sizes: Vec<usize> = groups.iter().map(|g| g.children.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_build_without_levels_emits_all_group() {
        let shaper = ResultShaper::new(Vec::new(), None, "*");
        let tree = shaper.build(counted("*", 5));
        assert_eq!(tree.doc_count(), 5);
        assert_eq!(names(tree.groups()), vec!["*"]);
        assert_eq!(tree.groups()[0].doc_count, 5);
    }

    #[test]
    fn test_build_recurses_per_level() {
        let child = |name: &str, c: u64| counted(name, c);
        let root = counted("*", 6).with_children(vec![
            counted("a", 3).with_children(vec![child("x", 1), child("y", 2)]),
            counted("b", 3).with_children(vec![child("x", 3)]),
        ]);
        let shaper = ResultShaper::new(
            vec![
                LevelSelection::new(Selection::Last, 0),
                LevelSelection::new(Selection::Top, 1),
            ],
            None,
            "*",
        );
        let tree = shaper.build(root);
        assert_eq!(names(tree.groups()), vec!["b", "a"]);
        assert_eq!(names(&tree.groups()[1].children), vec!["y"]);

        let json = tree.to_json().expect("json");
        assert!(json.contains("\"key\":\"b\""));
    }
}
