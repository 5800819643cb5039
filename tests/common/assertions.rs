//! 分组结果断言辅助

use pivotdb::query::{AggregationResultTree, Group};

/// 子分组的 (展示名, 文档数) 列表
pub fn group_counts(groups: &[Group]) -> Vec<(String, u64)> {
    groups
        .iter()
        .map(|g| (g.key.display().to_string(), g.doc_count))
        .collect()
}

/// 断言顶层分组与期望完全一致（含顺序）
pub fn assert_groups(tree: &AggregationResultTree, expected: &[(&str, u64)]) {
    let actual = group_counts(tree.groups());
    let expected: Vec<(String, u64)> = expected.iter().map(|(n, c)| (n.to_string(), *c)).collect();
    assert_eq!(actual, expected, "顶层分组不匹配");
}

/// 按展示名查找顶层分组
pub fn find_group<'a>(tree: &'a AggregationResultTree, display: &str) -> &'a Group {
    tree.groups()
        .iter()
        .find(|g| g.key.display() == display)
        .unwrap_or_else(|| panic!("缺少分组 '{}'", display))
}

/// 第一个指标的值
pub fn primary(group: &Group) -> f64 {
    group.metrics.primary().expect("指标应有值")
}

/// 递归统计叶子节点第一个指标之和
pub fn leaf_metric_sum(group: &Group) -> f64 {
    if group.children.is_empty() {
        return group.metrics.primary().unwrap_or(0.0);
    }
    group.children.iter().map(leaf_metric_sum).sum()
}
