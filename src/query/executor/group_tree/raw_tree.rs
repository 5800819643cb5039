//! 未解析的分组树
//!
//! 扫描阶段只处理 `EncodedKey`，子节点按键有序存放，名称解析推迟到物化阶段

use std::collections::BTreeMap;

use crate::query::executor::collector::{EncodedKey, KeySet};
use crate::query::metric::MetricValueSet;

/// 子节点键，`None` 为保留空组
pub type RawKey = Option<EncodedKey>;

#[derive(Debug, Clone)]
pub struct RawNode {
    pub doc_count: u64,
    pub metrics: MetricValueSet,
    pub children: BTreeMap<RawKey, RawNode>,
}

impl RawNode {
    pub fn new(metrics: MetricValueSet) -> Self {
        Self {
            doc_count: 0,
            metrics,
            children: BTreeMap::new(),
        }
    }

    fn add(&mut self, contribution: &MetricValueSet) {
        self.doc_count += 1;
        self.metrics.merge(contribution);
    }
}

/// 单个 Part 在单个分片上的建树器
#[derive(Debug)]
pub struct RawTreeBuilder {
    root: RawNode,
    zero: MetricValueSet,
}

impl RawTreeBuilder {
    pub fn new(zero: MetricValueSet) -> Self {
        Self {
            root: RawNode::new(zero.clone()),
            zero,
        }
    }

    /// 预置顶层的空组，零文档
    pub fn seed_empty_groups(&mut self, keys: &KeySet) {
        for key in keys.raw_keys() {
            let zero = &self.zero;
            self.root
                .children
                .entry(key)
                .or_insert_with(|| RawNode::new(zero.clone()));
        }
    }

    /// 将文档贡献加到各层键集合的笛卡尔积中的每个节点
    ///
    /// 某层键集合为空时，文档不进入该层及以下的子树
    pub fn add_document(&mut self, levels: &[KeySet], contribution: &MetricValueSet) {
        self.root.add(contribution);
        fan_out(&mut self.root, levels, contribution, &self.zero);
    }

    pub fn root(&self) -> &RawNode {
        &self.root
    }

    pub fn finish(self) -> RawNode {
        self.root
    }
}

fn fan_out(node: &mut RawNode, levels: &[KeySet], contribution: &MetricValueSet, zero: &MetricValueSet) {
    let Some((keys, rest)) = levels.split_first() else {
        return;
    };
    for key in keys.raw_keys() {
        let child = node
            .children
            .entry(key)
            .or_insert_with(|| RawNode::new(zero.clone()));
        child.add(contribution);
        fan_out(child, rest, contribution, zero);
    }
}
