//! 字段收集器
//!
//! 每个分组层级的字段链编译为一个收集器，将文档序号转换为一个或多个
//! `EncodedKey`，并能把键反解析为 `GroupKey`。收集器按组合方式包装：
//! `Filtered(Link(Text))` 表示先过滤、再经关系跳转、最后按文本分组。

pub mod batch;
pub mod bucket;
pub mod date;
pub mod encoding;
pub mod factory;
pub mod filtered;
pub mod key_set;
pub mod link;
pub mod scalar;
pub mod text;

pub use batch::BatchCollector;
pub use bucket::PredicateBucketCollector;
pub use date::{DateCollector, DateSubFieldCollector};
pub use encoding::EncodedKey;
pub use factory::CollectorFactory;
pub use filtered::FilteredCollector;
pub use key_set::KeySet;
pub use link::{LinkCollector, TransitiveLinkCollector};
pub use scalar::{IdCollector, NullCollector, ScalarCollector, ScalarKind};
pub use text::TextCollector;

use crate::core::error::DBResult;
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::ShardSearcher;
use crate::utils::ObjectPool;

/// 单个分片扫描的收集上下文
///
/// 持有只读搜索器与可复用的临时缓冲区
pub struct CollectContext<'a> {
    searcher: &'a dyn ShardSearcher,
    values: ObjectPool<Vec<i64>>,
    key_sets: ObjectPool<KeySet>,
}

impl<'a> CollectContext<'a> {
    pub fn new(searcher: &'a dyn ShardSearcher) -> Self {
        Self {
            searcher,
            values: ObjectPool::default(),
            key_sets: ObjectPool::default(),
        }
    }

    pub fn searcher(&self) -> &'a dyn ShardSearcher {
        self.searcher
    }

    /// 读取字段原始值到池化缓冲区，用完后调用 `release_values`
    pub fn read_values(&mut self, field: &str, doc: DocId) -> DBResult<Vec<i64>> {
        let mut buf = self.values.acquire();
        self.searcher.read_values(field, doc, &mut buf)?;
        Ok(buf)
    }

    pub fn release_values(&mut self, buf: Vec<i64>) {
        self.values.release(buf);
    }

    pub fn acquire_keys(&mut self) -> KeySet {
        self.key_sets.acquire()
    }

    pub fn release_keys(&mut self, keys: KeySet) {
        self.key_sets.release(keys);
    }
}

/// 收集器公共契约
pub trait KeyCollector {
    /// 将文档的零个或多个键追加到 `out`
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()>;

    /// 键 -> 展示标识
    fn resolve(&self, searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey>;

    /// 预注册即使没有匹配文档也必须出现的键
    fn collect_empty_groups(&self, _out: &mut KeySet) {}

    /// 解析后的顺序可能与键顺序不同，物化后需重新排序
    fn requires_ordering(&self) -> bool {
        false
    }
}

/// 收集器变体的封闭集合
#[derive(Debug)]
pub enum FieldCollector {
    Null(NullCollector),
    Scalar(ScalarCollector),
    Date(DateCollector),
    DateSubField(DateSubFieldCollector),
    NumBatch(BatchCollector),
    Text(TextCollector),
    Id(IdCollector),
    Link(LinkCollector),
    TransitiveLink(TransitiveLinkCollector),
    PredicateBucket(PredicateBucketCollector),
    Filtered(FilteredCollector),
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $body:expr) => {
        match $self {
            FieldCollector::Null($c) => $body,
            FieldCollector::Scalar($c) => $body,
            FieldCollector::Date($c) => $body,
            FieldCollector::DateSubField($c) => $body,
            FieldCollector::NumBatch($c) => $body,
            FieldCollector::Text($c) => $body,
            FieldCollector::Id($c) => $body,
            FieldCollector::Link($c) => $body,
            FieldCollector::TransitiveLink($c) => $body,
            FieldCollector::PredicateBucket($c) => $body,
            FieldCollector::Filtered($c) => $body,
        }
    };
}

impl KeyCollector for FieldCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        dispatch!(self, c => c.collect(ctx, doc, out))
    }

    fn resolve(&self, searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        dispatch!(self, c => c.resolve(searcher, key))
    }

    fn collect_empty_groups(&self, out: &mut KeySet) {
        dispatch!(self, c => c.collect_empty_groups(out))
    }

    fn requires_ordering(&self) -> bool {
        dispatch!(self, c => c.requires_ordering())
    }
}

/// 一个分组层级的完整收集器
///
/// 在字段收集器之上处理保留空组：文档在该层无值且空组已预注册时，归入空组
#[derive(Debug)]
pub struct LevelCollector {
    collector: FieldCollector,
    empty_groups: KeySet,
    null_label: String,
}

impl LevelCollector {
    pub fn new(collector: FieldCollector, include_missing: bool, null_label: impl Into<String>) -> Self {
        let mut empty_groups = KeySet::new();
        collector.collect_empty_groups(&mut empty_groups);
        if include_missing {
            empty_groups.mark_missing();
        }
        Self {
            collector,
            empty_groups,
            null_label: null_label.into(),
        }
    }

    pub fn collector(&self) -> &FieldCollector {
        &self.collector
    }

    /// 追加键，不做空组回退
    pub fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        self.collector.collect(ctx, doc, out)
    }

    /// 该层收集完毕后调用
    pub fn finish(&self, out: &mut KeySet) {
        if out.is_empty() && self.empty_groups.is_missing() {
            out.mark_missing();
        }
    }

    /// `None` 为保留空组
    pub fn resolve(&self, searcher: &dyn ShardSearcher, key: Option<EncodedKey>) -> DBResult<GroupKey> {
        match key {
            None => Ok(GroupKey::null(self.null_label.as_str())),
            Some(key) => self.collector.resolve(searcher, key),
        }
    }

    pub fn empty_groups(&self) -> &KeySet {
        &self.empty_groups
    }

    pub fn requires_ordering(&self) -> bool {
        self.collector.requires_ordering()
    }
}
