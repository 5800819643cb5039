use super::encoding::{decode_double, decode_float, encode_double_bits, encode_float_bits, EncodedKey};
use super::{CollectContext, KeyCollector, KeySet};
use crate::core::error::{DBError, DBResult};
use crate::core::DocId;
use crate::query::executor::group_tree::GroupKey;
use crate::storage::ShardSearcher;

/// 标量字段的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    /// integer 与 long 共用
    Long,
    Float,
    Double,
}

/// 布尔、整数、浮点字段收集器
///
/// 多值字段每个存储值产生一个键，单值字段只取第一个值
#[derive(Debug)]
pub struct ScalarCollector {
    field: String,
    kind: ScalarKind,
    multi_valued: bool,
    true_label: String,
    false_label: String,
}

impl ScalarCollector {
    pub fn new(field: impl Into<String>, kind: ScalarKind, multi_valued: bool) -> Self {
        Self {
            field: field.into(),
            kind,
            multi_valued,
            true_label: "true".to_string(),
            false_label: "false".to_string(),
        }
    }

    pub fn with_bool_labels(mut self, true_label: impl Into<String>, false_label: impl Into<String>) -> Self {
        self.true_label = true_label.into();
        self.false_label = false_label.into();
        self
    }

    fn encode(&self, raw: i64) -> EncodedKey {
        match self.kind {
            ScalarKind::Boolean => i64::from(raw != 0),
            ScalarKind::Long => raw,
            ScalarKind::Float => encode_float_bits(raw as u32),
            ScalarKind::Double => encode_double_bits(raw as u64),
        }
    }
}

impl KeyCollector for ScalarCollector {
    fn collect(&self, ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        let values = ctx.read_values(&self.field, doc)?;
        let take = if self.multi_valued { values.len() } else { 1 };
        for &raw in values.iter().take(take) {
            out.insert(self.encode(raw));
        }
        ctx.release_values(values);
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let display = match self.kind {
            ScalarKind::Boolean if key == 0 => self.false_label.clone(),
            ScalarKind::Boolean => self.true_label.clone(),
            ScalarKind::Long => key.to_string(),
            ScalarKind::Float => decode_float(key).to_string(),
            ScalarKind::Double => decode_double(key).to_string(),
        };
        Ok(GroupKey::numeric(display, key))
    }

    fn collect_empty_groups(&self, out: &mut KeySet) {
        if self.kind == ScalarKind::Boolean {
            out.insert(0);
            out.insert(1);
        }
    }
}

/// 按到达的对象本身分组，键为文档序号
///
/// 跨分片合并依赖对象标签，因此规范键为标签文本，区分大小写
#[derive(Debug, Default)]
pub struct IdCollector;

impl KeyCollector for IdCollector {
    fn collect(&self, _ctx: &mut CollectContext<'_>, doc: DocId, out: &mut KeySet) -> DBResult<()> {
        out.insert(i64::from(doc));
        Ok(())
    }

    fn resolve(&self, searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        let doc = DocId::try_from(key)
            .map_err(|_| DBError::Internal(format!("无效的对象键: {}", key)))?;
        Ok(GroupKey::exact(searcher.object_label(doc)?))
    }

    fn requires_ordering(&self) -> bool {
        true
    }
}

/// 所有文档归入同一组
#[derive(Debug)]
pub struct NullCollector {
    label: String,
}

impl NullCollector {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl KeyCollector for NullCollector {
    fn collect(&self, _ctx: &mut CollectContext<'_>, _doc: DocId, out: &mut KeySet) -> DBResult<()> {
        out.insert(0);
        Ok(())
    }

    fn resolve(&self, _searcher: &dyn ShardSearcher, key: EncodedKey) -> DBResult<GroupKey> {
        Ok(GroupKey::numeric(self.label.as_str(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldInfo, FieldType};
    use crate::storage::MemoryShard;

    fn shard() -> MemoryShard {
        let mut shard = MemoryShard::new(0);
        shard
            .define_field("flag", FieldInfo::single(FieldType::Boolean))
            .define_field("tags", FieldInfo::multi(FieldType::Long))
            .define_field("ratio", FieldInfo::single(FieldType::Float));
        let d = shard.add_doc("d0");
        shard.set_bools(d, "flag", &[true]).expect("set");
        shard.set_longs(d, "tags", &[7, 3, 7]).expect("set");
        shard.set_floats(d, "ratio", &[-0.5, 2.0]).expect("set");
        shard
    }

    #[test]
    fn test_boolean_collect_and_resolve() {
        let shard = shard();
        let mut ctx = CollectContext::new(&shard);
        let collector = ScalarCollector::new("flag", ScalarKind::Boolean, false)
            .with_bool_labels("yes", "no");
        let mut out = KeySet::new();
        collector.collect(&mut ctx, 0, &mut out).expect("collect");
        assert_eq!(out.as_slice(), &[1]);
        assert_eq!(collector.resolve(&shard, 1).expect("resolve").display(), "yes");
        assert_eq!(collector.resolve(&shard, 0).expect("resolve").display(), "no");

        let mut empty = KeySet::new();
        collector.collect_empty_groups(&mut empty);
        assert_eq!(empty.as_slice(), &[0, 1]);
    }

    #[test]
    fn test_multi_valued_emits_each_value_once() {
        let shard = shard();
        let mut ctx = CollectContext::new(&shard);
        let mut out = KeySet::new();
        ScalarCollector::new("tags", ScalarKind::Long, true)
            .collect(&mut ctx, 0, &mut out)
            .expect("collect");
        assert_eq!(out.as_slice(), &[7, 3]);

        out.clear();
        ScalarCollector::new("tags", ScalarKind::Long, false)
            .collect(&mut ctx, 0, &mut out)
            .expect("collect");
        assert_eq!(out.as_slice(), &[7]);
    }

    #[test]
    fn test_float_keys_are_ordered() {
        let shard = shard();
        let mut ctx = CollectContext::new(&shard);
        let collector = ScalarCollector::new("ratio", ScalarKind::Float, true);
        let mut out = KeySet::new();
        collector.collect(&mut ctx, 0, &mut out).expect("collect");
        let keys = out.as_slice().to_vec();
        assert!(keys[0] < keys[1]);
        assert_eq!(collector.resolve(&shard, keys[0]).expect("resolve").display(), "-0.5");
    }

    #[test]
    fn test_id_collector_uses_object_label() {
        let shard = shard();
        let mut ctx = CollectContext::new(&shard);
        let mut out = KeySet::new();
        IdCollector.collect(&mut ctx, 0, &mut out).expect("collect");
        assert_eq!(out.as_slice(), &[0]);
        assert_eq!(IdCollector.resolve(&shard, 0).expect("resolve"), GroupKey::exact("d0"));
        assert!(IdCollector.requires_ordering());
    }

    #[test]
    fn test_id_labels_differing_by_case_stay_apart() {
        let mut shard = MemoryShard::new(0);
        let upper = shard.add_doc("ABC");
        let lower = shard.add_doc("abc");
        let a = IdCollector.resolve(&shard, i64::from(upper)).expect("resolve");
        let b = IdCollector.resolve(&shard, i64::from(lower)).expect("resolve");
        assert_ne!(a, b);
        assert_eq!(a.display(), "ABC");
        assert_eq!(b.display(), "abc");
    }
}
