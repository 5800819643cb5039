//! 内存列存储
//!
//! 供测试与嵌入式场景使用，支持注入一次性的“段被替换”故障

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use roaring::RoaringBitmap;

use super::storage_client::{ColumnStore, DocSet, Query, ShardSearcher};
use crate::core::{DocId, FieldInfo, FieldType, ShardId, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct MemoryColumn {
    info: FieldInfo,
    values: Vec<Vec<i64>>,
    dictionary: Vec<String>,
    ordinals: HashMap<String, i64>,
}

impl MemoryColumn {
    fn new(info: FieldInfo) -> Self {
        Self {
            info,
            values: Vec::new(),
            dictionary: Vec::new(),
            ordinals: HashMap::new(),
        }
    }

    fn intern(&mut self, term: &str) -> i64 {
        if let Some(&ordinal) = self.ordinals.get(term) {
            return ordinal;
        }
        let ordinal = self.dictionary.len() as i64;
        self.dictionary.push(term.to_string());
        self.ordinals.insert(term.to_string(), ordinal);
        ordinal
    }
}

/// 单个内存分片
#[derive(Debug)]
pub struct MemoryShard {
    shard_id: ShardId,
    labels: Vec<String>,
    deleted: RoaringBitmap,
    columns: HashMap<String, MemoryColumn>,
    queries: HashMap<Query, RoaringBitmap>,
    pending_failures: AtomicU32,
}

impl MemoryShard {
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            labels: Vec::new(),
            deleted: RoaringBitmap::new(),
            columns: HashMap::new(),
            queries: HashMap::new(),
            pending_failures: AtomicU32::new(0),
        }
    }

    pub fn define_field(&mut self, name: &str, info: FieldInfo) -> &mut Self {
        self.columns
            .insert(name.to_string(), MemoryColumn::new(info));
        self
    }

    pub fn add_doc(&mut self, label: impl Into<String>) -> DocId {
        self.labels.push(label.into());
        (self.labels.len() - 1) as DocId
    }

    pub fn doc_count(&self) -> usize {
        self.labels.len()
    }

    pub fn delete_doc(&mut self, doc: DocId) {
        self.deleted.insert(doc);
    }

    fn column_mut(&mut self, field: &str) -> StorageResult<&mut MemoryColumn> {
        self.columns
            .get_mut(field)
            .ok_or_else(|| StorageError::UnknownField(field.to_string()))
    }

    /// 直接写入原始值
    pub fn set_raw(&mut self, doc: DocId, field: &str, values: &[i64]) -> StorageResult<()> {
        if doc as usize >= self.labels.len() {
            return Err(StorageError::Backend(format!("文档不存在: {}", doc)));
        }
        let column = self.column_mut(field)?;
        let idx = doc as usize;
        if column.values.len() <= idx {
            column.values.resize(idx + 1, Vec::new());
        }
        column.values[idx] = values.to_vec();
        Ok(())
    }

    pub fn set_bools(&mut self, doc: DocId, field: &str, values: &[bool]) -> StorageResult<()> {
        let raw: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
        self.set_raw(doc, field, &raw)
    }

    pub fn set_longs(&mut self, doc: DocId, field: &str, values: &[i64]) -> StorageResult<()> {
        self.set_raw(doc, field, values)
    }

    pub fn set_floats(&mut self, doc: DocId, field: &str, values: &[f32]) -> StorageResult<()> {
        let raw: Vec<i64> = values.iter().map(|v| i64::from(v.to_bits())).collect();
        self.set_raw(doc, field, &raw)
    }

    pub fn set_doubles(&mut self, doc: DocId, field: &str, values: &[f64]) -> StorageResult<()> {
        let raw: Vec<i64> = values.iter().map(|v| v.to_bits() as i64).collect();
        self.set_raw(doc, field, &raw)
    }

    /// 日期以 epoch 毫秒写入
    pub fn set_dates(&mut self, doc: DocId, field: &str, millis: &[i64]) -> StorageResult<()> {
        self.set_raw(doc, field, millis)
    }

    pub fn set_texts(&mut self, doc: DocId, field: &str, terms: &[&str]) -> StorageResult<()> {
        let column = self.column_mut(field)?;
        let raw: Vec<i64> = terms.iter().map(|t| column.intern(t)).collect();
        self.set_raw(doc, field, &raw)
    }

    pub fn set_links(&mut self, doc: DocId, field: &str, targets: &[DocId]) -> StorageResult<()> {
        let raw: Vec<i64> = targets.iter().map(|&t| i64::from(t)).collect();
        self.set_raw(doc, field, &raw)
    }

    /// 注册一个可被 `search` 求值的过滤条件
    pub fn define_query(&mut self, query: Query, docs: impl IntoIterator<Item = DocId>) -> &mut Self {
        self.queries.insert(query, docs.into_iter().collect());
        self
    }

    /// 接下来的 `times` 次读取返回 `SegmentReplaced`
    pub fn fail_next_reads(&self, times: u32) {
        self.pending_failures.store(times, Ordering::SeqCst);
    }

    fn check_segment(&self) -> StorageResult<()> {
        let consumed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(StorageError::SegmentReplaced {
                shard: self.shard_id,
            }),
            Err(_) => Ok(()),
        }
    }
}

impl ShardSearcher for MemoryShard {
    fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    fn live_docs(&self) -> StorageResult<DocSet> {
        self.check_segment()?;
        let mut docs: DocSet = (0..self.labels.len() as DocId).collect();
        docs -= &self.deleted;
        Ok(docs)
    }

    fn field_info(&self, field: &str) -> Option<FieldInfo> {
        self.columns.get(field).map(|c| c.info)
    }

    fn read_values(&self, field: &str, doc: DocId, out: &mut Vec<i64>) -> StorageResult<()> {
        let column = self
            .columns
            .get(field)
            .ok_or_else(|| StorageError::UnknownField(field.to_string()))?;
        if let Some(values) = column.values.get(doc as usize) {
            out.extend_from_slice(values);
        }
        Ok(())
    }

    fn dictionary_term(&self, field: &str, ordinal: i64) -> StorageResult<Option<String>> {
        let column = self
            .columns
            .get(field)
            .ok_or_else(|| StorageError::UnknownField(field.to_string()))?;
        if column.info.field_type != FieldType::Text {
            return Err(StorageError::Backend(format!("字段 {} 没有字典", field)));
        }
        Ok(usize::try_from(ordinal)
            .ok()
            .and_then(|i| column.dictionary.get(i))
            .cloned())
    }

    fn object_label(&self, doc: DocId) -> StorageResult<String> {
        self.labels
            .get(doc as usize)
            .cloned()
            .ok_or_else(|| StorageError::Backend(format!("文档不存在: {}", doc)))
    }

    fn search(&self, query: &Query) -> StorageResult<DocSet> {
        self.queries
            .get(query)
            .cloned()
            .ok_or_else(|| StorageError::Backend(format!("未注册的查询: {}", query.expression())))
    }
}

/// 内存列存储，持有多个分片
#[derive(Debug, Default)]
pub struct MemoryColumnStore {
    shards: RwLock<HashMap<ShardId, Arc<MemoryShard>>>,
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shard(&self, shard: MemoryShard) -> Arc<MemoryShard> {
        let shard = Arc::new(shard);
        self.shards.write().insert(shard.shard_id, Arc::clone(&shard));
        shard
    }

    pub fn shard(&self, shard: ShardId) -> Option<Arc<MemoryShard>> {
        self.shards.read().get(&shard).cloned()
    }

    pub fn shard_ids(&self) -> Vec<ShardId> {
        let mut ids: Vec<ShardId> = self.shards.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl ColumnStore for MemoryColumnStore {
    fn searcher(&self, shard: ShardId) -> StorageResult<Arc<dyn ShardSearcher>> {
        let shard = self.shard(shard).ok_or(StorageError::ShardNotFound(shard))?;
        Ok(shard as Arc<dyn ShardSearcher>)
    }
}
