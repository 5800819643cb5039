use std::collections::HashSet;

use regex::Regex;

use super::{Group, GroupKey};
use crate::core::error::{DBError, DBResult};

const TOKEN_PATTERN: &str = r"[\p{L}\p{N}]+";

/// 按词拆分分组展示名
///
/// 每个词得到原分组完整指标与子树的一份拷贝，空组原样保留
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    stop_words: HashSet<String>,
}

impl Tokenizer {
    pub fn new<'a, I>(stop_words: I) -> DBResult<Self>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let pattern = Regex::new(TOKEN_PATTERN)
            .map_err(|e| DBError::Internal(format!("分词正则编译失败: {}", e)))?;
        Ok(Self {
            pattern,
            stop_words: stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
        })
    }

    /// 一个名称中重复出现的词只计一次
    pub fn tokens<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut seen = HashSet::new();
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|token| {
                let lower = token.to_lowercase();
                !self.stop_words.contains(&lower) && seen.insert(lower)
            })
            .collect()
    }

    pub fn split(&self, groups: Vec<Group>) -> Vec<Group> {
        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            if group.key.is_null() {
                out.push(group);
                continue;
            }
            for token in self.tokens(group.key.display()) {
                let mut copy = group.clone();
                copy.key = GroupKey::text(token);
                out.push(copy);
            }
        }
        out
    }
}
