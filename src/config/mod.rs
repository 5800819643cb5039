use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::core::error::{DBError, DBResult};

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "pivotdb".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

/// 聚合引擎配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 工作线程数，0 表示顺序执行各分片
    pub worker_threads: usize,
    /// 段被并发替换后的额外重试次数
    pub shard_retry_attempts: u32,
    /// 重试前等待的毫秒数
    pub shard_retry_delay_ms: u64,
    /// 未指定深度时传递关系遍历的最大深度
    pub max_transitive_depth: u32,
    pub null_group_label: String,
    pub all_group_label: String,
    pub true_label: String,
    pub false_label: String,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            shard_retry_attempts: 1,
            shard_retry_delay_ms: 0,
            max_transitive_depth: 1000,
            null_group_label: String::new(),
            all_group_label: "*".to_string(),
            true_label: "true".to_string(),
            false_label: "false".to_string(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 顺序执行配置，不创建线程池
    pub fn sequential() -> Self {
        Self {
            worker_threads: 0,
            ..Self::default()
        }
    }

    /// 按 `worker_threads` 构建共享线程池
    ///
    /// `worker_threads == 0` 时返回 `None`，调用方按顺序执行
    pub fn build_thread_pool(&self) -> DBResult<Option<Arc<rayon::ThreadPool>>> {
        if self.worker_threads == 0 {
            return Ok(None);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("pivot-worker-{}", i))
            .build()
            .map_err(|e| DBError::Internal(format!("线程池创建失败: {}", e)))?;
        Ok(Some(Arc::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.shard_retry_attempts, 1);
        assert_eq!(config.shard_retry_delay_ms, 0);
        assert_eq!(config.all_group_label, "*");
        assert!(config.null_group_label.is_empty());
    }

    #[test]
    fn test_config_load_save() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let mut config = Config::default();
        config.worker_threads = 3;
        config.true_label = "yes".to_string();
        config
            .save(temp_file.path())
            .expect("Failed to save config to temporary file");

        let loaded_config =
            Config::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(loaded_config.worker_threads, 3);
        assert_eq!(loaded_config.true_label, "yes");
        assert_eq!(loaded_config.log.file, config.log.file);
    }

    #[test]
    fn test_config_load_written_toml() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"shard_retry_delay_ms = 25\nfalse_label = \"no\"\n")
            .expect("Failed to write TOML content to temporary file");

        let loaded_config =
            Config::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(loaded_config.shard_retry_delay_ms, 25);
        assert_eq!(loaded_config.false_label, "no");
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("worker_threads = 0\n").expect("parse partial config");
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.max_transitive_depth, 1000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_sequential_config_has_no_pool() {
        let pool = Config::sequential()
            .build_thread_pool()
            .expect("sequential config should not fail");
        assert!(pool.is_none());
    }

    #[test]
    fn test_build_thread_pool() {
        let mut config = Config::default();
        config.worker_threads = 2;
        let pool = config
            .build_thread_pool()
            .expect("pool should build")
            .expect("pool should exist");
        assert_eq!(pool.current_num_threads(), 2);
    }
}
