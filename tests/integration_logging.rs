//! 日志与配置集成测试
//!
//! 测试范围:
//! - 配置文件加载
//! - 日志文件创建与写入

mod common;

use std::fs;

use common::data_fixtures::flag_shard;
use pivotdb::config::Config;
use pivotdb::query::{aggregate, AggregationPart, AggregationRequest, AppContext, GroupingLevelSpec, MetricSpec};
use pivotdb::storage::MemoryColumnStore;
use pivotdb::utils::logging;

#[test]
fn test_config_file_drives_engine() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("pivotdb.toml");
    fs::write(
        &path,
        r#"
worker_threads = 0
true_label = "yes"
false_label = "no"

[log]
level = "debug"
"#,
    )
    .expect("写入配置失败");

    let config = Config::load(&path).expect("加载配置失败");
    assert_eq!(config.worker_threads, 0);
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.shard_retry_attempts, 1);

    let store = MemoryColumnStore::new();
    store.add_shard(flag_shard(0, &[true, false, false]));
    let ctx = AppContext::new(config).expect("创建上下文失败");
    assert!(ctx.pool.is_none());

    let request = AggregationRequest::new(
        AggregationPart::new(vec![GroupingLevelSpec::field("flag")], vec![MetricSpec::Count]),
        vec![0],
    );
    let tree = aggregate(&store, &ctx, &request).expect("聚合失败");
    let labels: Vec<&str> = tree.groups().iter().map(|g| g.key.display()).collect();
    assert_eq!(labels, vec!["no", "yes"]);
}

#[test]
fn test_logging_writes_file() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let mut config = Config::sequential();
    config.log.dir = dir.path().to_string_lossy().into_owned();
    config.log.file = "integration".to_string();

    logging::init(&config).expect("日志初始化失败");
    assert!(logging::is_initialized());

    let store = MemoryColumnStore::new();
    store.add_shard(flag_shard(0, &[true]));
    let request = AggregationRequest::new(
        AggregationPart::new(vec![GroupingLevelSpec::field("flag")], vec![MetricSpec::Count]),
        vec![0],
    );
    aggregate(&store, &AppContext::sequential(config), &request).expect("聚合失败");

    logging::shutdown();
    assert!(!logging::is_initialized());

    let written = fs::read_dir(dir.path())
        .expect("读取日志目录失败")
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with("integration"));
    assert!(written, "应生成日志文件");
}
