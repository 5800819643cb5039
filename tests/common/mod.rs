//! 集成测试共享工具模块
//!
//! 提供内存分片构造与结果断言，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;
pub mod data_fixtures;

use pivotdb::config::Config;
use pivotdb::query::AppContext;

/// 顺序执行的测试上下文
pub fn sequential_context() -> AppContext {
    AppContext::sequential(Config::sequential())
}

/// 带线程池的测试上下文
pub fn pooled_context(threads: usize) -> AppContext {
    let mut config = Config::default();
    config.worker_threads = threads;
    AppContext::new(config).expect("创建线程池失败")
}
