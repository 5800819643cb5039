// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::Config;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use parking_lot::Mutex;

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

/// 初始化日志系统
///
/// # Arguments
/// * `config` - 引擎配置，包含日志相关参数
pub fn init(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let handle = Logger::try_with_str(&config.log.level)?
        .log_to_file(
            FileSpec::default()
                .basename(&config.log.file)
                .directory(&config.log.dir),
        )
        .rotate(
            Criterion::Size(config.log.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.log.max_files),
        )
        .write_mode(WriteMode::Async)
        .append()
        .start()?;

    *LOGGER_HANDLE.lock() = Some(handle);

    log::info!("日志系统初始化完成: {}/{}", config.log.dir, config.log.file);
    Ok(())
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件
pub fn shutdown() {
    if let Some(handle) = LOGGER_HANDLE.lock().take() {
        handle.flush();
    }
}

/// 检查日志系统是否已初始化
pub fn is_initialized() -> bool {
    LOGGER_HANDLE.lock().is_some()
}
