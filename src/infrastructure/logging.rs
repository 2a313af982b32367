//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和日志轮转

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_FILE: &str = "tokenpay.log";

/// 初始化日志系统
///
/// 开启文件日志时返回 `WorkerGuard`，调用方需持有到进程退出，否则缓冲的日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    // 设置日志级别过滤器
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level: {}", config.level))?,
    };

    let (file_writer, guard) = if config.enable_file_logging {
        let (dir, file) = log_file_target(config.log_file_path.as_deref());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let (writer, guard) = non_blocking(rolling::daily(dir, file));
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    // 根据配置选择日志格式
    if config.format == "json" {
        let file_layer = file_writer.map(|w| {
            fmt::layer()
                .json()
                .with_writer(w)
                .with_timer(ChronoUtc::rfc_3339())
        });

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()
            .context("Failed to install JSON logger")?;
    } else {
        let file_layer = file_writer.map(|w| {
            fmt::layer()
                .with_writer(w)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
        });

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init()
            .context("Failed to install text logger")?;
    }

    Ok(guard)
}

/// 简化初始化（使用默认配置）
pub fn init_default_logging() -> Option<WorkerGuard> {
    let config = LoggingConfig::default();
    init_logging(&config).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logging: {:#}", e);
        // 回退到最基本的日志初始化
        let _ = tracing_subscriber::fmt::try_init();
        None
    })
}

/// 日志文件路径拆成 (目录, 文件名前缀)
fn log_file_target(path: Option<&str>) -> (PathBuf, String) {
    let Some(path) = path.map(Path::new) else {
        return (PathBuf::from(DEFAULT_LOG_DIR), DEFAULT_LOG_FILE.to_string());
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

    (dir, file)
}
