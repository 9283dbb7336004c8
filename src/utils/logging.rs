//! 日志工具模块
//!
//! 提供日志初始化和批处理日志输出的辅助函数

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{BatchRequest, BatchResult};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则根据 `verbose` 选择 info / debug
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "refill=debug,tower_http=debug"
    } else {
        "refill=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文档填充服务");
    info!("🌐 监听地址: {}:{}", config.host, config.port);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📊 最大并发数: {}", config.max_concurrent_fills);
    info!("⏱️ 单文件超时: {}s", config.fill_timeout_secs);
    if !config.admin_key.is_empty() {
        info!("🔑 已启用管理员令牌");
    }
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_batch_start(request: &BatchRequest, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始处理批次 {}", request);
    info!("📋 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch: &BatchResult, total: usize, elapsed: Duration) {
    info!("{}", "─".repeat(60));
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 成功: {}/{}", batch.succeeded(), total);
    info!("❌ 失败: {}", batch.failed());
    info!("⏱️ 总耗时: {:?}", elapsed);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
