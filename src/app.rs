use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::config::Config;
use crate::orchestrator::BatchProcessor;
use crate::services::{LlmService, TextExtractor};
use crate::utils::logging::log_startup;

/// 应用主结构
pub struct App {
    config: Config,
    router: Router,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let filler = Arc::new(LlmService::new(&config));
        let state = Arc::new(AppState {
            processor: BatchProcessor::new(filler, &config),
            extractor: TextExtractor::new(&config),
            max_file_size: config.max_file_size,
        });

        let router = build_router(state, &config);

        Ok(Self { config, router })
    }

    /// 运行 HTTP 服务，直到收到 Ctrl+C
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听地址: {}", addr))?;

        info!("✓ 服务已启动: http://{}", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP 服务异常退出")?;

        info!("服务已停止");
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("收到停止信号，正在关闭...");
}
