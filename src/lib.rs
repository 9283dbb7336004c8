//! # Refill
//!
//! 上传文档（纯文本或 PDF），由 LLM 按照指定字段把每个文档的内容填入 JSON 模板，
//! 返回填充后的 JSON 数组。
//!
//! ## 架构设计
//!
//! ### ① 能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件
//! - `build_skeleton` - 字段名 → JSON 骨架
//! - `LlmService` - 实现 `Filler`，调用 Chat Completion 填充骨架
//! - `TextExtractor` / `PdfService` - 文件类型判断与文本提取
//!
//! ### ② 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批处理器，并发派发、汇总结果
//!
//! ### ③ 接入层（API）
//! - `api/` - axum 路由，multipart 解析，错误响应
//! - `app` - 应用生命周期
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::{AdminOverride, Config};
pub use error::{AppError, AppResult, FillError, UploadError};
pub use models::{BatchRequest, BatchResult, FillResult, ResponseFormat, UploadedFile};
pub use orchestrator::BatchProcessor;
pub use services::{build_skeleton, Filler, LlmService};
