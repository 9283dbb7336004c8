//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 负责一个批次内所有文件的并发调度和结果汇总。
//!
//! ## 层次关系
//!
//! ```text
//! api (multipart → BatchRequest)
//!     ↓
//! orchestrator::batch_processor (处理 Vec<UploadedFile>)
//!     ↓
//! services (能力层：template / llm / text_extractor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **只做调度**：不构造提示词，不关心 HTTP
//! 2. **失败降级**：单个文件的错误作为数据返回
//! 3. **向下依赖**：编排层 → services

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
