//! API 模块
//!
//! 负责 HTTP 接入：multipart 解析、文件类型检查、错误响应

pub mod error;
pub mod routes;
pub mod upload;

pub use error::ApiError;
pub use routes::{build_router, AppState};
