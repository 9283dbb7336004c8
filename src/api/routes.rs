//! 路由与处理函数

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::future::try_join_all;
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::upload::read_refill_form;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{BatchRequest, ResponseFormat};
use crate::orchestrator::BatchProcessor;
use crate::services::TextExtractor;

/// 路由共享状态
pub struct AppState {
    pub processor: BatchProcessor,
    pub extractor: TextExtractor,
    pub max_file_size: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefillParams {
    #[serde(default)]
    pub format: ResponseFormat,
}

/// 构建路由
pub fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/refill", post(handle_refill))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_request_size))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

async fn health_check() -> Json<&'static str> {
    Json("ok")
}

/// `POST /refill`
///
/// 上传、类型检查和文本提取的错误会中止整个请求；
/// 单个文件的填充错误包含在结果中。
async fn handle_refill(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RefillParams>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_refill_form(multipart, state.max_file_size).await?;
    info!("收到填充请求: {} 个文件, {} 个字段", form.files.len(), form.keys.len());

    // 没有密钥时不提取任何文件
    if form.credential.is_empty() {
        return Err(AppError::MissingCredential.into());
    }

    let files = try_join_all(
        form.files
            .into_iter()
            .map(|raw| state.extractor.extract(raw.filename, raw.bytes)),
    )
    .await?;

    let request = BatchRequest::new(form.credential)
        .with_keys(form.keys)
        .with_files(files)
        .with_instructions(form.instructions);

    let batch = state.processor.run_batch_results(request).await?;
    let body = batch
        .to_json(params.format)
        .map_err(|e| ApiError(e.into()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}
