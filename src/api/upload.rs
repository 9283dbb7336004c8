//! multipart 表单解析
//!
//! 字段：
//! - `file`：一个或多个文件
//! - `keys`：可重复的字段名
//! - `instructions`：附加说明（可选）
//! - `openai_api_key`：调用方密钥

use axum::extract::Multipart;
use tracing::debug;

use crate::error::UploadError;

/// 未经提取的原始文件
#[derive(Debug, Clone)]
pub struct RawFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 解析后的表单
#[derive(Default)]
pub struct RefillForm {
    pub files: Vec<RawFile>,
    pub keys: Vec<String>,
    pub instructions: String,
    pub credential: String,
}

/// 读取整个 multipart 表单
///
/// 单个文件超过 `max_file_size` 时直接返回错误
pub async fn read_refill_form(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<RefillForm, UploadError> {
    let mut form = RefillForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let bytes = field.bytes().await.map_err(|e| UploadError::ReadFailed {
                    filename: filename.clone(),
                    reason: e.to_string(),
                })?;

                if bytes.len() > max_file_size {
                    return Err(UploadError::FileTooLarge {
                        filename,
                        size: bytes.len(),
                        limit: max_file_size,
                    });
                }

                debug!("收到文件: {} ({} 字节)", filename, bytes.len());
                form.files.push(RawFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "keys" => form.keys.push(read_text(field).await?),
            "instructions" => form.instructions = read_text(field).await?,
            "openai_api_key" => form.credential = read_text(field).await?,
            other => debug!("忽略未知字段: {}", other),
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, UploadError> {
    field
        .text()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))
}
