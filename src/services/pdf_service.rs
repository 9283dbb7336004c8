/// PDF 文本提取服务客户端
///
/// 把 PDF 发送给独立的提取服务（`POST /extract-text`，字段 `pdf`），返回纯文本
use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

/// PDF 服务客户端
#[derive(Clone)]
pub struct PdfService {
    client: reqwest::Client,
    base_url: String,
}

impl PdfService {
    /// 创建新的 PDF 服务客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.pdf_service_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/extract-text", self.base_url)
    }

    /// 提取 PDF 文本
    ///
    /// # 参数
    /// - `pdf`: PDF 文件内容
    ///
    /// # 返回
    /// 返回提取出的纯文本
    pub async fn extract_text(&self, pdf: Vec<u8>) -> Result<String> {
        let endpoint = self.endpoint();
        debug!("发送 PDF 到提取服务: {} ({} 字节)", endpoint, pdf.len());

        let part = Part::bytes(pdf)
            .file_name("file.pdf")
            .mime_str("application/pdf")?;
        let form = Form::new().part("pdf", part);

        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .context("failed to send PDF to PDF service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("PDF service returned {}: {}", status, body);
        }

        debug!("PDF 提取完成，响应长度: {} 字符", body.len());

        Ok(parse_extract_response(body))
    }
}

/// 提取服务可能返回 `{"text": "..."}`，也可能直接返回文本
fn parse_extract_response(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => match map.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => body,
        },
        _ => body,
    }
}
