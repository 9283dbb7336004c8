//! 文本提取 - 业务能力层
//!
//! 根据文件头判断类型：纯文本直接解码，PDF 交给 `PdfService`

use crate::config::Config;
use crate::error::{AppError, UploadError};
use crate::models::UploadedFile;
use crate::services::pdf_service::PdfService;
use tracing::{debug, warn};

/// 参与类型判断的字节数
const SNIFF_LEN: usize = 512;

/// 文件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::PlainText => "text/plain",
            MediaType::Pdf => "application/pdf",
            MediaType::Other(mime) => mime,
        }
    }
}

/// 以这些标签开头的内容视为 HTML，标签后必须是空白或 `>`
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

/// 根据文件头判断类型
pub fn detect_media_type(bytes: &[u8]) -> MediaType {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];

    if head.starts_with(b"%PDF-") {
        return MediaType::Pdf;
    }

    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    if let Some(markup) = detect_markup(head) {
        return MediaType::Other(markup.into());
    }
    if head.iter().any(|&b| is_binary_byte(b)) {
        return MediaType::Other("application/octet-stream".into());
    }

    MediaType::PlainText
}

fn detect_markup(head: &[u8]) -> Option<&'static str> {
    let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
    let head = &head[start..];

    if starts_with_ignore_case(head, b"<?xml") {
        return Some("text/xml");
    }
    if starts_with_ignore_case(head, b"<svg") {
        return Some("image/svg+xml");
    }

    let is_html = HTML_TAGS.iter().any(|tag| {
        starts_with_ignore_case(head, tag)
            && matches!(head.get(tag.len()), Some(b' ' | b'>' | b'\t' | b'\n' | b'\r'))
    });
    is_html.then_some("text/html")
}

fn starts_with_ignore_case(head: &[u8], prefix: &[u8]) -> bool {
    head.len() >= prefix.len() && head[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// 文本提取器
#[derive(Clone)]
pub struct TextExtractor {
    pdf_service: PdfService,
}

impl TextExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            pdf_service: PdfService::new(config),
        }
    }

    pub fn with_pdf_service(pdf_service: PdfService) -> Self {
        Self { pdf_service }
    }

    /// 提取单个文件的文本
    ///
    /// 不支持的类型在这里拒绝，不会进入批处理
    pub async fn extract(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, AppError> {
        let media_type = detect_media_type(&bytes);
        debug!("文件 {} 类型: {}", filename, media_type.as_str());

        let text = match media_type {
            MediaType::PlainText => decode_text(&filename, &bytes),
            MediaType::Pdf => self
                .pdf_service
                .extract_text(bytes)
                .await
                .map_err(|e| AppError::Extraction {
                    filename: filename.clone(),
                    reason: format!("{:#}", e),
                })?,
            MediaType::Other(detected) => {
                return Err(UploadError::InvalidFileType {
                    filename,
                    detected,
                }
                .into());
            }
        };

        Ok(UploadedFile::new(filename, text))
    }
}

/// 按 UTF-8 解码，非法字节替换为 U+FFFD
fn decode_text(filename: &str, bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(
                "⚠️ 文件 {} 不是有效的 UTF-8（位置 {}），非法字节已被替换",
                filename,
                e.valid_up_to()
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_detect_pdf() {
        assert_eq!(detect_media_type(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3"), MediaType::Pdf);
    }

    #[test]
    fn test_detect_text() {
        assert_eq!(detect_media_type(b"Name: Ada\r\nRole:\tEngineer\n"), MediaType::PlainText);
        assert_eq!(detect_media_type("姓名：张三".as_bytes()), MediaType::PlainText);
        assert_eq!(detect_media_type(b"\xEF\xBB\xBFhello"), MediaType::PlainText);
        assert_eq!(detect_media_type(b""), MediaType::PlainText);
    }

    #[test]
    fn test_detect_binary() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];
        assert_eq!(
            detect_media_type(&png),
            MediaType::Other("application/octet-stream".into())
        );
    }

    #[test]
    fn test_detect_markup() {
        assert_eq!(
            detect_media_type(b"<!DOCTYPE html>\n<html><body>hi</body></html>"),
            MediaType::Other("text/html".into())
        );
        assert_eq!(
            detect_media_type(b"  \n<HTML lang=\"en\">"),
            MediaType::Other("text/html".into())
        );
        assert_eq!(
            detect_media_type(b"<?xml version=\"1.0\"?><invoice/>"),
            MediaType::Other("text/xml".into())
        );
        assert_eq!(
            detect_media_type(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            MediaType::Other("image/svg+xml".into())
        );
    }

    #[test]
    fn test_angle_brackets_in_plain_text() {
        assert_eq!(detect_media_type(b"<Ada> wrote: total is 42"), MediaType::PlainText);
        assert_eq!(detect_media_type(b"<Bob> said hi"), MediaType::PlainText);
        assert_eq!(detect_media_type(b"a < b and b > c"), MediaType::PlainText);
    }

    #[test]
    fn test_binary_after_sniff_window_is_ignored() {
        let mut bytes = vec![b'a'; SNIFF_LEN];
        bytes.push(0x00);
        assert_eq!(detect_media_type(&bytes), MediaType::PlainText);
    }

    #[tokio::test]
    async fn test_extract_plain_text() {
        let extractor = TextExtractor::new(&Config::default());
        let file = extractor
            .extract("notes.txt".to_string(), b"Invoice #42".to_vec())
            .await
            .unwrap();
        assert_eq!(file, UploadedFile::new("notes.txt", "Invoice #42"));
    }

    #[tokio::test]
    async fn test_extract_invalid_utf8_is_replaced() {
        let extractor = TextExtractor::new(&Config::default());
        // Latin-1 编码的 "café"
        let file = extractor
            .extract("menu.txt".to_string(), b"caf\xE9".to_vec())
            .await
            .unwrap();
        assert_eq!(file.data, "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_extract_rejects_html() {
        let extractor = TextExtractor::new(&Config::default());
        let result = extractor
            .extract("page.txt".to_string(), b"<html><body>Invoice</body></html>".to_vec())
            .await;
        match result {
            Err(AppError::Upload(UploadError::InvalidFileType { detected, .. })) => {
                assert_eq!(detected, "text/html");
            }
            other => panic!("expected InvalidFileType, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_pdf_via_service() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/extract-text")
            .match_body(Matcher::Regex(r#"name="pdf""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "Invoice #42\nTotal: 10"}"#)
            .create_async()
            .await;

        let extractor = TextExtractor::with_pdf_service(PdfService::with_base_url(server.url()));
        let file = extractor
            .extract("scan.pdf".to_string(), b"%PDF-1.4\n".to_vec())
            .await
            .unwrap();

        assert_eq!(file, UploadedFile::new("scan.pdf", "Invoice #42\nTotal: 10"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extract_rejects_binary() {
        let extractor = TextExtractor::new(&Config::default());
        let result = extractor.extract("photo.jpg".to_string(), vec![0xFF, 0xD8, 0xFF, 0x00]).await;
        assert!(matches!(
            result,
            Err(AppError::Upload(UploadError::InvalidFileType { .. }))
        ));
    }

    #[tokio::test]
    async fn test_extract_pdf_service_failure() {
        let extractor =
            TextExtractor::with_pdf_service(PdfService::with_base_url("http://127.0.0.1:1"));
        let result = extractor.extract("scan.pdf".to_string(), b"%PDF-1.4".to_vec()).await;
        assert!(matches!(result, Err(AppError::Extraction { .. })));
    }
}
