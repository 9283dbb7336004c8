use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use refill::{Filler, UploadedFile};

/// 测试用填充器
///
/// 根据文档内容决定行为：
/// - `fail` → 返回错误
/// - `malformed` → 返回非 JSON 文本
/// - 其它 → 用骨架里的字段名和文档内容拼一个对象
#[derive(Default)]
pub struct MockFiller {
    calls: AtomicUsize,
    credentials: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockFiller {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl Filler for MockFiller {
    async fn fill(
        &self,
        text: &str,
        skeleton: &str,
        _instructions: &str,
        credential: &str,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(credential.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match text {
            "fail" => anyhow::bail!("upstream returned 502"),
            "malformed" => Ok("I could not find any of those fields.".to_string()),
            _ => {
                let skeleton: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(skeleton)?;
                let filled: serde_json::Map<String, serde_json::Value> = skeleton
                    .keys()
                    .map(|k| (k.clone(), serde_json::Value::String(format!("{} of {}", k, text))))
                    .collect();
                Ok(serde_json::Value::Object(filled).to_string())
            }
        }
    }
}

pub fn files(texts: &[&str]) -> Vec<UploadedFile> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| UploadedFile::new(format!("doc-{}.txt", i), *text))
        .collect()
}
