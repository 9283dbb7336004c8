//! 批处理器 - 编排层
//!
//! ## 职责
//!
//! 对一次请求中的所有文件并发执行"填充 → 解析"流程，并把结果汇总成一个 JSON 数组。
//!
//! ## 核心流程
//!
//! 1. **前置检查**：密钥为空时直接返回 `MissingCredential`，不派发任何任务
//! 2. **密钥替换**：管理员令牌统一替换为服务端密钥，只做一次
//! 3. **构建骨架**：所有任务共享同一个只读骨架
//! 4. **并发派发**：每个文件一个任务，由 Semaphore 限制同时进行的填充数量
//! 5. **汇总结果**：通过有界 channel 收集，每个文件恰好一个结果
//!
//! ## 设计特点
//!
//! - **失败降级**：单个文件失败只体现在结果里，不影响整个批次
//! - **超时**：每个填充调用都有超时
//! - **取消**：任务由 `JoinSet` 持有，批处理被丢弃时所有未完成任务一并中止
//! - **无序**：结果按完成顺序排列

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{AdminOverride, Config};
use crate::error::{AppError, AppResult, FillError};
use crate::models::{BatchRequest, BatchResult, FillResult, UploadedFile};
use crate::services::{build_skeleton, Filler};
use crate::utils::logging::{log_batch_complete, log_batch_start, truncate_text};

/// 批处理器
pub struct BatchProcessor {
    filler: Arc<dyn Filler>,
    admin_override: AdminOverride,
    max_concurrent: usize,
    fill_timeout: Duration,
}

impl BatchProcessor {
    /// 根据配置创建批处理器
    pub fn new(filler: Arc<dyn Filler>, config: &Config) -> Self {
        Self {
            filler,
            admin_override: config.admin_override(),
            max_concurrent: config.max_concurrent_fills.max(1),
            fill_timeout: config.fill_timeout(),
        }
    }

    pub fn with_admin_override(mut self, admin_override: AdminOverride) -> Self {
        self.admin_override = admin_override;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_fill_timeout(mut self, fill_timeout: Duration) -> Self {
        self.fill_timeout = fill_timeout;
        self
    }

    /// 运行批处理，返回 JSON 数组字符串
    ///
    /// 成功项为 JSON 对象，失败项为包含文件名和原因的字符串；没有文件时返回 `[]`。
    pub async fn run_batch(&self, request: BatchRequest) -> AppResult<String> {
        let result = self.run_batch_results(request).await?;
        Ok(result.to_legacy_json()?)
    }

    /// 运行批处理，返回带类型的结果
    pub async fn run_batch_results(&self, request: BatchRequest) -> AppResult<BatchResult> {
        if request.credential.is_empty() {
            return Err(AppError::MissingCredential);
        }

        let total = request.files.len();
        if total == 0 {
            info!("批次中没有文件，直接返回空结果");
            return Ok(BatchResult::default());
        }

        let started = Instant::now();
        log_batch_start(&request, self.max_concurrent);

        let shared = Arc::new(SharedInputs {
            filler: Arc::clone(&self.filler),
            skeleton: build_skeleton(&request.keys),
            instructions: request.instructions,
            credential: self.admin_override.resolve(&request.credential),
            fill_timeout: self.fill_timeout,
        });
        debug!("JSON 骨架: {}", shared.skeleton);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, mut rx) = mpsc::channel(total.min(self.max_concurrent));
        let mut tasks = JoinSet::new();

        // 每个文件一个任务
        for (idx, file) in request.files.into_iter().enumerate() {
            let file_index = idx + 1;
            let shared = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tasks.spawn(async move {
                let filename = file.name.clone();
                let result = AssertUnwindSafe(fill_one(shared, semaphore, file, file_index))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| FillResult::Failed {
                        filename,
                        error: FillError::Aborted(panic_message(panic.as_ref())),
                    });

                // 接收端只会在批处理被取消时关闭
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        // 等待全部结果
        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        let batch = BatchResult::new(results);
        log_batch_complete(&batch, total, started.elapsed());

        Ok(batch)
    }
}

/// 所有任务共享的只读输入
struct SharedInputs {
    filler: Arc<dyn Filler>,
    skeleton: String,
    instructions: String,
    credential: String,
    fill_timeout: Duration,
}

/// 处理单个文件：填充 → 解析
async fn fill_one(
    shared: Arc<SharedInputs>,
    semaphore: Arc<Semaphore>,
    file: UploadedFile,
    file_index: usize,
) -> FillResult {
    let UploadedFile { name: filename, data } = file;

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return FillResult::Failed {
                filename,
                error: FillError::Aborted(e.to_string()),
            };
        }
    };

    let started = Instant::now();
    debug!(
        "[文件 {}] 请求 LLM 填充: {} ({})",
        file_index,
        filename,
        truncate_text(&data, 40)
    );

    let completion = tokio::time::timeout(
        shared.fill_timeout,
        shared.filler.fill(
            &data,
            &shared.skeleton,
            &shared.instructions,
            &shared.credential,
        ),
    )
    .await;

    let result = match completion {
        Err(_) => FillResult::Failed {
            filename,
            error: FillError::Timeout {
                millis: shared.fill_timeout.as_millis() as u64,
            },
        },
        Ok(Err(e)) => FillResult::Failed {
            filename,
            error: FillError::Collaborator(format!("{:#}", e)),
        },
        Ok(Ok(text)) => parse_completion(filename, &text),
    };

    match &result {
        FillResult::Filled { filename, .. } => {
            info!(
                "[文件 {}] ✓ {} 填充完成，耗时 {:?}",
                file_index,
                filename,
                started.elapsed()
            );
        }
        FillResult::Failed { filename, error } => {
            warn!("[文件 {}] ❌ {} 填充失败: {}", file_index, filename, error);
        }
    }

    result
}

/// 把 LLM 返回的文本解析为 JSON 对象
fn parse_completion(filename: String, text: &str) -> FillResult {
    match serde_json::from_str::<Map<String, Value>>(text) {
        Ok(data) => FillResult::Filled { filename, data },
        Err(e) => FillResult::Failed {
            error: FillError::MalformedCompletion {
                filename: filename.clone(),
                reason: e.to_string(),
            },
            filename,
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 按文档内容决定行为的测试用填充器
    ///
    /// - `panic` → panic
    /// - `slow` → 长时间等待
    /// - 其它 → 返回 `{"text": <文档>}`
    #[derive(Default)]
    struct ScriptedFiller {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Filler for ScriptedFiller {
        async fn fill(
            &self,
            text: &str,
            _skeleton: &str,
            _instructions: &str,
            _credential: &str,
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let outcome = match text {
                "panic" => panic!("boom"),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(serde_json::json!({ "text": text }).to_string())
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
    }

    fn processor(filler: Arc<ScriptedFiller>) -> BatchProcessor {
        BatchProcessor::new(filler, &Config::default())
    }

    fn files(texts: &[&str]) -> Vec<UploadedFile> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| UploadedFile::new(format!("file-{}.txt", i), *text))
            .collect()
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let filler = Arc::new(ScriptedFiller::default());
        let processor = processor(Arc::clone(&filler)).with_max_concurrent(3);

        let texts: Vec<String> = (0..20).map(|i| format!("doc {}", i)).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        let request = BatchRequest::new("sk-test").with_files(files(&texts));

        let batch = processor.run_batch_results(request).await.unwrap();

        assert_eq!(batch.len(), 20);
        assert_eq!(batch.succeeded(), 20);
        assert!(filler.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(filler.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_entry() {
        let filler = Arc::new(ScriptedFiller::default());
        let processor =
            processor(Arc::clone(&filler)).with_fill_timeout(Duration::from_millis(50));

        let request = BatchRequest::new("sk-test").with_files(files(&["slow", "fast"]));
        let batch = processor.run_batch_results(request).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.succeeded(), 1);
        let timed_out = batch
            .results
            .iter()
            .find(|r| !r.is_filled())
            .unwrap();
        assert_eq!(timed_out.filename(), "file-0.txt");
        assert!(matches!(
            timed_out,
            FillResult::Failed {
                error: FillError::Timeout { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_panicking_task_still_reports() {
        let filler = Arc::new(ScriptedFiller::default());
        let processor = processor(Arc::clone(&filler));

        let request =
            BatchRequest::new("sk-test").with_files(files(&["ok one", "panic", "ok two"]));
        let batch = processor.run_batch_results(request).await.unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.failed(), 1);
        let aborted = batch.results.iter().find(|r| !r.is_filled()).unwrap();
        assert_eq!(
            aborted,
            &FillResult::Failed {
                filename: "file-1.txt".to_string(),
                error: FillError::Aborted("boom".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_dropping_batch_cancels_in_flight_tasks() {
        let filler = Arc::new(ScriptedFiller::default());
        let processor = processor(Arc::clone(&filler));

        let request = BatchRequest::new("sk-test").with_files(files(&["slow", "slow"]));
        let outcome =
            tokio::time::timeout(Duration::from_millis(100), processor.run_batch(request)).await;
        tokio_test::assert_err!(outcome);

        // 任务被中止后不会再有新的调用
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(filler.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parse_completion() {
        let filled = parse_completion("a.txt".to_string(), r#"{"name": "Ada"}"#);
        assert!(filled.is_filled());

        let failed = parse_completion("a.txt".to_string(), "Sure! Here is the JSON:");
        match failed {
            FillResult::Failed {
                error: FillError::MalformedCompletion { filename, .. },
                ..
            } => assert_eq!(filename, "a.txt"),
            other => panic!("unexpected result: {:?}", other),
        }

        // 数组不是对象
        assert!(!parse_completion("a.txt".to_string(), "[1, 2]").is_filled());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "task panicked");
    }
}
