use thiserror::Error;

/// 批处理级别的错误
///
/// 出现任何一种都会中止整个请求，在派发任务之前返回
#[derive(Debug, Error)]
pub enum AppError {
    /// 未提供 OpenAI 密钥
    #[error("OpenAI API key is required")]
    MissingCredential,

    /// 上传文件错误
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// 文本提取失败
    #[error("failed to extract text from {filename}: {reason}")]
    Extraction { filename: String, reason: String },

    /// 结果序列化失败
    #[error("failed to serialize batch result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 上传文件错误
#[derive(Debug, Error)]
pub enum UploadError {
    /// multipart 表单解析失败
    #[error("failed to parse multipart form: {0}")]
    Multipart(String),

    /// 文件超过大小上限
    #[error("file {filename} is too large: {size} bytes (max: {limit})")]
    FileTooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },

    /// 文件类型不支持
    #[error("invalid file type for {filename}: {detected}")]
    InvalidFileType { filename: String, detected: String },

    /// 读取文件失败
    #[error("failed to read file {filename}: {reason}")]
    ReadFailed { filename: String, reason: String },
}

/// 单个文件的填充错误
///
/// 不会中止整个批次，而是作为结果的一部分返回
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FillError {
    /// 填充调用失败
    #[error("Failed to request fill for file: {0}")]
    Collaborator(String),

    /// LLM 返回的内容不是 JSON 对象
    #[error("Failed to unmarshal result for file {filename}: {reason}")]
    MalformedCompletion { filename: String, reason: String },

    /// 超时
    #[error("Fill request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// 任务异常退出
    #[error("Fill task aborted: {0}")]
    Aborted(String),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
