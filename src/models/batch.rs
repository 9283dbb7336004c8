use serde::{Deserialize, Serialize};

/// 上传并提取过文本的文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// 原始文件名
    pub name: String,
    /// 提取出的纯文本
    pub data: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// 一次批处理请求
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    /// 模板字段名
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    #[serde(default)]
    pub instructions: String,
    /// 调用方提供的 OpenAI 密钥
    #[serde(rename = "openai_api_key", default)]
    pub credential: String,
}

impl BatchRequest {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            ..Default::default()
        }
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = files;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

// 手动实现，避免把密钥写进日志
impl std::fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRequest")
            .field("keys", &self.keys)
            .field("files", &self.files.len())
            .field("instructions", &self.instructions)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Display for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 文件数#{} 字段数#{} 附加说明#{}]",
            self.files.len(),
            self.keys.len(),
            !self.instructions.is_empty()
        )
    }
}
