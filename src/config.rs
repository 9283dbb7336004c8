use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 管理员令牌，请求中携带该令牌时替换为服务端的真实密钥
    pub admin_key: String,
    /// 服务端持有的真实 OpenAI 密钥
    pub openai_api_key: String,
    // --- LLM 配置 ---
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- PDF 服务配置 ---
    pub pdf_service_url: String,
    // --- 批处理配置 ---
    /// 同时进行的填充请求数量上限
    pub max_concurrent_fills: usize,
    /// 单个文件填充的超时时间（秒）
    pub fill_timeout_secs: u64,
    // --- 上传限制 ---
    /// 单个文件大小上限（字节）
    pub max_file_size: usize,
    /// 整个请求体大小上限（字节）
    pub max_request_size: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            admin_key: String::new(),
            openai_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            pdf_service_url: "http://pdf-service:5001".to_string(),
            max_concurrent_fills: 8,
            fill_timeout_secs: 120,
            max_file_size: 5 * 1024 * 1024,
            max_request_size: 32 * 1024 * 1024,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(default.host),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.port),
            admin_key: std::env::var("ADMIN_KEY").unwrap_or(default.admin_key),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.openai_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            pdf_service_url: std::env::var("PDF_SERVICE_URL").unwrap_or(default.pdf_service_url),
            max_concurrent_fills: std::env::var("MAX_CONCURRENT_FILLS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_fills).max(1),
            fill_timeout_secs: std::env::var("FILL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.fill_timeout_secs),
            max_file_size: std::env::var("MAX_FILE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_file_size),
            max_request_size: std::env::var("MAX_REQUEST_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_request_size),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 单个文件填充的超时时间
    pub fn fill_timeout(&self) -> Duration {
        Duration::from_secs(self.fill_timeout_secs)
    }

    /// 管理员令牌替换规则
    pub fn admin_override(&self) -> AdminOverride {
        AdminOverride::new(&self.admin_key, &self.openai_api_key)
    }
}

/// 管理员令牌替换
///
/// 调用方传入的密钥等于 `admin_key` 时，替换为 `provider_key`。
/// 任一值为空时不做替换。
#[derive(Clone, Default)]
pub struct AdminOverride {
    admin_key: String,
    provider_key: String,
}

impl AdminOverride {
    pub fn new(admin_key: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            admin_key: admin_key.into(),
            provider_key: provider_key.into(),
        }
    }

    /// 不做任何替换
    pub fn disabled() -> Self {
        Self::default()
    }

    /// 解析最终使用的密钥
    pub fn resolve(&self, credential: &str) -> String {
        if !self.admin_key.is_empty()
            && !self.provider_key.is_empty()
            && credential == self.admin_key
        {
            return self.provider_key.clone();
        }
        credential.to_string()
    }
}

// 不打印密钥
impl std::fmt::Debug for AdminOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminOverride")
            .field("enabled", &(!self.admin_key.is_empty() && !self.provider_key.is_empty()))
            .finish()
    }
}
