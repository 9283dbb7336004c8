//! LLM 服务 - 业务能力层
//!
//! 只负责"用文档内容填充 JSON 骨架"这一能力，不关心批处理流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use std::sync::OnceLock;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;

const SYSTEM_PROMPT: &str = "You are a parser of unstructured text data. Your task is to return JSON in the format specified, \
where each JSON value is filled in using information provided in the data. \
If the data does not contain the information required, return an empty string for that value. \
Return your answer in JSON format, but do not wrap it in backticks.";

const EXTRA_INSTRUCTIONS_TAG: &str = "[Extra Instructions]";
const JSON_STRUCTURE_TAG: &str = "[JSON Structure]";
const DATA_TAG: &str = "[Data to fill JSON structure with]";
const FILLED_JSON_TAG: &str = "[Filled JSON structure]";

/// 填充能力
///
/// 输入文档文本、JSON 骨架、附加说明和密钥，返回模型生成的文本。
/// 错误对调用方是不透明的，只作为失败原因展示。
#[async_trait]
pub trait Filler: Send + Sync {
    async fn fill(
        &self,
        text: &str,
        skeleton: &str,
        instructions: &str,
        credential: &str,
    ) -> Result<String>;
}

/// LLM 服务
///
/// 职责：
/// - 按固定的提示词结构组装消息
/// - 使用每个请求自带的密钥调用 Chat Completion
/// - 不关心批次，不解析返回的 JSON
pub struct LlmService {
    api_base_url: String,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        Self {
            api_base_url: config.llm_api_base_url.clone(),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 使用指定模型创建
    pub fn with_model(config: &Config, model_name: impl Into<String>) -> Self {
        Self {
            api_base_url: config.llm_api_base_url.clone(),
            model_name: model_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 构建消息列表
    fn build_messages(
        &self,
        text: &str,
        skeleton: &str,
        instructions: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages = vec![system_message(SYSTEM_PROMPT)?];

        // 附加说明（可选）
        if !instructions.is_empty() {
            messages.push(system_message(EXTRA_INSTRUCTIONS_TAG)?);
            let user_msg = ChatCompletionRequestUserMessageArgs::default()
                .content(instructions)
                .build()?;
            messages.push(ChatCompletionRequestMessage::User(user_msg));
        }

        for content in [JSON_STRUCTURE_TAG, skeleton, DATA_TAG, text, FILLED_JSON_TAG] {
            messages.push(system_message(content)?);
        }

        Ok(messages)
    }
}

#[async_trait]
impl Filler for LlmService {
    async fn fill(
        &self,
        text: &str,
        skeleton: &str,
        instructions: &str,
        credential: &str,
    ) -> Result<String> {
        if credential.is_empty() {
            anyhow::bail!("OPENAI_API_KEY is not set");
        }

        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("文档长度: {} 字符", text.len());

        let openai_config = OpenAIConfig::new()
            .with_api_key(credential)
            .with_api_base(&self.api_base_url);
        let client = Client::with_config(openai_config);

        let messages = self.build_messages(text, skeleton, instructions)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .build()?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("failed to create chat completion: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(strip_code_fence(&content))
    }
}

fn system_message(content: &str) -> Result<ChatCompletionRequestMessage> {
    let msg = ChatCompletionRequestSystemMessageArgs::default()
        .content(content)
        .build()?;
    Ok(ChatCompletionRequestMessage::System(msg))
}

/// 去掉模型偶尔加上的 Markdown 代码块
pub fn strip_code_fence(content: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n(.*?)\n?\s*```\s*$").expect("valid fence regex")
    });

    match fence.captures(content) {
        Some(caps) => caps[1].trim().to_string(),
        None => content.trim().to_string(),
    }
}
