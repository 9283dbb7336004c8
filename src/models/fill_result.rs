//! 填充结果
//!
//! 每个上传文件对应且仅对应一个 `FillResult`，无论成功还是失败。
//!
//! 两种输出格式：
//! - `Legacy`：JSON 数组，成功项为对象，失败项为包含错误信息的字符串
//! - `Tagged`：`{"results": [{"ok": true, ...} | {"ok": false, ...}]}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FillError;

/// 单个文件的填充结果
#[derive(Debug, Clone, PartialEq)]
pub enum FillResult {
    /// 填充成功
    Filled {
        filename: String,
        data: Map<String, Value>,
    },
    /// 填充失败
    Failed { filename: String, error: FillError },
}

impl FillResult {
    pub fn filename(&self) -> &str {
        match self {
            FillResult::Filled { filename, .. } | FillResult::Failed { filename, .. } => filename,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, FillResult::Filled { .. })
    }

    /// 旧格式中的单个元素
    ///
    /// 成功时为缩进后的 JSON 对象，失败时为 JSON 字符串
    fn to_legacy_element(&self) -> serde_json::Result<String> {
        match self {
            FillResult::Filled { data, .. } => serde_json::to_string_pretty(data),
            FillResult::Failed { error, .. } => serde_json::to_string(&error.to_string()),
        }
    }
}

/// 响应格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Legacy,
    Tagged,
}

/// 带标记的结果项
#[derive(Debug, Serialize)]
struct TaggedEntry<'a> {
    ok: bool,
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaggedEnvelope<'a> {
    results: Vec<TaggedEntry<'a>>,
}

/// 一个批次的全部结果，按完成顺序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub results: Vec<FillResult>,
}

impl BatchResult {
    pub fn new(results: Vec<FillResult>) -> Self {
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_filled()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// 拼接为 JSON 数组字符串，空批次返回 `[]`
    pub fn to_legacy_json(&self) -> serde_json::Result<String> {
        let elements = self
            .results
            .iter()
            .map(FillResult::to_legacy_element)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(format!("[{}]", elements.join(",")))
    }

    pub fn to_tagged_json(&self) -> serde_json::Result<String> {
        let envelope = TaggedEnvelope {
            results: self
                .results
                .iter()
                .map(|result| match result {
                    FillResult::Filled { filename, data } => TaggedEntry {
                        ok: true,
                        filename,
                        data: Some(data),
                        error: None,
                    },
                    FillResult::Failed { filename, error } => TaggedEntry {
                        ok: false,
                        filename,
                        data: None,
                        error: Some(error.to_string()),
                    },
                })
                .collect(),
        };
        serde_json::to_string_pretty(&envelope)
    }

    pub fn to_json(&self, format: ResponseFormat) -> serde_json::Result<String> {
        match format {
            ResponseFormat::Legacy => self.to_legacy_json(),
            ResponseFormat::Tagged => self.to_tagged_json(),
        }
    }
}
