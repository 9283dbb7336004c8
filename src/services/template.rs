//! 模板构建
//!
//! 把字段名列表转换为 JSON 对象骨架，每个字段的占位值就是字段名本身

use serde_json::{Map, Value};

/// 构建 JSON 骨架
///
/// 重复的字段名只保留一个；空列表返回 `{}`。
pub fn build_skeleton<S: AsRef<str>>(keys: &[S]) -> String {
    let skeleton: Map<String, Value> = keys
        .iter()
        .map(|key| {
            let key = key.as_ref();
            (key.to_string(), Value::String(key.to_string()))
        })
        .collect();

    Value::Object(skeleton).to_string()
}
