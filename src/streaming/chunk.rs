//! 可复用的流式 chunk 对象
//!
//! 默认形态与 OpenAI `chat.completion.chunk` 的最小结构一致：
//! `{"choices":[{"index":0,"delta":{},"finish_reason":null}]}`。

use crate::streaming::metadata::ResponseMeta;
use serde::{Deserialize, Serialize};

/// chunk 对象类型标识
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// 流式 chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<ChunkChoice>,
}

/// chunk 中的单个选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    /// 始终序列化，未结束时为 null
    pub finish_reason: Option<String>,
}

/// 增量内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<serde_json::Value>>,
}

impl Default for ChatCompletionChunk {
    fn default() -> Self {
        Self {
            id: None,
            object: None,
            created: None,
            model: None,
            choices: vec![ChunkChoice::default()],
        }
    }
}

impl ChunkDelta {
    fn clear(&mut self) {
        self.role = None;
        self.content = None;
        self.reasoning_content = None;
        self.tool_calls = None;
    }
}

impl ChatCompletionChunk {
    /// 恢复为默认形态
    ///
    /// 归还对象池之前由调用方调用；对象池本身不做重置。
    pub fn reset(&mut self) {
        self.id = None;
        self.object = None;
        self.created = None;
        self.model = None;
        self.choices.truncate(1);
        match self.choices.first_mut() {
            Some(choice) => {
                choice.index = 0;
                choice.delta.clear();
                choice.finish_reason = None;
            }
            None => self.choices.push(ChunkChoice::default()),
        }
    }

    /// 写入响应元数据和模型名
    pub fn stamp(&mut self, meta: &ResponseMeta, model: &str) {
        self.id = Some(meta.id.clone());
        self.object = Some(CHUNK_OBJECT.to_string());
        self.created = Some(meta.created);
        self.model = Some(model.to_string());
    }

    /// 首个选项的增量
    pub fn delta_mut(&mut self) -> &mut ChunkDelta {
        if self.choices.is_empty() {
            self.choices.push(ChunkChoice::default());
        }
        &mut self.choices[0].delta
    }

    /// 设置首个选项的结束原因
    pub fn set_finish_reason(&mut self, reason: Option<&str>) {
        if self.choices.is_empty() {
            self.choices.push(ChunkChoice::default());
        }
        self.choices[0].finish_reason = reason.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let json = serde_json::to_string(&ChatCompletionChunk::default()).unwrap();
        assert_eq!(
            json,
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":null}]}"#
        );
    }

    #[test]
    fn test_stamp_and_content() {
        let meta = ResponseMeta {
            id: "chatcmpl-1700000000000".to_string(),
            created: 1_700_000_000,
        };
        let mut chunk = ChatCompletionChunk::default();
        chunk.stamp(&meta, "gpt-4o");
        chunk.delta_mut().content = Some("hi".to_string());

        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["id"], "chatcmpl-1700000000000");
        assert_eq!(value["object"], CHUNK_OBJECT);
        assert_eq!(value["created"], 1_700_000_000);
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["choices"][0]["delta"]["content"], "hi");
    }

    #[test]
    fn test_reset_restores_default() {
        let mut chunk = ChatCompletionChunk::default();
        chunk.id = Some("x".to_string());
        chunk.delta_mut().content = Some("stale".to_string());
        chunk.set_finish_reason(Some("stop"));
        chunk.choices.push(ChunkChoice {
            index: 1,
            ..Default::default()
        });

        chunk.reset();
        assert_eq!(chunk, ChatCompletionChunk::default());
    }

    #[test]
    fn test_reset_with_empty_choices() {
        let mut chunk = ChatCompletionChunk {
            choices: Vec::new(),
            ..Default::default()
        };
        chunk.reset();
        assert_eq!(chunk, ChatCompletionChunk::default());
    }
}
