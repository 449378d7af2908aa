//! Ollama API client — chat with native tool calling, plus embeddings.
//!
//! The plan/act/observe orchestration lives on the model side: Ollama's
//! `/api/chat` endpoint decides when to call a tool and returns structured
//! `tool_calls`. This module is only the wire client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system" | "user" | "assistant" | "tool"
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

/// A tool call emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String, // always "function"
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object.
    pub parameters: serde_json::Value,
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Response from `/api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

/// Response from `/api/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("empty response from Ollama")]
    EmptyResponse,
}

/// Client for Ollama's `/api/chat` and `/api/embeddings` endpoints.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, temperature: f32) -> Self {
        Self {
            base_url: base_url.into(),
            temperature,
            client: reqwest::Client::new(),
        }
    }

    /// Send a chat request with optional tools (non-streaming).
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        tools: Option<&[Tool]>,
    ) -> Result<ChatResponse, OllamaError> {
        let endpoint = format!("{}/api/chat", self.base_url);

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature
            }
        });

        if let Some(t) = tools {
            body["tools"] = serde_json::to_value(t)?;
        }

        let response = self.client.post(&endpoint).json(&body).send().await?;
        let text = response.text().await?;

        if text.is_empty() {
            return Err(OllamaError::EmptyResponse);
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)?;
        Ok(chat_response)
    }

    /// Embed a text snippet with the given embedding model.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, OllamaError> {
        let endpoint = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({
                "model": model,
                "prompt": text,
            }))
            .send()
            .await?;

        let parsed: EmbeddingsResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(OllamaError::EmptyResponse);
        }
        Ok(parsed.embedding)
    }
}

// ─── Text-fallback tool-call parsing ─────────────────────────────────────────

/// Parse tool calls from response text.
///
/// Some models ignore the native `tool_calls` field and emit the call as a
/// JSON object in the message content instead. This scans the content for
/// brace-delimited objects of the shape `{"name": ..., "arguments": {...}}`.
pub fn parse_tool_calls_from_text(content: &str) -> Vec<ToolCall> {
    let content = content.trim();

    if let Some(call) = try_parse_tool_call(content) {
        return vec![call];
    }

    let mut tool_calls = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in content.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = start.take() {
                        if let Some(call) = try_parse_tool_call(&content[s..=i]) {
                            tool_calls.push(call);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    tool_calls
}

fn try_parse_tool_call(json_str: &str) -> Option<ToolCall> {
    let value = serde_json::from_str::<serde_json::Value>(json_str).ok()?;
    let name = value.get("name").and_then(|n| n.as_str())?;

    // Some models say "parameters" instead of "arguments".
    let arguments = value
        .get("arguments")
        .or_else(|| value.get("parameters"))?
        .clone();

    Some(ToolCall {
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_content_as_tool_call() {
        let calls =
            parse_tool_calls_from_text(r#"{"name": "file_read", "arguments": {"path": "a.rs"}}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "file_read");
        assert_eq!(calls[0].function.arguments["path"], "a.rs");
    }

    #[test]
    fn parses_embedded_tool_call() {
        let calls = parse_tool_calls_from_text(
            r#"I'll read it now: {"name": "file_read", "arguments": {"path": "src/main.rs"}} done"#,
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "file_read");
    }

    #[test]
    fn accepts_parameters_alias() {
        let calls =
            parse_tool_calls_from_text(r#"{"name": "terminal", "parameters": {"command": "ls"}}"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments["command"], "ls");
    }

    #[test]
    fn plain_text_yields_no_calls() {
        assert!(parse_tool_calls_from_text("The answer is 42.").is_empty());
        assert!(parse_tool_calls_from_text("{\"no\": \"name field\"}").is_empty());
    }
}
