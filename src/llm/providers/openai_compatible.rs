use async_trait::async_trait;

use crate::errors::{EduCopyError, EduCopyResult};
use crate::llm::provider::InferenceService;
use crate::llm::response::parse_completion;
use crate::llm::types::{CallConfig, ChatMessage, MessageContent};

/// Calls any endpoint that speaks the OpenAI chat-completions format.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for OpenAiCompatibleProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the JSON request body for a single user prompt.
pub fn build_body(call: &CallConfig, prompt: MessageContent) -> serde_json::Value {
    serde_json::json!({
        "model": call.model,
        "messages": [ChatMessage::user(prompt)],
        "temperature": call.temperature,
        "max_tokens": call.max_tokens,
    })
}

/// Copy of `body` with image payloads replaced, for logging.
fn sanitized_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            if let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) {
                for part in parts {
                    if part.get("type").and_then(|t| t.as_str()) == Some("image_url") {
                        if let Some(url) = part.get_mut("image_url").and_then(|u| u.get_mut("url")) {
                            *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                        }
                    }
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[async_trait]
impl InferenceService for OpenAiCompatibleProvider {
    async fn request(&self, call: &CallConfig, prompt: MessageContent) -> EduCopyResult<String> {
        let body = build_body(call, prompt);

        tracing::debug!(model = %call.model, endpoint = %call.endpoint, "sending LLM request");
        tracing::debug!(body = %sanitized_for_log(&body), "request body (sanitized, base64 omitted)");

        let response = self
            .client
            .post(&call.endpoint)
            .bearer_auth(&call.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EduCopyError::InferenceFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "LLM endpoint returned an error status");
            return Err(EduCopyError::InferenceFailure(format!("{status} {err_body}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EduCopyError::ResponseUnparseable(e.to_string()))?;

        let content = parse_completion(&json)?;
        tracing::info!(content_len = content.len(), "LLM response received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::image_prompt;

    #[test]
    fn test_body_shape() {
        let call = CallConfig::new("https://api.example.com", "k", "gpt-4o-mini");
        let body = build_body(&call, MessageContent::Text("hello".into()));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 1000);
    }

    #[test]
    fn test_log_body_omits_image_payload() {
        let call = CallConfig::new("https://api.example.com", "k", "gpt-4o");
        let body = build_body(&call, image_prompt("data:image/jpeg;base64,SECRETBYTES"));
        let logged = sanitized_for_log(&body);
        assert!(!logged.contains("SECRETBYTES"));
        assert!(logged.contains("<omitted_base64_image>"));
        // the real body is untouched
        assert!(body.to_string().contains("SECRETBYTES"));
    }
}
