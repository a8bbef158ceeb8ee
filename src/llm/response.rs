use serde_json::Value;

use crate::errors::{EduCopyError, EduCopyResult};

/// Extract the reply text from an OpenAI-compatible completion.
///
/// Prefers `choices[0].message.content`, then `choices[0].text`.
pub fn parse_completion(json: &Value) -> EduCopyResult<String> {
    let first = json["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| EduCopyError::ResponseUnparseable("response has no choices".into()))?;

    let content = first["message"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| first["text"].as_str().filter(|s| !s.is_empty()));

    match content {
        Some(text) => Ok(text.to_string()),
        None => Err(EduCopyError::ResponseUnparseable(
            "first choice has neither message content nor text".into(),
        )),
    }
}
