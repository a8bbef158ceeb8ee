use async_trait::async_trait;

use crate::errors::EduCopyResult;
use crate::llm::types::{CallConfig, MessageContent};

/// The external language-model endpoint. Implementations turn one user prompt
/// into the model's reply text.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn request(&self, call: &CallConfig, prompt: MessageContent) -> EduCopyResult<String>;
}
