use std::sync::Arc;

use futures_util::future::join;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{ConfigStore, Settings};
use crate::errors::{EduCopyError, EduCopyResult};
use crate::llm::prompt;
use crate::llm::provider::InferenceService;
use crate::llm::types::CallConfig;
use crate::protocol::channel::{AgentChannel, ControllerEnvelope};
use crate::protocol::delivery::{DeliveryOutcome, DeliveryProtocol};
use crate::protocol::message::{ControllerMessage, DeliveryMode, Task};

/// Privileged side: builds requests, calls the model, and hands every outcome,
/// success or failure, to the delivery protocol.
pub struct Controller {
    config: Arc<dyn ConfigStore>,
    inference: Arc<dyn InferenceService>,
    delivery: DeliveryProtocol,
}

impl Controller {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        inference: Arc<dyn InferenceService>,
        delivery: DeliveryProtocol,
    ) -> Self {
        Self {
            config,
            inference,
            delivery,
        }
    }

    /// Process a text selection in the background.
    pub fn handle_selection(
        self: &Arc<Self>,
        target: Arc<dyn AgentChannel>,
        text: String,
        mode: DeliveryMode,
    ) -> JoinHandle<DeliveryOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process_selection(target.as_ref(), &text, mode).await })
    }

    /// Process a captured region in the background.
    pub fn handle_captured_image(
        self: &Arc<Self>,
        target: Arc<dyn AgentChannel>,
        image_data: String,
    ) -> JoinHandle<Vec<DeliveryOutcome>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process_captured_image(target.as_ref(), &image_data).await })
    }

    pub async fn process_selection(
        &self,
        target: &dyn AgentChannel,
        text: &str,
        mode: DeliveryMode,
    ) -> DeliveryOutcome {
        tracing::info!(target_id = %target.target_id(), ?mode, len = text.len(), "processing selection");
        let task = match self.transform_selection(text).await {
            Ok(result) => Task::deliver(result, mode),
            Err(e) => {
                tracing::warn!(error = %e, "selection processing failed");
                Task::error(e.to_string())
            }
        };
        self.delivery.deliver(target, &task).await
    }

    /// On success the result goes out twice, concurrently: clipboard and input.
    pub async fn process_captured_image(
        &self,
        target: &dyn AgentChannel,
        image_data: &str,
    ) -> Vec<DeliveryOutcome> {
        tracing::info!(target_id = %target.target_id(), bytes = image_data.len(), "processing captured image");
        match self.transform_image(image_data).await {
            Ok(text) => {
                let clipboard = Task::deliver(text.clone(), DeliveryMode::Clipboard);
                let input = Task::deliver(text, DeliveryMode::Input);
                let (a, b) = join(
                    self.delivery.deliver(target, &clipboard),
                    self.delivery.deliver(target, &input),
                )
                .await;
                vec![a, b]
            }
            Err(e) => {
                tracing::warn!(error = %e, "image processing failed");
                vec![self.delivery.deliver(target, &Task::error(e.to_string())).await]
            }
        }
    }

    pub async fn start_capture(&self, target: &dyn AgentChannel) -> DeliveryOutcome {
        self.delivery.deliver(target, &Task::start_capture()).await
    }

    pub async fn toggle_notifications(&self, target: &dyn AgentChannel) -> DeliveryOutcome {
        self.delivery.deliver(target, &Task::toggle_notifications()).await
    }

    /// Drain Agent → Controller messages until every sender is gone.
    pub async fn run_inbox(self: Arc<Self>, mut rx: mpsc::Receiver<ControllerEnvelope>) {
        while let Some(envelope) = rx.recv().await {
            match envelope.message {
                ControllerMessage::ProcessImage { image_data } => {
                    self.handle_captured_image(envelope.origin, image_data);
                }
            }
        }
        tracing::info!("controller inbox closed");
    }

    async fn transform_selection(&self, text: &str) -> EduCopyResult<String> {
        if text.trim().is_empty() {
            return Err(EduCopyError::NoSelection);
        }
        let settings = Settings::load(self.config.as_ref())?;
        let (endpoint, api_key) = settings.credentials()?;
        let call = CallConfig::new(endpoint, api_key, settings.effective_model());
        tracing::debug!(model = %call.model, "resolved model");
        let prompt = prompt::text_prompt(&settings.prompt_template, text);
        self.inference.request(&call, prompt).await
    }

    async fn transform_image(&self, image_data: &str) -> EduCopyResult<String> {
        if image_data.is_empty() {
            return Err(EduCopyError::CaptureFailure("empty image payload".into()));
        }
        let settings = Settings::load(self.config.as_ref())?;
        let (endpoint, api_key) = settings.credentials()?;
        let call = CallConfig::new(endpoint, api_key, settings.effective_ocr_model());
        tracing::debug!(model = %call.model, "resolved OCR model");
        self.inference.request(&call, prompt::image_prompt(image_data)).await
    }
}
