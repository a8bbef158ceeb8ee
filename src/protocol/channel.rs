use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::EduCopyResult;
use crate::protocol::message::{AgentMessage, AgentReply, ControllerMessage};

/// Controller-side view of one page context that may or may not host a live Agent.
///
/// No method guarantees delivery: the page may navigate away, forbid injection,
/// or drop its listener between calls.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    fn target_id(&self) -> &str;

    /// Lightweight liveness probe. Callers bound it with a timeout.
    async fn ping(&self) -> EduCopyResult<AgentReply>;

    /// Install the Agent program into the page. Must be harmless when one is already present.
    async fn inject(&self) -> EduCopyResult<()>;

    async fn send(&self, message: AgentMessage) -> EduCopyResult<()>;
}

/// Host-level system notification, shown outside the page.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(title = %title, message = %message, "system notification");
    }
}

/// Agent → Controller direction.
#[async_trait]
pub trait ControllerLink: Send + Sync {
    async fn send(&self, message: ControllerMessage) -> EduCopyResult<()>;
}

/// A message arriving at the Controller, tagged with the page it came from so
/// results can be delivered back to the same place.
pub struct ControllerEnvelope {
    pub origin: Arc<dyn AgentChannel>,
    pub message: ControllerMessage,
}
