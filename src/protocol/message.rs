use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// How a result is handed to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Clipboard,
    Input,
}

/// Controller → Agent instruction. One message per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AgentMessage {
    Ping,
    ProcessResult { result: String, mode: DeliveryMode },
    ShowError { error: String },
    StartCapture,
    ToggleNotifications,
}

/// Agent's answer to `ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub status: String,
}

impl AgentReply {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Agent → Controller message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControllerMessage {
    ProcessImage {
        #[serde(rename = "imageData")]
        image_data: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ClipboardDeliver,
    InputDeliver,
    Error,
    StartCapture,
    ToggleNotifications,
}

/// One unit of work handed from the Controller to an Agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub payload: String,
}

impl Task {
    pub fn deliver(result: impl Into<String>, mode: DeliveryMode) -> Self {
        let kind = match mode {
            DeliveryMode::Clipboard => TaskKind::ClipboardDeliver,
            DeliveryMode::Input => TaskKind::InputDeliver,
        };
        Self {
            kind,
            payload: result.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Error,
            payload: message.into(),
        }
    }

    pub fn start_capture() -> Self {
        Self {
            kind: TaskKind::StartCapture,
            payload: String::new(),
        }
    }

    pub fn toggle_notifications() -> Self {
        Self {
            kind: TaskKind::ToggleNotifications,
            payload: String::new(),
        }
    }

    /// Wire form sent over the channel.
    pub fn to_message(&self) -> AgentMessage {
        match self.kind {
            TaskKind::ClipboardDeliver => AgentMessage::ProcessResult {
                result: self.payload.clone(),
                mode: DeliveryMode::Clipboard,
            },
            TaskKind::InputDeliver => AgentMessage::ProcessResult {
                result: self.payload.clone(),
                mode: DeliveryMode::Input,
            },
            TaskKind::Error => AgentMessage::ShowError {
                error: self.payload.clone(),
            },
            TaskKind::StartCapture => AgentMessage::StartCapture,
            TaskKind::ToggleNotifications => AgentMessage::ToggleNotifications,
        }
    }

    /// Inverse of [`Task::to_message`]. `ping` carries no task.
    pub fn from_message(message: &AgentMessage) -> Option<Self> {
        match message {
            AgentMessage::Ping => None,
            AgentMessage::ProcessResult { result, mode } => Some(Self::deliver(result.clone(), *mode)),
            AgentMessage::ShowError { error } => Some(Self::error(error.clone())),
            AgentMessage::StartCapture => Some(Self::start_capture()),
            AgentMessage::ToggleNotifications => Some(Self::toggle_notifications()),
        }
    }

    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::of(&self.to_message())
    }

    /// Title and body for the host-level notification shown when the Agent is unreachable.
    pub fn fallback_notice(&self) -> (&'static str, String) {
        match self.kind {
            TaskKind::ClipboardDeliver | TaskKind::InputDeliver => ("LLM result", self.payload.clone()),
            TaskKind::Error => ("Processing error", self.payload.clone()),
            TaskKind::StartCapture => (
                "Page unreachable",
                "Region capture is not available on this page".to_string(),
            ),
            TaskKind::ToggleNotifications => (
                "Page unreachable",
                "Notifications could not be toggled on this page".to_string(),
            ),
        }
    }
}

/// Content fingerprint of a serialized message.
///
/// Two structurally identical messages share a key, so a deliberate second
/// delivery of the same text while the first is still running is dropped too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey(u64);

impl CorrelationKey {
    pub fn of(message: &AgentMessage) -> Self {
        let serialized = serde_json::to_string(message).unwrap_or_else(|_| format!("{message:?}"));
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
