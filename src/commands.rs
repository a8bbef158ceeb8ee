use std::str::FromStr;
use std::sync::Arc;

use crate::controller::Controller;
use crate::errors::EduCopyError;
use crate::protocol::channel::AgentChannel;
use crate::protocol::delivery::DeliveryOutcome;
use crate::protocol::message::DeliveryMode;

/// User-facing entry points: keyboard shortcuts and context-menu items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    CopyToClipboard,
    SimulateInput,
    StartCapture,
    ToggleNotifications,
}

impl FromStr for HostCommand {
    type Err = EduCopyError;

    /// Accepts both shortcut names (`copy-to-clipboard`) and menu ids (`copyToClipboard`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copy-to-clipboard" | "copyToClipboard" => Ok(Self::CopyToClipboard),
            "simulate-input" | "simulateInput" => Ok(Self::SimulateInput),
            "start-capture" | "startCapture" => Ok(Self::StartCapture),
            "toggle-notifications" | "toggleNotifications" => Ok(Self::ToggleNotifications),
            other => Err(EduCopyError::Config(format!("unknown command '{other}'"))),
        }
    }
}

/// Run a command against the page it was invoked on.
///
/// `selection` is the page's current text selection; it is only read by the
/// two text commands, and a missing one surfaces as a `NoSelection` error on the page.
pub async fn run_command(
    controller: &Arc<Controller>,
    target: Arc<dyn AgentChannel>,
    command: HostCommand,
    selection: Option<String>,
) -> DeliveryOutcome {
    tracing::info!(?command, target_id = %target.target_id(), "command invoked");
    let text = selection.unwrap_or_default();
    match command {
        HostCommand::CopyToClipboard => {
            controller
                .process_selection(target.as_ref(), &text, DeliveryMode::Clipboard)
                .await
        }
        HostCommand::SimulateInput => {
            controller
                .process_selection(target.as_ref(), &text, DeliveryMode::Input)
                .await
        }
        HostCommand::StartCapture => controller.start_capture(target.as_ref()).await,
        HostCommand::ToggleNotifications => controller.toggle_notifications(target.as_ref()).await,
    }
}
