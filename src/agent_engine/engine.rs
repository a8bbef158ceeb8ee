use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent_engine::countdown::{Countdown, CountdownOutcome};
use crate::agent_engine::dedup::{DedupLedger, InFlightGuard};
use crate::agent_engine::state::{AgentLifecycleState, ForegroundClaim, ForegroundLock, PageEvent};
use crate::config::{self, keys, ConfigStore};
use crate::errors::{EduCopyError, EduCopyResult};
use crate::executor::actions::{ActionExecutor, Notices};
use crate::executor::host::{PageHost, PageUi};
use crate::perception::capture::{CaptureStep, RegionCapture};
use crate::perception::crop::crop_region;
use crate::perception::traits::Rasterizer;
use crate::perception::types::CaptureRegion;
use crate::protocol::channel::ControllerLink;
use crate::protocol::message::{AgentMessage, AgentReply, ControllerMessage, DeliveryMode, Task};

/// Everything the Agent touches outside its own state.
#[derive(Clone)]
pub struct AgentServices {
    pub host: Arc<dyn PageHost>,
    pub ui: Arc<dyn PageUi>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub config: Arc<dyn ConfigStore>,
    pub controller: Arc<dyn ControllerLink>,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub input_countdown_secs: u32,
    pub inbox_capacity: usize,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            input_countdown_secs: 5,
            inbox_capacity: 32,
        }
    }
}

/// Items on the Agent's task queue.
pub enum Inbound {
    Message {
        message: AgentMessage,
        reply: oneshot::Sender<Option<AgentReply>>,
    },
    Page(PageEvent),
}

/// Sending side of an attached Agent.
#[derive(Clone)]
pub struct AgentHandle {
    id: Uuid,
    tx: mpsc::Sender<Inbound>,
    foreground: ForegroundLock,
    ledger: DedupLedger,
    cancel: CancellationToken,
}

impl AgentHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed() && !self.cancel.is_cancelled()
    }

    /// Hand a message to the Agent's listener. Resolves once the listener has
    /// accepted it, not when the resulting action finishes.
    pub async fn dispatch(&self, message: AgentMessage) -> EduCopyResult<Option<AgentReply>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Inbound::Message { message, reply })
            .await
            .map_err(|_| EduCopyError::Channel("agent listener is gone".into()))?;
        rx.await
            .map_err(|_| EduCopyError::Channel("agent dropped the message".into()))
    }

    pub async fn page_event(&self, event: PageEvent) -> EduCopyResult<()> {
        self.tx
            .send(Inbound::Page(event))
            .await
            .map_err(|_| EduCopyError::Channel("agent listener is gone".into()))
    }

    pub fn state(&self) -> AgentLifecycleState {
        if self.is_alive() {
            self.foreground.state()
        } else {
            AgentLifecycleState::Uninjected
        }
    }

    pub fn in_flight(&self) -> usize {
        self.ledger.len()
    }

    /// Tear the Agent down: stops the inbox and hard-cancels running countdowns.
    pub fn detach(&self) {
        self.cancel.cancel();
    }
}

/// The in-page message handler. Owns all per-page state; nothing is global.
pub struct Agent {
    id: Uuid,
    services: AgentServices,
    options: AgentOptions,
    ledger: DedupLedger,
    foreground: ForegroundLock,
    capture: RegionCapture,
    capture_claim: Option<ForegroundClaim>,
    notifications: watch::Sender<bool>,
    executor: Arc<ActionExecutor>,
    notices: Notices,
    cancel: CancellationToken,
}

impl Agent {
    /// Attach a new Agent to a page and start its task queue.
    pub fn spawn(services: AgentServices, options: AgentOptions) -> AgentHandle {
        let (tx, rx) = mpsc::channel(options.inbox_capacity.max(1));
        let agent = Agent::new(services, options);
        let handle = AgentHandle {
            id: agent.id,
            tx,
            foreground: agent.foreground.clone(),
            ledger: agent.ledger.clone(),
            cancel: agent.cancel.clone(),
        };
        tokio::spawn(agent.run(rx));
        handle
    }

    fn new(services: AgentServices, options: AgentOptions) -> Self {
        let enabled = config::notifications_enabled(services.config.as_ref());
        let (notifications, rx) = watch::channel(enabled);
        let notices = Notices::new(services.ui.clone(), rx);
        let executor = Arc::new(ActionExecutor::new(services.host.clone(), notices.clone()));
        Self {
            id: Uuid::new_v4(),
            services,
            options,
            ledger: DedupLedger::new(),
            foreground: ForegroundLock::new(),
            capture: RegionCapture::new(),
            capture_claim: None,
            notifications,
            executor,
            notices,
            cancel: CancellationToken::new(),
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Inbound>) {
        tracing::info!(agent_id = %self.id, "agent attached");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                inbound = rx.recv() => match inbound {
                    Some(Inbound::Message { message, reply }) => {
                        let answer = self.handle_message(message);
                        let _ = reply.send(answer);
                    }
                    Some(Inbound::Page(event)) => self.handle_page_event(event),
                    None => break,
                },
            }
        }
        self.teardown();
        tracing::info!(agent_id = %self.id, "agent detached");
    }

    fn teardown(&mut self) {
        self.cancel.cancel();
        self.foreground.close();
        if self.capture.cancel() == CaptureStep::Cancelled {
            self.services.ui.hide_capture_overlay();
        }
        self.capture_claim = None;
    }

    fn handle_message(&mut self, message: AgentMessage) -> Option<AgentReply> {
        match message {
            AgentMessage::Ping => Some(AgentReply::ok()),
            AgentMessage::StartCapture => {
                self.start_capture();
                None
            }
            AgentMessage::ToggleNotifications => {
                self.toggle_notifications();
                None
            }
            AgentMessage::ProcessResult { result, mode } => {
                if let Some(guard) = self.admit(&Task::deliver(result.as_str(), mode)) {
                    self.execute_result(result, mode, guard);
                }
                None
            }
            AgentMessage::ShowError { error } => {
                if let Some(_guard) = self.admit(&Task::error(error.as_str())) {
                    self.notices.error(&error);
                }
                None
            }
        }
    }

    /// Claim the task's fingerprint; `None` means a copy is already running.
    fn admit(&self, task: &Task) -> Option<InFlightGuard> {
        let guard = self.ledger.should_process(task);
        if guard.is_none() {
            tracing::debug!(agent_id = %self.id, kind = ?task.kind, "duplicate task ignored");
        }
        guard
    }

    fn execute_result(&self, text: String, mode: DeliveryMode, guard: InFlightGuard) {
        let executor = self.executor.clone();
        let notices = self.notices.clone();
        match mode {
            DeliveryMode::Clipboard => {
                tokio::spawn(async move {
                    let _guard = guard;
                    if let Err(e) = executor.deliver_clipboard(&text).await {
                        tracing::warn!(error = %e, "clipboard delivery failed");
                        notices.error(&e.to_string());
                    }
                });
            }
            DeliveryMode::Input => {
                let foreground = self.foreground.clone();
                let countdown = Countdown::new(self.services.ui.clone(), self.notifications.subscribe());
                let seconds = self.options.input_countdown_secs;
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    // Queues behind an active capture.
                    let claim = tokio::select! {
                        _ = cancel.cancelled() => return,
                        claim = foreground.claim(AgentLifecycleState::CountingDown) => claim,
                    };
                    let Ok(_claim) = claim else {
                        return;
                    };
                    if countdown.run(seconds, &cancel).await == CountdownOutcome::Cancelled {
                        return;
                    }
                    if let Err(e) = executor.deliver_input(&text) {
                        tracing::warn!(error = %e, "input delivery failed");
                        notices.error(&e.to_string());
                    }
                });
            }
        }
    }

    fn toggle_notifications(&mut self) {
        let enabled = !config::notifications_enabled(self.services.config.as_ref());
        if let Err(e) = self
            .services
            .config
            .set(keys::NOTIFICATIONS_ENABLED, serde_json::Value::Bool(enabled))
        {
            tracing::warn!(error = %e, "failed to persist notification flag");
        }
        self.notifications.send_replace(enabled);
        tracing::info!(agent_id = %self.id, enabled, "notifications toggled");
        if enabled {
            self.notices.info("Notifications enabled");
        }
    }

    fn start_capture(&mut self) {
        if self.capture.is_armed() {
            tracing::debug!(agent_id = %self.id, "capture already active");
            return;
        }
        let Some(claim) = self.foreground.try_claim(AgentLifecycleState::Capturing) else {
            tracing::info!(agent_id = %self.id, "capture rejected, countdown in progress");
            self.notices.error(&EduCopyError::Busy.to_string());
            return;
        };
        self.capture_claim = Some(claim);
        self.capture.arm();
        self.services.ui.show_capture_overlay();
        tracing::info!(agent_id = %self.id, "capture started");
    }

    fn handle_page_event(&mut self, event: PageEvent) {
        let step = match event {
            PageEvent::PointerDown { client, scroll } => self.capture.pointer_down(client, scroll),
            PageEvent::PointerMove { client, scroll } => self.capture.pointer_move(client, scroll),
            PageEvent::PointerUp { client, scroll } => self.capture.pointer_up(client, scroll),
            PageEvent::KeyDown { key } if key == "Escape" => self.capture.cancel(),
            PageEvent::KeyDown { .. } => CaptureStep::Ignored,
        };

        match step {
            CaptureStep::Ignored => {}
            CaptureStep::Started(rect) | CaptureStep::Updated(rect) => {
                self.services.ui.update_capture_selection(rect);
            }
            CaptureStep::Cancelled => {
                self.end_capture();
                tracing::info!(agent_id = %self.id, "capture cancelled");
            }
            CaptureStep::TooSmall(region) => {
                self.end_capture();
                self.notices.error(
                    &EduCopyError::CaptureTooSmall {
                        width: region.width,
                        height: region.height,
                    }
                    .to_string(),
                );
            }
            CaptureStep::Finished(region) => {
                self.end_capture();
                self.process_region(region);
            }
        }
    }

    /// Remove the overlay and release the foreground before anything else runs.
    fn end_capture(&mut self) {
        self.services.ui.hide_capture_overlay();
        self.capture_claim = None;
    }

    fn process_region(&self, region: CaptureRegion) {
        self.notices.info("Processing capture...");
        let rasterizer = self.services.rasterizer.clone();
        let ui = self.services.ui.clone();
        let config = self.services.config.clone();
        let controller = self.services.controller.clone();
        let notices = self.notices.clone();
        let agent_id = self.id;

        tokio::spawn(async move {
            let result = async {
                let raster = rasterizer.capture().await.map_err(|e| match e {
                    EduCopyError::CaptureFailure(_) => e,
                    other => EduCopyError::CaptureFailure(other.to_string()),
                })?;
                let captured = crop_region(&raster, &region)?;
                if config::show_preview(config.as_ref()) {
                    ui.show_preview(&captured.data_url);
                }
                tracing::info!(
                    agent_id = %agent_id,
                    width = captured.width,
                    height = captured.height,
                    "region captured, sending to controller"
                );
                controller
                    .send(ControllerMessage::ProcessImage {
                        image_data: captured.data_url,
                    })
                    .await
            }
            .await;

            if let Err(e) = result {
                tracing::warn!(agent_id = %agent_id, error = %e, "region capture failed");
                notices.error(&e.to_string());
            }
        });
    }
}
