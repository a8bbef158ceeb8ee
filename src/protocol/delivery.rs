use std::sync::Arc;
use std::time::Duration;

use crate::errors::{EduCopyError, EduCopyResult};
use crate::protocol::channel::{AgentChannel, Notifier};
use crate::protocol::message::{AgentMessage, Task};

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Full probe → inject → send sequences before falling back.
    pub max_attempts: u32,
    pub probe_timeout: Duration,
    /// Wait after injection so the Agent's listener is attached before sending.
    pub settle_delay: Duration,
    pub backoff: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            probe_timeout: Duration::from_millis(500),
            settle_delay: Duration::from_millis(100),
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    FallbackShown,
}

/// Moves a Task from the Controller to a possibly absent, possibly stale Agent.
pub struct DeliveryProtocol {
    config: DeliveryConfig,
    notifier: Arc<dyn Notifier>,
}

impl DeliveryProtocol {
    pub fn new(config: DeliveryConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self { config, notifier }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Deliver `task`, falling back to a system notification once every attempt failed.
    pub async fn deliver(&self, target: &dyn AgentChannel, task: &Task) -> DeliveryOutcome {
        let message = task.to_message();
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(target, &message).await {
                Ok(()) => {
                    tracing::info!(
                        target_id = %target.target_id(),
                        kind = ?task.kind,
                        attempt,
                        "task delivered"
                    );
                    return DeliveryOutcome::Delivered;
                }
                Err(e) => {
                    tracing::warn!(
                        target_id = %target.target_id(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "delivery attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }
        }

        let err = EduCopyError::DeliveryExhausted {
            attempts: max_attempts,
            last_error,
        };
        tracing::error!(target_id = %target.target_id(), error = %err, "falling back to system notification");
        let (title, body) = task.fallback_notice();
        self.notifier.notify(title, &body);
        DeliveryOutcome::FallbackShown
    }

    async fn attempt(&self, target: &dyn AgentChannel, message: &AgentMessage) -> EduCopyResult<()> {
        let alive = matches!(
            tokio::time::timeout(self.config.probe_timeout, target.ping()).await,
            Ok(Ok(reply)) if reply.is_ok()
        );

        if !alive {
            tracing::debug!(target_id = %target.target_id(), "no agent answered the probe, injecting");
            target.inject().await?;
            tokio::time::sleep(self.config.settle_delay).await;
        }

        target.send(message.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::protocol::message::{AgentReply, DeliveryMode};

    #[derive(Default)]
    struct RecordingNotifier {
        shown: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, message: &str) {
            self.shown.lock().unwrap().push((title.to_string(), message.to_string()));
        }
    }

    /// Scripted channel: the probe answers once `alive`, injection succeeds from
    /// `inject_ok_from` onward, sends fail `send_failures` times.
    #[derive(Default)]
    struct ScriptedChannel {
        alive: std::sync::atomic::AtomicBool,
        hang_probe: bool,
        inject_ok_from: Option<u32>,
        send_failures: AtomicU32,
        probes: AtomicU32,
        injections: AtomicU32,
        sends: Mutex<Vec<AgentMessage>>,
    }

    #[async_trait]
    impl AgentChannel for ScriptedChannel {
        fn target_id(&self) -> &str {
            "scripted"
        }

        async fn ping(&self) -> EduCopyResult<AgentReply> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.hang_probe {
                std::future::pending::<()>().await;
            }
            if self.alive.load(Ordering::SeqCst) {
                Ok(AgentReply::ok())
            } else {
                Err(EduCopyError::Channel("no listener".into()))
            }
        }

        async fn inject(&self) -> EduCopyResult<()> {
            let n = self.injections.fetch_add(1, Ordering::SeqCst) + 1;
            match self.inject_ok_from {
                Some(from) if n >= from => {
                    self.alive.store(true, Ordering::SeqCst);
                    Ok(())
                }
                _ => Err(EduCopyError::Channel("restricted page".into())),
            }
        }

        async fn send(&self, message: AgentMessage) -> EduCopyResult<()> {
            let remaining = self.send_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.send_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(EduCopyError::Channel("context destroyed".into()));
            }
            self.sends.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn protocol(notifier: Arc<RecordingNotifier>) -> DeliveryProtocol {
        DeliveryProtocol::new(DeliveryConfig::default(), notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_agent_skips_injection() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel::default();
        channel.alive.store(true, Ordering::SeqCst);

        let outcome = protocol(notifier.clone())
            .deliver(&channel, &Task::deliver("x", DeliveryMode::Clipboard))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(channel.injections.load(Ordering::SeqCst), 0);
        assert_eq!(channel.sends.lock().unwrap().len(), 1);
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_agent_is_injected_then_sent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel {
            inject_ok_from: Some(1),
            ..Default::default()
        };

        let outcome = protocol(notifier)
            .deliver(&channel, &Task::error("bad key"))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(channel.injections.load(Ordering::SeqCst), 1);
        assert_eq!(
            channel.sends.lock().unwrap().as_slice(),
            &[AgentMessage::ShowError {
                error: "bad key".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_target_falls_back_after_budget() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel::default();

        let outcome = protocol(notifier.clone())
            .deliver(&channel, &Task::deliver("the answer", DeliveryMode::Input))
            .await;

        assert_eq!(outcome, DeliveryOutcome::FallbackShown);
        assert_eq!(channel.injections.load(Ordering::SeqCst), 3);
        assert!(channel.sends.lock().unwrap().is_empty());
        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.as_slice(), &[("LLM result".to_string(), "the answer".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_retries_whole_sequence() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel {
            inject_ok_from: Some(1),
            send_failures: AtomicU32::new(2),
            ..Default::default()
        };

        let outcome = protocol(notifier.clone())
            .deliver(&channel, &Task::deliver("x", DeliveryMode::Clipboard))
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(channel.probes.load(Ordering::SeqCst), 3);
        assert_eq!(channel.sends.lock().unwrap().len(), 1);
        assert!(notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_is_bounded() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel {
            hang_probe: true,
            inject_ok_from: Some(1),
            ..Default::default()
        };

        let outcome = protocol(notifier)
            .deliver(&channel, &Task::start_capture())
            .await;

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(channel.injections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_fallback_uses_error_title() {
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = ScriptedChannel::default();

        protocol(notifier.clone())
            .deliver(&channel, &Task::error("quota exceeded"))
            .await;

        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "Processing error");
        assert_eq!(shown[0].1, "quota exceeded");
    }
}
