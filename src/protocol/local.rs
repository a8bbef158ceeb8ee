use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::agent_engine::engine::{Agent, AgentHandle, AgentOptions, AgentServices};
use crate::agent_engine::state::{AgentLifecycleState, PageEvent};
use crate::config::ConfigStore;
use crate::errors::{EduCopyError, EduCopyResult};
use crate::executor::host::{PageHost, PageUi};
use crate::perception::traits::Rasterizer;
use crate::protocol::channel::{AgentChannel, ControllerEnvelope, ControllerLink};
use crate::protocol::message::{AgentMessage, AgentReply, ControllerMessage};

/// Host capabilities of one page, handed to every Agent injected into it.
#[derive(Clone)]
pub struct PageEnvironment {
    pub host: Arc<dyn PageHost>,
    pub ui: Arc<dyn PageUi>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub config: Arc<dyn ConfigStore>,
}

/// A page context living in the same process as the Controller.
///
/// The Agent runs on its own task queue and is only present after `inject`.
/// Navigation detaches it; restricted pages refuse injection.
pub struct PageTarget {
    id: String,
    me: Weak<PageTarget>,
    env: PageEnvironment,
    options: AgentOptions,
    controller_tx: mpsc::Sender<ControllerEnvelope>,
    agent: Mutex<Option<AgentHandle>>,
    injectable: AtomicBool,
    injections: AtomicU32,
}

impl PageTarget {
    pub fn new(
        id: impl Into<String>,
        env: PageEnvironment,
        options: AgentOptions,
        controller_tx: mpsc::Sender<ControllerEnvelope>,
    ) -> Arc<Self> {
        let id = id.into();
        Arc::new_cyclic(|me| Self {
            id,
            me: me.clone(),
            env,
            options,
            controller_tx,
            agent: Mutex::new(None),
            injectable: AtomicBool::new(true),
            injections: AtomicU32::new(0),
        })
    }

    /// Model a page where scripts cannot be injected (browser-internal pages, stores).
    pub fn set_injectable(&self, injectable: bool) {
        self.injectable.store(injectable, Ordering::SeqCst);
    }

    /// Number of times an Agent was actually installed.
    pub fn injection_count(&self) -> u32 {
        self.injections.load(Ordering::SeqCst)
    }

    /// The page navigated away: the current Agent (if any) is gone.
    pub async fn navigate(&self) {
        if let Some(handle) = self.agent.lock().await.take() {
            tracing::info!(target_id = %self.id, agent_id = %handle.id(), "page navigated, agent detached");
            handle.detach();
        }
    }

    pub async fn state(&self) -> AgentLifecycleState {
        match self.live_agent().await {
            Some(handle) => handle.state(),
            None => AgentLifecycleState::Uninjected,
        }
    }

    pub async fn agent(&self) -> Option<AgentHandle> {
        self.live_agent().await
    }

    /// Route a pointer or key event to the Agent. Dropped when none is attached.
    pub async fn page_event(&self, event: PageEvent) -> EduCopyResult<()> {
        match self.live_agent().await {
            Some(handle) => handle.page_event(event).await,
            None => Ok(()),
        }
    }

    async fn live_agent(&self) -> Option<AgentHandle> {
        self.agent
            .lock()
            .await
            .as_ref()
            .filter(|handle| handle.is_alive())
            .cloned()
    }
}

#[async_trait]
impl AgentChannel for PageTarget {
    fn target_id(&self) -> &str {
        &self.id
    }

    async fn ping(&self) -> EduCopyResult<AgentReply> {
        let handle = self
            .live_agent()
            .await
            .ok_or_else(|| EduCopyError::Channel("no agent listening".into()))?;
        handle
            .dispatch(AgentMessage::Ping)
            .await?
            .ok_or_else(|| EduCopyError::Channel("agent did not answer ping".into()))
    }

    async fn inject(&self) -> EduCopyResult<()> {
        if !self.injectable.load(Ordering::SeqCst) {
            return Err(EduCopyError::Channel(format!(
                "cannot inject into restricted page '{}'",
                self.id
            )));
        }

        let mut slot = self.agent.lock().await;
        if slot.as_ref().is_some_and(|handle| handle.is_alive()) {
            tracing::debug!(target_id = %self.id, "agent already present, injection is a no-op");
            return Ok(());
        }

        let link = Arc::new(TargetLink {
            origin: self.me.clone(),
            tx: self.controller_tx.clone(),
        });
        let services = AgentServices {
            host: self.env.host.clone(),
            ui: self.env.ui.clone(),
            rasterizer: self.env.rasterizer.clone(),
            config: self.env.config.clone(),
            controller: link,
        };
        let handle = Agent::spawn(services, self.options.clone());
        tracing::info!(target_id = %self.id, agent_id = %handle.id(), "agent injected");
        *slot = Some(handle);
        self.injections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: AgentMessage) -> EduCopyResult<()> {
        let handle = self
            .live_agent()
            .await
            .ok_or_else(|| EduCopyError::Channel("no agent listening".into()))?;
        handle.dispatch(message).await.map(|_| ())
    }
}

/// Agent → Controller link that tags messages with their page of origin.
struct TargetLink {
    origin: Weak<PageTarget>,
    tx: mpsc::Sender<ControllerEnvelope>,
}

#[async_trait]
impl ControllerLink for TargetLink {
    async fn send(&self, message: ControllerMessage) -> EduCopyResult<()> {
        let origin = self
            .origin
            .upgrade()
            .ok_or_else(|| EduCopyError::Channel("page context destroyed".into()))?;
        self.tx
            .send(ControllerEnvelope { origin, message })
            .await
            .map_err(|_| EduCopyError::Channel("controller is not listening".into()))
    }
}
