pub mod agent_engine;
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;
pub mod protocol;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ConfigStore;
use crate::controller::Controller;
use crate::llm::provider::InferenceService;
use crate::protocol::channel::{ControllerEnvelope, Notifier};
use crate::protocol::delivery::{DeliveryConfig, DeliveryProtocol};

/// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Load `.env` if present so `EDUCOPY_API_KEY` / `EDUCOPY_API_ENDPOINT` can be set there.
pub fn init_env() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), ".env loaded");
    }
}

/// A running Controller plus the inbox Agents report back to.
pub struct Runtime {
    pub controller: Arc<Controller>,
    /// Give a clone to every page target so its Agent can reach the Controller.
    pub controller_tx: mpsc::Sender<ControllerEnvelope>,
    pub inbox: JoinHandle<()>,
}

/// Wire a Controller to its collaborators and start draining its inbox.
pub fn start(
    config: Arc<dyn ConfigStore>,
    inference: Arc<dyn InferenceService>,
    notifier: Arc<dyn Notifier>,
    delivery: DeliveryConfig,
) -> Runtime {
    let controller = Arc::new(Controller::new(
        config,
        inference,
        DeliveryProtocol::new(delivery, notifier),
    ));
    // Agent → Controller channel (buffer=32).
    let (controller_tx, controller_rx) = mpsc::channel::<ControllerEnvelope>(32);
    tracing::info!("spawning controller inbox");
    let inbox = tokio::spawn(controller.clone().run_inbox(controller_rx));
    Runtime {
        controller,
        controller_tx,
        inbox,
    }
}
