use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::{EduCopyError, EduCopyResult};
use crate::perception::types::{PagePoint, ScrollOffset};

/// Lifecycle of the Agent inside one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLifecycleState {
    Uninjected,
    Idle,
    Capturing,
    CountingDown,
}

/// Pointer and keyboard input routed to the Agent by the page.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    PointerDown { client: PagePoint, scroll: ScrollOffset },
    PointerMove { client: PagePoint, scroll: ScrollOffset },
    PointerUp { client: PagePoint, scroll: ScrollOffset },
    KeyDown { key: String },
}

/// Single mutual-exclusion lock over interactive foreground UI
/// (capture overlay, countdown badge).
#[derive(Debug, Clone)]
pub struct ForegroundLock {
    permits: Arc<Semaphore>,
    state: Arc<Mutex<AgentLifecycleState>>,
}

impl Default for ForegroundLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundLock {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            state: Arc::new(Mutex::new(AgentLifecycleState::Idle)),
        }
    }

    pub fn state(&self) -> AgentLifecycleState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim without waiting; `None` if another foreground interaction is active.
    pub fn try_claim(&self, as_state: AgentLifecycleState) -> Option<ForegroundClaim> {
        let permit = self.permits.clone().try_acquire_owned().ok()?;
        Some(self.enter(permit, as_state))
    }

    /// Wait until the foreground is free, then claim it.
    pub async fn claim(&self, as_state: AgentLifecycleState) -> EduCopyResult<ForegroundClaim> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EduCopyError::Cancelled)?;
        Ok(self.enter(permit, as_state))
    }

    /// Reject further claims and wake waiters with an error.
    pub fn close(&self) {
        self.permits.close();
    }

    fn enter(&self, permit: OwnedSemaphorePermit, as_state: AgentLifecycleState) -> ForegroundClaim {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = as_state;
        ForegroundClaim {
            state: self.state.clone(),
            _permit: permit,
        }
    }
}

/// Held while a foreground interaction runs. Dropping it returns the Agent to `Idle`.
#[derive(Debug)]
pub struct ForegroundClaim {
    state: Arc<Mutex<AgentLifecycleState>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for ForegroundClaim {
    fn drop(&mut self) {
        // The permit field drops after this body, so a queued claimant cannot
        // have set its own state yet.
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = AgentLifecycleState::Idle;
    }
}
