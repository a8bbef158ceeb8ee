use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::executor::host::PageUi;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Elapsed,
    Cancelled,
}

/// Visible, one-second-granularity delay before simulated input.
///
/// Turning notifications off mid-countdown only removes the badge: the
/// schedule keeps running and the countdown still elapses at the original
/// deadline. Only the cancellation token stops the schedule itself.
pub struct Countdown {
    ui: Arc<dyn PageUi>,
    notifications: watch::Receiver<bool>,
}

impl Countdown {
    pub fn new(ui: Arc<dyn PageUi>, notifications: watch::Receiver<bool>) -> Self {
        Self { ui, notifications }
    }

    /// Spawn the countdown and call `on_complete` once it elapses.
    pub fn start<F>(self, seconds: u32, cancel: CancellationToken, on_complete: F) -> JoinHandle<CountdownOutcome>
    where
        F: FnOnce() + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.run(seconds, &cancel).await;
            if outcome == CountdownOutcome::Elapsed {
                on_complete();
            }
            outcome
        })
    }

    pub async fn run(mut self, seconds: u32, cancel: &CancellationToken) -> CountdownOutcome {
        let started = Instant::now();
        let mut visible = *self.notifications.borrow_and_update();
        let mut watching = true;

        for remaining in (0..=seconds).rev() {
            if visible {
                self.ui.show_countdown(remaining);
            }
            if remaining == 0 {
                break;
            }

            let deadline = started + TICK * (seconds - remaining + 1);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        if visible {
                            self.ui.hide_countdown();
                        }
                        tracing::debug!(remaining, "countdown cancelled");
                        return CountdownOutcome::Cancelled;
                    }
                    _ = tokio::time::sleep_until(deadline) => break,
                    changed = self.notifications.changed(), if visible && watching => {
                        match changed {
                            Ok(()) => {
                                if !*self.notifications.borrow_and_update() {
                                    self.ui.hide_countdown();
                                    visible = false;
                                    tracing::debug!(remaining, "notifications disabled, countdown badge removed");
                                }
                            }
                            Err(_) => watching = false,
                        }
                    }
                }
            }
        }

        if visible {
            self.ui.hide_countdown();
        }
        CountdownOutcome::Elapsed
    }
}
