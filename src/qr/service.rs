//! Polling refresh loop for the QR display
//!
//! One tokio task owns the display state exclusively. Its only two event
//! sources are the poll timer and the manual-regenerate command channel, so
//! fetches are serialized: at most one backend request is ever in flight and
//! results commit in the order they were started. A regenerate resets the
//! interval, skipping the tick that was scheduled before it.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::backend::{BackendClient, FetchError, QrTokenRecord};
use crate::qr::display::DisplayState;

#[derive(Debug)]
pub enum DisplayCommand {
    /// Ask the backend to rotate the token now, then refresh immediately.
    Regenerate { bearer_token: String },
}

#[derive(Debug, thiserror::Error)]
#[error("display loop is no longer running")]
pub struct DisplayClosed;

/// Handle to a running display loop.
///
/// Cheap to clone; view handlers use it to read the latest snapshot and to
/// enqueue commands. Nothing outside the loop can write the display state.
#[derive(Debug, Clone)]
pub struct QrDisplay {
    commands: mpsc::Sender<DisplayCommand>,
    snapshot: watch::Receiver<DisplayState>,
}

impl QrDisplay {
    /// Spawns the refresh loop for one company's QR display.
    pub fn spawn(
        client: BackendClient,
        company_id: i64,
        frontend_base_url: String,
        poll_interval: Duration,
    ) -> QrDisplay {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(DisplayState::default());

        let refresh_loop = RefreshLoop {
            client,
            company_id,
            frontend_base_url,
            state_tx,
        };
        tokio::spawn(refresh_loop.run(command_rx, poll_interval));

        QrDisplay {
            commands: command_tx,
            snapshot: state_rx,
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> DisplayState {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.snapshot.clone()
    }

    /// Enqueues a manual regeneration with the operator's bearer token.
    pub async fn regenerate(&self, bearer_token: String) -> Result<(), DisplayClosed> {
        self.commands
            .send(DisplayCommand::Regenerate { bearer_token })
            .await
            .map_err(|_| DisplayClosed)
    }
}

struct RefreshLoop {
    client: BackendClient,
    company_id: i64,
    frontend_base_url: String,
    state_tx: watch::Sender<DisplayState>,
}

impl RefreshLoop {
    async fn run(self, mut commands: mpsc::Receiver<DisplayCommand>, poll_interval: Duration) {
        info!(
            company_id = self.company_id,
            "🔄 QR display loop started (poll interval: {:?})", poll_interval
        );

        let mut interval = tokio::time::interval(poll_interval);
        // A tick that queued up behind a slow fetch is not a new poll.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.client.fetch_version(self.company_id).await;
                    if !self.commit(outcome) {
                        break;
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(DisplayCommand::Regenerate { bearer_token }) => {
                            if !self.handle_regenerate(&bearer_token).await {
                                break;
                            }
                            // Skip the tick that was scheduled before the
                            // regenerate so a stale poll result cannot land
                            // right after the fresh one.
                            interval.reset();
                        }
                        None => break,
                    }
                }
            }
        }

        info!(company_id = self.company_id, "🛑 QR display loop stopped");
    }

    /// Rotate on the backend, then fetch and commit the fresh token.
    async fn handle_regenerate(&self, bearer_token: &str) -> bool {
        info!(company_id = self.company_id, "🔁 Manual QR regeneration requested");

        match self.client.regenerate(bearer_token).await {
            Ok(()) => {
                let outcome = self.client.fetch_version(self.company_id).await;
                self.commit(outcome)
            }
            Err(e) => {
                // Rotation failed: the displayed image stays, the operator
                // sees the error indicator.
                error!(company_id = self.company_id, "❌ QR regeneration failed: {}", e);
                self.commit(Err(e))
            }
        }
    }

    /// Applies one fetch outcome and publishes the next snapshot.
    /// Returns `false` once every snapshot receiver is gone.
    fn commit(&self, outcome: Result<QrTokenRecord, FetchError>) -> bool {
        if let Err(e) = &outcome {
            warn!(company_id = self.company_id, "⚠️ QR fetch failed: {}", e);
        }

        let previous = self.state_tx.borrow().clone();
        let next = previous.apply(
            outcome,
            &self.frontend_base_url,
            self.company_id,
            chrono::Utc::now(),
        );

        if next.render_count > previous.render_count {
            info!(
                company_id = self.company_id,
                render_count = next.render_count,
                "🆕 Token changed, QR redrawn"
            );
        }

        self.state_tx.send(next).is_ok()
    }
}
