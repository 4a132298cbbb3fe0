use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{BackendClient, ReloadSummary};
use crate::error::BackendError;
use crate::event::{AppEvent, BackendEvent, EventSender};
use crate::state::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexRejection {
    Indexing,
    InFlight,
}

/// User-facing result of a reindex request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexReport {
    pub success: bool,
    pub message: String,
}

impl ReindexReport {
    fn from_result(result: &Result<ReloadSummary, BackendError>) -> Self {
        match result {
            Ok(summary) => Self {
                success: true,
                message: format!(
                    "PDFs reindexed successfully! Indexed {} text chunks.",
                    summary.chunks
                ),
            },
            Err(err) if err.is_unreachable() || err.is_malformed() => Self {
                success: false,
                message: "Failed to reindex PDFs. Make sure the backend is running.".to_string(),
            },
            Err(err) => Self {
                success: false,
                message: format!(
                    "Failed to reindex PDFs: {}",
                    err.reason().unwrap_or("Unknown error")
                ),
            },
        }
    }
}

/// Fires one-shot reindex commands. It never touches the stored status; the
/// poller picks up the new state.
pub struct ReindexController {
    client: BackendClient,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl ReindexController {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn trigger(
        &mut self,
        status: Option<&Status>,
        tx: &EventSender,
    ) -> Result<(), ReindexRejection> {
        if self.is_in_flight() {
            return Err(ReindexRejection::InFlight);
        }
        if status.is_some_and(|s| s.indexing) {
            return Err(ReindexRejection::Indexing);
        }

        self.generation += 1;
        let generation = self.generation;
        let client = self.client.clone();
        let tx = tx.clone();
        info!(generation, "reindex requested");
        self.in_flight = Some(tokio::spawn(async move {
            let result = client.reload().await;
            let _ = tx.send(AppEvent::Backend(BackendEvent::Reindex { generation, result }));
        }));
        Ok(())
    }

    /// Turns a finished request into a report, or `None` if the result is
    /// stale.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<ReloadSummary, BackendError>,
    ) -> Option<ReindexReport> {
        if !self.is_in_flight() || generation != self.generation {
            return None;
        }
        self.in_flight = None;

        match &result {
            Ok(summary) => info!(chunks = summary.chunks, "reindex finished"),
            Err(err) => warn!(error = %err, "reindex failed"),
        }
        Some(ReindexReport::from_result(&result))
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
