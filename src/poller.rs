use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::api::BackendClient;
use crate::error::BackendError;
use crate::event::{AppEvent, BackendEvent, EventSender};
use crate::state::Status;

/// Lifecycle of the status timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    /// Backend reported `ready && !indexing`; no further polls this session.
    Converged,
    /// Torn down.
    Stopped,
}

/// What applying one poll result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    Converged,
    Failed,
    Ignored,
}

/// Periodically fetches backend indexing status until it converges.
pub struct StatusPoller {
    client: BackendClient,
    interval: Duration,
    status: Option<Status>,
    state: PollerState,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(client: BackendClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            status: None,
            state: PollerState::Idle,
            generation: 0,
            task: None,
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PollerState::Running
    }

    /// Fetches immediately, then once per interval. A no-op while running or
    /// after teardown.
    pub fn start(&mut self, tx: &EventSender) {
        if matches!(self.state, PollerState::Running | PollerState::Stopped) {
            return;
        }
        self.generation += 1;
        self.state = PollerState::Running;

        let generation = self.generation;
        let client = self.client.clone();
        let period = self.interval;
        let tx = tx.clone();
        debug!(generation, ?period, "status polling started");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = client.status().await;
                let event = AppEvent::Backend(BackendEvent::Status { generation, result });
                if tx.send(event).is_err() {
                    break;
                }
            }
        }));
    }

    /// Restarts polling after convergence, e.g. when a reindex was triggered.
    /// Returns true if polling was actually restarted.
    pub fn resume(&mut self, tx: &EventSender) -> bool {
        if self.state != PollerState::Converged {
            return false;
        }
        info!("resuming status polling");
        self.start(tx);
        true
    }

    /// Stores a poll result. Results from an older generation, or arriving
    /// after the timer was stopped, are dropped.
    pub fn apply(&mut self, generation: u64, result: Result<Status, BackendError>) -> PollOutcome {
        if self.state != PollerState::Running || generation != self.generation {
            return PollOutcome::Ignored;
        }

        match result {
            Ok(status) => {
                let converged = status.is_converged();
                debug!(
                    chunks = status.chunks_loaded,
                    ready = status.ready,
                    indexing = status.indexing,
                    "status updated"
                );
                self.status = Some(status);
                if converged {
                    info!("backend index converged, polling stopped");
                    self.halt();
                    self.state = PollerState::Converged;
                    PollOutcome::Converged
                } else {
                    PollOutcome::Updated
                }
            }
            Err(err) => {
                debug!(error = %err, "status poll failed");
                if self.status.is_none() {
                    self.status = Some(Status::unknown());
                }
                PollOutcome::Failed
            }
        }
    }

    /// Tears the poller down for good. Idempotent.
    pub fn stop(&mut self) {
        self.halt();
        self.state = PollerState::Stopped;
    }

    fn halt(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{self, EventReceiver};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PERIOD: Duration = Duration::from_millis(60);

    fn poller(server: &MockServer) -> StatusPoller {
        let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        StatusPoller::new(client, PERIOD)
    }

    fn offline_poller() -> StatusPoller {
        let client = BackendClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        StatusPoller::new(client, PERIOD)
    }

    async fn next_status(rx: &mut EventReceiver) -> (u64, Result<Status, BackendError>) {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(AppEvent::Backend(BackendEvent::Status { generation, result }))) => {
                (generation, result)
            }
            other => panic!("expected status event, got {other:?}"),
        }
    }

    fn status(chunks: u64, ready: bool, indexing: bool) -> Status {
        Status {
            chunks_loaded: chunks,
            ready,
            indexing,
            ..Status::unknown()
        }
    }

    #[tokio::test]
    async fn converges_after_two_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chunksLoaded": 42,
                "ready": true,
                "indexing": false
            })))
            .mount(&server)
            .await;

        let mut poller = poller(&server);
        let (tx, mut rx) = event::channel();
        poller.start(&tx);

        let mut outcomes = Vec::new();
        while outcomes.last() != Some(&PollOutcome::Converged) {
            let (generation, result) = next_status(&mut rx).await;
            outcomes.push(poller.apply(generation, result));
        }

        assert_eq!(
            outcomes,
            vec![PollOutcome::Failed, PollOutcome::Failed, PollOutcome::Converged]
        );
        assert_eq!(poller.status(), Some(&status(42, true, false)));
        assert_eq!(poller.state(), PollerState::Converged);

        tokio::time::sleep(PERIOD * 4).await;
        assert!(rx.try_recv().is_err());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn keeps_polling_while_indexing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chunksLoaded": 0,
                "ready": false,
                "indexing": true
            })))
            .mount(&server)
            .await;

        let mut poller = poller(&server);
        let (tx, mut rx) = event::channel();
        poller.start(&tx);

        for _ in 0..3 {
            let (generation, result) = next_status(&mut rx).await;
            assert_eq!(poller.apply(generation, result), PollOutcome::Updated);
        }
        assert!(poller.is_running());
        poller.stop();
    }

    #[test]
    fn failure_without_prior_status_sets_placeholder() {
        let mut poller = offline_poller();
        poller.state = PollerState::Running;
        poller.generation = 1;

        assert_eq!(poller.apply(1, Err(BackendError::Timeout)), PollOutcome::Failed);
        assert_eq!(poller.status(), Some(&Status::unknown()));
    }

    #[test]
    fn failure_preserves_previous_status() {
        let mut poller = offline_poller();
        poller.state = PollerState::Running;
        poller.generation = 1;

        let indexing = status(10, false, true);
        assert_eq!(poller.apply(1, Ok(indexing.clone())), PollOutcome::Updated);
        let err = BackendError::Http {
            status: 502,
            reason: None,
        };
        assert_eq!(poller.apply(1, Err(err)), PollOutcome::Failed);
        assert_eq!(poller.status(), Some(&indexing));
    }

    #[test]
    fn results_after_stop_or_from_old_generation_are_ignored() {
        let mut poller = offline_poller();
        poller.state = PollerState::Running;
        poller.generation = 2;

        assert_eq!(
            poller.apply(1, Ok(status(5, false, false))),
            PollOutcome::Ignored
        );
        assert_eq!(poller.status(), None);

        poller.stop();
        poller.stop();
        assert_eq!(poller.state(), PollerState::Stopped);
        assert_eq!(
            poller.apply(2, Ok(status(5, false, false))),
            PollOutcome::Ignored
        );
        assert_eq!(poller.status(), None);
    }

    #[tokio::test]
    async fn resume_only_after_convergence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chunksLoaded": 3,
                "ready": true,
                "indexing": false
            })))
            .mount(&server)
            .await;

        let mut poller = poller(&server);
        let (tx, mut rx) = event::channel();
        assert!(!poller.resume(&tx));

        poller.start(&tx);
        let (generation, result) = next_status(&mut rx).await;
        assert_eq!(poller.apply(generation, result), PollOutcome::Converged);

        assert!(poller.resume(&tx));
        let (next_generation, result) = next_status(&mut rx).await;
        assert_eq!(next_generation, generation + 1);
        assert_eq!(poller.apply(next_generation, result), PollOutcome::Converged);

        poller.stop();
        assert!(!poller.resume(&tx));
    }
}
