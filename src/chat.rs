use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{BackendClient, ChatAnswer};
use crate::conversation::ConversationStore;
use crate::error::BackendError;
use crate::event::{AppEvent, BackendEvent, EventSender};
use crate::state::{Message, Status};

pub const FALLBACK_ANSWER: &str =
    "Sorry, I encountered an error. Please make sure the backend is running and PDFs are indexed.";

/// Why a submission was refused. Refused submissions change nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    Empty,
    Pending,
    Indexing,
}

/// Turns user input into backend chat queries. At most one query is in
/// flight; further submissions are rejected rather than queued.
pub struct ChatController {
    client: BackendClient,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl ChatController {
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Checks the submission preconditions and returns the trimmed question.
    pub fn check(&self, input: &str, status: Option<&Status>) -> Result<String, SubmitRejection> {
        if self.is_pending() {
            return Err(SubmitRejection::Pending);
        }
        if status.is_some_and(|s| s.indexing) {
            return Err(SubmitRejection::Indexing);
        }
        let question = input.trim();
        if question.is_empty() {
            return Err(SubmitRejection::Empty);
        }
        Ok(question.to_string())
    }

    /// Appends the user turn, clears `input` and sends the question.
    pub fn submit(
        &mut self,
        input: &mut String,
        status: Option<&Status>,
        log: &mut ConversationStore,
        tx: &EventSender,
    ) -> Result<(), SubmitRejection> {
        let question = self.check(input, status)?;

        log.push(Message::user(question.clone()));
        input.clear();

        self.generation += 1;
        let generation = self.generation;
        let client = self.client.clone();
        let tx = tx.clone();
        debug!(generation, "sending chat question");
        self.in_flight = Some(tokio::spawn(async move {
            let result = client.chat(&question).await;
            let _ = tx.send(AppEvent::Backend(BackendEvent::Chat { generation, result }));
        }));
        Ok(())
    }

    /// Applies a finished query. Returns false for results that no longer
    /// belong to the pending request.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<ChatAnswer, BackendError>,
        log: &mut ConversationStore,
    ) -> bool {
        if !self.is_pending() || generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale chat result");
            return false;
        }
        self.in_flight = None;

        let message = match result {
            Ok(answer) => Message::assistant(answer.answer, answer.images),
            Err(err) => {
                warn!(error = %err, "chat request failed");
                Message::assistant(FALLBACK_ANSWER, None)
            }
        };
        log.push(message);
        true
    }

    /// Abandons the in-flight query; its result will be ignored.
    pub fn cancel(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
