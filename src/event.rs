use crossterm::event::{KeyEvent, MouseEvent};
use tokio::sync::mpsc;

use crate::api::{ChatAnswer, ReloadSummary};
use crate::error::BackendError;
use crate::state::Status;

/// Everything the main loop reacts to. Terminal input, the animation tick and
/// completed backend calls all arrive on the same channel, so state is only
/// ever mutated from one place.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
    Backend(BackendEvent),
}

/// Outcome of a backend call, tagged with the generation of the component
/// that issued it. Stale generations are dropped on arrival.
#[derive(Debug)]
pub enum BackendEvent {
    Status {
        generation: u64,
        result: Result<Status, BackendError>,
    },
    Chat {
        generation: u64,
        result: Result<ChatAnswer, BackendError>,
    },
    Reindex {
        generation: u64,
        result: Result<ReloadSummary, BackendError>,
    },
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
