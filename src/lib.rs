pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod poller;
pub mod reindex;
pub mod state;
pub mod tui;
pub mod ui;
pub mod viewer;

// Re-export main types for convenience
pub use api::{BackendClient, ChatAnswer, ReloadSummary};
pub use app::App;
pub use config::Config;
pub use conversation::ConversationStore;
pub use error::BackendError;
pub use state::{Message, Role, Status};
pub use viewer::ImageViewer;
