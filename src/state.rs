//! UI-agnostic application state types
//!
//! This module contains the data structures exchanged with the backend and
//! projected by the terminal UI. None of them depend on ratatui.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// A single turn in the conversation log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: None,
        }
    }

    pub fn assistant(content: impl Into<String>, images: Option<Vec<String>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            images,
        }
    }

    /// Image references attached to this message, empty when there are none.
    pub fn image_refs(&self) -> &[String] {
        self.images.as_deref().unwrap_or(&[])
    }
}

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// Backend indexing state as reported by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub chunks_loaded: u64,
    pub ready: bool,
    pub indexing: bool,
    #[serde(default)]
    pub last_index_error: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_indexed_at: Option<i64>,
    #[serde(default)]
    pub catalog_enabled: Option<bool>,
    #[serde(default)]
    pub catalog_products: Option<u64>,
}

impl Status {
    /// Placeholder used when the very first poll fails, so the UI always has
    /// something to render.
    pub fn unknown() -> Self {
        Self {
            chunks_loaded: 0,
            ready: false,
            indexing: false,
            last_index_error: None,
            last_indexed_at: None,
            catalog_enabled: None,
            catalog_products: None,
        }
    }

    /// Polling stops once the backend reports this state.
    pub fn is_converged(&self) -> bool {
        self.ready && !self.indexing
    }

    pub fn indicator(&self) -> StatusIndicator {
        if self.indexing {
            StatusIndicator::Indexing
        } else if self.ready {
            StatusIndicator::Ready
        } else {
            StatusIndicator::NotReady
        }
    }

    /// Human readable one-line summary. `indexing` wins over `ready`.
    pub fn summary(&self) -> String {
        let catalog = self.catalog_enabled.unwrap_or(false);
        match self.indicator() {
            StatusIndicator::Indexing => "Indexing PDFs...".to_string(),
            StatusIndicator::Ready if catalog => {
                format!("Ready ({} products)", self.catalog_products.unwrap_or(0))
            }
            StatusIndicator::Ready => format!("Ready ({} chunks)", self.chunks_loaded),
            StatusIndicator::NotReady if catalog => "Catalog not indexed".to_string(),
            StatusIndicator::NotReady => "Not indexed".to_string(),
        }
    }

    pub fn index_error(&self) -> Option<&str> {
        self.last_index_error
            .as_deref()
            .filter(|e| !e.trim().is_empty())
    }

    /// `lastIndexedAt` rendered in local time.
    pub fn last_indexed_display(&self) -> Option<String> {
        let millis = self.last_indexed_at?;
        Local
            .timestamp_millis_opt(millis)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Indexing,
    Ready,
    NotReady,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_parses_backend_payload() {
        let body = r#"{
            "chunksLoaded": 120,
            "ready": true,
            "indexing": false,
            "lastIndexError": null,
            "lastIndexedAt": 1700000000000,
            "catalogEnabled": false
        }"#;
        let status: Status = serde_json::from_str(body).unwrap();
        assert_eq!(status.chunks_loaded, 120);
        assert!(status.is_converged());
        assert_eq!(status.last_indexed_at, Some(1_700_000_000_000));
        assert_eq!(status.catalog_products, None);
    }

    #[test]
    fn indexing_takes_precedence_over_ready() {
        let mut status = Status::unknown();
        status.ready = true;
        status.indexing = true;
        assert_eq!(status.indicator(), StatusIndicator::Indexing);
        assert_eq!(status.summary(), "Indexing PDFs...");
        assert!(!status.is_converged());
    }

    #[test]
    fn summary_covers_catalog_modes() {
        let mut status = Status::unknown();
        assert_eq!(status.summary(), "Not indexed");

        status.catalog_enabled = Some(true);
        assert_eq!(status.summary(), "Catalog not indexed");

        status.ready = true;
        status.catalog_products = Some(17);
        assert_eq!(status.summary(), "Ready (17 products)");

        status.catalog_enabled = Some(false);
        status.chunks_loaded = 42;
        assert_eq!(status.summary(), "Ready (42 chunks)");
    }

    #[test]
    fn blank_index_error_is_hidden() {
        let mut status = Status::unknown();
        status.last_index_error = Some("  ".to_string());
        assert_eq!(status.index_error(), None);
        status.last_index_error = Some("disk full".to_string());
        assert_eq!(status.index_error(), Some("disk full"));
    }

    #[test]
    fn message_without_images_has_empty_refs() {
        let msg = Message::assistant("hi", None);
        assert!(msg.image_refs().is_empty());
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
