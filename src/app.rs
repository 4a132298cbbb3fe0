use anyhow::{Context, Result};
use arboard::Clipboard;
use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::api::BackendClient;
use crate::chat::{ChatController, SubmitRejection};
use crate::config::Config;
use crate::conversation::{ConversationStore, ImageSlot};
use crate::event::{BackendEvent, EventSender};
use crate::poller::StatusPoller;
use crate::reindex::{ReindexController, ReindexRejection, ReindexReport};
use crate::state::Status;
use crate::viewer::ImageViewer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Modal message shown until the user dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub success: bool,
    pub message: String,
}

impl From<ReindexReport> for Notice {
    fn from(report: ReindexReport) -> Self {
        Self {
            success: report.success,
            message: report.message,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input buffer
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Conversation
    pub conversation: ConversationStore,
    pub chat: ChatController,
    pub chat_scroll: u16,
    pub follow_bottom: bool, // Keep the newest message in view on each render
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub selected_image: Option<ImageSlot>,

    // Backend status and reindexing
    pub poller: StatusPoller,
    pub reindex: ReindexController,
    pub notice: Option<Notice>,

    // Image overlay
    pub viewer: ImageViewer,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub viewer_area: Option<Rect>,

    clipboard: Option<Clipboard>,
    client: BackendClient,
    config: Config,
    tx: EventSender,
    torn_down: bool,
}

impl App {
    pub fn new(config: Config, tx: EventSender) -> Result<Self> {
        let client = BackendClient::new(&config.backend_url, config.request_timeout())?;

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            input_cursor: 0,

            conversation: ConversationStore::new(),
            chat: ChatController::new(client.clone()),
            chat_scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_width: 0,
            selected_image: None,

            poller: StatusPoller::new(client.clone(), config.poll_interval()),
            reindex: ReindexController::new(client.clone()),
            notice: None,

            viewer: ImageViewer::default(),

            animation_frame: 0,

            chat_area: None,
            viewer_area: None,

            clipboard: None,
            client,
            config,
            tx,
            torn_down: false,
        })
    }

    /// Kicks off status polling.
    pub fn start(&mut self) {
        info!(backend = %self.client.base_url(), "session started");
        self.poller.start(&self.tx);
    }

    pub fn status(&self) -> Option<&Status> {
        self.poller.status()
    }

    pub fn is_indexing(&self) -> bool {
        self.status().is_some_and(|s| s.indexing)
    }

    /// Typing is allowed unless a query is pending or the backend is indexing.
    pub fn input_enabled(&self) -> bool {
        !self.chat.is_pending() && !self.is_indexing()
    }

    pub fn can_send(&self) -> bool {
        self.input_enabled() && !self.input.trim().is_empty()
    }

    pub fn can_reindex(&self) -> bool {
        !self.is_indexing() && !self.reindex.is_in_flight()
    }

    pub fn submit(&mut self) -> Result<(), SubmitRejection> {
        let status = self.poller.status();
        self.chat
            .submit(&mut self.input, status, &mut self.conversation, &self.tx)?;
        self.input_cursor = 0;
        self.scroll_to_bottom();
        Ok(())
    }

    pub fn trigger_reindex(&mut self) -> Result<(), ReindexRejection> {
        self.reindex.trigger(self.poller.status(), &self.tx)
    }

    /// Single entry point for completed backend calls.
    pub fn apply_backend(&mut self, event: BackendEvent) {
        if self.torn_down {
            debug!("dropping backend event after teardown");
            return;
        }

        match event {
            BackendEvent::Status { generation, result } => {
                self.poller.apply(generation, result);
            }
            BackendEvent::Chat { generation, result } => {
                if self.chat.complete(generation, result, &mut self.conversation) {
                    self.scroll_to_bottom();
                }
            }
            BackendEvent::Reindex { generation, result } => {
                if let Some(report) = self.reindex.complete(generation, result) {
                    if report.success && self.config.resume_polling_after_reindex {
                        self.poller.resume(&self.tx);
                    }
                    self.notice = Some(report.into());
                }
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    // Image selection within the conversation
    pub fn select_next_image(&mut self) {
        self.step_image_selection(true);
    }

    pub fn select_prev_image(&mut self) {
        self.step_image_selection(false);
    }

    fn step_image_selection(&mut self, forward: bool) {
        let slots = self.conversation.image_slots();
        if slots.is_empty() {
            self.selected_image = None;
            return;
        }
        let current = self
            .selected_image
            .and_then(|sel| slots.iter().position(|s| *s == sel));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => slots.len() - 1,
            (Some(i), true) => (i + 1) % slots.len(),
            (Some(i), false) => (i + slots.len() - 1) % slots.len(),
        };
        self.selected_image = Some(slots[next]);
    }

    pub fn open_selected_image(&mut self) {
        let Some(slot) = self.selected_image else {
            return;
        };
        if let Some(images) = self.conversation.images_of(slot) {
            self.viewer.open(images.to_vec(), slot.image);
        }
    }

    /// Absolute form of an image reference, for display and copying.
    pub fn image_location(&self, reference: &str) -> String {
        self.client.resolve_image(reference)
    }

    /// Copies `text` to the system clipboard, raising a notice on failure.
    pub fn copy_to_clipboard(&mut self, text: &str) {
        let result = self.write_clipboard(text);
        self.report_copy(result);
    }

    fn write_clipboard(&mut self, text: &str) -> Result<()> {
        // The handle stays alive for the session; on X11 the copied text
        // disappears with it.
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new().context("clipboard unavailable")?,
        };
        self.clipboard
            .insert(clipboard)
            .set_text(text.to_string())
            .context("failed to set clipboard text")
    }

    fn report_copy(&mut self, result: Result<()>) {
        match result {
            Ok(()) => debug!("copied image link"),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "clipboard copy failed");
                self.notice = Some(Notice {
                    success: false,
                    message: format!("Could not copy image link: {e:#}"),
                });
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() || self.is_indexing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    /// Scroll chat so the newest message (or "Thinking...") is visible.
    ///
    /// The estimate here covers the time before the first render; once the
    /// chat area is drawn, `follow_bottom` makes the renderer pin the scroll
    /// to the exact wrapped height.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;

        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let wrapped = |chars: usize| chars / wrap_width + 1;

        let mut total_lines: usize = 0;

        for msg in self.conversation.messages() {
            total_lines += 1; // Role line ("You:" or "Assistant:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                total_lines += wrapped(line.chars().count());
            }
            for (i, reference) in msg.image_refs().iter().enumerate() {
                let label = format!("  [image {}] ", i + 1);
                total_lines += wrapped(label.len() + reference.chars().count());
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat.is_pending() {
            total_lines += 2; // "Assistant:" + "Thinking..."
        }

        self.pin_scroll(total_lines);
    }

    /// Scroll so the last of `total_lines` sits at the bottom of the chat area.
    pub fn pin_scroll(&mut self, total_lines: usize) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };
        let offset = total_lines.saturating_sub(visible_height);
        self.chat_scroll = u16::try_from(offset).unwrap_or(u16::MAX);
    }

    /// Stops the poller and abandons in-flight requests. Nothing that
    /// resolves afterwards is applied. Idempotent.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.poller.stop();
        self.chat.cancel();
        self.reindex.cancel();
        info!("session closed");
    }
}
