use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clipboard::ClipboardWriter;
use crate::events::AppEvent;
use crate::models::{AppConfig, GenerationSession, ReplyResult, SessionStatus};

/// The post being edited. Accepts anything; blankness is only checked when rolling.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    text: String,
}

impl InputState {
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn current_text(&self) -> &str {
        &self.text
    }

    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn pop(&mut self) {
        self.text.pop();
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Transient "Copied!" marker on one card.
///
/// Only one clear is ever scheduled: marking again aborts the previous timer and
/// bumps `generation`, so an expiry from an older mark is ignored.
#[derive(Debug, Default)]
pub struct CopyMarker {
    index: Option<usize>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl CopyMarker {
    pub const fn current(&self) -> Option<usize> {
        self.index
    }

    /// Must be called from within a tokio runtime.
    pub fn mark(&mut self, index: usize, window: Duration, events: &mpsc::UnboundedSender<AppEvent>) {
        self.cancel_pending();
        self.generation = self.generation.wrapping_add(1);
        self.index = Some(index);

        let generation = self.generation;
        let tx = events.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(AppEvent::CopiedExpired { index, generation });
        }));
    }

    /// Clears the marker if the expiry belongs to the current mark.
    pub fn expire(&mut self, index: usize, generation: u64) -> bool {
        if self.index == Some(index) && self.generation == generation {
            self.index = None;
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.cancel_pending();
        self.index = None;
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// What the reply cards show: the active session's replies plus the copy marker.
#[derive(Debug, Default)]
pub struct ResultBoard {
    session: Option<GenerationSession>,
    copied: CopyMarker,
}

impl ResultBoard {
    pub fn begin(&mut self, session: GenerationSession) {
        self.copied.clear();
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&GenerationSession> {
        self.session.as_ref()
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Idle, |s| s.status.clone())
    }

    pub fn is_generating(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.status.is_in_progress())
    }

    pub fn replies(&self) -> &[ReplyResult] {
        self.session
            .as_ref()
            .map(|s| s.results.as_slice())
            .unwrap_or_default()
    }

    /// Appends a reply to the active session. Replies for any other session are dropped.
    pub fn append(&mut self, session_id: Uuid, result: ReplyResult) -> bool {
        match self.session.as_mut() {
            Some(session) if session.id == session_id => session.push(result),
            _ => {
                debug!(session = %session_id, "dropping reply from inactive session");
                false
            }
        }
    }

    pub fn fail(&mut self, session_id: Uuid, reason: String) {
        if let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) {
            session.fail(reason);
        }
    }

    pub fn finish(&mut self, session_id: Uuid) {
        if let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) {
            session.complete();
            let elapsed = Utc::now() - session.started_at;
            info!(
                session = %session_id,
                replies = session.results.len(),
                elapsed_ms = elapsed.num_milliseconds(),
                "session closed"
            );
        }
    }

    pub fn reset(&mut self) {
        self.session = None;
        self.copied.clear();
    }

    pub fn copied(&self) -> Option<usize> {
        self.copied.current()
    }

    pub fn mark_copied(
        &mut self,
        index: usize,
        window: Duration,
        events: &mpsc::UnboundedSender<AppEvent>,
    ) {
        self.copied.mark(index, window, events);
    }

    pub fn clear_copied(&mut self) {
        self.copied.clear();
    }

    pub fn expire_copied(&mut self, index: usize, generation: u64) {
        self.copied.expire(index, generation);
    }
}

#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub show_help: bool,
    pub exit_pending: bool,
    pub input: InputState,
    pub board: ResultBoard,
    pub selected: usize,
    pub model: String,
    pub has_api_key: bool,
    pub notice: Option<String>,
    pub copied_window: Duration,
    /// Session whose task has not reported `GenerationFinished` yet. Survives a reset.
    running: Option<Uuid>,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            should_quit: false,
            show_help: false,
            exit_pending: false,
            input: InputState::default(),
            board: ResultBoard::default(),
            selected: 0,
            model: config.model.clone(),
            has_api_key: config.api_key.is_some(),
            notice: None,
            copied_window: Duration::from_millis(config.copied_millis),
            running: None,
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Whether a session task is still calling the model, even one that was reset
    pub const fn is_rolling(&self) -> bool {
        self.running.is_some()
    }

    /// Whether Enter would start a roll right now
    pub fn can_generate(&self) -> bool {
        !self.is_rolling() && !self.board.is_generating() && !self.input.is_blank()
    }

    /// Opens a new session for the current input.
    ///
    /// Returns the session id and post text to hand to the orchestrator, or `None`
    /// when the input is blank or a session is already rolling. A reset session
    /// still counts as rolling until its task reports `GenerationFinished`.
    pub fn start_generation(&mut self) -> Option<(Uuid, String)> {
        if let Some(running) = self.running {
            debug!(session = %running, "previous session still in flight");
            return None;
        }
        if self.board.is_generating() {
            return None;
        }

        let session = GenerationSession::start(self.input.current_text())?;
        let id = session.id;
        let source_text = session.source_text.clone();

        info!(session = %id, chars = source_text.chars().count(), "rolling replies");

        self.board.begin(session);
        self.running = Some(id);
        self.selected = 0;
        self.notice = None;

        Some((id, source_text))
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ReplyReady { session, result } => {
                self.board.append(session, result);
            }
            AppEvent::GenerationFailed { session, error } => {
                self.board.fail(session, error);
            }
            AppEvent::GenerationFinished { session } => {
                if self.running == Some(session) {
                    self.running = None;
                }
                self.board.finish(session);
            }
            AppEvent::CopiedExpired { index, generation } => {
                self.board.expire_copied(index, generation);
            }
        }
    }

    /// Copies reply `index` to the clipboard and shows the marker on success.
    pub fn copy_reply(
        &mut self,
        index: usize,
        clipboard: &mut dyn ClipboardWriter,
        events: &mpsc::UnboundedSender<AppEvent>,
    ) {
        let Some(text) = self.board.replies().get(index).map(|r| r.text.clone()) else {
            return;
        };

        match clipboard.write_text(&text) {
            Ok(()) => {
                self.selected = index;
                self.notice = None;
                self.board.mark_copied(index, self.copied_window, events);
            }
            Err(e) => {
                warn!(error = %e, "failed to copy text");
                self.board.clear_copied();
                self.notice = Some(e.to_string());
            }
        }
    }

    pub fn copy_selected(
        &mut self,
        clipboard: &mut dyn ClipboardWriter,
        events: &mpsc::UnboundedSender<AppEvent>,
    ) {
        self.copy_reply(self.selected, clipboard, events);
    }

    /// Clears the post and every card. Replies still in flight are discarded on
    /// arrival, and the next roll waits until that session's task has finished.
    pub fn reset(&mut self) {
        if let Some(id) = self.board.active_id() {
            debug!(session = %id, "resetting session");
        }
        self.input.set_text("");
        self.board.reset();
        self.selected = 0;
        self.notice = None;
    }

    pub fn select_next(&mut self) {
        let count = self.board.replies().len();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_previous(&mut self) {
        let count = self.board.replies().len();
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
