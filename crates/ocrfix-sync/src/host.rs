//! Page host: runs an `EditorSession` against a `PageBackend`.
//!
//! The host owns the two asynchronous concerns of the editor:
//!
//! - **Loads**: each `open` spawns a fetch tagged with a `LoadTicket`;
//!   opening another page cancels the ticket so a late response is
//!   dropped.
//! - **Saves**: the session's autosave pipeline decides *when*; the host
//!   sleeps until the debounce deadline, sends the request, and reports
//!   the outcome back. At most one save per page is in flight; a later
//!   one waits for it, and only the newest waiting payload is kept.
//!
//! Results from spawned tasks come back over a channel and are applied
//! on the host's own task, so the session is only ever touched from one
//! place.

use crate::backend::{BackendError, PageBackend, PageId};
use crate::ticket::{LoadTicket, LoadTracker};
use ocrfix_core::{EditorConfig, PageDocument, SaveBody, SaveReceipt};
use ocrfix_editor::{EditorSession, SaveRequest, SaveState, SaveTicket};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// Session clock that follows tokio's (possibly paused) timer.
fn tokio_clock() -> std::time::Instant {
    Instant::now().into_std()
}

/// Something observable that happened while the host was running.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PageLoaded(PageId),
    LoadFailed { page: PageId, message: String },
    /// A response for a page the user already left.
    StaleLoadDropped(PageId),
    SaveStarted(PageId),
    SaveFinished { page: PageId, ok: bool },
}

/// Requests accepted by `PageHost::run`.
pub enum HostCommand {
    Open(PageId),
    Edit(Box<dyn FnOnce(&mut EditorSession) + Send>),
    SaveNow,
    RetrySave,
    RerunRecognition,
    Shutdown,
}

enum HostMessage {
    Loaded {
        ticket: LoadTicket,
        result: Result<PageDocument, BackendError>,
    },
    Saved {
        page: PageId,
        /// `None` for the flush of a page being left.
        ticket: Option<SaveTicket>,
        result: Result<SaveReceipt, BackendError>,
    },
}

pub struct PageHost<B> {
    backend: Arc<B>,
    session: EditorSession,
    /// Page most recently requested.
    page: Option<PageId>,
    /// Page whose content the session currently holds.
    loaded_page: Option<PageId>,
    loads: LoadTracker,
    /// Spawned tasks whose result has not been handled yet.
    outstanding: usize,
    /// Pages with a save request on the wire.
    saving: HashSet<PageId>,
    /// Saves waiting for the one in flight on the same page.
    queued: HashMap<PageId, (Option<SaveTicket>, SaveBody)>,
    tx: mpsc::UnboundedSender<HostMessage>,
    rx: mpsc::UnboundedReceiver<HostMessage>,
}

impl<B: PageBackend + 'static> PageHost<B> {
    pub fn new(backend: B, config: EditorConfig) -> Self {
        Self::with_shared(Arc::new(backend), config)
    }

    pub fn with_shared(backend: Arc<B>, config: EditorConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            session: EditorSession::with_clock(config, tokio_clock),
            page: None,
            loaded_page: None,
            loads: LoadTracker::new(),
            outstanding: 0,
            saving: HashSet::new(),
            queued: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn page(&self) -> Option<&PageId> {
        self.page.as_ref()
    }

    pub fn loaded_page(&self) -> Option<&PageId> {
        self.loaded_page.as_ref()
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Navigate to `page`. Unsaved edits of the current page are flushed
    /// first; any load still in flight is cancelled.
    pub fn open(&mut self, page: PageId) {
        self.leave_current_page();
        log::info!("opening page {page}");
        let ticket = self.loads.begin(page.clone());
        self.page = Some(page);
        self.outstanding += 1;

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch(ticket.page()).await;
            if tx.send(HostMessage::Loaded { ticket, result }).is_err() {
                log::debug!("host gone, dropping load result");
            }
        });
    }

    fn leave_current_page(&mut self) {
        let Some(page) = self.loaded_page.take() else {
            return;
        };
        if self.session.has_unsaved_edits() {
            log::info!("flushing unsaved edits of {page} before leaving");
            let payload = SaveBody {
                annotations: self.session.store().snapshot(),
            };
            self.spawn_save(page, None, payload);
        }
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Run `f` against the session, then send any save that became due.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut EditorSession) -> R) -> R {
        let out = f(&mut self.session);
        self.pump_saves();
        out
    }

    pub fn save_now(&mut self) {
        self.session.save_now();
        self.pump_saves();
    }

    /// Replay a failed save. Returns whether a request went out.
    pub fn retry_save(&mut self) -> bool {
        if self.loaded_page.is_none() {
            return false;
        }
        match self.session.retry_save() {
            Some(request) => self.dispatch_save(request).is_some(),
            None => false,
        }
    }

    fn pump_saves(&mut self) -> Option<PageId> {
        self.loaded_page.as_ref()?;
        let request = self.session.poll_autosave()?;
        self.dispatch_save(request)
    }

    fn dispatch_save(&mut self, request: SaveRequest) -> Option<PageId> {
        let page = self.loaded_page.clone()?;
        self.spawn_save(page.clone(), Some(request.ticket), request.payload);
        Some(page)
    }

    fn spawn_save(&mut self, page: PageId, ticket: Option<SaveTicket>, payload: SaveBody) {
        if self.saving.contains(&page) {
            log::debug!("save of {page} waits for the one in flight");
            self.queued.insert(page, (ticket, payload));
            return;
        }
        self.saving.insert(page.clone());
        self.outstanding += 1;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.save(&page, &payload).await;
            if tx.send(HostMessage::Saved { page, ticket, result }).is_err() {
                log::debug!("host gone, dropping save result");
            }
        });
    }

    // ─── Event loop ──────────────────────────────────────────────────────

    fn save_deadline(&self) -> Option<Instant> {
        self.loaded_page.as_ref()?;
        self.session.next_save_deadline().map(Instant::from_std)
    }

    /// No task outstanding and no save scheduled.
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.queued.is_empty() && self.save_deadline().is_none()
    }

    /// Wait for the next load/save result or debounce deadline.
    pub async fn next_event(&mut self) -> HostEvent {
        loop {
            let deadline = self.save_deadline();
            // Placeholder when nothing is scheduled; the branch is disabled.
            let wake = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
            tokio::select! {
                msg = self.rx.recv() => {
                    if let Some(msg) = msg {
                        return self.handle_message(msg);
                    }
                }
                _ = sleep_until(wake), if deadline.is_some() => {
                    if let Some(page) = self.pump_saves() {
                        return HostEvent::SaveStarted(page);
                    }
                }
            }
        }
    }

    /// Process events until nothing is in flight or scheduled.
    pub async fn settle(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        while !self.is_idle() {
            events.push(self.next_event().await);
        }
        events
    }

    fn handle_message(&mut self, msg: HostMessage) -> HostEvent {
        self.outstanding = self.outstanding.saturating_sub(1);
        match msg {
            HostMessage::Loaded { ticket, result } => {
                let page = ticket.page().clone();
                if !self.loads.accept(&ticket) {
                    log::debug!("dropping stale load of {page}");
                    return HostEvent::StaleLoadDropped(page);
                }
                match result {
                    Ok(doc) => {
                        self.session.load_document(doc);
                        self.loaded_page = Some(page.clone());
                        HostEvent::PageLoaded(page)
                    }
                    Err(err) => {
                        let message = err.to_string();
                        self.session.load_failed(message.clone());
                        HostEvent::LoadFailed { page, message }
                    }
                }
            }
            HostMessage::Saved {
                page,
                ticket,
                result,
            } => {
                let ok = result.is_ok();
                self.saving.remove(&page);
                if let Some((queued_ticket, payload)) = self.queued.remove(&page) {
                    self.spawn_save(page.clone(), queued_ticket, payload);
                }
                match ticket {
                    Some(ticket) if self.loaded_page.as_ref() == Some(&page) => {
                        let outcome = result.map(|r| r.updated_at).map_err(|e| e.to_string());
                        self.session.complete_save(ticket, outcome);
                        // A flush requested during the save goes out now.
                        self.pump_saves();
                    }
                    _ => {
                        if let Err(err) = result {
                            log::warn!("saving {page} failed after leaving it: {err}");
                        }
                    }
                }
                HostEvent::SaveFinished { page, ok }
            }
        }
    }

    // ─── Re-run recognition ──────────────────────────────────────────────

    /// Save pending edits, ask the recognizer to redo the page text, and
    /// reload. Local geometry and grouping are never touched here.
    pub async fn rerun_recognition(&mut self) -> Result<(), BackendError> {
        let Some(page) = self.loaded_page.clone() else {
            log::warn!("re-run requested with no page loaded");
            return Ok(());
        };
        self.save_now();
        self.settle().await;
        let status = self.session.save_status();
        if status.state == SaveState::Error {
            return Err(BackendError::Unsaved(status.error.clone().unwrap_or_default()));
        }
        self.backend.rerun(&page).await?;
        self.open(page);
        self.settle().await;
        Ok(())
    }

    /// Drive the host from a command channel until `Shutdown` or the
    /// sender is dropped. Pending edits are saved before returning.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<HostCommand>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        HostCommand::Open(page) => self.open(page),
                        HostCommand::Edit(f) => self.edit(f),
                        HostCommand::SaveNow => self.save_now(),
                        HostCommand::RetrySave => {
                            self.retry_save();
                        }
                        HostCommand::RerunRecognition => {
                            if let Err(err) = self.rerun_recognition().await {
                                log::warn!("re-run failed: {err}");
                            }
                        }
                        HostCommand::Shutdown => break,
                    }
                }
                event = self.next_event() => log::debug!("host event: {event:?}"),
            }
        }
        self.save_now();
        self.settle().await;
    }
}
