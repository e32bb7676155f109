//! Autosave pipeline.
//!
//! ```text
//!   idle ──edit──▶ dirty ──debounce fires──▶ saving ──ok──▶ saved
//!                   ▲  └─edit: restart timer     │
//!                   │                             └─err──▶ error ──retry──▶ saving
//!                   └──────────── edit ◀──────────────── saved
//! ```
//!
//! The pipeline is a pure state machine: it never sleeps or performs I/O.
//! The host asks `next_deadline()` when to wake, calls `poll()` at that
//! time, and reports the outcome of each `SaveRequest` via `complete()`.
//!
//! At most one save is in flight. Edits made while saving are held back
//! and re-armed one full debounce window after the save finishes; every
//! request carries the full annotation list, so the last write wins.

use ocrfix_core::{Annotation, SaveBody};
use std::time::{Duration, Instant};

/// Source of "now" for timers. Hosts with virtual time supply their own.
pub type Clock = fn() -> Instant;

pub fn system_clock() -> Instant {
    Instant::now()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Dirty,
    Saving,
    Saved,
    Error,
}

/// What the UI shows about persistence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveStatus {
    pub state: SaveState,
    /// Server timestamp of the last successful save or load.
    pub updated_at: Option<String>,
    /// Failure message while in `Error`.
    pub error: Option<String>,
}

// ─── Debounce ────────────────────────────────────────────────────────────

/// A cancellable single-shot deadline.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the window from `now`, replacing any pending deadline.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Fire on the next poll.
    pub fn expedite(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────

/// Identifies one outbound save so late completions can be recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket(u64);

/// A save the host must send through the write contract.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub payload: SaveBody,
}

#[derive(Debug)]
pub struct AutosavePipeline {
    status: SaveStatus,
    debounce: Debounce,
    /// Edits are only tracked once a page has loaded.
    loaded: bool,
    in_flight: Option<SaveTicket>,
    next_ticket: u64,
    /// Edits arrived while a save was outstanding or had failed.
    pending_edits: bool,
    /// A flush was requested while saving; skip the window afterwards.
    flush_after_save: bool,
    /// Payload of the most recent request, replayed by `retry`.
    last_payload: Option<SaveBody>,
}

impl AutosavePipeline {
    pub fn new(delay: Duration) -> Self {
        Self {
            status: SaveStatus::default(),
            debounce: Debounce::new(delay),
            loaded: false,
            in_flight: None,
            next_ticket: 0,
            pending_edits: false,
            flush_after_save: false,
            last_payload: None,
        }
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn state(&self) -> SaveState {
        self.status.state
    }

    /// When the host should next call `poll`.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Has unsaved edits, whether or not a save is already scheduled.
    pub fn has_unsaved_edits(&self) -> bool {
        self.status.state == SaveState::Dirty || self.pending_edits
    }

    /// A page finished loading. Its content is not an edit.
    pub fn mark_loaded(&mut self, updated_at: Option<String>) {
        self.reset();
        self.loaded = true;
        self.status.updated_at = updated_at;
        log::debug!("autosave: page loaded");
    }

    /// Forget everything, e.g. when the page failed to load. A save still
    /// in flight is orphaned and its completion ignored.
    pub fn reset(&mut self) {
        self.status = SaveStatus::default();
        self.debounce.cancel();
        self.loaded = false;
        self.in_flight = None;
        self.pending_edits = false;
        self.flush_after_save = false;
        self.last_payload = None;
    }

    /// Record a store mutation. Returns whether the status changed.
    pub fn mark_dirty(&mut self, now: Instant) -> bool {
        if !self.loaded {
            return false;
        }
        match self.status.state {
            SaveState::Saving | SaveState::Error => {
                self.pending_edits = true;
                false
            }
            SaveState::Dirty => {
                self.debounce.schedule(now);
                false
            }
            SaveState::Idle | SaveState::Saved => {
                self.debounce.schedule(now);
                self.status.state = SaveState::Dirty;
                log::debug!("autosave: dirty");
                true
            }
        }
    }

    /// Skip the rest of the debounce window. While a save is in flight the
    /// flush happens right after it completes.
    pub fn flush(&mut self, now: Instant) {
        match self.status.state {
            SaveState::Dirty => self.debounce.expedite(now),
            SaveState::Saving if self.pending_edits => self.flush_after_save = true,
            _ => {}
        }
    }

    /// Issue a save if the debounce window has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        snapshot: impl FnOnce() -> Vec<Annotation>,
    ) -> Option<SaveRequest> {
        if !self.debounce.is_due(now) {
            return None;
        }
        self.debounce.cancel();
        if self.status.state != SaveState::Dirty {
            return None;
        }
        Some(self.begin(SaveBody {
            annotations: snapshot(),
        }))
    }

    fn begin(&mut self, payload: SaveBody) -> SaveRequest {
        let ticket = SaveTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.last_payload = Some(payload.clone());
        self.status.state = SaveState::Saving;
        self.status.error = None;
        log::debug!(
            "autosave: saving {} annotations (ticket {})",
            payload.annotations.len(),
            ticket.0
        );
        SaveRequest { ticket, payload }
    }

    /// Record the outcome of a save. `Ok` carries the server's
    /// `updated_at`. Returns `false` for a ticket that is no longer
    /// current.
    pub fn complete(
        &mut self,
        ticket: SaveTicket,
        outcome: Result<String, String>,
        now: Instant,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            log::debug!("autosave: ignoring stale completion for ticket {}", ticket.0);
            return false;
        }
        self.in_flight = None;
        match outcome {
            Ok(updated_at) => {
                self.status.state = SaveState::Saved;
                self.status.updated_at = Some(updated_at);
                self.status.error = None;
                self.last_payload = None;
                if self.pending_edits {
                    self.pending_edits = false;
                    self.status.state = SaveState::Dirty;
                    if std::mem::take(&mut self.flush_after_save) {
                        self.debounce.expedite(now);
                    } else {
                        self.debounce.schedule(now);
                    }
                }
            }
            Err(message) => {
                log::warn!("autosave failed: {message}");
                self.status.state = SaveState::Error;
                self.status.error = Some(message);
            }
        }
        true
    }

    /// Replay the failed payload. Only valid from `Error`.
    pub fn retry(&mut self) -> Option<SaveRequest> {
        if self.status.state != SaveState::Error {
            return None;
        }
        let payload = self.last_payload.take()?;
        log::info!("autosave: retrying");
        Some(self.begin(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrfix_core::{Annotation, AnnotationId};
    use pretty_assertions::assert_eq;

    const DELAY: Duration = Duration::from_millis(1200);

    fn ann(text: &str) -> Annotation {
        let mut a = Annotation::new(AnnotationId::intern("autosave_a"), 0.0, 0.0, 20.0, 20.0);
        a.text = text.to_string();
        a
    }

    fn loaded() -> AutosavePipeline {
        let mut p = AutosavePipeline::new(DELAY);
        p.mark_loaded(Some("t0".into()));
        p
    }

    #[test]
    fn load_is_not_an_edit() {
        let mut p = loaded();
        assert_eq!(p.state(), SaveState::Idle);
        assert_eq!(p.next_deadline(), None);
        assert!(p.poll(Instant::now() + DELAY * 2, Vec::new).is_none());
    }

    #[test]
    fn edits_before_load_are_ignored() {
        let mut p = AutosavePipeline::new(DELAY);
        assert!(!p.mark_dirty(Instant::now()));
        assert_eq!(p.state(), SaveState::Idle);
    }

    #[test]
    fn burst_of_edits_saves_once_with_last_state() {
        let mut p = loaded();
        let t0 = Instant::now();
        let mut text = "";
        for (i, t) in ["one", "two", "three"].into_iter().enumerate() {
            p.mark_dirty(t0 + Duration::from_millis(300 * i as u64));
            text = t;
            // Nothing fires in the middle of the burst.
            assert!(p.poll(t0 + Duration::from_millis(300 * i as u64 + 100), Vec::new).is_none());
        }
        let last_edit = t0 + Duration::from_millis(600);
        assert_eq!(p.next_deadline(), Some(last_edit + DELAY));
        assert!(p.poll(last_edit + DELAY - Duration::from_millis(1), Vec::new).is_none());

        let req = p.poll(last_edit + DELAY, || vec![ann(text)]).unwrap();
        assert_eq!(req.payload.annotations[0].text, "three");
        assert_eq!(p.state(), SaveState::Saving);
        assert!(p.poll(last_edit + DELAY * 3, Vec::new).is_none());
    }

    #[test]
    fn success_records_timestamp() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        let req = p.poll(now + DELAY, Vec::new).unwrap();
        assert!(p.complete(req.ticket, Ok("t1".into()), now + DELAY));
        assert_eq!(
            p.status(),
            &SaveStatus {
                state: SaveState::Saved,
                updated_at: Some("t1".into()),
                error: None,
            }
        );
    }

    #[test]
    fn edit_during_save_is_rearmed_after_completion() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        let req = p.poll(now + DELAY, Vec::new).unwrap();

        p.mark_dirty(now + DELAY + Duration::from_millis(10));
        assert_eq!(p.state(), SaveState::Saving);
        assert_eq!(p.next_deadline(), None);

        let done = now + DELAY * 2;
        p.complete(req.ticket, Ok("t1".into()), done);
        assert_eq!(p.state(), SaveState::Dirty);
        assert_eq!(p.next_deadline(), Some(done + DELAY));
        assert_eq!(p.status().updated_at.as_deref(), Some("t1"));
    }

    #[test]
    fn failure_needs_manual_retry_with_same_payload() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        let first = p.poll(now + DELAY, || vec![ann("v1")]).unwrap();
        p.complete(first.ticket, Err("HTTP 500".into()), now + DELAY);
        assert_eq!(p.state(), SaveState::Error);
        assert_eq!(p.status().error.as_deref(), Some("HTTP 500"));

        // Further edits do not auto-save out of the error state.
        p.mark_dirty(now + DELAY * 2);
        assert_eq!(p.state(), SaveState::Error);
        assert!(p.poll(now + DELAY * 10, Vec::new).is_none());

        let again = p.retry().unwrap();
        assert_eq!(again.payload, first.payload);
        assert_ne!(again.ticket, first.ticket);
        assert_eq!(p.state(), SaveState::Saving);

        // The edit held back during the error follows once the retry lands.
        p.complete(again.ticket, Ok("t2".into()), now + DELAY * 11);
        assert_eq!(p.state(), SaveState::Dirty);
    }

    #[test]
    fn retry_outside_error_is_noop() {
        let mut p = loaded();
        assert!(p.retry().is_none());
    }

    #[test]
    fn stale_ticket_is_ignored_after_reload() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        let req = p.poll(now + DELAY, Vec::new).unwrap();
        p.mark_loaded(Some("fresh".into()));
        assert!(!p.complete(req.ticket, Ok("old".into()), now + DELAY));
        assert_eq!(p.status().updated_at.as_deref(), Some("fresh"));
        assert_eq!(p.state(), SaveState::Idle);
    }

    #[test]
    fn flush_skips_the_window() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        p.flush(now);
        assert!(p.poll(now, Vec::new).is_some());
    }

    #[test]
    fn flush_during_save_fires_right_after() {
        let mut p = loaded();
        let now = Instant::now();
        p.mark_dirty(now);
        let req = p.poll(now + DELAY, Vec::new).unwrap();
        p.mark_dirty(now + DELAY);
        p.flush(now + DELAY);
        p.complete(req.ticket, Ok("t1".into()), now + DELAY * 2);
        assert!(p.poll(now + DELAY * 2, Vec::new).is_some());
    }
}
