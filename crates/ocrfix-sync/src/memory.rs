//! In-memory `PageBackend`.
//!
//! Pages are held as JSON text and pass through the same read/write
//! codecs as a remote service would. Useful for tests, demos and offline
//! work.

use crate::backend::{BackendError, PageBackend, PageId};
use async_trait::async_trait;
use ocrfix_core::{PageDocument, SaveBody, SaveReceipt, decode_page};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct StoredPage {
    json: String,
    revision: u64,
    latency: Duration,
    /// Texts the recognizer produces on re-run, in reading order.
    recognition: Option<Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<PageId, StoredPage>,
    saves: usize,
    failures: VecDeque<BackendError>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a page body (read-contract JSON).
    pub fn insert_page(&self, page: impl Into<String>, json: impl Into<String>) {
        self.lock().pages.insert(
            PageId::new(page),
            StoredPage {
                json: json.into(),
                ..StoredPage::default()
            },
        );
    }

    pub fn page_json(&self, page: &PageId) -> Option<String> {
        self.lock().pages.get(page).map(|p| p.json.clone())
    }

    /// Delay every response for `page`.
    pub fn set_latency(&self, page: &PageId, latency: Duration) {
        if let Some(p) = self.lock().pages.get_mut(page) {
            p.latency = latency;
        }
    }

    /// Texts a re-run will write, one per annotation in stored order.
    pub fn set_recognition(&self, page: &PageId, texts: Vec<String>) {
        if let Some(p) = self.lock().pages.get_mut(page) {
            p.recognition = Some(texts);
        }
    }

    /// Make the next save fail with an HTTP 500 carrying `message`.
    pub fn fail_next_save(&self, message: &str) {
        let body = json!({ "error": message }).to_string();
        self.lock()
            .failures
            .push_back(BackendError::from_http(500, "Internal Server Error", &body));
    }

    /// Number of successful saves across all pages.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn latency(&self, page: &PageId) -> Duration {
        self.lock().pages.get(page).map(|p| p.latency).unwrap_or_default()
    }
}

fn stamp(revision: u64) -> String {
    format!("rev-{revision}")
}

#[async_trait]
impl PageBackend for MemoryBackend {
    async fn fetch(&self, page: &PageId) -> Result<PageDocument, BackendError> {
        tokio::time::sleep(self.latency(page)).await;
        let json = self
            .page_json(page)
            .ok_or_else(|| BackendError::NotFound(page.clone()))?;
        Ok(decode_page(&json)?)
    }

    async fn save(&self, page: &PageId, body: &SaveBody) -> Result<SaveReceipt, BackendError> {
        tokio::time::sleep(self.latency(page)).await;
        let mut state = self.lock();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        let stored = state
            .pages
            .get_mut(page)
            .ok_or_else(|| BackendError::NotFound(page.clone()))?;
        stored.revision += 1;
        let updated_at = stamp(stored.revision);
        stored.json = json!({
            "annotations": body.annotations,
            "updated_at": updated_at,
        })
        .to_string();
        state.saves += 1;
        log::debug!("memory backend: saved {page} ({updated_at})");
        Ok(SaveReceipt { updated_at })
    }

    async fn rerun(&self, page: &PageId) -> Result<(), BackendError> {
        tokio::time::sleep(self.latency(page)).await;
        let mut state = self.lock();
        let stored = state
            .pages
            .get_mut(page)
            .ok_or_else(|| BackendError::NotFound(page.clone()))?;
        let Some(texts) = stored.recognition.clone() else {
            return Ok(());
        };
        let mut doc: Value = serde_json::from_str(&stored.json)
            .map_err(|e| BackendError::Decode(e.into()))?;
        let Some(obj) = doc.as_object_mut() else {
            return Err(BackendError::Transport(format!("page {page} is not a document")));
        };
        if let Some(list) = obj.get_mut("annotations").and_then(Value::as_array_mut) {
            for (entry, text) in list.iter_mut().zip(texts) {
                if let Some(entry) = entry.as_object_mut() {
                    entry.insert("text".to_string(), Value::String(text));
                }
            }
        }
        stored.revision += 1;
        obj.insert("updated_at".to_string(), Value::String(stamp(stored.revision)));
        stored.json = doc.to_string();
        Ok(())
    }
}
