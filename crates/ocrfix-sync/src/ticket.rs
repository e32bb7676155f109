//! Load cancellation.
//!
//! Every page fetch carries a `LoadTicket`. Starting a new load cancels
//! the previous ticket, so a slow response for a page the user already
//! left is dropped instead of overwriting the current page.

use crate::backend::PageId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    page: PageId,
    cancelled: Arc<AtomicBool>,
}

impl LoadTicket {
    pub fn page(&self) -> &PageId {
        &self.page
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    generation: u64,
    current: Option<LoadTicket>,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading `page`, cancelling whatever was loading before.
    pub fn begin(&mut self, page: PageId) -> LoadTicket {
        self.cancel();
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            page,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        self.current = Some(ticket.clone());
        ticket
    }

    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take() {
            log::debug!("cancelling load of {}", previous.page);
            previous.cancel();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.current.is_some()
    }

    /// Whether a finished load may be applied. Accepting clears the
    /// current ticket.
    pub fn accept(&mut self, ticket: &LoadTicket) -> bool {
        let current = self
            .current
            .as_ref()
            .is_some_and(|c| c.generation == ticket.generation);
        if current && !ticket.is_cancelled() {
            self.current = None;
            true
        } else {
            false
        }
    }
}
