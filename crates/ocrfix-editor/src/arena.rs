//! Render handle arena.
//!
//! The rendering surface attaches transform handles (shape-node keys,
//! transformer ids) to annotations. Those live here, keyed by
//! `AnnotationId`, so the domain model never holds a rendering object.

use ocrfix_core::{AnnotationId, AnnotationStore};
use std::collections::HashMap;

/// Opaque handle issued by a rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

#[derive(Debug, Clone)]
pub struct HandleArena<H> {
    handles: HashMap<AnnotationId, H>,
}

impl<H> Default for HandleArena<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<H> HandleArena<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handle` to `id`, returning any handle it replaces.
    pub fn insert(&mut self, id: AnnotationId, handle: H) -> Option<H> {
        self.handles.insert(id, handle)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&H> {
        self.handles.get(&id)
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<H> {
        self.handles.remove(&id)
    }

    /// Drop handles whose annotation is gone. Returns how many were dropped.
    pub fn retain_existing(&mut self, store: &AnnotationStore) -> usize {
        let before = self.handles.len();
        self.handles.retain(|id, _| store.contains(*id));
        before - self.handles.len()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
