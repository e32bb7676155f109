//! Selection controller.
//!
//! Tracks which annotations are active and how clicks change that.
//!
//! | Input | `Single` | `Multi` |
//! |-------|----------|---------|
//! | click box | replace with `{id}` | toggle `id` |
//! | additive click box | toggle `id` | toggle `id` |
//! | click background | clear | clear, start marquee |
//! | additive click background | clear | keep, start marquee (union) |
//!
//! The selection keeps insertion order; the last entry is the most
//! recently added and survives a switch back to `Single`.

use ocrfix_core::geometry::{rect_from_corners, rect_to_image_space};
use ocrfix_core::{AnnotationId, AnnotationStore, Point, Rect, hit_test_rect};
use smallvec::SmallVec;

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    #[default]
    Single,
    Multi,
}

/// An in-progress rubber-band drag, in stage coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    pub start: Point,
    pub current: Point,
    /// Union with the existing selection instead of replacing it.
    additive: bool,
}

impl Marquee {
    pub fn rect(&self) -> Rect {
        rect_from_corners(self.start, self.current)
    }
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    mode: SelectMode,
    selected: SmallVec<[AnnotationId; 8]>,
    marquee: Option<Marquee>,
    /// Marquees smaller than this on both axes count as plain clicks.
    threshold: f64,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl SelectionController {
    pub fn new(threshold: f64) -> Self {
        Self {
            mode: SelectMode::Single,
            selected: SmallVec::new(),
            marquee: None,
            threshold,
        }
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    /// Switch modes. Leaving `Multi` collapses the selection to its most
    /// recently added member. Returns whether the selection changed.
    pub fn set_mode(&mut self, mode: SelectMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.marquee = None;
        if mode == SelectMode::Single && self.selected.len() > 1 {
            let keep = self.selected[self.selected.len() - 1];
            self.selected.clear();
            self.selected.push(keep);
            return true;
        }
        false
    }

    pub fn selected(&self) -> &[AnnotationId] {
        &self.selected
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.selected.contains(&id)
    }

    /// Most recently added member.
    pub fn primary(&self) -> Option<AnnotationId> {
        self.selected.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    // ─── Clicks ──────────────────────────────────────────────────────────

    /// Pointer-down on an annotation. Returns whether the selection changed.
    pub fn click_annotation(&mut self, id: AnnotationId, modifiers: Modifiers) -> bool {
        self.marquee = None;
        if self.mode == SelectMode::Multi || modifiers.additive() {
            self.toggle(id);
            return true;
        }
        if self.selected.len() == 1 && self.selected[0] == id {
            return false;
        }
        self.selected.clear();
        self.selected.push(id);
        true
    }

    /// Pointer-down on empty canvas at stage position `at`.
    pub fn click_background(&mut self, at: Point, modifiers: Modifiers) -> bool {
        match self.mode {
            SelectMode::Single => {
                self.marquee = None;
                self.clear()
            }
            SelectMode::Multi => {
                let additive = modifiers.additive();
                let changed = if additive { false } else { self.clear() };
                self.marquee = Some(Marquee {
                    start: at,
                    current: at,
                    additive,
                });
                changed
            }
        }
    }

    fn toggle(&mut self, id: AnnotationId) {
        if let Some(pos) = self.selected.iter().position(|s| *s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    // ─── Marquee ─────────────────────────────────────────────────────────

    pub fn marquee(&self) -> Option<&Marquee> {
        self.marquee.as_ref()
    }

    /// Current marquee rectangle in stage coordinates.
    pub fn marquee_rect(&self) -> Option<Rect> {
        self.marquee.map(|m| m.rect())
    }

    pub fn drag_marquee(&mut self, to: Point) -> bool {
        match &mut self.marquee {
            Some(m) => {
                m.current = to;
                true
            }
            None => false,
        }
    }

    /// Release the marquee and select every intersecting annotation.
    /// A drag under the threshold on both axes changes nothing.
    pub fn finish_marquee(&mut self, store: &AnnotationStore, scale: f64) -> bool {
        let Some(marquee) = self.marquee.take() else {
            return false;
        };
        let rect = marquee.rect();
        if rect.width() < self.threshold && rect.height() < self.threshold {
            return false;
        }
        let hits = hit_test_rect(store, rect_to_image_space(rect, scale));
        log::debug!("marquee selected {} annotations", hits.len());
        if marquee.additive {
            let before = self.selected.len();
            for id in hits {
                if !self.selected.contains(&id) {
                    self.selected.push(id);
                }
            }
            self.selected.len() != before
        } else {
            self.replace(&hits)
        }
    }

    pub fn cancel_marquee(&mut self) {
        self.marquee = None;
    }

    // ─── Bulk ────────────────────────────────────────────────────────────

    /// Replace the selection. Returns whether it changed.
    pub fn replace(&mut self, ids: &[AnnotationId]) -> bool {
        if self.selected.as_slice() == ids {
            return false;
        }
        self.selected.clear();
        self.selected.extend(ids.iter().copied());
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    /// Drop the given ids (e.g. after a delete).
    pub fn remove(&mut self, ids: &[AnnotationId]) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| !ids.contains(id));
        self.selected.len() != before
    }

    /// Drop every id the store no longer knows.
    pub fn prune(&mut self, store: &AnnotationStore) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| store.contains(*id));
        self.selected.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrfix_core::RawAnnotation;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> AnnotationId {
        AnnotationId::intern(s)
    }

    fn store() -> AnnotationStore {
        let mut store = AnnotationStore::default();
        store.load(vec![
            RawAnnotation {
                id: Some("sel_a".into()),
                ..RawAnnotation::with_geometry(0.0, 0.0, 40.0, 40.0)
            },
            RawAnnotation {
                id: Some("sel_b".into()),
                ..RawAnnotation::with_geometry(100.0, 0.0, 40.0, 40.0)
            },
            RawAnnotation {
                id: Some("sel_c".into()),
                ..RawAnnotation::with_geometry(0.0, 200.0, 40.0, 40.0)
            },
        ]);
        store
    }

    #[test]
    fn single_click_replaces() {
        let mut sel = SelectionController::default();
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        sel.click_annotation(id("sel_b"), Modifiers::NONE);
        assert_eq!(sel.selected(), &[id("sel_b")]);
        assert!(!sel.click_annotation(id("sel_b"), Modifiers::NONE));
    }

    #[test]
    fn additive_click_toggles() {
        let mut sel = SelectionController::default();
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        sel.click_annotation(id("sel_b"), Modifiers::SHIFT);
        assert_eq!(sel.selected(), &[id("sel_a"), id("sel_b")]);
        sel.click_annotation(id("sel_a"), Modifiers::SHIFT);
        assert_eq!(sel.selected(), &[id("sel_b")]);
    }

    #[test]
    fn multi_mode_click_toggles_without_modifier() {
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        sel.click_annotation(id("sel_b"), Modifiers::NONE);
        assert_eq!(sel.selected().len(), 2);
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        assert_eq!(sel.selected(), &[id("sel_b")]);
    }

    #[test]
    fn background_click_in_single_mode_clears() {
        let mut sel = SelectionController::default();
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        assert!(sel.click_background(Point::new(500.0, 500.0), Modifiers::SHIFT));
        assert!(sel.is_empty());
        assert!(sel.marquee().is_none());
    }

    #[test]
    fn marquee_selects_intersecting_boxes() {
        let store = store();
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        sel.click_annotation(id("sel_c"), Modifiers::NONE);

        sel.click_background(Point::new(-10.0, -10.0), Modifiers::NONE);
        assert!(sel.is_empty());
        sel.drag_marquee(Point::new(120.0, 20.0));
        assert!(sel.finish_marquee(&store, 1.0));
        assert_eq!(sel.selected(), &[id("sel_a"), id("sel_b")]);
    }

    #[test]
    fn marquee_respects_scale() {
        let store = store();
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        // At scale 0.5, stage (0,90)-(30,130) is image (0,180)-(60,260).
        sel.click_background(Point::new(0.0, 90.0), Modifiers::NONE);
        sel.drag_marquee(Point::new(30.0, 130.0));
        sel.finish_marquee(&store, 0.5);
        assert_eq!(sel.selected(), &[id("sel_c")]);
    }

    #[test]
    fn additive_marquee_unions() {
        let store = store();
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        sel.click_annotation(id("sel_c"), Modifiers::NONE);
        sel.click_background(Point::new(90.0, -5.0), Modifiers::SHIFT);
        sel.drag_marquee(Point::new(150.0, 50.0));
        sel.finish_marquee(&store, 1.0);
        assert_eq!(sel.selected(), &[id("sel_c"), id("sel_b")]);
    }

    #[test]
    fn tiny_marquee_is_a_click() {
        let store = store();
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        sel.click_background(Point::new(10.0, 10.0), Modifiers::SHIFT);
        sel.drag_marquee(Point::new(11.0, 11.5));
        assert!(!sel.finish_marquee(&store, 1.0));
        assert!(sel.is_empty());
    }

    #[test]
    fn leaving_multi_keeps_most_recent() {
        let mut sel = SelectionController::default();
        sel.set_mode(SelectMode::Multi);
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        sel.click_annotation(id("sel_c"), Modifiers::NONE);
        sel.click_annotation(id("sel_b"), Modifiers::NONE);
        assert!(sel.set_mode(SelectMode::Single));
        assert_eq!(sel.selected(), &[id("sel_b")]);
        // A following plain click replaces it straight away.
        sel.click_annotation(id("sel_a"), Modifiers::NONE);
        assert_eq!(sel.selected(), &[id("sel_a")]);
    }

    #[test]
    fn prune_drops_deleted_ids() {
        let mut store = store();
        let mut sel = SelectionController::default();
        sel.replace(&[id("sel_a"), id("sel_b")]);
        store.delete(&[id("sel_a")]);
        assert!(sel.prune(&store));
        assert_eq!(sel.selected(), &[id("sel_b")]);
    }
}
