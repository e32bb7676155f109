//! The annotation store for one page.
//!
//! Holds the annotations sorted by `order`, and guarantees after every
//! public operation that `order` values are exactly `0..N-1` and that
//! every box is at least `min_size` on both axes.
//!
//! Operations on ids that no longer exist are no-ops: UI callbacks
//! routinely race with deletes.

use crate::config::EditorConfig;
use crate::id::AnnotationId;
use crate::model::{Annotation, AnnotationPatch, TextDirection};
use crate::wire::RawAnnotation;
use std::collections::{HashMap, HashSet};

/// Fallback placement for entries that arrive with no geometry at all.
const FALLBACK_X: f64 = 20.0;
const FALLBACK_Y: f64 = 20.0;
const FALLBACK_STEP: f64 = 40.0;
const FALLBACK_WIDTH: f64 = 160.0;
const FALLBACK_HEIGHT: f64 = 32.0;

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    /// Invariant: `items[i].order == i`.
    items: Vec<Annotation>,
    min_size: f64,
    default_label: String,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl AnnotationStore {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            items: Vec::new(),
            min_size: config.min_size,
            default_label: config.default_label.clone(),
        }
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    // ─── Bulk load ───────────────────────────────────────────────────────

    /// Replace the contents with a freshly loaded list.
    ///
    /// Missing ids are generated, missing fields defaulted, geometry is
    /// taken from `points` or a fallback slot when absent, and the result
    /// is sorted by the incoming `order` (array position when missing)
    /// and renumbered densely.
    pub fn load(&mut self, raw: Vec<RawAnnotation>) {
        let mut seen = HashSet::with_capacity(raw.len());
        let mut keyed: Vec<(f64, usize, Annotation)> = raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let key = entry.order.unwrap_or(index as f64);
                let ann = self.normalize(entry, index, &mut seen);
                (key, index, ann)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.items = keyed.into_iter().map(|(_, _, ann)| ann).collect();
        self.renumber();
        log::debug!("loaded {} annotations", self.items.len());
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn normalize(
        &self,
        raw: RawAnnotation,
        index: usize,
        seen: &mut HashSet<AnnotationId>,
    ) -> Annotation {
        let id = match raw.id.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                let id = AnnotationId::intern(s);
                if seen.contains(&id) {
                    let fresh = AnnotationId::generate();
                    log::warn!("duplicate annotation id {id}, reassigned to {fresh}");
                    fresh
                } else {
                    id
                }
            }
            _ => AnnotationId::generate(),
        };
        seen.insert(id);

        let from_points = raw.points.as_deref().and_then(bounding_box);
        if !raw.has_geometry() && from_points.is_none() {
            log::debug!("annotation {id} has no geometry, using fallback slot {index}");
        }
        let (px, py, pw, ph) = from_points.unwrap_or((
            FALLBACK_X,
            FALLBACK_Y + FALLBACK_STEP * index as f64,
            FALLBACK_WIDTH,
            FALLBACK_HEIGHT,
        ));

        Annotation {
            id,
            text: raw.text.unwrap_or_default(),
            label: raw
                .label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| self.default_label.clone()),
            x: raw.x.unwrap_or(px),
            y: raw.y.unwrap_or(py),
            width: self.clamp_size(raw.width.unwrap_or(pw)),
            height: self.clamp_size(raw.height.unwrap_or(ph)),
            rotation: raw.rotation.unwrap_or(0.0),
            order: index,
            group_id: raw.group_id.map(coerce_group_id).unwrap_or(0),
            text_direction: raw
                .text_direction
                .as_deref()
                .map(TextDirection::from_loose)
                .unwrap_or_default(),
            confidence: raw.confidence,
        }
    }

    fn clamp_size(&self, v: f64) -> f64 {
        if v.is_finite() {
            v.abs().max(self.min_size)
        } else {
            self.min_size
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Append a new annotation at the end of the reading order.
    ///
    /// A missing or already-used id is replaced with a generated one.
    /// Any incoming `order` is ignored.
    pub fn insert(&mut self, partial: RawAnnotation) -> AnnotationId {
        let mut seen: HashSet<AnnotationId> = self.items.iter().map(|a| a.id).collect();
        let mut ann = self.normalize(partial, self.items.len(), &mut seen);
        ann.order = self.items.len();
        let id = ann.id;
        self.items.push(ann);
        self.renumber();
        id
    }

    /// Apply a partial update. Returns `false` for unknown ids or a patch
    /// that changed nothing.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> bool {
        let min_size = self.min_size;
        let Some(pos) = self.position(id) else {
            return false;
        };
        let ann = &mut self.items[pos];
        let before = ann.clone();

        if let Some(text) = patch.text {
            ann.text = text;
        }
        if let Some(label) = patch.label {
            ann.label = label;
        }
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            ann.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            ann.y = y;
        }
        if let Some(w) = patch.width.filter(|v| v.is_finite()) {
            ann.width = w.max(min_size);
        }
        if let Some(h) = patch.height.filter(|v| v.is_finite()) {
            ann.height = h.max(min_size);
        }
        if let Some(r) = patch.rotation.filter(|v| v.is_finite()) {
            ann.rotation = r;
        }
        if let Some(g) = patch.group_id {
            ann.group_id = g;
        }
        if let Some(dir) = patch.text_direction {
            ann.text_direction = dir;
        }
        let changed = *ann != before;

        match patch.order {
            Some(target) => self.reorder(id, target) || changed,
            None => changed,
        }
    }

    /// Remove every matching annotation. Returns the ids actually removed.
    pub fn delete(&mut self, ids: &[AnnotationId]) -> Vec<AnnotationId> {
        let targets: HashSet<AnnotationId> = ids.iter().copied().collect();
        let mut removed = Vec::new();
        self.items.retain(|a| {
            if targets.contains(&a.id) {
                removed.push(a.id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.renumber();
        }
        removed
    }

    /// Move one annotation to `target_index` in the reading order
    /// (clamped to the valid range).
    pub fn reorder(&mut self, id: AnnotationId, target_index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = target_index.min(self.items.len() - 1);
        if from == to {
            return false;
        }
        let ann = self.items.remove(from);
        self.items.insert(to, ann);
        self.renumber();
        true
    }

    /// Overwrite `order` for the listed ids, then re-sort and renumber.
    ///
    /// Ties are broken by current position, so callers may hand out
    /// colliding values and get a deterministic result.
    pub fn assign_orders(&mut self, orders: &HashMap<AnnotationId, usize>) {
        for ann in &mut self.items {
            if let Some(&o) = orders.get(&ann.id) {
                ann.order = o;
            }
        }
        self.items.sort_by_key(|a| a.order);
        self.renumber();
    }

    /// Set `group_id` on every listed annotation. Returns how many changed.
    pub fn set_group(&mut self, ids: &[AnnotationId], group_id: i64) -> usize {
        let targets: HashSet<AnnotationId> = ids.iter().copied().collect();
        let mut changed = 0;
        for ann in self.items.iter_mut().filter(|a| targets.contains(&a.id)) {
            if ann.group_id != group_id {
                ann.group_id = group_id;
                changed += 1;
            }
        }
        changed
    }

    /// Shift the listed annotations by `(dx, dy)` image units.
    pub fn translate(&mut self, ids: &[AnnotationId], dx: f64, dy: f64) -> bool {
        if !dx.is_finite() || !dy.is_finite() || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        let targets: HashSet<AnnotationId> = ids.iter().copied().collect();
        let mut moved = false;
        for ann in self.items.iter_mut().filter(|a| targets.contains(&a.id)) {
            ann.x += dx;
            ann.y += dy;
            moved = true;
        }
        moved
    }

    /// Rewrite `order` to match the current positions.
    fn renumber(&mut self) {
        for (i, ann) in self.items.iter_mut().enumerate() {
            ann.order = i;
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: AnnotationId) -> Option<usize> {
        self.items.iter().position(|a| a.id == id)
    }

    /// Annotations in reading order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Annotation> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.items
    }

    pub fn ids(&self) -> Vec<AnnotationId> {
        self.items.iter().map(|a| a.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copy of the current list, e.g. for a save payload.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.items.clone()
    }

    /// Largest `group_id` in use, if any.
    pub fn max_group_id(&self) -> Option<i64> {
        self.items.iter().map(|a| a.group_id).max()
    }
}

/// Integer group key from arbitrary numeric input; non-finite is 0.
pub fn coerce_group_id(v: f64) -> i64 {
    if v.is_finite() { v.trunc() as i64 } else { 0 }
}

/// Axis-aligned `(x, y, width, height)` around a polygon.
fn bounding_box(points: &[(f64, f64)]) -> Option<(f64, f64, f64, f64)> {
    let (first, rest) = points.split_first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.0, first.1, first.0, first.1);
    for &(x, y) in rest {
        x0 = x0.min(x);
        y0 = y0.min(y);
        x1 = x1.max(x);
        y1 = y1.max(y);
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(id: &str, x: f64, order: Option<f64>) -> RawAnnotation {
        RawAnnotation {
            id: Some(id.to_string()),
            order,
            ..RawAnnotation::with_geometry(x, 0.0, 40.0, 20.0)
        }
    }

    fn orders(store: &AnnotationStore) -> Vec<(String, usize)> {
        store
            .iter()
            .map(|a| (a.id.as_str().to_string(), a.order))
            .collect()
    }

    fn assert_dense(store: &AnnotationStore) {
        for (i, a) in store.iter().enumerate() {
            assert_eq!(a.order, i, "order gap at {}", a.id);
        }
    }

    #[test]
    fn load_sorts_by_existing_order_and_renumbers() {
        let mut store = AnnotationStore::default();
        store.load(vec![
            raw("s_c", 0.0, Some(10.0)),
            raw("s_a", 0.0, Some(2.0)),
            raw("s_b", 0.0, Some(5.0)),
        ]);
        assert_eq!(
            orders(&store),
            vec![("s_a".into(), 0), ("s_b".into(), 1), ("s_c".into(), 2)]
        );
    }

    #[test]
    fn load_uses_array_position_when_order_missing() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("p_a", 0.0, None), raw("p_b", 0.0, Some(0.5)), raw("p_c", 0.0, None)]);
        // p_a keyed 0, p_b keyed 0.5, p_c keyed 2.
        assert_eq!(store.ids()[1].as_str(), "p_b");
        assert_dense(&store);
    }

    #[test]
    fn load_fills_defaults() {
        let mut store = AnnotationStore::default();
        store.load(vec![RawAnnotation {
            width: Some(3.0),
            group_id: Some(f64::NAN),
            ..RawAnnotation::default()
        }]);
        let a = &store.as_slice()[0];
        assert_eq!(a.label, "text");
        assert_eq!(a.group_id, 0);
        assert_eq!(a.width, 12.0);
        assert_eq!(a.height, 32.0);
        assert_eq!(a.text_direction, TextDirection::Ltr);
        assert!(a.id.as_str().starts_with("box_"));
    }

    #[test]
    fn load_derives_geometry_from_points() {
        let mut store = AnnotationStore::default();
        store.load(vec![RawAnnotation {
            points: Some(vec![(10.0, 5.0), (60.0, 8.0), (58.0, 30.0), (12.0, 28.0)]),
            ..RawAnnotation::default()
        }]);
        let a = &store.as_slice()[0];
        assert_eq!((a.x, a.y, a.width, a.height), (10.0, 5.0, 50.0, 25.0));
    }

    #[test]
    fn fallback_slots_do_not_overlap() {
        let mut store = AnnotationStore::default();
        store.load(vec![RawAnnotation::default(), RawAnnotation::default()]);
        let ys: Vec<f64> = store.iter().map(|a| a.y).collect();
        assert_eq!(ys, vec![20.0, 60.0]);
    }

    #[test]
    fn duplicate_ids_are_reassigned() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("dup", 0.0, None), raw("dup", 10.0, None)]);
        let ids = store.ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn insert_appends_and_generates_id() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("i_a", 0.0, None)]);
        let id = store.insert(RawAnnotation::with_geometry(5.0, 5.0, 20.0, 20.0));
        assert_eq!(store.get(id).unwrap().order, 1);
        assert_dense(&store);
    }

    #[test]
    fn insert_with_taken_id_gets_a_fresh_one() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("i_taken", 0.0, None)]);
        let id = store.insert(raw("i_taken", 5.0, None));
        assert_ne!(id.as_str(), "i_taken");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_clamps_size() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("u_a", 0.0, None)]);
        let id = AnnotationId::intern("u_a");
        assert!(store.update(
            id,
            AnnotationPatch {
                width: Some(4.0),
                height: Some(f64::INFINITY),
                ..AnnotationPatch::default()
            }
        ));
        let a = store.get(id).unwrap();
        assert_eq!(a.width, 12.0);
        assert_eq!(a.height, 20.0);
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let mut store = AnnotationStore::default();
        assert!(!store.update(AnnotationId::intern("ghost"), AnnotationPatch::text("x")));
    }

    #[test]
    fn update_with_order_reorders() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("uo_a", 0.0, None), raw("uo_b", 0.0, None), raw("uo_c", 0.0, None)]);
        store.update(
            AnnotationId::intern("uo_c"),
            AnnotationPatch {
                order: Some(0),
                ..AnnotationPatch::default()
            },
        );
        assert_eq!(store.ids()[0].as_str(), "uo_c");
        assert_dense(&store);
    }

    #[test]
    fn delete_renumbers() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("d_a", 0.0, None), raw("d_b", 0.0, None), raw("d_c", 0.0, None)]);
        let removed = store.delete(&[AnnotationId::intern("d_b"), AnnotationId::intern("ghost")]);
        assert_eq!(removed, vec![AnnotationId::intern("d_b")]);
        assert_eq!(orders(&store), vec![("d_a".into(), 0), ("d_c".into(), 1)]);
    }

    #[test]
    fn reorder_clamps_target() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("r_a", 0.0, None), raw("r_b", 0.0, None), raw("r_c", 0.0, None)]);
        assert!(store.reorder(AnnotationId::intern("r_a"), 99));
        assert_eq!(store.ids().last().unwrap().as_str(), "r_a");
        assert!(!store.reorder(AnnotationId::intern("missing"), 0));
        assert_dense(&store);
    }

    #[test]
    fn reorder_moves_to_front() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("rf_a", 0.0, None), raw("rf_b", 0.0, None), raw("rf_c", 0.0, None)]);
        assert!(store.reorder(AnnotationId::intern("rf_c"), 0));
        assert_eq!(
            orders(&store),
            vec![("rf_c".into(), 0), ("rf_a".into(), 1), ("rf_b".into(), 2)]
        );
        assert!(!store.reorder(AnnotationId::intern("rf_c"), 0));
    }

    #[test]
    fn translate_moves_only_targets() {
        let mut store = AnnotationStore::default();
        store.load(vec![raw("t_a", 0.0, None), raw("t_b", 100.0, None)]);
        assert!(store.translate(&[AnnotationId::intern("t_b")], 5.0, -2.0));
        assert_eq!(store.get(AnnotationId::intern("t_a")).unwrap().x, 0.0);
        let b = store.get(AnnotationId::intern("t_b")).unwrap();
        assert_eq!((b.x, b.y), (105.0, -2.0));
        assert!(!store.translate(&[AnnotationId::intern("t_b")], f64::NAN, 0.0));
    }

    #[test]
    fn coerce_group_id_truncates() {
        assert_eq!(coerce_group_id(2.9), 2);
        assert_eq!(coerce_group_id(f64::NEG_INFINITY), 0);
    }
}
