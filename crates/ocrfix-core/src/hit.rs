//! Hit testing: point or rectangle → annotation lookup, in image space.

use crate::id::AnnotationId;
use crate::store::AnnotationStore;
use kurbo::{Point, Rect};

/// Topmost annotation under `p`.
///
/// Later reading order paints on top, so the search runs back to front.
pub fn hit_test(store: &AnnotationStore, p: Point) -> Option<AnnotationId> {
    store.iter().rev().find(|a| a.contains(p)).map(|a| a.id)
}

/// Every annotation whose bounds intersect `rect` (edges inclusive),
/// in reading order. Used for marquee selection.
pub fn hit_test_rect(store: &AnnotationStore, rect: Rect) -> Vec<AnnotationId> {
    store
        .iter()
        .filter(|a| a.intersects(rect))
        .map(|a| a.id)
        .collect()
}
