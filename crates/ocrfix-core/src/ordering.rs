//! Spatial re-ordering of a selection.
//!
//! `arrange` sorts the selected boxes by a spatial key and packs them
//! into consecutive reading positions starting at the earliest selected
//! position. Unselected boxes that sat inside that window are pushed
//! past it by the selection size; everything is then renumbered densely.

use crate::id::AnnotationId;
use crate::model::Annotation;
use crate::store::AnnotationStore;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrangeDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
}

impl ArrangeDirection {
    fn compare(self, a: &Annotation, b: &Annotation) -> Ordering {
        match self {
            ArrangeDirection::LeftToRight => a.x.total_cmp(&b.x),
            ArrangeDirection::RightToLeft => b.x.total_cmp(&a.x),
            ArrangeDirection::TopToBottom => a.y.total_cmp(&b.y),
        }
    }
}

impl fmt::Display for ArrangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArrangeDirection::LeftToRight => "left-to-right",
            ArrangeDirection::RightToLeft => "right-to-left",
            ArrangeDirection::TopToBottom => "top-to-bottom",
        })
    }
}

impl FromStr for ArrangeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ltr" | "left-to-right" => Ok(ArrangeDirection::LeftToRight),
            "rtl" | "right-to-left" => Ok(ArrangeDirection::RightToLeft),
            "ttb" | "top-to-bottom" => Ok(ArrangeDirection::TopToBottom),
            other => Err(format!(
                "unknown direction '{other}' (expected ltr, rtl or ttb)"
            )),
        }
    }
}

/// Re-order the selected annotations by `direction`.
///
/// Unknown and repeated ids are ignored. Fewer than two live ids is a
/// no-op. Returns whether any `order` changed.
pub fn arrange(
    store: &mut AnnotationStore,
    selected: &[AnnotationId],
    direction: ArrangeDirection,
) -> bool {
    let wanted: HashSet<AnnotationId> = selected.iter().copied().collect();
    let (mut picked, others): (Vec<&Annotation>, Vec<&Annotation>) =
        store.iter().partition(|a| wanted.contains(&a.id));
    if picked.len() < 2 {
        return false;
    }

    // Stable: equal keys keep their current reading order.
    picked.sort_by(|a, b| direction.compare(a, b));

    let count = picked.len();
    let min_order = picked.iter().map(|a| a.order).min().unwrap_or(0);
    let window = min_order..min_order + count;

    let before: Vec<AnnotationId> = store.ids();
    let mut orders: HashMap<AnnotationId, usize> = HashMap::with_capacity(store.len());
    for (i, a) in picked.iter().enumerate() {
        orders.insert(a.id, min_order + i);
    }
    for a in &others {
        if window.contains(&a.order) {
            orders.insert(a.id, a.order + count);
        }
    }
    store.assign_orders(&orders);

    let changed = store.ids() != before;
    log::debug!("arranged {count} annotations {direction} (changed: {changed})");
    changed
}
