//! Group sequence, labels and colors.
//!
//! A group is every annotation sharing a `group_id`. Its position in the
//! group sequence is the rank of the smallest `order` among its members,
//! so reordering boxes silently re-letters groups. Labels follow the
//! sequence (`A`, `B`, ... `Z`, `AA`, `AB`, ...), not the numeric id.

use crate::id::AnnotationId;
use crate::store::{AnnotationStore, coerce_group_id};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// One group as presented to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub group_id: i64,
    /// Position in the group sequence.
    pub sequence: usize,
    pub label: String,
    pub color: String,
    /// Members in reading order.
    pub members: SmallVec<[AnnotationId; 8]>,
}

/// Spreadsheet-style column label: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn group_label_from_index(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    // Only ASCII capitals are pushed.
    String::from_utf8(out).unwrap_or_default()
}

/// Group ids ordered by the minimum `order` of their members.
pub fn group_sequence(store: &AnnotationStore) -> Vec<i64> {
    // Store iteration is already in reading order, so first sight is the minimum.
    let mut seen = HashSet::new();
    store
        .iter()
        .filter(|a| seen.insert(a.group_id))
        .map(|a| a.group_id)
        .collect()
}

/// Full group listing with labels and palette colors.
pub fn groups(store: &AnnotationStore, palette: &[String]) -> Vec<GroupInfo> {
    let sequence = group_sequence(store);
    let mut by_id: HashMap<i64, SmallVec<[AnnotationId; 8]>> = HashMap::new();
    for a in store.iter() {
        by_id.entry(a.group_id).or_default().push(a.id);
    }
    sequence
        .into_iter()
        .enumerate()
        .map(|(i, group_id)| GroupInfo {
            group_id,
            sequence: i,
            label: group_label_from_index(i),
            color: palette_color(palette, i),
            members: by_id.remove(&group_id).unwrap_or_default(),
        })
        .collect()
}

/// Palette entry for a sequence index, cycling; empty palette gives gray.
pub fn palette_color(palette: &[String], index: usize) -> String {
    if palette.is_empty() {
        return "#888888".to_string();
    }
    palette[index % palette.len()].clone()
}

/// Label of the group an annotation belongs to.
pub fn label_for(store: &AnnotationStore, id: AnnotationId) -> Option<String> {
    let group_id = store.get(id)?.group_id;
    let pos = group_sequence(store).iter().position(|g| *g == group_id)?;
    Some(group_label_from_index(pos))
}

// ─── Assignment ──────────────────────────────────────────────────────────

/// Where `assign_group` puts the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupTarget {
    /// `max(existing group_id) + 1`.
    New,
    Existing(i64),
}

impl FromStr for GroupTarget {
    type Err = std::convert::Infallible;

    /// `"new"` or any number; unparsable or non-finite input is group 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("new") {
            return Ok(GroupTarget::New);
        }
        let n = s.parse::<f64>().unwrap_or(0.0);
        Ok(GroupTarget::Existing(coerce_group_id(n)))
    }
}

/// Id for a fresh group: one past the largest in use. When that would
/// overflow, the smallest unused non-negative id.
pub fn new_group_id(store: &AnnotationStore) -> i64 {
    let Some(max) = store.max_group_id() else {
        return 0;
    };
    max.checked_add(1).unwrap_or_else(|| {
        let used: HashSet<i64> = store.iter().map(|a| a.group_id).collect();
        (0..).find(|g| !used.contains(g)).unwrap_or(0)
    })
}

/// Put every listed annotation in one group. Returns the group id used,
/// or `None` when no listed id exists.
pub fn assign_group(
    store: &mut AnnotationStore,
    ids: &[AnnotationId],
    target: GroupTarget,
) -> Option<i64> {
    let live: Vec<AnnotationId> = ids.iter().copied().filter(|id| store.contains(*id)).collect();
    if live.is_empty() {
        return None;
    }
    let group_id = match target {
        GroupTarget::New => new_group_id(store),
        GroupTarget::Existing(g) => g,
    };
    let changed = store.set_group(&live, group_id);
    log::debug!("assigned {} annotations to group {group_id} ({changed} changed)", live.len());
    Some(group_id)
}

// ─── Shifting ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Earlier,
    Later,
}

/// Swap a group with its neighbour in the sequence.
///
/// Rewrites every annotation's `order` so that groups become contiguous
/// runs in the new sequence, each keeping its internal relative order.
/// Returns `false` at a boundary or for an unknown group.
pub fn shift_group(store: &mut AnnotationStore, group_id: i64, direction: ShiftDirection) -> bool {
    let mut sequence = group_sequence(store);
    let Some(pos) = sequence.iter().position(|g| *g == group_id) else {
        return false;
    };
    let neighbour = match direction {
        ShiftDirection::Earlier if pos > 0 => pos - 1,
        ShiftDirection::Later if pos + 1 < sequence.len() => pos + 1,
        _ => return false,
    };
    sequence.swap(pos, neighbour);

    let rank: HashMap<i64, usize> = sequence.iter().enumerate().map(|(i, g)| (*g, i)).collect();
    let mut ordered: Vec<(usize, usize, AnnotationId)> = store
        .iter()
        .map(|a| (rank[&a.group_id], a.order, a.id))
        .collect();
    ordered.sort_by_key(|(rank, order, _)| (*rank, *order));
    let orders: HashMap<AnnotationId, usize> = ordered
        .into_iter()
        .enumerate()
        .map(|(i, (_, _, id))| (id, i))
        .collect();
    store.assign_orders(&orders);
    true
}

// ─── Selection summary ───────────────────────────────────────────────────

/// Group membership of a selection, for the group picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionGroup {
    Empty,
    Uniform(i64),
    /// Members disagree; the picker must not overwrite silently.
    Mixed,
}

impl fmt::Display for SelectionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionGroup::Empty => f.write_str(""),
            SelectionGroup::Uniform(g) => write!(f, "{g}"),
            SelectionGroup::Mixed => f.write_str("mixed"),
        }
    }
}

pub fn selection_group_id(store: &AnnotationStore, selected: &[AnnotationId]) -> SelectionGroup {
    let mut groups = selected.iter().filter_map(|id| store.get(*id)).map(|a| a.group_id);
    let Some(first) = groups.next() else {
        return SelectionGroup::Empty;
    };
    if groups.all(|g| g == first) {
        SelectionGroup::Uniform(first)
    } else {
        SelectionGroup::Mixed
    }
}
