//! Full-text assembly for preview and export.
//!
//! Works on the order-sorted store and the current group sequence.
//! Right-to-left boxes are reversed on the way out; stored text is
//! never touched.

use crate::groups::{group_label_from_index, group_sequence};
use crate::store::AnnotationStore;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Formatting policy for assembled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextMode {
    /// Everything concatenated, no separators.
    Continuous,
    /// One line per annotation, tagged with its group label.
    LineBreak,
    /// One line per group.
    #[default]
    GroupBreak,
    /// One paragraph per group, separated by a blank line.
    GroupBlank,
}

impl TextMode {
    pub const ALL: [TextMode; 4] = [
        TextMode::Continuous,
        TextMode::LineBreak,
        TextMode::GroupBreak,
        TextMode::GroupBlank,
    ];
}

impl fmt::Display for TextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextMode::Continuous => "continuous",
            TextMode::LineBreak => "line-break",
            TextMode::GroupBreak => "group-break",
            TextMode::GroupBlank => "group-blank",
        })
    }
}

impl FromStr for TextMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextMode::ALL
            .into_iter()
            .find(|m| m.to_string() == s)
            .ok_or_else(|| {
                format!("unknown text mode '{s}' (expected continuous, line-break, group-break or group-blank)")
            })
    }
}

/// Assemble the page text under `mode`.
pub fn assemble(store: &AnnotationStore, mode: TextMode) -> String {
    match mode {
        TextMode::Continuous => store.iter().map(|a| a.display_text()).collect(),
        TextMode::LineBreak => {
            let labels: HashMap<i64, String> = group_sequence(store)
                .into_iter()
                .enumerate()
                .map(|(i, g)| (g, group_label_from_index(i)))
                .collect();
            store
                .iter()
                .map(|a| {
                    let label = labels.get(&a.group_id).map(String::as_str).unwrap_or("?");
                    format!("[{label}] {}", a.display_text())
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        TextMode::GroupBreak => group_paragraphs(store).join("\n"),
        TextMode::GroupBlank => group_paragraphs(store).join("\n\n"),
    }
}

/// Concatenated text of each group, in group sequence.
fn group_paragraphs(store: &AnnotationStore) -> Vec<String> {
    let mut by_group: HashMap<i64, String> = HashMap::new();
    for a in store.iter() {
        by_group.entry(a.group_id).or_default().push_str(&a.display_text());
    }
    group_sequence(store)
        .into_iter()
        .map(|g| by_group.remove(&g).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RawAnnotation;
    use pretty_assertions::assert_eq;

    fn page() -> AnnotationStore {
        let entries = [
            ("t_1", "Hello", 1, "ltr"),
            ("t_2", "World", 1, "ltr"),
            ("t_3", "cba", 0, "rtl"),
            ("t_4", "!", 1, "ltr"),
        ];
        let mut store = AnnotationStore::default();
        store.load(
            entries
                .iter()
                .map(|(id, text, group, dir)| RawAnnotation {
                    id: Some(id.to_string()),
                    text: Some(text.to_string()),
                    group_id: Some(*group as f64),
                    text_direction: Some(dir.to_string()),
                    ..RawAnnotation::with_geometry(0.0, 0.0, 20.0, 20.0)
                })
                .collect(),
        );
        store
    }

    #[test]
    fn continuous_concatenates_in_order() {
        assert_eq!(assemble(&page(), TextMode::Continuous), "HelloWorldabc!");
    }

    #[test]
    fn line_break_tags_group_labels() {
        assert_eq!(
            assemble(&page(), TextMode::LineBreak),
            "[A] Hello\n[A] World\n[B] abc\n[A] !"
        );
    }

    #[test]
    fn group_modes_join_per_group() {
        assert_eq!(assemble(&page(), TextMode::GroupBreak), "HelloWorld!\nabc");
        assert_eq!(assemble(&page(), TextMode::GroupBlank), "HelloWorld!\n\nabc");
    }

    #[test]
    fn empty_store_gives_empty_text() {
        let store = AnnotationStore::default();
        for mode in TextMode::ALL {
            assert_eq!(assemble(&store, mode), "");
        }
    }

    #[test]
    fn mode_names_roundtrip() {
        for mode in TextMode::ALL {
            assert_eq!(mode.to_string().parse::<TextMode>(), Ok(mode));
        }
        assert!("paragraphs".parse::<TextMode>().is_err());
    }
}
