//! Annotation data model.
//!
//! An `Annotation` is one recognized, editable text region on a page
//! image. Geometry is always in source-image units (the space persisted
//! to storage); display scaling lives in `geometry`.
//!
//! `order` is a dense reading-sequence index maintained by the
//! `AnnotationStore`; `group_id` is an opaque bucket key whose display
//! identity (letter, color) is derived, never stored.

use crate::id::AnnotationId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Default minimum box edge, in image units.
pub const MIN_SIZE: f64 = 12.0;

/// Label given to annotations that arrive without one.
pub const DEFAULT_LABEL: &str = "text";

// ─── Text direction ──────────────────────────────────────────────────────

/// Reading direction of an annotation's text. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Lenient parse used on load: anything but `rtl` is `ltr`.
    pub fn from_loose(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("rtl") {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }
}

impl fmt::Display for TextDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextDirection::Ltr => f.write_str("ltr"),
            TextDirection::Rtl => f.write_str("rtl"),
        }
    }
}

impl FromStr for TextDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ltr" => Ok(TextDirection::Ltr),
            "rtl" => Ok(TextDirection::Rtl),
            other => Err(format!("unknown text direction '{other}'")),
        }
    }
}

// ─── Annotation ──────────────────────────────────────────────────────────

/// One editable OCR box.
///
/// `Serialize` produces exactly the write-contract field set; the
/// recognizer `confidence` is kept for display only and never written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub text: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, clockwise, around the top-left corner.
    pub rotation: f64,
    pub order: usize,
    pub group_id: i64,
    pub text_direction: TextDirection,
    #[serde(skip)]
    pub confidence: Option<f64>,
}

impl Annotation {
    /// A blank annotation with the given geometry, in group 0.
    pub fn new(id: AnnotationId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            text: String::new(),
            label: DEFAULT_LABEL.to_string(),
            x,
            y,
            width,
            height,
            rotation: 0.0,
            order: 0,
            group_id: 0,
            text_direction: TextDirection::Ltr,
            confidence: None,
        }
    }

    /// Axis-aligned bounds in image space (rotation ignored).
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn contains(&self, p: Point) -> bool {
        let b = self.bounds();
        p.x >= b.x0 && p.x <= b.x1 && p.y >= b.y0 && p.y <= b.y1
    }

    /// Closed-interval intersection with `rect` (touching edges count).
    pub fn intersects(&self, rect: Rect) -> bool {
        intersects_inclusive(self.bounds(), rect)
    }

    /// Text as it should be presented: reversed for right-to-left boxes.
    /// The stored `text` is never modified.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self.text_direction {
            TextDirection::Ltr => Cow::Borrowed(&self.text),
            TextDirection::Rtl => Cow::Owned(self.text.chars().rev().collect()),
        }
    }

    /// Geometry fields only, for snapshot/restore in the editor.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
        }
    }
}

/// `left <= a.right && right >= a.left && top <= a.bottom && bottom >= a.top`.
pub fn intersects_inclusive(a: Rect, b: Rect) -> bool {
    let a = a.abs();
    let b = b.abs();
    b.x0 <= a.x1 && b.x1 >= a.x0 && b.y0 <= a.y1 && b.y1 >= a.y0
}

/// Position, size and rotation of one box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

// ─── Patches ─────────────────────────────────────────────────────────────

/// Partial update for one annotation. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub text: Option<String>,
    pub label: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub order: Option<usize>,
    pub group_id: Option<i64>,
    pub text_direction: Option<TextDirection>,
}

impl AnnotationPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn geometry(g: Geometry) -> Self {
        Self {
            x: Some(g.x),
            y: Some(g.y),
            width: Some(g.width),
            height: Some(g.height),
            rotation: Some(g.rotation),
            ..Self::default()
        }
    }

    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// True when the patch touches fields that affect order or grouping.
    pub fn is_structural(&self) -> bool {
        self.order.is_some() || self.group_id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(x: f64, y: f64, w: f64, h: f64) -> Annotation {
        Annotation::new(AnnotationId::intern("model_test"), x, y, w, h)
    }

    #[test]
    fn touching_edges_intersect() {
        let a = ann(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!a.intersects(Rect::new(10.5, 0.0, 20.0, 5.0)));
    }

    #[test]
    fn intersection_accepts_inverted_rects() {
        let a = ann(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(Rect::new(15.0, 15.0, 5.0, 5.0)));
    }

    #[test]
    fn rtl_text_is_reversed_for_display_only() {
        let mut a = ann(0.0, 0.0, 20.0, 20.0);
        a.text = "abc".into();
        a.text_direction = TextDirection::Rtl;
        assert_eq!(a.display_text(), "cba");
        assert_eq!(a.text, "abc");
    }

    #[test]
    fn loose_direction_parse_defaults_to_ltr() {
        assert_eq!(TextDirection::from_loose("RTL"), TextDirection::Rtl);
        assert_eq!(TextDirection::from_loose("vertical"), TextDirection::Ltr);
        assert_eq!(TextDirection::from_loose(""), TextDirection::Ltr);
    }

    #[test]
    fn structural_patch_detection() {
        assert!(!AnnotationPatch::text("x").is_structural());
        let p = AnnotationPatch {
            group_id: Some(2),
            ..AnnotationPatch::default()
        };
        assert!(p.is_structural());
    }
}
