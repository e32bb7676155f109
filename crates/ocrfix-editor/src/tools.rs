//! Tool system for canvas interactions.
//!
//! Each tool translates pointer events into `StoreMutation`s that the
//! `EditorSession` applies. Selection changes happen before the tool sees
//! the event, so `ToolContext::selected` is already up to date.
//!
//! | Tool | Pointer down | Pointer move | Pointer up |
//! |------|--------------|--------------|------------|
//! | **Select** | start dragging the selection | translate selection | stop |
//! | **Draw** | start a draft box (empty canvas only) | resize draft | commit or discard |
//!
//! All geometry leaving a tool is in image space: stage deltas are
//! divided by the current scale.

use crate::input::InputEvent;
use crate::session::StoreMutation;
use ocrfix_core::geometry::{rect_from_corners, to_image_space};
use ocrfix_core::{AnnotationId, AnnotationPatch, AnnotationStore, Point, RawAnnotation, Rect};

/// The active tool determines how pointer events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Draw,
}

/// What a tool may look at while handling one event.
pub struct ToolContext<'a> {
    pub store: &'a AnnotationStore,
    /// Annotation under the pointer, if any.
    pub hit: Option<AnnotationId>,
    pub selected: &'a [AnnotationId],
    pub scale: f64,
    /// Cleared during text-only phases: no drawing, moving or resizing.
    pub geometry_editable: bool,
}

pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle a pointer event, returning zero or more mutations.
    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<StoreMutation>;

    /// Abandon any in-progress gesture.
    fn cancel(&mut self);
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SelectTool {
    /// Last pointer position (stage) while dragging the selection.
    drag_from: Option<Point>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<StoreMutation> {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                // Only a press on a box that ended up selected starts a drag.
                self.drag_from = match ctx.hit {
                    Some(id) if ctx.selected.contains(&id) && ctx.geometry_editable => {
                        Some(Point::new(*x, *y))
                    }
                    _ => None,
                };
                vec![]
            }
            InputEvent::PointerMove { x, y, .. } => {
                let Some(from) = self.drag_from else {
                    return vec![];
                };
                if !ctx.geometry_editable {
                    self.drag_from = None;
                    return vec![];
                }
                self.drag_from = Some(Point::new(*x, *y));
                let scale = if ctx.scale > 0.0 && ctx.scale.is_finite() { ctx.scale } else { 1.0 };
                let dx = (x - from.x) / scale;
                let dy = (y - from.y) / scale;
                if dx == 0.0 && dy == 0.0 {
                    return vec![];
                }
                vec![StoreMutation::Translate {
                    ids: ctx.selected.to_vec(),
                    dx,
                    dy,
                }]
            }
            InputEvent::PointerUp { .. } => {
                self.drag_from = None;
                vec![]
            }
            InputEvent::Key { .. } => vec![],
        }
    }

    fn cancel(&mut self) {
        self.drag_from = None;
    }
}

// ─── Draw Tool ───────────────────────────────────────────────────────────

/// A box being drawn. Lives outside the store until pointer-up, so an
/// accidental click never reaches the annotation list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawDraft {
    /// Image-space point where the drag started.
    pub anchor: Point,
    /// Current image-space box.
    pub rect: Rect,
}

#[derive(Debug)]
pub struct DrawTool {
    draft: Option<DrawDraft>,
    min_size: f64,
}

impl DrawTool {
    pub fn new(min_size: f64) -> Self {
        Self {
            draft: None,
            min_size,
        }
    }

    pub fn draft(&self) -> Option<&DrawDraft> {
        self.draft.as_ref()
    }

    fn track(&mut self, x: f64, y: f64, scale: f64) {
        if let Some(draft) = &mut self.draft {
            let current = to_image_space(Point::new(x, y), scale);
            draft.rect = rect_from_corners(draft.anchor, current);
        }
    }
}

impl Tool for DrawTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Draw
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> Vec<StoreMutation> {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                self.draft = None;
                if ctx.hit.is_some() || !ctx.geometry_editable {
                    return vec![];
                }
                let anchor = to_image_space(Point::new(*x, *y), ctx.scale);
                self.draft = Some(DrawDraft {
                    anchor,
                    rect: Rect::new(anchor.x, anchor.y, anchor.x + 1.0, anchor.y + 1.0),
                });
                vec![]
            }
            InputEvent::PointerMove { x, y, .. } => {
                self.track(*x, *y, ctx.scale);
                vec![]
            }
            InputEvent::PointerUp { x, y, .. } => {
                self.track(*x, *y, ctx.scale);
                let Some(draft) = self.draft.take() else {
                    return vec![];
                };
                let r = draft.rect;
                if r.width() < self.min_size || r.height() < self.min_size {
                    log::debug!(
                        "discarding {:.1}x{:.1} draft below minimum size {}",
                        r.width(),
                        r.height(),
                        self.min_size
                    );
                    return vec![];
                }
                vec![StoreMutation::Insert(RawAnnotation::with_geometry(
                    r.x0,
                    r.y0,
                    r.width().max(self.min_size),
                    r.height().max(self.min_size),
                ))]
            }
            InputEvent::Key { .. } => vec![],
        }
    }

    fn cancel(&mut self) {
        self.draft = None;
    }
}

// ─── Transform commit ────────────────────────────────────────────────────

/// A shape's geometry as the rendering surface reports it after a
/// move/resize/rotate gesture, in stage pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTransform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees. Not scaled.
    pub rotation: f64,
}

/// Image-space patch for a finished transform gesture.
pub fn transform_patch(t: &ShapeTransform, scale: f64) -> AnnotationPatch {
    let s = if scale > 0.0 && scale.is_finite() { scale } else { 1.0 };
    AnnotationPatch {
        x: Some(t.x / s),
        y: Some(t.y / s),
        width: Some(t.width.abs() / s),
        height: Some(t.height.abs() / s),
        rotation: Some(t.rotation),
        ..AnnotationPatch::default()
    }
}
