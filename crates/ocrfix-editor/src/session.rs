//! Editor session: the single owner of one page's editing state.
//!
//! Every change to the annotation list goes through `apply` /
//! `apply_all`, which form the transaction boundary:
//!
//! 1. run the mutation against the store (which re-normalizes `order`),
//! 2. drop selection entries and render handles for vanished ids,
//! 3. mark the autosave pipeline dirty,
//! 4. notify subscribers.
//!
//! Subscribers run synchronously at the end of each public operation,
//! never halfway through one.

use crate::arena::{HandleArena, RenderHandle};
use crate::autosave::{AutosavePipeline, Clock, SaveRequest, SaveStatus, SaveTicket, system_clock};
use crate::input::{InputEvent, Modifiers};
use crate::selection::{SelectMode, SelectionController};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{DrawTool, SelectTool, ShapeTransform, Tool, ToolContext, ToolKind, transform_patch};
use ocrfix_core::geometry::{to_display_space, to_image_space};
use ocrfix_core::{
    Annotation, AnnotationId, AnnotationPatch, AnnotationStore, ArrangeDirection, EditorConfig,
    Geometry, GroupInfo, GroupTarget, PageDocument, Point, RawAnnotation, Rect, SelectionGroup,
    ShiftDirection, Size, StageSize, TextDirection, TextMode, arrange, assemble, assign_group,
    compute_stage_size, groups, hit_test, selection_group_id, shift_group,
};
use std::mem::discriminant;

/// A change to the annotation list.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreMutation {
    Insert(RawAnnotation),
    Update {
        id: AnnotationId,
        patch: AnnotationPatch,
    },
    Delete(Vec<AnnotationId>),
    Translate {
        ids: Vec<AnnotationId>,
        dx: f64,
        dy: f64,
    },
    Reorder {
        id: AnnotationId,
        index: usize,
    },
    AssignGroup {
        ids: Vec<AnnotationId>,
        target: GroupTarget,
    },
    ShiftGroup {
        group_id: i64,
        direction: ShiftDirection,
    },
    Arrange {
        ids: Vec<AnnotationId>,
        direction: ArrangeDirection,
    },
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A page was loaded (or failed to load; see `page_error`).
    Loaded,
    AnnotationsChanged,
    SelectionChanged,
    SaveStatusChanged(SaveStatus),
    /// Tool or selection mode changed.
    ModeChanged,
    /// The marquee or draw draft moved; repaint the overlay.
    OverlayChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

/// Result of committing a move/resize/rotate gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOutcome {
    Applied,
    /// Geometry is locked: snap the shape back to this committed geometry.
    Restore(Geometry),
    /// Unknown id (deleted meanwhile).
    Ignored,
}

pub struct EditorSession {
    store: AnnotationStore,
    selection: SelectionController,
    select_tool: SelectTool,
    draw_tool: DrawTool,
    tool: ToolKind,
    autosave: AutosavePipeline,
    config: EditorConfig,
    image_size: Option<Size>,
    stage: StageSize,
    geometry_editable: bool,
    handles: HandleArena<RenderHandle>,
    page_error: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    pending: Vec<SessionEvent>,
    clock: Clock,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_clock(config, system_clock)
    }

    /// Session whose debounce timer reads time from `clock`.
    pub fn with_clock(config: EditorConfig, clock: Clock) -> Self {
        Self {
            store: AnnotationStore::new(&config),
            selection: SelectionController::new(config.marquee_threshold),
            select_tool: SelectTool::new(),
            draw_tool: DrawTool::new(config.min_size),
            tool: ToolKind::Select,
            autosave: AutosavePipeline::new(config.autosave_debounce()),
            image_size: None,
            stage: StageSize::default(),
            geometry_editable: true,
            handles: HandleArena::new(),
            page_error: None,
            listeners: Vec::new(),
            next_subscription: 0,
            pending: Vec::new(),
            clock,
            config,
        }
    }

    // ─── Observers ───────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Queue an event; a later event of the same kind replaces it.
    fn emit(&mut self, event: SessionEvent) {
        let kind = discriminant(&event);
        if let Some(slot) = self.pending.iter_mut().find(|e| discriminant(*e) == kind) {
            *slot = event;
        } else {
            self.pending.push(event);
        }
    }

    fn notify(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending);
        for (_, listener) in &mut self.listeners {
            for event in &events {
                listener(event);
            }
        }
    }

    fn emit_save_status(&mut self) {
        let status = self.autosave.status().clone();
        self.emit(SessionEvent::SaveStatusChanged(status));
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Replace the page content. Not an edit: no save is scheduled.
    pub fn load(&mut self, raw: Vec<RawAnnotation>, updated_at: Option<String>) {
        self.store.load(raw);
        self.selection.clear();
        self.selection.cancel_marquee();
        self.select_tool.cancel();
        self.draw_tool.cancel();
        self.handles.clear();
        self.page_error = None;
        self.autosave.mark_loaded(updated_at);
        log::info!("page loaded with {} annotations", self.store.len());
        self.emit(SessionEvent::Loaded);
        self.emit(SessionEvent::AnnotationsChanged);
        self.emit(SessionEvent::SelectionChanged);
        self.emit_save_status();
        self.notify();
    }

    pub fn load_document(&mut self, doc: PageDocument) {
        self.load(doc.annotations, doc.updated_at);
    }

    /// The page could not be loaded. Holds an empty list, never a guess.
    pub fn load_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("page load failed: {message}");
        self.store.clear();
        self.selection.clear();
        self.selection.cancel_marquee();
        self.select_tool.cancel();
        self.draw_tool.cancel();
        self.handles.clear();
        self.autosave.reset();
        self.page_error = Some(message);
        self.emit(SessionEvent::Loaded);
        self.emit(SessionEvent::AnnotationsChanged);
        self.emit(SessionEvent::SelectionChanged);
        self.emit_save_status();
        self.notify();
    }

    pub fn page_error(&self) -> Option<&str> {
        self.page_error.as_deref()
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Update the page image and container sizes, recomputing the scale.
    pub fn set_viewport(&mut self, image: Option<Size>, container: Size) {
        self.image_size = image;
        self.stage = compute_stage_size(image, container);
    }

    pub fn stage(&self) -> StageSize {
        self.stage
    }

    pub fn scale(&self) -> f64 {
        self.stage.scale
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply one mutation and notify. Returns whether anything changed.
    pub fn apply(&mut self, mutation: StoreMutation) -> bool {
        let changed = self.apply_inner(mutation).is_some();
        self.notify();
        changed
    }

    /// Apply several mutations as one transaction.
    pub fn apply_all(&mut self, mutations: impl IntoIterator<Item = StoreMutation>) -> bool {
        let mut changed = false;
        for mutation in mutations {
            changed |= self.apply_inner(mutation).is_some();
        }
        self.notify();
        changed
    }

    /// Runs one mutation and the post-mutation bookkeeping. Returns the
    /// inserted id for inserts, or some placeholder id on any change.
    fn apply_inner(&mut self, mutation: StoreMutation) -> Option<AnnotationId> {
        let touched = match mutation {
            StoreMutation::Insert(raw) => Some(self.store.insert(raw)),
            StoreMutation::Update { id, patch } => self.store.update(id, patch).then_some(id),
            StoreMutation::Delete(ids) => self.store.delete(&ids).first().copied(),
            StoreMutation::Translate { ids, dx, dy } => {
                let first = ids.first().copied();
                self.store.translate(&ids, dx, dy).then_some(first).flatten()
            }
            StoreMutation::Reorder { id, index } => self.store.reorder(id, index).then_some(id),
            StoreMutation::AssignGroup { ids, target } => {
                let first = ids.first().copied();
                let before: Vec<i64> = self.group_ids_of(&ids);
                assign_group(&mut self.store, &ids, target)?;
                (self.group_ids_of(&ids) != before).then_some(first).flatten()
            }
            StoreMutation::ShiftGroup {
                group_id,
                direction,
            } => {
                let first = self.store.iter().find(|a| a.group_id == group_id).map(|a| a.id);
                shift_group(&mut self.store, group_id, direction).then_some(first).flatten()
            }
            StoreMutation::Arrange { ids, direction } => {
                let first = ids.first().copied();
                arrange(&mut self.store, &ids, direction).then_some(first).flatten()
            }
        }?;

        if self.selection.prune(&self.store) {
            self.emit(SessionEvent::SelectionChanged);
        }
        let dropped = self.handles.retain_existing(&self.store);
        if dropped > 0 {
            log::debug!("released {dropped} render handles");
        }
        if self.autosave.mark_dirty((self.clock)()) {
            self.emit_save_status();
        }
        self.emit(SessionEvent::AnnotationsChanged);
        Some(touched)
    }

    fn group_ids_of(&self, ids: &[AnnotationId]) -> Vec<i64> {
        ids.iter()
            .filter_map(|id| self.store.get(*id))
            .map(|a| a.group_id)
            .collect()
    }

    pub fn set_text(&mut self, id: AnnotationId, text: impl Into<String>) -> bool {
        self.apply(StoreMutation::Update {
            id,
            patch: AnnotationPatch::text(text),
        })
    }

    pub fn set_label(&mut self, ids: &[AnnotationId], label: &str) -> bool {
        self.apply_all(ids.iter().map(|id| StoreMutation::Update {
            id: *id,
            patch: AnnotationPatch {
                label: Some(label.to_string()),
                ..AnnotationPatch::default()
            },
        }))
    }

    pub fn set_direction(&mut self, ids: &[AnnotationId], direction: TextDirection) -> bool {
        self.apply_all(ids.iter().map(|id| StoreMutation::Update {
            id: *id,
            patch: AnnotationPatch {
                text_direction: Some(direction),
                ..AnnotationPatch::default()
            },
        }))
    }

    pub fn delete(&mut self, ids: &[AnnotationId]) -> bool {
        self.apply(StoreMutation::Delete(ids.to_vec()))
    }

    pub fn delete_selected(&mut self) -> bool {
        let ids = self.selection.selected().to_vec();
        self.delete(&ids)
    }

    pub fn reorder(&mut self, id: AnnotationId, index: usize) -> bool {
        self.apply(StoreMutation::Reorder { id, index })
    }

    /// Re-order the selection spatially.
    pub fn arrange(&mut self, direction: ArrangeDirection) -> bool {
        let ids = self.selection.selected().to_vec();
        self.apply(StoreMutation::Arrange { ids, direction })
    }

    /// Put the selection into a group. Returns the group id used.
    pub fn assign_group(&mut self, target: GroupTarget) -> Option<i64> {
        let ids = self.selection.selected().to_vec();
        self.apply(StoreMutation::AssignGroup {
            ids: ids.clone(),
            target,
        });
        ids.iter()
            .find_map(|id| self.store.get(*id))
            .map(|a| a.group_id)
    }

    /// Move the selection's group one step in the group sequence. A mixed
    /// selection is left alone.
    pub fn shift_group(&mut self, direction: ShiftDirection) -> bool {
        match self.selection_group() {
            SelectionGroup::Uniform(group_id) => self.apply(StoreMutation::ShiftGroup {
                group_id,
                direction,
            }),
            SelectionGroup::Empty | SelectionGroup::Mixed => false,
        }
    }

    /// Move the selection by image units (keyboard nudge).
    pub fn nudge(&mut self, dx: f64, dy: f64) -> bool {
        if !self.geometry_editable {
            return false;
        }
        let ids = self.selection.selected().to_vec();
        self.apply(StoreMutation::Translate { ids, dx, dy })
    }

    /// Commit a move/resize/rotate gesture reported in stage pixels.
    pub fn commit_transform(&mut self, id: AnnotationId, shape: ShapeTransform) -> TransformOutcome {
        let Some(current) = self.store.get(id).map(Annotation::geometry) else {
            return TransformOutcome::Ignored;
        };
        if !self.geometry_editable {
            return TransformOutcome::Restore(current);
        }
        self.apply(StoreMutation::Update {
            id,
            patch: transform_patch(&shape, self.stage.scale),
        });
        TransformOutcome::Applied
    }

    pub fn set_geometry_editable(&mut self, editable: bool) {
        if self.geometry_editable == editable {
            return;
        }
        self.geometry_editable = editable;
        if !editable {
            self.select_tool.cancel();
            self.draw_tool.cancel();
            self.emit(SessionEvent::OverlayChanged);
        }
        self.emit(SessionEvent::ModeChanged);
        self.notify();
    }

    pub fn geometry_editable(&self) -> bool {
        self.geometry_editable
    }

    // ─── Modes ───────────────────────────────────────────────────────────

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn is_drawing(&self) -> bool {
        self.tool == ToolKind::Draw
    }

    pub fn select_mode(&self) -> SelectMode {
        self.selection.mode()
    }

    /// Enter or leave draw mode. Drawing forces single selection.
    pub fn set_draw_mode(&mut self, on: bool) {
        self.set_tool(if on { ToolKind::Draw } else { ToolKind::Select });
        self.notify();
    }

    fn set_tool(&mut self, tool: ToolKind) {
        if self.tool == tool {
            return;
        }
        self.select_tool.cancel();
        self.draw_tool.cancel();
        if self.selection.marquee().is_some() {
            self.selection.cancel_marquee();
        }
        self.tool = tool;
        if tool == ToolKind::Draw && self.selection.set_mode(SelectMode::Single) {
            self.emit(SessionEvent::SelectionChanged);
        }
        self.emit(SessionEvent::OverlayChanged);
        self.emit(SessionEvent::ModeChanged);
    }

    /// Switch selection mode. Asking for `Multi` leaves draw mode.
    pub fn set_select_mode(&mut self, mode: SelectMode) {
        self.change_select_mode(mode);
        self.notify();
    }

    fn change_select_mode(&mut self, mode: SelectMode) {
        if mode == SelectMode::Multi {
            self.set_tool(ToolKind::Select);
        }
        if self.selection.mode() == mode {
            return;
        }
        if self.selection.set_mode(mode) {
            self.emit(SessionEvent::SelectionChanged);
        }
        self.emit(SessionEvent::ModeChanged);
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selected(&self) -> &[AnnotationId] {
        self.selection.selected()
    }

    pub fn selection_group(&self) -> SelectionGroup {
        selection_group_id(&self.store, self.selection.selected())
    }

    /// Select exactly `ids` (unknown ids are dropped).
    pub fn select(&mut self, ids: &[AnnotationId]) {
        let live: Vec<AnnotationId> = ids.iter().copied().filter(|id| self.store.contains(*id)).collect();
        if live.len() > 1 {
            self.change_select_mode(SelectMode::Multi);
        }
        if self.selection.replace(&live) {
            self.emit(SessionEvent::SelectionChanged);
        }
        self.notify();
    }

    pub fn select_all(&mut self) {
        let ids = self.store.ids();
        self.select(&ids);
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.emit(SessionEvent::SelectionChanged);
        }
        self.notify();
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    /// Route a pointer event. Returns whether the store changed.
    pub fn handle_pointer(&mut self, event: &InputEvent) -> bool {
        let changed = match event {
            InputEvent::PointerDown { x, y, modifiers } => {
                self.pointer_down(Point::new(*x, *y), *modifiers, event)
            }
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(Point::new(*x, *y), event),
            InputEvent::PointerUp { .. } => self.pointer_up(event),
            InputEvent::Key { key, modifiers } => {
                self.key(key, *modifiers);
                false
            }
        };
        self.notify();
        changed
    }

    fn pointer_down(&mut self, at: Point, modifiers: Modifiers, event: &InputEvent) -> bool {
        let hit = hit_test(&self.store, to_image_space(at, self.stage.scale));
        let selection_changed = match (self.tool, hit) {
            (ToolKind::Select, Some(id)) => self.selection.click_annotation(id, modifiers),
            (ToolKind::Select, None) => {
                let changed = self.selection.click_background(at, modifiers);
                if self.selection.marquee().is_some() {
                    self.emit(SessionEvent::OverlayChanged);
                }
                changed
            }
            // Clicking a box while drawing selects it instead of starting a draft.
            (ToolKind::Draw, Some(id)) => self.selection.click_annotation(id, Modifiers::NONE),
            (ToolKind::Draw, None) => false,
        };
        if selection_changed {
            self.emit(SessionEvent::SelectionChanged);
        }
        let mutations = self.run_tool(event, hit);
        if self.tool == ToolKind::Draw {
            self.emit(SessionEvent::OverlayChanged);
        }
        self.apply_mutations(mutations)
    }

    fn pointer_move(&mut self, at: Point, event: &InputEvent) -> bool {
        if self.selection.drag_marquee(at) {
            self.emit(SessionEvent::OverlayChanged);
            return false;
        }
        let mutations = self.run_tool(event, None);
        if self.draw_tool.draft().is_some() {
            self.emit(SessionEvent::OverlayChanged);
        }
        self.apply_mutations(mutations)
    }

    fn pointer_up(&mut self, event: &InputEvent) -> bool {
        if self.selection.marquee().is_some() {
            if self.selection.finish_marquee(&self.store, self.stage.scale) {
                self.emit(SessionEvent::SelectionChanged);
            }
            self.emit(SessionEvent::OverlayChanged);
        }
        let had_draft = self.draw_tool.draft().is_some();
        let mutations = self.run_tool(event, None);
        if had_draft {
            self.emit(SessionEvent::OverlayChanged);
        }
        let mut changed = false;
        for mutation in mutations {
            let is_insert = matches!(mutation, StoreMutation::Insert(_));
            if let Some(id) = self.apply_inner(mutation) {
                changed = true;
                // A freshly drawn box becomes the selection.
                if is_insert && self.selection.replace(&[id]) {
                    self.emit(SessionEvent::SelectionChanged);
                }
            }
        }
        changed
    }

    fn run_tool(&mut self, event: &InputEvent, hit: Option<AnnotationId>) -> Vec<StoreMutation> {
        let ctx = ToolContext {
            store: &self.store,
            hit,
            selected: self.selection.selected(),
            scale: self.stage.scale,
            geometry_editable: self.geometry_editable,
        };
        match self.tool {
            ToolKind::Select => self.select_tool.handle(event, &ctx),
            ToolKind::Draw => self.draw_tool.handle(event, &ctx),
        }
    }

    fn apply_mutations(&mut self, mutations: Vec<StoreMutation>) -> bool {
        let mut changed = false;
        for mutation in mutations {
            changed |= self.apply_inner(mutation).is_some();
        }
        changed
    }

    /// In-progress draw box in stage coordinates.
    pub fn draft_rect(&self) -> Option<Rect> {
        self.draw_tool
            .draft()
            .map(|d| to_display_space(d.rect, self.stage.scale))
    }

    /// In-progress marquee in stage coordinates.
    pub fn marquee_rect(&self) -> Option<Rect> {
        self.selection.marquee_rect()
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and perform a key binding. Returns the action taken.
    pub fn handle_key(&mut self, key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let action = self.key(key, modifiers);
        self.notify();
        action
    }

    fn key(&mut self, key: &str, m: Modifiers) -> Option<ShortcutAction> {
        let action = ShortcutMap::resolve(key, m.ctrl, m.shift, m.alt, m.meta)?;
        log::debug!("shortcut {key:?} -> {action:?}");
        let selected = self.selection.selected().to_vec();
        match action {
            ShortcutAction::ToggleDraw => {
                let next = if self.is_drawing() { ToolKind::Select } else { ToolKind::Draw };
                self.set_tool(next);
            }
            ShortcutAction::ToggleMulti => {
                let next = match self.selection.mode() {
                    SelectMode::Single => SelectMode::Multi,
                    SelectMode::Multi => SelectMode::Single,
                };
                self.change_select_mode(next);
            }
            ShortcutAction::Deselect => {
                self.set_tool(ToolKind::Select);
                if self.selection.clear() {
                    self.emit(SessionEvent::SelectionChanged);
                }
            }
            ShortcutAction::Delete => {
                self.apply_inner(StoreMutation::Delete(selected));
            }
            ShortcutAction::SelectAll => {
                let ids = self.store.ids();
                if ids.len() > 1 {
                    self.change_select_mode(SelectMode::Multi);
                }
                if self.selection.replace(&ids) {
                    self.emit(SessionEvent::SelectionChanged);
                }
            }
            ShortcutAction::Nudge { dx, dy } => {
                if self.geometry_editable {
                    self.apply_inner(StoreMutation::Translate {
                        ids: selected,
                        dx: dx as f64,
                        dy: dy as f64,
                    });
                }
            }
            ShortcutAction::NewGroup => {
                if !selected.is_empty() {
                    self.apply_inner(StoreMutation::AssignGroup {
                        ids: selected,
                        target: GroupTarget::New,
                    });
                }
            }
            ShortcutAction::GroupEarlier | ShortcutAction::GroupLater => {
                let direction = if action == ShortcutAction::GroupEarlier {
                    ShiftDirection::Earlier
                } else {
                    ShiftDirection::Later
                };
                if let SelectionGroup::Uniform(group_id) = self.selection_group() {
                    self.apply_inner(StoreMutation::ShiftGroup {
                        group_id,
                        direction,
                    });
                }
            }
            ShortcutAction::Arrange(direction) => {
                self.apply_inner(StoreMutation::Arrange {
                    ids: selected,
                    direction,
                });
            }
            ShortcutAction::SaveNow => self.autosave.flush((self.clock)()),
        }
        Some(action)
    }

    // ─── Autosave ────────────────────────────────────────────────────────

    pub fn save_status(&self) -> &SaveStatus {
        self.autosave.status()
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.autosave.has_unsaved_edits()
    }

    pub fn is_saving(&self) -> bool {
        self.autosave.is_saving()
    }

    /// When the host should next call `poll_autosave`.
    pub fn next_save_deadline(&self) -> Option<std::time::Instant> {
        self.autosave.next_deadline()
    }

    /// Skip the debounce window on the next poll.
    pub fn save_now(&mut self) {
        self.autosave.flush((self.clock)());
    }

    /// Issue the pending save if its debounce window has elapsed.
    pub fn poll_autosave(&mut self) -> Option<SaveRequest> {
        let now = (self.clock)();
        let store = &self.store;
        let request = self.autosave.poll(now, || store.snapshot());
        if request.is_some() {
            self.emit_save_status();
            self.notify();
        }
        request
    }

    /// Report the outcome of a save issued by `poll_autosave` or
    /// `retry_save`. `Ok` carries the server's `updated_at`.
    pub fn complete_save(&mut self, ticket: SaveTicket, outcome: Result<String, String>) {
        if self.autosave.complete(ticket, outcome, (self.clock)()) {
            self.emit_save_status();
            self.notify();
        }
    }

    /// Replay the failed save. Only valid while in the error state.
    pub fn retry_save(&mut self) -> Option<SaveRequest> {
        let request = self.autosave.retry();
        if request.is_some() {
            self.emit_save_status();
            self.notify();
        }
        request
    }

    // ─── Render handles ──────────────────────────────────────────────────

    /// Attach a rendering handle to a live annotation.
    pub fn attach_handle(&mut self, id: AnnotationId, handle: RenderHandle) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        self.handles.insert(id, handle);
        true
    }

    pub fn handle_for(&self, id: AnnotationId) -> Option<RenderHandle> {
        self.handles.get(id).copied()
    }

    pub fn detach_handle(&mut self, id: AnnotationId) -> Option<RenderHandle> {
        self.handles.remove(id)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.as_slice()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn groups(&self) -> Vec<GroupInfo> {
        groups(&self.store, &self.config.palette)
    }

    pub fn assemble(&self, mode: TextMode) -> String {
        assemble(&self.store, mode)
    }
}
