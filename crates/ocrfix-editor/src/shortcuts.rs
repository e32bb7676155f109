//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s so every host
//! surface shares one binding table.

use ocrfix_core::ArrangeDirection;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Modes ──
    ToggleDraw,
    ToggleMulti,
    /// Clear selection and leave draw mode.
    Deselect,

    // ── Edit ──
    Delete,
    SelectAll,
    /// Move the selection by whole image units.
    Nudge { dx: i32, dy: i32 },

    // ── Reading order ──
    NewGroup,
    GroupEarlier,
    GroupLater,
    Arrange(ArrangeDirection),

    // ── Persistence ──
    /// Save immediately instead of waiting for the debounce window.
    SaveNow,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` plays the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"d"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "l" | "L" => Some(ShortcutAction::Arrange(ArrangeDirection::LeftToRight)),
                "r" | "R" => Some(ShortcutAction::Arrange(ArrangeDirection::RightToLeft)),
                "t" | "T" => Some(ShortcutAction::Arrange(ArrangeDirection::TopToBottom)),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "s" | "S" => Some(ShortcutAction::SaveNow),
                _ => None,
            };
        }

        let step = if shift { 10 } else { 1 };
        let nudge = match key {
            "ArrowLeft" => Some((-step, 0)),
            "ArrowRight" => Some((step, 0)),
            "ArrowUp" => Some((0, -step)),
            "ArrowDown" => Some((0, step)),
            _ => None,
        };
        if let Some((dx, dy)) = nudge {
            return Some(ShortcutAction::Nudge { dx, dy });
        }

        if shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        match key {
            "d" | "D" => Some(ShortcutAction::ToggleDraw),
            "m" | "M" => Some(ShortcutAction::ToggleMulti),
            "g" | "G" => Some(ShortcutAction::NewGroup),
            "[" => Some(ShortcutAction::GroupEarlier),
            "]" => Some(ShortcutAction::GroupLater),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_mode_toggles() {
        assert_eq!(
            ShortcutMap::resolve("d", false, false, false, false),
            Some(ShortcutAction::ToggleDraw)
        );
        assert_eq!(
            ShortcutMap::resolve("m", false, false, false, false),
            Some(ShortcutAction::ToggleMulti)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", false, false, false, false),
            Some(ShortcutAction::Deselect)
        );
    }

    #[test]
    fn resolve_delete() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
    }

    #[test]
    fn resolve_cmd_combos() {
        // Cmd+A and Ctrl+A
        assert_eq!(
            ShortcutMap::resolve("a", false, false, false, true),
            Some(ShortcutAction::SelectAll)
        );
        assert_eq!(
            ShortcutMap::resolve("a", true, false, false, false),
            Some(ShortcutAction::SelectAll)
        );
        assert_eq!(
            ShortcutMap::resolve("s", false, false, false, true),
            Some(ShortcutAction::SaveNow)
        );
    }

    #[test]
    fn resolve_arrange() {
        assert_eq!(
            ShortcutMap::resolve("L", false, true, false, true),
            Some(ShortcutAction::Arrange(ArrangeDirection::LeftToRight))
        );
        assert_eq!(
            ShortcutMap::resolve("r", true, true, false, false),
            Some(ShortcutAction::Arrange(ArrangeDirection::RightToLeft))
        );
        assert_eq!(
            ShortcutMap::resolve("T", false, true, false, true),
            Some(ShortcutAction::Arrange(ArrangeDirection::TopToBottom))
        );
    }

    #[test]
    fn resolve_groups() {
        assert_eq!(
            ShortcutMap::resolve("g", false, false, false, false),
            Some(ShortcutAction::NewGroup)
        );
        assert_eq!(
            ShortcutMap::resolve("[", false, false, false, false),
            Some(ShortcutAction::GroupEarlier)
        );
        assert_eq!(
            ShortcutMap::resolve("]", false, false, false, false),
            Some(ShortcutAction::GroupLater)
        );
    }

    #[test]
    fn resolve_nudge_steps() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", false, false, false, false),
            Some(ShortcutAction::Nudge { dx: -1, dy: 0 })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", false, true, false, false),
            Some(ShortcutAction::Nudge { dx: 0, dy: 10 })
        );
    }

    #[test]
    fn resolve_modifier_precedence() {
        // Cmd+D is not draw mode
        assert_eq!(ShortcutMap::resolve("d", false, false, false, true), None);
        // Shift+G is not a new group
        assert_eq!(ShortcutMap::resolve("G", false, true, false, false), None);
        // Cmd+S only
        assert_eq!(ShortcutMap::resolve("s", false, false, false, false), None);
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("7", false, false, false, false), None);
    }
}
