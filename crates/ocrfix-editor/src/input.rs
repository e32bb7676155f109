//! Input abstraction layer.
//!
//! Normalizes pointer and keyboard events from whatever surface hosts the
//! editor into a unified `InputEvent`. Pointer coordinates are
//! stage-relative (display pixels), exactly as the rendering surface
//! reports them.

use ocrfix_core::Point;

/// Keyboard modifiers held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Shift, Ctrl or Cmd: the click adds to (or toggles within) the selection.
    pub fn additive(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64, modifiers: Modifiers },
    PointerMove { x: f64, y: f64, modifiers: Modifiers },
    PointerUp { x: f64, y: f64, modifiers: Modifiers },
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Same event with different modifiers.
    pub fn with_modifiers(mut self, mods: Modifiers) -> Self {
        match &mut self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers = mods,
        }
        self
    }

    /// Stage position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. } => Some(Point::new(*x, *y)),
            Self::Key { .. } => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Key { modifiers, .. } => *modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_modifiers() {
        assert!(!Modifiers::NONE.additive());
        assert!(Modifiers::SHIFT.additive());
        assert!(
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            }
            .additive()
        );
        assert!(
            !Modifiers {
                alt: true,
                ..Modifiers::NONE
            }
            .additive()
        );
    }

    #[test]
    fn position_only_for_pointer_events() {
        assert_eq!(
            InputEvent::pointer_move(3.0, 4.0).position(),
            Some(Point::new(3.0, 4.0))
        );
        let key = InputEvent::Key {
            key: "a".into(),
            modifiers: Modifiers::NONE,
        };
        assert_eq!(key.position(), None);
    }
}
