//! Mouse input primitives.

use crate::{geom::Point, input::key::Mods};

/// Mouse button codes.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
    /// No button (moves and scrolls).
    None,
}

/// Mouse action kinds.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum MouseAction {
    /// Button press.
    Down,
    /// Button release.
    Up,
    /// Motion with a button held.
    Drag,
    /// Motion without a button.
    Moved,
    /// Scroll wheel up.
    ScrollUp,
    /// Scroll wheel down.
    ScrollDown,
}

/// A mouse input event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// What happened.
    pub action: MouseAction,
    /// Which button.
    pub button: Button,
    /// Modifier keys held.
    pub mods: Mods,
    /// Cell position, zero-based.
    pub position: Point,
}

impl MouseEvent {
    /// True for scroll-wheel events.
    pub fn is_scroll(&self) -> bool {
        matches!(self.action, MouseAction::ScrollUp | MouseAction::ScrollDown)
    }
}
