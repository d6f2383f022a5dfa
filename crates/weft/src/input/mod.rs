//! Input events and the raw-byte key decoder.

/// Logical key primitives.
pub mod key;
/// Mouse primitives.
pub mod mouse;
/// The byte-stream decoder.
mod parser;

pub use key::{Key, KeyCode, Mods};
pub use mouse::{Button, MouseAction, MouseEvent};
pub use parser::Parser;

use crate::geom::Size;

/// A decoded input event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A key press.
    Key(Key),
    /// A mouse action.
    Mouse(MouseEvent),
    /// A bracketed paste, delivered as a single unit.
    Paste(String),
    /// The terminal was resized.
    Resize(Size),
}
