//! Weft is a toolkit for interactive terminal programs: a layout engine
//! over a node tree, styled text with a small markup language, an input
//! decoder for raw terminal bytes, editable buffers, and a cooperative
//! event loop that repaints by diffing frames.
//!
//! The pieces compose but stand alone. [`print_text`] styles a single line
//! for a CLI; [`Parser`] decodes key bytes for anything that reads a raw
//! TTY; [`Console`] ties the whole stack together into an application.
//!
//! A minimal application:
//!
//! ```no_run
//! use weft::*;
//!
//! fn main() -> Result<()> {
//!     let mut layout = Layout::new();
//!     let w = layout.window(Control::text(Text::markup("press <b>q</b> to quit")));
//!     layout.set_root(w);
//!     let mut console: Console<()> = Console::new(layout, StyleSheet::default());
//!     console.bind([Key::new('q')], |ev| {
//!         ev.console.exit(None);
//!         Ok(())
//!     })?;
//!     console.run()?;
//!     Ok(())
//! }
//! ```

/// Editable text buffers with undo, history, and completion.
pub mod buffer;
/// The event loop and application state.
pub mod console;
/// Window content: static text and buffer editors.
pub mod control;
/// Error types.
pub mod error;
/// Condition expressions scoping key bindings.
pub mod filter;
/// The focus stack.
pub mod focus;
/// Cell-grid geometry.
pub mod geom;
/// Input events and the raw-byte decoder.
pub mod input;
/// Key bindings and sequence matching.
pub mod keymap;
/// The layout tree and dimension solver.
pub mod layout;
/// One-shot styled output for CLIs.
pub mod print;
/// Screen buffers, diffing, and paint operations.
pub mod screen;
/// Colors, attributes, and style sheets.
pub mod style;
/// Terminal abstraction and the VT100 implementation.
pub mod terminal;
/// Test doubles for driving the stack without a TTY.
pub mod testing;
/// Styled text, markup, and ANSI parsing.
pub mod text;

pub use buffer::Buffer;
pub use console::{Console, ConsoleCtx, ConsoleOptions, Remote};
pub use control::{Control, Highlighter, RenderedControl};
pub use error::{Error, Result};
pub use filter::{Filter, FilterCtx};
pub use focus::FocusStack;
pub use geom::{Point, Rect, Size};
pub use input::{Event, Key, KeyCode, Mods, MouseEvent, Parser};
pub use keymap::{Binding, Dispatch, KeyEvent, KeyMap};
pub use layout::{Dimension, Float, Layout, Node, NodeId, Split, Window};
pub use print::{print_text, render_text};
pub use screen::{CursorShape, PaintOp, ScreenBuffer, WrapMode};
pub use style::{Attrs, Color, ColorDepth, StyleSheet};
pub use terminal::{TermOptions, Terminal, Vt100Terminal};
pub use text::{FormattedText, Fragment, Text};
