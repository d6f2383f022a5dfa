//! Terminal ownership: mode switching, painting, and raw input delivery.
//!
//! The console drives everything through the [`Terminal`] trait so the whole
//! stack runs against a scripted terminal in tests. The real implementation
//! is [`Vt100Terminal`](vt100::Vt100Terminal).

#[cfg(unix)]
pub(crate) mod signals;
/// The real terminal, speaking the VT100/xterm subset.
pub mod vt100;

use crate::{error::Result, geom::Size, screen::PaintOp, style::ColorDepth};

pub use vt100::Vt100Terminal;

/// Raw events a terminal delivers to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Bytes read from the terminal, not yet decoded.
    Bytes(Vec<u8>),
    /// The window size changed; query `size()` for the new one.
    Resize,
    /// The input stream ended; the loop should wind down.
    Hangup,
}

/// Where a terminal's reader threads deliver input. Cloneable so the byte
/// reader and the resize watcher each get one.
pub trait InputSink: Send {
    fn send(&self, input: RawInput);
    fn clone_sink(&self) -> Box<dyn InputSink>;
}

/// Modes requested when entering the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermOptions {
    /// Switch to the alternate screen.
    pub full_screen: bool,
    /// Enable SGR mouse reporting.
    pub mouse: bool,
    /// Enable bracketed paste.
    pub bracketed_paste: bool,
}

/// Exclusive handle on a terminal while the console runs.
pub trait Terminal {
    /// Current size in cells.
    fn size(&self) -> Result<Size>;

    /// The color depth output is degraded to.
    fn depth(&self) -> ColorDepth;

    /// Switch into raw mode and the requested reporting modes.
    fn enter(&mut self, opts: &TermOptions) -> Result<()>;

    /// Restore the terminal to its original state. Must be safe to call
    /// more than once.
    fn leave(&mut self) -> Result<()>;

    /// Queue a batch of paint operations.
    fn apply(&mut self, ops: &[PaintOp]) -> Result<()>;

    /// Push queued output to the terminal.
    fn flush(&mut self) -> Result<()>;

    /// Start delivering raw input to the sink. Called once per run.
    fn spawn_input(&mut self, sink: Box<dyn InputSink>) -> Result<()>;
}
