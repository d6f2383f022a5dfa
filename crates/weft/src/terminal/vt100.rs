//! The real terminal: raw mode, mode reporting, and escape output.

use std::{
    env,
    io::{self, Read, Write},
    thread,
};

use crossterm::{
    QueueableCommand, cursor,
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    },
    style::Print,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};

use crate::{
    error::{Error, Result},
    geom::Size,
    screen::{CursorShape, PaintOp},
    style::{ColorDepth, sgr},
    terminal::{InputSink, RawInput, TermOptions, Terminal},
};

/// A terminal reached through stdin/stdout, emitting the VT100/xterm
/// escape subset.
pub struct Vt100Terminal {
    out: io::Stdout,
    depth: ColorDepth,
    entered: Option<TermOptions>,
}

impl Vt100Terminal {
    /// Acquire the terminal. Fails with `TerminalUnavailable` when stdin or
    /// stdout is not a TTY.
    pub fn new(depth: Option<ColorDepth>) -> Result<Self> {
        if !io::stdin().is_tty() {
            return Err(Error::TerminalUnavailable("stdin is not a tty".into()));
        }
        let out = io::stdout();
        if !out.is_tty() {
            return Err(Error::TerminalUnavailable("stdout is not a tty".into()));
        }
        Ok(Self {
            out,
            depth: depth.unwrap_or_else(ColorDepth::detect),
            entered: None,
        })
    }
}

/// Window size from the environment, for terminals where the size ioctl
/// fails.
fn env_size() -> Size {
    let get = |name: &str, fallback: u32| {
        env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    };
    Size::new(get("COLUMNS", 80), get("LINES", 24))
}

impl Terminal for Vt100Terminal {
    fn size(&self) -> Result<Size> {
        match terminal::size() {
            Ok((w, h)) => Ok(Size::new(w as u32, h as u32)),
            Err(_) => Ok(env_size()),
        }
    }

    fn depth(&self) -> ColorDepth {
        self.depth
    }

    fn enter(&mut self, opts: &TermOptions) -> Result<()> {
        terminal::enable_raw_mode()?;
        if opts.full_screen {
            self.out.queue(EnterAlternateScreen)?;
        }
        if opts.mouse {
            self.out.queue(EnableMouseCapture)?;
        }
        if opts.bracketed_paste {
            self.out.queue(EnableBracketedPaste)?;
        }
        self.out.flush()?;
        self.entered = Some(*opts);
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        let Some(opts) = self.entered.take() else {
            return Ok(());
        };
        // Keep going on failure; report only the first error so we get the
        // best chance of handing back a usable TTY.
        let mut first: Option<io::Error> = None;
        let mut note = |r: io::Result<()>| {
            if let Err(e) = r {
                first.get_or_insert(e);
            }
        };
        note(self.out.queue(Print("\x1b[0m")).map(|_| ()));
        note(self.out.queue(cursor::Show).map(|_| ()));
        if opts.bracketed_paste {
            note(self.out.queue(DisableBracketedPaste).map(|_| ()));
        }
        if opts.mouse {
            note(self.out.queue(DisableMouseCapture).map(|_| ()));
        }
        if opts.full_screen {
            note(self.out.queue(LeaveAlternateScreen).map(|_| ()));
        }
        note(self.out.flush());
        note(terminal::disable_raw_mode());
        match first {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn apply(&mut self, ops: &[PaintOp]) -> Result<()> {
        for op in ops {
            match op {
                PaintOp::MoveTo(p) => {
                    self.out.queue(cursor::MoveTo(p.x as u16, p.y as u16))?;
                }
                PaintOp::SetStyle(attrs) => {
                    self.out.queue(Print(sgr(attrs, self.depth)))?;
                }
                PaintOp::Print(s) => {
                    self.out.queue(Print(s))?;
                }
                PaintOp::ClearScreen => {
                    self.out.queue(Print(sgr(&Default::default(), self.depth)))?;
                    self.out.queue(Clear(ClearType::All))?;
                    self.out.queue(cursor::MoveTo(0, 0))?;
                }
                PaintOp::CursorTo(p) => {
                    self.out.queue(cursor::MoveTo(p.x as u16, p.y as u16))?;
                }
                PaintOp::CursorVisible(true) => {
                    self.out.queue(cursor::Show)?;
                }
                PaintOp::CursorVisible(false) => {
                    self.out.queue(cursor::Hide)?;
                }
                PaintOp::SetCursorShape(shape) => {
                    let style = match shape {
                        CursorShape::Block => cursor::SetCursorStyle::SteadyBlock,
                        CursorShape::Line => cursor::SetCursorStyle::SteadyBar,
                        CursorShape::Underscore => cursor::SetCursorStyle::SteadyUnderScore,
                    };
                    self.out.queue(style)?;
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn spawn_input(&mut self, sink: Box<dyn InputSink>) -> Result<()> {
        #[cfg(unix)]
        {
            let resize_sink = sink.clone_sink();
            crate::terminal::signals::watch_resize(move || {
                resize_sink.send(RawInput::Resize);
            })?;
        }
        thread::Builder::new()
            .name("weft-input".into())
            .spawn(move || {
                let mut stdin = io::stdin();
                let mut buf = [0u8; 1024];
                loop {
                    match stdin.read(&mut buf) {
                        Ok(0) | Err(_) => {
                            sink.send(RawInput::Hangup);
                            break;
                        }
                        Ok(n) => sink.send(RawInput::Bytes(buf[..n].to_vec())),
                    }
                }
            })?;
        Ok(())
    }
}
