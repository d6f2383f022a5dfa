//! The console: a cooperative event loop over a [`Terminal`].
//!
//! One thread owns all application state. Reader threads push raw input into
//! an mpsc channel; the loop decodes it, runs key bindings, repaints when
//! something marked the frame dirty, and sleeps on the channel otherwise.
//! Background work talks to the loop through [`Remote`], which enqueues
//! closures to run on the loop thread.

use std::{
    collections::{BinaryHeap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{debug, error, trace, warn};

use crate::{
    buffer::Buffer,
    error::{Error, Result},
    filter::FilterCtx,
    focus::FocusStack,
    geom::Size,
    input::{Event, Key, KeyCode, MouseAction, MouseEvent, Parser},
    keymap::{Binding, Dispatch, KeyEvent, KeyMap},
    layout::{Layout, Node, NodeId},
    screen::ScreenBuffer,
    style::{Attrs, ColorDepth, StyleSheet},
    terminal::{InputSink, RawInput, TermOptions, Terminal, Vt100Terminal},
};

/// Tunables for a console run.
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Run on the alternate screen instead of inline.
    pub full_screen: bool,
    /// Request mouse reporting.
    pub mouse: bool,
    /// Force a color depth instead of detecting one.
    pub color_depth: Option<ColorDepth>,
    /// How long a lone ESC byte may sit in the decoder before it is
    /// delivered as the Esc key.
    pub escape_timeout: Duration,
    /// How long an ambiguous key-sequence prefix waits for more keys.
    pub key_timeout: Duration,
    /// Repaint at least this often, for clocks and spinners.
    pub refresh_interval: Option<Duration>,
    /// How long shutdown waits for background workers to observe
    /// cancellation before the terminal is restored.
    pub shutdown_grace: Duration,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            full_screen: true,
            mouse: true,
            color_depth: None,
            escape_timeout: Duration::from_millis(100),
            key_timeout: Duration::from_millis(500),
            refresh_interval: None,
            shutdown_grace: Duration::from_millis(100),
        }
    }
}

/// Everything the loop thread can be asked to do.
pub(crate) enum LoopMsg<T> {
    Input(RawInput),
    Callback(Box<dyn FnOnce(&mut ConsoleCtx<T>) + Send>),
    Invalidate,
}

/// Adapts the loop channel to the terminal's [`InputSink`].
struct Forward<T> {
    tx: Sender<LoopMsg<T>>,
}

impl<T: Send + 'static> InputSink for Forward<T> {
    fn send(&self, input: RawInput) {
        // The loop hanging up is not the reader thread's problem.
        let _ = self.tx.send(LoopMsg::Input(input));
    }

    fn clone_sink(&self) -> Box<dyn InputSink> {
        Box::new(Forward {
            tx: self.tx.clone(),
        })
    }
}

/// A deferred closure, ordered by deadline.
struct Timer<T> {
    due: Instant,
    seq: u64,
    cb: Box<dyn FnOnce(&mut ConsoleCtx<T>)>,
}

impl<T> PartialEq for Timer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Timer<T> {}

impl<T> PartialOrd for Timer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Timer<T> {
    // Reversed so the BinaryHeap surfaces the earliest deadline.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.due.cmp(&self.due).then(other.seq.cmp(&self.seq))
    }
}

/// A handle for other threads: enqueue work on the loop thread, request a
/// repaint, and observe shutdown.
pub struct Remote<T> {
    tx: Sender<LoopMsg<T>>,
    cancel: Arc<AtomicBool>,
}

impl<T> Clone for Remote<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> Remote<T> {
    /// Run a closure on the loop thread with full access to the console.
    pub fn call(&self, f: impl FnOnce(&mut ConsoleCtx<T>) + Send + 'static) {
        let _ = self.tx.send(LoopMsg::Callback(Box::new(f)));
    }

    /// Mark the frame dirty.
    pub fn invalidate(&self) {
        let _ = self.tx.send(LoopMsg::Invalidate);
    }

    /// True once the console has shut down; long-running work should bail.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// The state key handlers and callbacks operate on.
pub struct ConsoleCtx<T> {
    /// The layout tree.
    pub layout: Layout,
    /// Focus stack over the layout's focusable windows.
    pub focus: FocusStack,
    /// Style classes for rendering.
    pub style: StyleSheet,
    /// Loop tunables.
    pub options: ConsoleOptions,

    dirty: bool,
    exit: Option<Option<T>>,
    tasks: VecDeque<Box<dyn FnOnce(&mut ConsoleCtx<T>)>>,
    timers: BinaryHeap<Timer<T>>,
    timer_seq: u64,
    tx: Sender<LoopMsg<T>>,
    rx: Option<Receiver<LoopMsg<T>>>,
    cancel: Arc<AtomicBool>,
    workers: Arc<AtomicUsize>,
}

impl<T> ConsoleCtx<T> {
    pub fn new(layout: Layout, style: StyleSheet) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut focus = FocusStack::new();
        focus.ensure_valid(&layout);
        Self {
            layout,
            focus,
            style,
            options: ConsoleOptions::default(),
            dirty: true,
            exit: None,
            tasks: VecDeque::new(),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            tx,
            rx: Some(rx),
            cancel: Arc::new(AtomicBool::new(false)),
            workers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mark the frame dirty; the loop repaints before its next sleep.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Stop the loop, handing `result` back from `run`.
    pub fn exit(&mut self, result: Option<T>) {
        self.exit = Some(result);
    }

    /// Run a closure after the current handler completes. Handlers are never
    /// re-entered; this is how one handler triggers another's work.
    pub fn schedule(&mut self, f: impl FnOnce(&mut ConsoleCtx<T>) + 'static) {
        self.tasks.push_back(Box::new(f));
    }

    /// Run a closure on the loop thread after a delay.
    pub fn set_timer(&mut self, after: Duration, f: impl FnOnce(&mut ConsoleCtx<T>) + 'static) {
        self.timer_seq += 1;
        self.timers.push(Timer {
            due: Instant::now() + after,
            seq: self.timer_seq,
            cb: Box::new(f),
        });
    }

    /// A handle other threads use to talk to this console.
    pub fn remote(&self) -> Remote<T> {
        Remote {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Spawn a worker thread holding a [`Remote`]. Shutdown waits up to
    /// [`ConsoleOptions::shutdown_grace`] for workers to finish.
    pub fn background(&self, f: impl FnOnce(Remote<T>) + Send + 'static) -> Result<()>
    where
        T: Send + 'static,
    {
        let remote = self.remote();
        let workers = self.workers.clone();
        workers.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("weft-worker".into())
            .spawn(move || {
                f(remote);
                workers.fetch_sub(1, Ordering::SeqCst);
            });
        if spawned.is_err() {
            self.workers.fetch_sub(1, Ordering::SeqCst);
        }
        spawned?;
        Ok(())
    }

    /// Block until live workers wind down or the grace period lapses.
    fn await_workers(&self) {
        let deadline = Instant::now() + self.options.shutdown_grace;
        while self.workers.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        let left = self.workers.load(Ordering::SeqCst);
        if left > 0 {
            warn!("{left} background workers still running at shutdown");
        }
    }

    /// The state filters are evaluated against.
    pub fn filter_ctx(&self) -> FilterCtx<'_> {
        FilterCtx {
            layout: &self.layout,
            focused: self.focus.current(),
        }
    }

    /// The buffer in the focused window, if the focused window holds one.
    pub fn focused_buffer_mut(&mut self) -> Option<&mut Buffer> {
        let id = self.focus.current()?;
        self.layout.buffer_mut(id)
    }

    /// Snapshot the focused buffer's undo state.
    pub fn save_undo(&mut self) {
        if let Some(b) = self.focused_buffer_mut() {
            b.save_to_undo();
        }
    }

    fn run_tasks(&mut self) {
        while let Some(task) = self.tasks.pop_front() {
            task(self);
        }
    }

    fn fire_due_timers(&mut self, now: Instant) {
        while self.timers.peek().is_some_and(|t| t.due <= now) {
            if let Some(t) = self.timers.pop() {
                (t.cb)(self);
                self.dirty = true;
            }
        }
    }

    fn next_timer_due(&self) -> Option<Instant> {
        self.timers.peek().map(|t| t.due)
    }
}

/// A full-screen (or inline) interactive application.
pub struct Console<T> {
    /// The state handlers operate on.
    pub ctx: ConsoleCtx<T>,
    keymap: KeyMap<T>,
}

impl<T> Console<T> {
    pub fn new(layout: Layout, style: StyleSheet) -> Self {
        Self {
            ctx: ConsoleCtx::new(layout, style),
            keymap: KeyMap::new(),
        }
    }

    /// Register a binding.
    pub fn add_binding(&mut self, binding: Binding<T>) -> Result<()> {
        self.keymap.add(binding)
    }

    /// Register an unconditional binding.
    pub fn bind(
        &mut self,
        keys: impl IntoIterator<Item = Key>,
        handler: impl FnMut(&mut KeyEvent<'_, T>) -> Result<()> + 'static,
    ) -> Result<()> {
        self.keymap.bind(keys, handler)
    }

    /// Tab/Shift-Tab focus cycling and Ctrl-C exit.
    pub fn install_default_bindings(&mut self) -> Result<()> {
        self.bind([Key::new(KeyCode::Tab)], |ev| {
            ev.console.focus.next(&ev.console.layout);
            Ok(())
        })?;
        self.bind([Key::new(KeyCode::BackTab)], |ev| {
            ev.console.focus.previous(&ev.console.layout);
            Ok(())
        })?;
        self.bind([Key::ctrl('c')], |ev| {
            ev.console.exit(None);
            Ok(())
        })?;
        Ok(())
    }

    /// Emacs-flavored editing keys, active while a buffer holds focus.
    pub fn install_editing_bindings(&mut self) -> Result<()> {
        use crate::filter::Filter::BufferHasFocus;

        fn edit<T>(
            keys: impl IntoIterator<Item = Key>,
            f: impl Fn(&mut Buffer) + 'static,
        ) -> Binding<T> {
            Binding::new(keys, move |ev: &mut KeyEvent<'_, T>| {
                if let Some(b) = ev.console.focused_buffer_mut() {
                    f(b);
                }
                Ok(())
            })
            .when(BufferHasFocus)
        }

        let plain: &[(KeyCode, fn(&mut Buffer))] = &[
            (KeyCode::Left, |b| b.move_left(1)),
            (KeyCode::Right, |b| b.move_right(1)),
            (KeyCode::Home, |b| b.move_home()),
            (KeyCode::End, |b| b.move_end()),
        ];
        for &(code, f) in plain {
            self.keymap.add(edit([Key::new(code)], f))?;
        }
        self.keymap.add(edit([Key::ctrl('a')], |b| b.move_home()))?;
        self.keymap.add(edit([Key::ctrl('e')], |b| b.move_end()))?;
        self.keymap
            .add(edit([Key::ctrl(KeyCode::Left)], Buffer::move_word_left))?;
        self.keymap
            .add(edit([Key::ctrl(KeyCode::Right)], Buffer::move_word_right))?;

        // Up/Down move within multi-line text and recall history otherwise.
        self.keymap.add(edit([Key::new(KeyCode::Up)], |b| {
            if b.multiline {
                b.move_up();
            } else {
                b.history_prev();
            }
        }))?;
        self.keymap.add(edit([Key::new(KeyCode::Down)], |b| {
            if b.multiline {
                b.move_down();
            } else {
                b.history_next();
            }
        }))?;

        self.keymap.add(
            edit([Key::new(KeyCode::Backspace)], |b| b.delete_before(1)).save_before(),
        )?;
        self.keymap
            .add(edit([Key::new(KeyCode::Delete)], |b| b.delete(1)).save_before())?;
        self.keymap.add(edit([Key::ctrl('z')], Buffer::undo))?;
        self.keymap.add(edit([Key::ctrl('y')], Buffer::redo))?;

        self.keymap.add(edit([Key::new(KeyCode::Enter)], |b| {
            if b.multiline {
                b.save_to_undo();
                b.insert("\n");
            } else {
                b.accept();
            }
        }))?;
        Ok(())
    }
}

impl<T: Send + 'static> Console<T> {
    /// Run on the process's terminal until a handler calls
    /// [`ConsoleCtx::exit`] or input hangs up.
    pub fn run(&mut self) -> Result<Option<T>> {
        let mut term = Vt100Terminal::new(self.ctx.options.color_depth)?;
        self.run_with(&mut term)
    }

    /// Run against any terminal. Restores the terminal on all exits,
    /// including errors.
    pub fn run_with(&mut self, term: &mut dyn Terminal) -> Result<Option<T>> {
        let rx = self
            .ctx
            .rx
            .take()
            .ok_or_else(|| Error::Internal("console is already running".into()))?;
        let opts = TermOptions {
            full_screen: self.ctx.options.full_screen,
            mouse: self.ctx.options.mouse,
            bracketed_paste: true,
        };
        term.enter(&opts)?;
        let out = self.event_loop(term, &rx);
        self.ctx.cancel.store(true, Ordering::SeqCst);
        self.ctx.await_workers();
        if let Err(e) = term.leave() {
            warn!("terminal restore failed: {e}");
        }
        self.ctx.rx = Some(rx);
        out
    }

    fn event_loop(
        &mut self,
        term: &mut dyn Terminal,
        rx: &Receiver<LoopMsg<T>>,
    ) -> Result<Option<T>> {
        term.spawn_input(Box::new(Forward {
            tx: self.ctx.tx.clone(),
        }))?;
        let mut size = term.size()?;
        let mut parser = Parser::new();
        let mut prev: Option<ScreenBuffer> = None;
        let mut esc_since: Option<Instant> = None;
        let mut keys_since: Option<Instant> = None;
        let mut last_render = Instant::now();
        self.ctx.dirty = true;
        debug!("console loop starting at {}x{}", size.w, size.h);

        loop {
            self.ctx.run_tasks();
            if let Some(result) = self.ctx.exit.take() {
                return Ok(result);
            }
            if self.ctx.dirty {
                self.render_frame(term, size, &mut prev)?;
                last_render = Instant::now();
            }

            let mut deadline: Option<Instant> = None;
            let mut consider = |d: Instant| {
                deadline = Some(deadline.map_or(d, |cur| cur.min(d)));
            };
            if let Some(at) = esc_since {
                consider(at + self.ctx.options.escape_timeout);
            }
            if let Some(at) = keys_since {
                consider(at + self.ctx.options.key_timeout);
            }
            if let Some(due) = self.ctx.next_timer_due() {
                consider(due);
            }
            if let Some(iv) = self.ctx.options.refresh_interval {
                consider(last_render + iv);
            }

            let msg = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if d <= now {
                        Err(RecvTimeoutError::Timeout)
                    } else {
                        rx.recv_timeout(d - now)
                    }
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match msg {
                Ok(LoopMsg::Input(RawInput::Bytes(bytes))) => {
                    trace!("input: {} bytes", bytes.len());
                    for ev in parser.feed(&bytes) {
                        self.handle_event(ev, &prev);
                    }
                }
                Ok(LoopMsg::Input(RawInput::Resize)) => {
                    size = term.size()?;
                    debug!("resized to {}x{}", size.w, size.h);
                    self.handle_event(Event::Resize(size), &prev);
                }
                Ok(LoopMsg::Input(RawInput::Hangup)) => {
                    debug!("input hangup");
                    return Ok(None);
                }
                Ok(LoopMsg::Callback(f)) => {
                    f(&mut self.ctx);
                    self.ctx.invalidate();
                }
                Ok(LoopMsg::Invalidate) => self.ctx.invalidate(),
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    if esc_since.is_some_and(|at| at + self.ctx.options.escape_timeout <= now) {
                        for ev in parser.flush() {
                            self.handle_event(ev, &prev);
                        }
                    }
                    if keys_since.is_some_and(|at| at + self.ctx.options.key_timeout <= now) {
                        match self.keymap.flush(&mut self.ctx) {
                            Ok(keys) => self.fallback_keys(&keys),
                            Err(e) => error!("key handler failed: {e}"),
                        }
                        self.ctx.invalidate();
                    }
                    self.ctx.fire_due_timers(now);
                    if self
                        .ctx
                        .options
                        .refresh_interval
                        .is_some_and(|iv| last_render + iv <= now)
                    {
                        self.ctx.invalidate();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Internal("input channel closed".into()));
                }
            }

            esc_since = match (parser.has_pending(), esc_since) {
                (false, _) => None,
                (true, Some(at)) => Some(at),
                (true, None) => Some(Instant::now()),
            };
            keys_since = match (self.keymap.has_pending(), keys_since) {
                (false, _) => None,
                (true, Some(at)) => Some(at),
                (true, None) => Some(Instant::now()),
            };
        }
    }

    /// Arrange, render, diff, and push one frame. A failed incremental paint
    /// is retried once as a full repaint before the error propagates.
    fn render_frame(
        &mut self,
        term: &mut dyn Terminal,
        size: Size,
        prev: &mut Option<ScreenBuffer>,
    ) -> Result<()> {
        self.ctx.focus.ensure_valid(&self.ctx.layout);
        let mut buf = ScreenBuffer::new(size, Attrs::default());
        self.ctx
            .layout
            .render(&mut buf, &self.ctx.style, self.ctx.focus.current())?;
        let ops = match prev.as_ref() {
            Some(p) => buf.diff(p),
            None => buf.render_full(),
        };
        if let Err(e) = term.apply(&ops).and_then(|()| term.flush()) {
            warn!("incremental paint failed, repainting in full: {e}");
            term.apply(&buf.render_full())?;
            term.flush()?;
        }
        *prev = Some(buf);
        self.ctx.dirty = false;
        Ok(())
    }

    /// Dispatch one decoded event. Handler errors are logged; they do not
    /// stop the loop.
    fn handle_event(&mut self, ev: Event, prev: &Option<ScreenBuffer>) {
        match ev {
            Event::Key(key) => match self.keymap.feed(key, &mut self.ctx) {
                Ok(Dispatch::Handled) => self.ctx.invalidate(),
                Ok(Dispatch::Pending) => {}
                Ok(Dispatch::Unhandled(keys)) => self.fallback_keys(&keys),
                Err(e) => {
                    error!("key handler failed: {e}");
                    self.ctx.invalidate();
                }
            },
            Event::Paste(s) => {
                if let Some(b) = self.ctx.focused_buffer_mut() {
                    b.save_to_undo();
                    b.insert(&s);
                    self.ctx.invalidate();
                }
            }
            Event::Mouse(m) => self.handle_mouse(m, prev),
            Event::Resize(_) => self.ctx.invalidate(),
        }
    }

    /// Keys no binding claimed: printable characters go into the focused
    /// buffer.
    fn fallback_keys(&mut self, keys: &[Key]) {
        for key in keys {
            if let Some(c) = key.text()
                && let Some(b) = self.ctx.focused_buffer_mut()
            {
                b.insert(&c.to_string());
                self.ctx.invalidate();
            }
        }
    }

    fn handle_mouse(&mut self, m: MouseEvent, prev: &Option<ScreenBuffer>) {
        if m.is_scroll() {
            if let Some(id) = self.scroll_region_at(m) {
                if let Some(Node::Scroll(sv)) = self.ctx.layout.node_mut(id) {
                    sv.offset = match m.action {
                        MouseAction::ScrollUp => sv.offset.saturating_sub(1),
                        _ => sv.offset.saturating_add(1),
                    };
                }
                self.ctx.invalidate();
            }
            return;
        }
        if m.action == MouseAction::Down {
            if let Some(id) = self.ctx.layout.window_at(m.position) {
                if self.ctx.layout.focusable_windows().contains(&id) {
                    self.ctx.focus.focus(id);
                }
                self.ctx.invalidate();
            }
            // Fragment handlers are looked up against the frame on screen,
            // which is what the user clicked.
            if let Some(p) = prev
                && let Some(handler) = p.handler_at(m.position)
            {
                handler(&m);
                self.ctx.invalidate();
            }
        }
    }

    /// The topmost scrollable region under the pointer.
    fn scroll_region_at(&self, m: MouseEvent) -> Option<NodeId> {
        self.ctx
            .layout
            .regions()
            .iter()
            .rev()
            .find(|(id, rect)| {
                rect.contains_point(m.position)
                    && matches!(self.ctx.layout.node(*id), Some(Node::Scroll(_)))
            })
            .map(|&(id, _)| id)
    }
}
