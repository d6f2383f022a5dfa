//! Test doubles: a virtual terminal that interprets paint operations, and a
//! scripted [`Terminal`] for driving the console without a TTY.

use std::{cell::Cell, collections::VecDeque, sync::mpsc, thread};

use unicode_segmentation::UnicodeSegmentation;

use crate::{
    error::Result,
    geom::{Point, Size},
    screen::{CursorShape, PaintOp, ScreenBuffer},
    style::{Attrs, ColorDepth},
    terminal::{InputSink, RawInput, TermOptions, Terminal},
    text::grapheme_width,
};

/// A model terminal: a grid of styled graphemes updated by [`PaintOp`]s,
/// used to check that painted output matches the frame it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualTerm {
    size: Size,
    /// One styled grapheme per cell. The trailing cell of a wide grapheme
    /// holds an empty string.
    cells: Vec<(String, Attrs)>,
    pen: Point,
    style: Attrs,
    cursor: Option<Point>,
    cursor_visible: bool,
    cursor_shape: CursorShape,
}

impl VirtualTerm {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![(" ".into(), Attrs::default()); size.area() as usize],
            pen: Point::default(),
            style: Attrs::default(),
            cursor: None,
            cursor_visible: false,
            cursor_shape: CursorShape::default(),
        }
    }

    /// A virtual terminal showing a buffer's full repaint.
    pub fn from_buffer(buf: &ScreenBuffer) -> Self {
        let mut vt = Self::new(buf.size());
        vt.apply(&buf.render_full());
        vt
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor.filter(|_| self.cursor_visible)
    }

    /// The cursor glyph last selected.
    pub fn cursor_shape(&self) -> CursorShape {
        self.cursor_shape
    }

    fn idx(&self, p: Point) -> Option<usize> {
        (p.x < self.size.w && p.y < self.size.h).then(|| (p.y * self.size.w + p.x) as usize)
    }

    /// The styled grapheme at a cell.
    pub fn cell(&self, p: Point) -> Option<&(String, Attrs)> {
        self.idx(p).map(|i| &self.cells[i])
    }

    /// Interpret a batch of paint operations.
    pub fn apply(&mut self, ops: &[PaintOp]) {
        for op in ops {
            match op {
                PaintOp::MoveTo(p) => self.pen = *p,
                PaintOp::SetStyle(style) => self.style = *style,
                PaintOp::Print(s) => self.print(s.clone()),
                PaintOp::ClearScreen => {
                    self.cells = vec![(" ".into(), Attrs::default()); self.size.area() as usize];
                    self.pen = Point::default();
                    self.style = Attrs::default();
                }
                PaintOp::CursorTo(p) => self.cursor = Some(*p),
                PaintOp::CursorVisible(v) => self.cursor_visible = *v,
                PaintOp::SetCursorShape(s) => self.cursor_shape = *s,
            }
        }
    }

    fn print(&mut self, s: String) {
        for g in s.graphemes(true) {
            let w = grapheme_width(g) as u32;
            if let Some(i) = self.idx(self.pen) {
                self.cells[i] = (g.to_string(), self.style);
                if w == 2
                    && let Some(j) = self.idx(Point {
                        x: self.pen.x + 1,
                        y: self.pen.y,
                    })
                {
                    self.cells[j] = (String::new(), self.style);
                }
            }
            self.pen.x += w;
        }
    }

    /// The visible text of one row.
    pub fn row_text(&self, y: u32) -> String {
        (0..self.size.w)
            .filter_map(|x| self.cell(Point { x, y }))
            .map(|(g, _)| g.as_str())
            .collect()
    }

    /// All rows as strings.
    pub fn text(&self) -> Vec<String> {
        (0..self.size.h).map(|y| self.row_text(y)).collect()
    }

    /// True when any row contains the substring.
    pub fn contains_text(&self, needle: &str) -> bool {
        (0..self.size.h).any(|y| self.row_text(y).contains(needle))
    }
}

/// A scripted terminal: a fixed size, a queue of raw input delivered when
/// the console attaches, and a [`VirtualTerm`] accumulating the output.
pub struct TestTerminal {
    size: Size,
    script: VecDeque<RawInput>,
    hangup_at_end: bool,
    /// Every op applied, across all frames.
    pub ops: Vec<PaintOp>,
    /// Number of flushes.
    pub frames: usize,
    /// The screen contents after all applied ops.
    pub screen: VirtualTerm,
    entered: Option<TermOptions>,
    resize_to: Option<Size>,
    size_queried: Cell<bool>,
}

impl TestTerminal {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            script: VecDeque::new(),
            hangup_at_end: true,
            ops: Vec::new(),
            frames: 0,
            screen: VirtualTerm::new(size),
            entered: None,
            resize_to: None,
            size_queried: Cell::new(false),
        }
    }

    /// Queue raw bytes as if typed.
    pub fn type_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.script.push_back(RawInput::Bytes(bytes.into()));
        self
    }

    /// Queue a resize to a new size, delivered in script order. Size queries
    /// after the first report the new size.
    pub fn resize(&mut self, size: Size) -> &mut Self {
        // A single scripted resize is enough for the tests that use this.
        self.resize_to = Some(size);
        self.script.push_back(RawInput::Resize);
        self
    }

    /// The requested modes, if the console entered the terminal.
    pub fn entered(&self) -> Option<TermOptions> {
        self.entered
    }
}

impl Terminal for TestTerminal {
    fn size(&self) -> Result<Size> {
        if self.size_queried.replace(true)
            && let Some(s) = self.resize_to
        {
            return Ok(s);
        }
        Ok(self.size)
    }

    fn depth(&self) -> ColorDepth {
        ColorDepth::TrueColor
    }

    fn enter(&mut self, opts: &TermOptions) -> Result<()> {
        self.entered = Some(*opts);
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.entered = None;
        Ok(())
    }

    fn apply(&mut self, ops: &[PaintOp]) -> Result<()> {
        self.ops.extend_from_slice(ops);
        self.screen.apply(ops);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.frames += 1;
        Ok(())
    }

    fn spawn_input(&mut self, sink: Box<dyn InputSink>) -> Result<()> {
        let mut script: Vec<RawInput> = self.script.drain(..).collect();
        if self.hangup_at_end {
            script.push(RawInput::Hangup);
        }
        // Deliver from a thread so the console sees input arrive through its
        // channel exactly as it would from a live reader.
        let (ready_tx, ready_rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            for input in script {
                sink.send(input);
            }
            let _ = ready_tx.send(());
        });
        // The script is tiny; wait for delivery so tests are deterministic.
        let _ = ready_rx.recv();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::WrapMode;
    use crate::text::FormattedText;

    #[test]
    fn virtual_term_tracks_prints() {
        let mut vt = VirtualTerm::new(Size { w: 5, h: 2 });
        vt.apply(&[
            PaintOp::MoveTo(Point { x: 1, y: 1 }),
            PaintOp::Print("ab".into()),
        ]);
        assert_eq!(vt.row_text(1), " ab  ");
        assert!(vt.contains_text("ab"));
    }

    #[test]
    fn full_repaint_matches_buffer() {
        let mut buf = ScreenBuffer::new(Size { w: 8, h: 2 }, Attrs::default());
        buf.write_fragments(
            Point::default(),
            &FormattedText::raw("hi\nthere"),
            8,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let vt = VirtualTerm::from_buffer(&buf);
        assert_eq!(vt.row_text(0), "hi      ");
        assert_eq!(vt.row_text(1), "there   ");
    }

    #[test]
    fn diff_applied_to_previous_matches_full() {
        let mut a = ScreenBuffer::new(Size { w: 10, h: 3 }, Attrs::default());
        a.write_fragments(
            Point::default(),
            &FormattedText::raw("first"),
            10,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let mut b = ScreenBuffer::new(Size { w: 10, h: 3 }, Attrs::default());
        b.write_fragments(
            Point { x: 2, y: 1 },
            &FormattedText::raw("second"),
            8,
            WrapMode::Truncate,
            Attrs::default(),
        );

        let mut vt = VirtualTerm::from_buffer(&a);
        vt.apply(&b.diff(&a));
        assert_eq!(vt.text(), VirtualTerm::from_buffer(&b).text());
    }
}
