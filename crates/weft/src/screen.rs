//! The screen buffer: a grid of styled cells, a cursor, and frame diffing.
//!
//! Rendering is two-staged. Controls write fragments into a [`ScreenBuffer`];
//! the console then diffs the buffer against the previous frame, producing a
//! list of [`PaintOp`]s that a terminal (real or virtual) applies. The ops are
//! plain data, so the whole pipeline is testable without a terminal.

use std::fmt::Write as _;

use unicode_segmentation::UnicodeSegmentation;

use crate::{
    geom::{Point, Rect, Size},
    style::Attrs,
    text::{FormattedText, MouseHandler, grapheme_width},
};

/// One terminal cell. Not `Debug`: the mouse handler is an opaque closure.
#[derive(Clone, Default)]
pub struct Cell {
    /// First scalar of the grapheme in this cell. `' '` when blank.
    pub ch: char,
    /// Remaining scalars of the grapheme (combining marks), usually empty.
    pub suffix: String,
    /// Style the cell is drawn with.
    pub style: Attrs,
    /// Mouse callback covering this cell.
    pub handler: Option<MouseHandler>,
    /// True for the right half of a width-2 grapheme. Never drawn directly.
    pub continuation: bool,
}

impl Cell {
    fn blank(style: Attrs) -> Self {
        Self {
            ch: ' ',
            style,
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.ch == ' ' && self.suffix.is_empty() && !self.continuation
    }
}

/// What to do when a fragment overruns its width limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Continue on the next row, at the write origin's column.
    Wrap,
    /// Drop the overflow up to the next newline.
    Truncate,
}

/// How the input cursor is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// A filled cell.
    #[default]
    Block,
    /// A vertical bar.
    Line,
    /// An underscore.
    Underscore,
}

/// One drawing instruction. A frame's diff is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    /// Move the output cursor to a cell.
    MoveTo(Point),
    /// Switch the active style.
    SetStyle(Attrs),
    /// Emit text at the output cursor, advancing it.
    Print(String),
    /// Erase the whole screen with the default style.
    ClearScreen,
    /// Place the visible input cursor.
    CursorTo(Point),
    /// Show or hide the input cursor.
    CursorVisible(bool),
    /// Select the cursor glyph.
    SetCursorShape(CursorShape),
}

/// A grid of cells plus the input-cursor state for one frame.
#[derive(Clone)]
pub struct ScreenBuffer {
    size: Size,
    cells: Vec<Cell>,
    cursor: Option<Point>,
    cursor_visible: bool,
    cursor_shape: CursorShape,
}

impl ScreenBuffer {
    /// A buffer of blanks in the given style.
    pub fn new(size: Size, style: Attrs) -> Self {
        Self {
            size,
            cells: vec![Cell::blank(style); size.area() as usize],
            cursor: None,
            cursor_visible: false,
            cursor_shape: CursorShape::default(),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rect(&self) -> Rect {
        self.size.rect()
    }

    /// Where the input cursor sits, if placed this frame.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Whether the input cursor should be shown.
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn idx(&self, p: Point) -> Option<usize> {
        if self.rect().contains_point(p) {
            Some(p.y as usize * self.size.w as usize + p.x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, p: Point) -> Option<&Cell> {
        self.idx(p).map(|i| &self.cells[i])
    }

    /// The mouse handler covering a cell, if any.
    pub fn handler_at(&self, p: Point) -> Option<MouseHandler> {
        self.get(p).and_then(|c| c.handler.clone())
    }

    /// Place the input cursor.
    pub fn set_cursor(&mut self, p: Point, visible: bool) {
        self.cursor = Some(p);
        self.cursor_visible = visible;
    }

    /// The cursor glyph for this frame.
    pub fn cursor_shape(&self) -> CursorShape {
        self.cursor_shape
    }

    /// Select the cursor glyph.
    pub fn set_cursor_shape(&mut self, shape: CursorShape) {
        self.cursor_shape = shape;
    }

    /// Fill a rectangle with a character.
    pub fn fill(&mut self, r: Rect, ch: char, style: Attrs) {
        if let Some(isec) = self.rect().intersect(&r) {
            for y in isec.tl.y..isec.bottom() {
                for x in isec.tl.x..isec.right() {
                    let cell = Cell {
                        ch,
                        ..Cell::blank(style)
                    };
                    self.put(Point { x, y }, cell);
                }
            }
        }
    }

    /// Overwrite one cell, splitting any wide grapheme it lands on.
    fn put(&mut self, p: Point, cell: Cell) {
        let Some(i) = self.idx(p) else { return };
        if self.cells[i].continuation && p.x > 0 {
            let left = i - 1;
            self.cells[left] = Cell::blank(self.cells[left].style);
        }
        // A continuation at p+1 pairs with the cell being overwritten, so it
        // is stale no matter what replaces its left half.
        if self
            .idx(Point { x: p.x + 1, y: p.y })
            .is_some_and(|r| self.cells[r].continuation)
        {
            let right = i + 1;
            self.cells[right] = Cell::blank(self.cells[right].style);
        }
        self.cells[i] = cell;
    }

    fn put_grapheme(
        &mut self,
        p: Point,
        g: &str,
        style: Attrs,
        handler: Option<&MouseHandler>,
    ) -> u32 {
        let width = grapheme_width(g) as u32;
        let mut chars = g.chars();
        let ch = match chars.next() {
            Some(c) => c,
            None => return 0,
        };
        self.put(
            p,
            Cell {
                ch,
                suffix: chars.collect(),
                style,
                handler: handler.cloned(),
                continuation: false,
            },
        );
        if width == 2 {
            self.put(
                Point { x: p.x + 1, y: p.y },
                Cell {
                    ch: ' ',
                    suffix: String::new(),
                    style,
                    handler: handler.cloned(),
                    continuation: true,
                },
            );
        }
        width
    }

    /// Write fragments starting at `at`, clipping at `width_limit` columns
    /// from the origin. Newlines return to the origin column on the next row.
    /// Returns the end cursor position.
    pub fn write_fragments(
        &mut self,
        at: Point,
        ft: &FormattedText,
        width_limit: u32,
        wrap: WrapMode,
        default_style: Attrs,
    ) -> Point {
        let mut cur = at;
        let mut clipping = false;
        for frag in &ft.0 {
            let style = default_style.combine(&frag.style);
            for g in frag.text.graphemes(true) {
                if g == "\n" {
                    cur.x = at.x;
                    cur.y += 1;
                    clipping = false;
                    continue;
                }
                if clipping {
                    continue;
                }
                let w = grapheme_width(g) as u32;
                if cur.x + w > at.x + width_limit {
                    match wrap {
                        WrapMode::Wrap => {
                            cur.x = at.x;
                            cur.y += 1;
                        }
                        WrapMode::Truncate => {
                            clipping = true;
                            continue;
                        }
                    }
                }
                cur.x += self.put_grapheme(cur, g, style, frag.handler.as_ref());
            }
        }
        cur
    }

    /// Copy a rectangle of another buffer into this one at `dest`. Source
    /// cells outside either buffer are skipped.
    pub fn blit(&mut self, src: &Self, src_rect: Rect, dest: Point) {
        for dy in 0..src_rect.h {
            for dx in 0..src_rect.w {
                let from = Point {
                    x: src_rect.tl.x + dx,
                    y: src_rect.tl.y + dy,
                };
                if let Some(cell) = src.get(from) {
                    self.put(
                        Point {
                            x: dest.x + dx,
                            y: dest.y + dy,
                        },
                        cell.clone(),
                    );
                }
            }
        }
    }

    /// Whether two cells draw identically. Blank cells compare by the
    /// attributes that are visible on a blank (background, reverse,
    /// underline, strike, blink); foreground color and weight are ignored.
    fn draws_same(a: &Cell, b: &Cell) -> bool {
        if a.is_blank() && b.is_blank() {
            let vis = |s: &Attrs| (s.bg, s.reverse, s.underline, s.strike, s.blink);
            return vis(&a.style) == vis(&b.style);
        }
        a.ch == b.ch && a.suffix == b.suffix && a.style == b.style && a.continuation == b.continuation
    }

    /// Per-row change flags, with wide graphemes promoted so a change to
    /// either half marks both.
    fn changed_row(&self, prev: &Self, y: u32) -> Vec<bool> {
        let w = self.size.w as usize;
        let mut changed = vec![false; w];
        for x in 0..w {
            let p = Point { x: x as u32, y };
            let cur = &self.cells[self.idx(p).expect("in range")];
            changed[x] = match prev.get(p) {
                Some(old) => !Self::draws_same(cur, old),
                None => true,
            };
        }
        for x in 0..w {
            let p = Point { x: x as u32, y };
            let cell = &self.cells[self.idx(p).expect("in range")];
            if cell.continuation && changed[x] && x > 0 {
                changed[x - 1] = true;
            }
        }
        for x in (0..w).rev() {
            if changed[x] && x + 1 < w {
                let right = Point {
                    x: x as u32 + 1,
                    y,
                };
                if self.cells[self.idx(right).expect("in range")].continuation {
                    changed[x + 1] = true;
                }
            }
        }
        changed
    }

    /// Emit the paint ops for one row given its change flags, coalescing
    /// adjacent changed cells that share a style into a single print.
    fn paint_row(&self, y: u32, changed: &[bool], ops: &mut Vec<PaintOp>) {
        let mut x = 0usize;
        while x < changed.len() {
            if !changed[x] {
                x += 1;
                continue;
            }
            let start = x as u32;
            let style = self.cells[self.idx(Point { x: start, y }).expect("in range")].style;
            let mut text = String::new();
            while x < changed.len() && changed[x] {
                let cell = &self.cells[self.idx(Point { x: x as u32, y }).expect("in range")];
                if cell.style != style && !cell.continuation {
                    break;
                }
                if !cell.continuation {
                    text.push(cell.ch);
                    let _ = write!(text, "{}", cell.suffix);
                }
                x += 1;
            }
            ops.push(PaintOp::MoveTo(Point { x: start, y }));
            ops.push(PaintOp::SetStyle(style));
            ops.push(PaintOp::Print(text));
        }
    }

    /// Diff against the previous frame, yielding the ops to bring the
    /// terminal up to date. A size change falls back to a full repaint.
    pub fn diff(&self, prev: &Self) -> Vec<PaintOp> {
        if self.size != prev.size {
            return self.render_full();
        }
        let mut ops = Vec::new();
        for y in 0..self.size.h {
            let changed = self.changed_row(prev, y);
            self.paint_row(y, &changed, &mut ops);
        }
        self.cursor_ops(Some(prev), &mut ops);
        ops
    }

    /// The ops for a full repaint of this frame.
    pub fn render_full(&self) -> Vec<PaintOp> {
        let mut ops = vec![PaintOp::ClearScreen];
        for y in 0..self.size.h {
            let changed: Vec<bool> = (0..self.size.w)
                .map(|x| {
                    let cell = self
                        .get(Point { x, y })
                        .expect("in range");
                    !(cell.is_blank() && cell.style.is_empty())
                })
                .collect();
            self.paint_row(y, &changed, &mut ops);
        }
        self.cursor_ops(None, &mut ops);
        ops
    }

    fn cursor_ops(&self, prev: Option<&Self>, ops: &mut Vec<PaintOp>) {
        let moved = prev.is_none_or(|p| {
            p.cursor != self.cursor || p.cursor_visible != self.cursor_visible
        });
        if !ops.is_empty() || moved {
            if let Some(p) = self.cursor {
                ops.push(PaintOp::CursorTo(p));
            }
            ops.push(PaintOp::CursorVisible(self.cursor_visible && self.cursor.is_some()));
        }
        if prev.is_none_or(|p| p.cursor_shape != self.cursor_shape) {
            ops.push(PaintOp::SetCursorShape(self.cursor_shape));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{style::parse_style, testing::VirtualTerm, text::Fragment};

    fn buf(w: u32, h: u32) -> ScreenBuffer {
        ScreenBuffer::new(Size { w, h }, Attrs::default())
    }

    fn row(b: &ScreenBuffer, y: u32) -> String {
        (0..b.size().w)
            .map(|x| b.get(Point { x, y }).unwrap())
            .filter(|c| !c.continuation)
            .map(|c| format!("{}{}", c.ch, c.suffix))
            .collect()
    }

    fn prints(ops: &[PaintOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                PaintOp::Print(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn write_and_read_back() {
        let mut b = buf(5, 2);
        let end = b.write_fragments(
            Point { x: 1, y: 0 },
            &FormattedText::raw("hi"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert_eq!(end, Point { x: 3, y: 0 });
        assert_eq!(row(&b, 0), " hi  ");
    }

    #[test]
    fn newline_returns_to_origin_column() {
        let mut b = buf(5, 2);
        b.write_fragments(
            Point { x: 1, y: 0 },
            &FormattedText::raw("a\nb"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert_eq!(row(&b, 0), " a   ");
        assert_eq!(row(&b, 1), " b   ");
    }

    #[test]
    fn wrap_and_truncate() {
        let mut b = buf(5, 2);
        b.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("abcdef"),
            4,
            WrapMode::Wrap,
            Attrs::default(),
        );
        assert_eq!(row(&b, 0), "abcd ");
        assert_eq!(row(&b, 1), "ef   ");

        let mut b = buf(5, 2);
        b.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("abcdef\ngh"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert_eq!(row(&b, 0), "abcd ");
        assert_eq!(row(&b, 1), "gh   ");
    }

    #[test]
    fn wide_grapheme_occupies_two_cells() {
        let mut b = buf(5, 1);
        b.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("a界b"),
            5,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert!(b.get(Point { x: 2, y: 0 }).unwrap().continuation);
        assert_eq!(b.get(Point { x: 1, y: 0 }).unwrap().ch, '界');
        assert_eq!(b.get(Point { x: 3, y: 0 }).unwrap().ch, 'b');
    }

    #[test]
    fn overwriting_half_a_wide_cell_blanks_the_other() {
        let mut b = buf(4, 1);
        b.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("界"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        b.write_fragments(
            Point { x: 1, y: 0 },
            &FormattedText::raw("x"),
            1,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert_eq!(b.get(Point { x: 0, y: 0 }).unwrap().ch, ' ');
        assert_eq!(b.get(Point { x: 1, y: 0 }).unwrap().ch, 'x');
    }

    #[test]
    fn overlapping_wide_writes_keep_pairs_intact() {
        let mut b = buf(16, 1);
        b.write_fragments(
            Point { x: 4, y: 0 },
            &FormattedText::raw("a界"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        // The second write puts a wide left half where the first one put its
        // continuation, and its own continuation where the first put a wide
        // left half.
        b.write_fragments(
            Point { x: 4, y: 0 },
            &FormattedText::raw("界 "),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert_eq!(b.get(Point { x: 4, y: 0 }).unwrap().ch, '界');
        assert!(b.get(Point { x: 5, y: 0 }).unwrap().continuation);
        assert!(!b.get(Point { x: 6, y: 0 }).unwrap().continuation);
        assert_eq!(b.get(Point { x: 6, y: 0 }).unwrap().ch, ' ');
    }

    #[test]
    fn diff_erases_overlapping_wide_remnants() {
        let mut prev = buf(16, 2);
        prev.write_fragments(
            Point { x: 4, y: 1 },
            &FormattedText::raw("a界"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        prev.write_fragments(
            Point { x: 4, y: 1 },
            &FormattedText::raw("界 "),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let cur = buf(16, 2);
        let mut vt = VirtualTerm::from_buffer(&prev);
        vt.apply(&cur.diff(&prev));
        assert_eq!(vt.text(), VirtualTerm::from_buffer(&cur).text());
    }

    #[test]
    fn diff_no_change_is_empty() {
        let a = buf(3, 2);
        let b = a.clone();
        assert!(b.diff(&a).is_empty());
    }

    #[test]
    fn diff_coalesces_runs() {
        let prev = buf(5, 1);
        let mut cur = buf(5, 1);
        cur.write_fragments(
            Point { x: 1, y: 0 },
            &FormattedText::raw("ab"),
            2,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let ops = cur.diff(&prev);
        assert_eq!(prints(&ops), vec!["ab"]);
        assert!(ops.contains(&PaintOp::MoveTo(Point { x: 1, y: 0 })));
    }

    #[test]
    fn diff_splits_on_style_change() {
        let prev = buf(4, 1);
        let mut cur = buf(4, 1);
        let bold = parse_style("bold");
        cur.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText(vec![Fragment::raw("a"), Fragment::new(bold, "b")]),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let ops = cur.diff(&prev);
        assert_eq!(prints(&ops), vec!["a", "b"]);
    }

    #[test]
    fn blank_cells_ignore_foreground() {
        let prev = buf(3, 1);
        let mut cur = ScreenBuffer::new(Size { w: 3, h: 1 }, parse_style("fg:red"));
        assert!(cur.diff(&prev).is_empty());
        cur = ScreenBuffer::new(Size { w: 3, h: 1 }, parse_style("bg:red"));
        assert!(!cur.diff(&prev).is_empty());
    }

    #[test]
    fn wide_cell_promotes_whole_grapheme() {
        let mut prev = buf(4, 1);
        prev.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("界"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let mut cur = prev.clone();
        cur.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText::raw("海"),
            4,
            WrapMode::Truncate,
            Attrs::default(),
        );
        let ops = cur.diff(&prev);
        assert_eq!(prints(&ops), vec!["海"]);
    }

    #[test]
    fn size_change_repaints() {
        let prev = buf(3, 1);
        let cur = buf(4, 1);
        assert_eq!(cur.diff(&prev)[0], PaintOp::ClearScreen);
    }

    #[test]
    fn cursor_ops_emitted_on_move() {
        let prev = buf(3, 1);
        let mut cur = buf(3, 1);
        cur.set_cursor(Point { x: 2, y: 0 }, true);
        let ops = cur.diff(&prev);
        assert_eq!(
            ops,
            vec![
                PaintOp::CursorTo(Point { x: 2, y: 0 }),
                PaintOp::CursorVisible(true)
            ]
        );
        let again = cur.diff(&cur.clone());
        assert!(again.is_empty());
    }

    #[test]
    fn handler_lookup() {
        use std::rc::Rc;
        let mut b = buf(3, 1);
        let handler: MouseHandler = Rc::new(|_| {});
        let frag = Fragment::raw("ab").with_handler(handler.clone());
        b.write_fragments(
            Point { x: 0, y: 0 },
            &FormattedText(vec![frag]),
            3,
            WrapMode::Truncate,
            Attrs::default(),
        );
        assert!(b.handler_at(Point { x: 1, y: 0 }).is_some());
        assert!(b.handler_at(Point { x: 2, y: 0 }).is_none());
    }
}
