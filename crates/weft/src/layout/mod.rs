//! The layout tree: containers, windows, and per-frame arrangement.
//!
//! Nodes live in a slotmap arena and refer to each other by [`NodeId`], so
//! the tree has no owning cycles. Each frame the console walks the tree:
//! pass one computes [`Dimension`]s bottom-up, pass two assigns concrete
//! rectangles top-down and draws every window into the screen buffer.

/// Size constraints and the allocation solver.
pub mod dimension;

use slotmap::{SlotMap, new_key_type};

pub use dimension::{Dimension, distribute};

use crate::{
    control::Control,
    error::Result,
    geom::{Point, Rect, Size},
    screen::{CursorShape, ScreenBuffer, WrapMode},
    style::{Attrs, StyleSheet},
};

new_key_type! {
    /// Handle to a node in the layout tree.
    pub struct NodeId;
}

/// Placement of split content when the children cannot fill the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Pack children at the top (HSplit) or left (VSplit).
    #[default]
    Start,
    /// Center the run of children.
    Center,
    /// Pack children at the bottom or right.
    End,
    /// Spread leftover space into the gaps between children.
    Justify,
}

/// Which axis a split distributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Children stacked top to bottom; rows are distributed (HSplit).
    Rows,
    /// Children side by side; columns are distributed (VSplit).
    Cols,
}

/// A leaf node: a rectangle of screen owned by one control.
pub struct Window {
    /// The content, absent for filler windows.
    pub control: Option<Control>,
    /// Filler character drawn across the whole region instead of a control.
    pub fill: Option<char>,
    /// Width constraint override. Defaults to the control's preferred width.
    pub width: Option<Dimension>,
    /// Height constraint override.
    pub height: Option<Dimension>,
    /// What to do with lines wider than the window.
    pub wrap: WrapMode,
    /// Style string applied under the window's content.
    pub style: String,
    /// Cursor glyph shown while this window holds focus.
    pub cursor_shape: CursorShape,
}

impl Window {
    pub fn new(control: Control) -> Self {
        Self {
            control: Some(control),
            fill: None,
            width: None,
            height: None,
            wrap: WrapMode::Truncate,
            style: String::new(),
            cursor_shape: CursorShape::default(),
        }
    }

    /// A window that paints a repeated character, used for separators.
    pub fn filler(ch: char) -> Self {
        Self {
            control: None,
            fill: Some(ch),
            width: None,
            height: None,
            wrap: WrapMode::Truncate,
            style: String::new(),
            cursor_shape: CursorShape::default(),
        }
    }
}

/// An ordered sequence of children along one axis.
pub struct Split {
    pub axis: Axis,
    pub children: Vec<NodeId>,
    /// Cells inserted between adjacent children.
    pub padding: u32,
    /// Character drawn in the padding, when set.
    pub padding_char: Option<char>,
    /// Style string for the padding cells.
    pub padding_style: String,
    pub align: Align,
}

/// Anchoring for one float over a base child.
#[derive(Debug, Clone, Copy)]
pub struct Float {
    pub child: NodeId,
    /// Columns from the container's left edge.
    pub left: Option<u32>,
    /// Rows from the container's top edge.
    pub top: Option<u32>,
    /// Columns from the right edge.
    pub right: Option<u32>,
    /// Rows from the bottom edge.
    pub bottom: Option<u32>,
    /// Anchor the left edge at the focused window's cursor column.
    pub xcursor: bool,
    /// Anchor the top edge one row below the focused window's cursor.
    pub ycursor: bool,
}

impl Float {
    pub fn new(child: NodeId) -> Self {
        Self {
            child,
            left: None,
            top: None,
            right: None,
            bottom: None,
            xcursor: false,
            ycursor: false,
        }
    }
}

/// A base child with floats painted over it.
pub struct FloatContainer {
    pub base: NodeId,
    pub floats: Vec<Float>,
}

/// A viewport over a child arranged at its full virtual height.
pub struct ScrollView {
    pub child: NodeId,
    /// First virtual row shown. Adjusted to keep the cursor visible.
    pub offset: u32,
}

/// A node in the layout tree.
pub enum Node {
    Window(Window),
    Split(Split),
    Float(FloatContainer),
    Scroll(ScrollView),
}

/// The layout tree plus the per-frame arrangement results.
#[derive(Default)]
pub struct Layout {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    /// Node rectangles in paint order, rebuilt each render.
    regions: Vec<(NodeId, Rect)>,
    /// Human-readable reports of constraint violations, rebuilt each render.
    overflow: Vec<String>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Add a window wrapping a control.
    pub fn window(&mut self, control: Control) -> NodeId {
        self.add(Node::Window(Window::new(control)))
    }

    /// Add a fixed-width filler column, such as a `|` separator.
    pub fn filler(&mut self, ch: char, width: u32) -> NodeId {
        let mut w = Window::filler(ch);
        w.width = Some(Dimension::exact(width));
        self.add(Node::Window(w))
    }

    /// Add a split that stacks children top to bottom.
    pub fn hsplit(&mut self, children: Vec<NodeId>) -> NodeId {
        self.split(Axis::Rows, children)
    }

    /// Add a split that places children side by side.
    pub fn vsplit(&mut self, children: Vec<NodeId>) -> NodeId {
        self.split(Axis::Cols, children)
    }

    fn split(&mut self, axis: Axis, children: Vec<NodeId>) -> NodeId {
        self.add(Node::Split(Split {
            axis,
            children,
            padding: 0,
            padding_char: None,
            padding_style: String::new(),
            align: Align::Start,
        }))
    }

    /// Add a float container over a base node.
    pub fn float_container(&mut self, base: NodeId) -> NodeId {
        self.add(Node::Float(FloatContainer {
            base,
            floats: Vec::new(),
        }))
    }

    /// Attach a float to an existing float container.
    pub fn push_float(&mut self, container: NodeId, float: Float) {
        if let Some(Node::Float(fc)) = self.nodes.get_mut(container) {
            fc.floats.push(float);
        }
    }

    /// Add a scrollable viewport over a child.
    pub fn scrollable(&mut self, child: NodeId) -> NodeId {
        self.add(Node::Scroll(ScrollView { child, offset: 0 }))
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn window_mut(&mut self, id: NodeId) -> Option<&mut Window> {
        match self.nodes.get_mut(id) {
            Some(Node::Window(w)) => Some(w),
            _ => None,
        }
    }

    /// The buffer inside a window node, if it has one.
    pub fn buffer(&self, id: NodeId) -> Option<&crate::buffer::Buffer> {
        match self.nodes.get(id) {
            Some(Node::Window(w)) => w.control.as_ref().and_then(Control::as_buffer),
            _ => None,
        }
    }

    pub fn buffer_mut(&mut self, id: NodeId) -> Option<&mut crate::buffer::Buffer> {
        match self.nodes.get_mut(id) {
            Some(Node::Window(w)) => w.control.as_mut().and_then(Control::as_buffer_mut),
            _ => None,
        }
    }

    /// Focusable windows in tree order.
    pub fn focusable_windows(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_focusable(self.root, &mut out);
        out
    }

    fn collect_focusable(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.nodes.get(id) {
            Some(Node::Window(w)) => {
                if w.control.as_ref().is_some_and(Control::is_focusable) {
                    out.push(id);
                }
            }
            Some(Node::Split(s)) => {
                for &c in &s.children {
                    self.collect_focusable(c, out);
                }
            }
            Some(Node::Float(fc)) => {
                self.collect_focusable(fc.base, out);
                for f in &fc.floats {
                    self.collect_focusable(f.child, out);
                }
            }
            Some(Node::Scroll(sv)) => self.collect_focusable(sv.child, out),
            None => {}
        }
    }

    /// Node rectangles from the last render, in paint order.
    pub fn regions(&self) -> &[(NodeId, Rect)] {
        &self.regions
    }

    /// The rectangle a node occupied in the last render.
    pub fn region_of(&self, id: NodeId) -> Option<Rect> {
        self.regions
            .iter()
            .find(|(n, _)| *n == id)
            .map(|(_, r)| *r)
    }

    /// The topmost window under a point in the last render.
    pub fn window_at(&self, p: Point) -> Option<NodeId> {
        self.regions
            .iter()
            .rev()
            .find(|(n, r)| {
                r.contains_point(p) && matches!(self.nodes.get(*n), Some(Node::Window(_)))
            })
            .map(|(n, _)| *n)
    }

    /// Constraint violations observed during the last render.
    pub fn overflows(&self) -> &[String] {
        &self.overflow
    }

    /// Pass one: the size constraints a node exports on each axis, as
    /// `(width, height)`.
    pub fn measure(&self, id: NodeId, sheet: &StyleSheet) -> Result<(Dimension, Dimension)> {
        match self.nodes.get(id) {
            Some(Node::Window(w)) => {
                let (pw, ph) = match &w.control {
                    Some(c) => (c.preferred_width(sheet)?, c.preferred_height(sheet)?),
                    None => (0, 0),
                };
                Ok((
                    w.width.unwrap_or_else(|| Dimension::fit(pw)),
                    w.height.unwrap_or_else(|| Dimension::fit(ph)),
                ))
            }
            Some(Node::Split(s)) => {
                let mut main = (0u64, 0u64, 0u64);
                let mut cross = Dimension {
                    max: u32::MAX,
                    ..Dimension::fit(0)
                };
                for &c in &s.children {
                    let (wd, hd) = self.measure(c, sheet)?;
                    let (m, x) = match s.axis {
                        Axis::Rows => (hd, wd),
                        Axis::Cols => (wd, hd),
                    };
                    main.0 += m.min as u64;
                    main.1 += m.preferred as u64;
                    main.2 += m.max as u64;
                    cross.min = cross.min.max(x.min);
                    cross.preferred = cross.preferred.max(x.preferred);
                }
                let pad = s.padding as u64 * s.children.len().saturating_sub(1) as u64;
                let clamp = |v: u64| v.min(u32::MAX as u64) as u32;
                let main = Dimension {
                    min: clamp(main.0 + pad),
                    preferred: clamp(main.1 + pad),
                    max: clamp(main.2 + pad),
                    weight: 1,
                };
                Ok(match s.axis {
                    Axis::Rows => (cross, main),
                    Axis::Cols => (main, cross),
                })
            }
            Some(Node::Float(fc)) => self.measure(fc.base, sheet),
            Some(Node::Scroll(sv)) => {
                let (wd, _) = self.measure(sv.child, sheet)?;
                // The viewport's height is the outer constraint, not the
                // child's.
                Ok((wd, Dimension::default()))
            }
            None => Ok((Dimension::default(), Dimension::default())),
        }
    }

    /// Pass two plus drawing: arrange the tree into `rect` and render every
    /// window into the buffer.
    pub fn render(
        &mut self,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        self.regions.clear();
        self.overflow.clear();
        if !self.nodes.contains_key(self.root) {
            return Ok(());
        }
        let rect = buf.rect();
        self.render_node(self.root, rect, buf, sheet, focused)
    }

    fn render_node(
        &mut self,
        id: NodeId,
        rect: Rect,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        self.regions.push((id, rect));
        match self.nodes.get(id) {
            Some(Node::Window(_)) => self.render_window(id, rect, buf, sheet, focused),
            Some(Node::Split(_)) => self.render_split(id, rect, buf, sheet, focused),
            Some(Node::Float(_)) => self.render_float(id, rect, buf, sheet, focused),
            Some(Node::Scroll(_)) => self.render_scroll(id, rect, buf, sheet, focused),
            None => Ok(()),
        }
    }

    fn render_window(
        &mut self,
        id: NodeId,
        rect: Rect,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let (wd, hd) = self.measure(id, sheet)?;
        let Some(Node::Window(w)) = self.nodes.get(id) else {
            return Ok(());
        };
        let style = sheet.parse(&w.style);
        let shape = w.cursor_shape;
        if let Some(ch) = w.fill {
            buf.fill(rect, ch, style);
            return Ok(());
        }

        let mut tmp = ScreenBuffer::new(rect.size(), style);
        let mut cursor = None;
        if let Some(control) = &w.control {
            let is_focused = focused == Some(id);
            let rendered = control.render(sheet, is_focused)?;
            tmp.write_fragments(Point::default(), &rendered.text, rect.w, w.wrap, style);
            if is_focused {
                cursor = rendered.cursor;
            }
        }
        if rect.w < wd.min || rect.h < hd.min {
            let msg = format!(
                "window needs at least {}x{}, got {}x{}",
                wd.min, hd.min, rect.w, rect.h
            );
            let overlay = overlay_style(sheet, "overflow");
            tmp.fill(Rect::new(0, 0, rect.w, 1), ' ', overlay);
            tmp.write_fragments(
                Point::default(),
                &crate::text::FormattedText::raw(msg.clone()),
                rect.w,
                WrapMode::Truncate,
                overlay,
            );
            self.overflow.push(msg);
        }
        buf.blit(&tmp, rect.size().rect(), rect.tl);
        if let Some(c) = cursor {
            let p = Point {
                x: rect.tl.x + c.x.min(rect.w.saturating_sub(1)),
                y: rect.tl.y + c.y.min(rect.h.saturating_sub(1)),
            };
            buf.set_cursor(p, true);
            buf.set_cursor_shape(shape);
        }
        Ok(())
    }

    fn render_split(
        &mut self,
        id: NodeId,
        rect: Rect,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        let (axis, children, padding, padding_char, padding_style, align) = {
            let Some(Node::Split(s)) = self.nodes.get(id) else {
                return Ok(());
            };
            (
                s.axis,
                s.children.clone(),
                s.padding,
                s.padding_char,
                s.padding_style.clone(),
                s.align,
            )
        };
        let n = children.len();
        if n == 0 || rect.is_empty() {
            return Ok(());
        }

        let total = match axis {
            Axis::Rows => rect.h,
            Axis::Cols => rect.w,
        };
        let pad_total = (padding * (n as u32 - 1)).min(total);
        let mut dims = Vec::with_capacity(n);
        for &c in &children {
            let (wd, hd) = self.measure(c, sheet)?;
            dims.push(match axis {
                Axis::Rows => hd,
                Axis::Cols => wd,
            });
        }
        let alloc = distribute(total - pad_total, &dims);

        let min_needed: u64 = dims.iter().map(|d| d.min as u64).sum::<u64>() + pad_total as u64;
        if min_needed > total as u64 {
            self.overflow.push(format!(
                "split needs at least {min_needed} cells, got {total}"
            ));
        }

        let used: u64 = alloc.iter().map(|&a| a as u64).sum::<u64>() + pad_total as u64;
        let extra = (total as u64).saturating_sub(used) as u32;
        let gaps = n as u32 - 1;
        let (lead, per_gap, gap_rem) = match align {
            Align::Start => (0, 0, 0),
            Align::Center => (extra / 2, 0, 0),
            Align::End => (extra, 0, 0),
            Align::Justify if gaps > 0 => (0, extra / gaps, extra % gaps),
            Align::Justify => (0, 0, 0),
        };

        let pad_style = sheet.parse(&padding_style);
        let mut pos = match axis {
            Axis::Rows => rect.tl.y,
            Axis::Cols => rect.tl.x,
        } + lead;
        for (i, &child) in children.iter().enumerate() {
            let span = alloc[i];
            let crect = match axis {
                Axis::Rows => Rect::new(rect.tl.x, pos, rect.w, span),
                Axis::Cols => Rect::new(pos, rect.tl.y, span, rect.h),
            };
            let crect = crect.intersect(&rect).unwrap_or_default();
            self.render_node(child, crect, buf, sheet, focused)?;
            pos += span;
            if i + 1 < n {
                let mut gap = padding + per_gap;
                if (i as u32) < gap_rem {
                    gap += 1;
                }
                if gap > 0 {
                    if let Some(ch) = padding_char {
                        let grect = match axis {
                            Axis::Rows => Rect::new(rect.tl.x, pos, rect.w, gap),
                            Axis::Cols => Rect::new(pos, rect.tl.y, gap, rect.h),
                        };
                        if let Some(grect) = grect.intersect(&rect) {
                            buf.fill(grect, ch, pad_style);
                        }
                    }
                    pos += gap;
                }
            }
        }
        Ok(())
    }

    fn render_float(
        &mut self,
        id: NodeId,
        rect: Rect,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        let (base, floats) = {
            let Some(Node::Float(fc)) = self.nodes.get(id) else {
                return Ok(());
            };
            (fc.base, fc.floats.clone())
        };
        self.render_node(base, rect, buf, sheet, focused)?;

        for f in floats {
            let (wd, hd) = self.measure(f.child, sheet)?;
            let mut w = wd.clamped_preferred().min(rect.w);
            let mut h = hd.clamped_preferred().min(rect.h);
            if let (Some(l), Some(r)) = (f.left, f.right) {
                w = rect.w.saturating_sub(l + r);
            }
            if let (Some(t), Some(b)) = (f.top, f.bottom) {
                h = rect.h.saturating_sub(t + b);
            }
            if w == 0 || h == 0 {
                continue;
            }
            let cursor = buf.cursor();
            let x = if let Some(l) = f.left {
                rect.tl.x + l
            } else if let Some(r) = f.right {
                rect.right().saturating_sub(r + w)
            } else if f.xcursor {
                cursor.map_or(rect.tl.x, |c| c.x)
            } else {
                rect.tl.x + (rect.w - w) / 2
            };
            let y = if let Some(t) = f.top {
                rect.tl.y + t
            } else if let Some(b) = f.bottom {
                rect.bottom().saturating_sub(b + h)
            } else if f.ycursor {
                cursor.map_or(rect.tl.y, |c| c.y + 1)
            } else {
                rect.tl.y + (rect.h - h) / 2
            };
            // Clamp to stay on screen.
            let x = x.clamp(rect.tl.x, rect.right().saturating_sub(w));
            let y = y.clamp(rect.tl.y, rect.bottom().saturating_sub(h));
            let frect = Rect::new(x, y, w, h);
            if let Some(frect) = frect.intersect(&rect) {
                self.render_node(f.child, frect, buf, sheet, focused)?;
            }
        }
        Ok(())
    }

    fn render_scroll(
        &mut self,
        id: NodeId,
        rect: Rect,
        buf: &mut ScreenBuffer,
        sheet: &StyleSheet,
        focused: Option<NodeId>,
    ) -> Result<()> {
        let (child, mut offset) = {
            let Some(Node::Scroll(sv)) = self.nodes.get(id) else {
                return Ok(());
            };
            (sv.child, sv.offset)
        };
        if rect.is_empty() {
            return Ok(());
        }
        let (_, hd) = self.measure(child, sheet)?;
        let virtual_h = hd.clamped_preferred().max(rect.h);

        let mut tmp = ScreenBuffer::new(Size::new(rect.w, virtual_h), Attrs::default());
        let mark = self.regions.len();
        self.render_node(child, Rect::new(0, 0, rect.w, virtual_h), &mut tmp, sheet, focused)?;

        // Minimum movement to bring the cursor into the viewport.
        if let Some(c) = tmp.cursor() {
            if c.y < offset {
                offset = c.y;
            } else if c.y >= offset + rect.h {
                offset = c.y + 1 - rect.h;
            }
        }
        offset = offset.min(virtual_h - rect.h);
        if let Some(Node::Scroll(sv)) = self.nodes.get_mut(id) {
            sv.offset = offset;
        }

        // Child regions were recorded in virtual coordinates; map them into
        // the viewport.
        let band = Rect::new(0, offset, rect.w, rect.h);
        for (_, r) in &mut self.regions[mark..] {
            *r = match r.intersect(&band) {
                Some(vis) => Rect::new(
                    vis.tl.x + rect.tl.x,
                    vis.tl.y - offset + rect.tl.y,
                    vis.w,
                    vis.h,
                ),
                None => Rect::default(),
            };
        }

        buf.blit(&tmp, band, rect.tl);
        if let Some(c) = tmp.cursor() {
            if c.y >= offset && c.y < offset + rect.h {
                buf.set_cursor(
                    Point {
                        x: rect.tl.x + c.x,
                        y: rect.tl.y + c.y - offset,
                    },
                    tmp.cursor_visible(),
                );
                buf.set_cursor_shape(tmp.cursor_shape());
            }
        }
        Ok(())
    }
}

/// The style for a named overlay class, defaulting to reverse video.
fn overlay_style(sheet: &StyleSheet, class: &str) -> Attrs {
    let s = sheet.parse(&format!("class:{class}"));
    if s.is_empty() { Attrs::default().with_reverse() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::Buffer, control::Control};

    fn screen(w: u32, h: u32) -> ScreenBuffer {
        ScreenBuffer::new(Size::new(w, h), Attrs::default())
    }

    fn row(b: &ScreenBuffer, y: u32) -> String {
        (0..b.size().w)
            .map(|x| b.get(Point::new(x, y)).unwrap())
            .filter(|c| !c.continuation)
            .map(|c| c.ch)
            .collect()
    }

    #[test]
    fn two_pane_with_separator() {
        let mut l = Layout::new();
        let left = l.window(Control::text("left"));
        let sep = l.filler('|', 1);
        let right = l.window(Control::text("right"));
        let root = l.vsplit(vec![left, sep, right]);
        l.set_root(root);

        let mut buf = screen(20, 3);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert!(row(&buf, 0).contains("left"));
        assert!(row(&buf, 0).contains("right"));
        assert!(row(&buf, 0).contains('|'));
        assert!(row(&buf, 1).contains('|'));
        assert_eq!(l.region_of(sep).unwrap().w, 1);
        assert!(l.overflows().is_empty());
    }

    #[test]
    fn hsplit_allocates_rows() {
        let mut l = Layout::new();
        let a = l.window(Control::text("a"));
        let b = l.window(Control::text("b"));
        if let Some(w) = l.window_mut(a) {
            w.height = Some(Dimension::exact(2));
        }
        let root = l.hsplit(vec![a, b]);
        l.set_root(root);

        let mut buf = screen(5, 6);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.region_of(a).unwrap(), Rect::new(0, 0, 5, 2));
        // The second window absorbs the slack.
        assert_eq!(l.region_of(b).unwrap(), Rect::new(0, 2, 5, 4));
    }

    #[test]
    fn padding_with_char() {
        let mut l = Layout::new();
        let a = l.window(Control::text("a"));
        let b = l.window(Control::text("b"));
        if let Some(w) = l.window_mut(a) {
            w.height = Some(Dimension::exact(1));
        }
        if let Some(w) = l.window_mut(b) {
            w.height = Some(Dimension::exact(1));
        }
        let root = l.hsplit(vec![a, b]);
        if let Some(Node::Split(s)) = l.node_mut(root) {
            s.padding = 1;
            s.padding_char = Some('-');
        }
        l.set_root(root);

        let mut buf = screen(3, 3);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(row(&buf, 0), "a  ");
        assert_eq!(row(&buf, 1), "---");
        assert_eq!(row(&buf, 2), "b  ");
    }

    #[test]
    fn min_width_overflow_reports_overlay() {
        let mut l = Layout::new();
        let w = l.window(Control::text("wide"));
        if let Some(win) = l.window_mut(w) {
            win.width = Some(Dimension::fit(60).with_min(60));
        }
        l.set_root(w);

        let mut buf = screen(40, 10);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.overflows().len(), 1);
        assert!(l.overflows()[0].contains("60"));
        assert!(row(&buf, 0).contains("window needs at least"));
    }

    #[test]
    fn centered_float() {
        let mut l = Layout::new();
        let base = l.window(Control::text("base"));
        let pop = l.window(Control::text("pop"));
        if let Some(w) = l.window_mut(pop) {
            w.width = Some(Dimension::exact(3));
            w.height = Some(Dimension::exact(1));
        }
        let root = l.float_container(base);
        l.push_float(root, Float::new(pop));
        l.set_root(root);

        let mut buf = screen(9, 3);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.region_of(pop).unwrap(), Rect::new(3, 1, 3, 1));
        assert_eq!(&row(&buf, 1)[3..6], "pop");
    }

    #[test]
    fn cursor_anchored_float() {
        let mut l = Layout::new();
        let mut b = Buffer::with_text("ab");
        b.set_cursor(2);
        let base = l.window(Control::buffer(b));
        let menu = l.window(Control::text("menu"));
        if let Some(w) = l.window_mut(menu) {
            w.width = Some(Dimension::exact(4));
            w.height = Some(Dimension::exact(1));
        }
        let root = l.float_container(base);
        let mut f = Float::new(menu);
        f.xcursor = true;
        f.ycursor = true;
        l.push_float(root, f);
        l.set_root(root);

        let mut buf = screen(10, 4);
        l.render(&mut buf, &StyleSheet::default(), Some(base))
            .unwrap();
        // Cursor is at (2, 0); the float opens one row below it.
        assert_eq!(l.region_of(menu).unwrap(), Rect::new(2, 1, 4, 1));
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut l = Layout::new();
        let mut b = Buffer::with_text("l0\nl1\nl2\nl3\nl4\nl5");
        b.multiline = true;
        b.set_cursor(0);
        let win = l.window(Control::buffer(b));
        let root = l.scrollable(win);
        l.set_root(root);
        let sheet = StyleSheet::default();

        let mut buf = screen(4, 2);
        l.render(&mut buf, &sheet, Some(win)).unwrap();
        assert_eq!(row(&buf, 0), "l0  ");
        assert_eq!(buf.cursor(), Some(Point::new(0, 0)));

        // Move the cursor to the last line; the viewport scrolls down.
        if let Some(b) = l.buffer_mut(win) {
            b.set_cursor(b.text().chars().count());
        }
        let mut buf = screen(4, 2);
        l.render(&mut buf, &sheet, Some(win)).unwrap();
        assert_eq!(row(&buf, 0), "l4  ");
        assert_eq!(row(&buf, 1), "l5  ");
        assert_eq!(buf.cursor(), Some(Point::new(2, 1)));

        // And back up again.
        if let Some(b) = l.buffer_mut(win) {
            b.set_cursor(0);
        }
        let mut buf = screen(4, 2);
        l.render(&mut buf, &sheet, Some(win)).unwrap();
        assert_eq!(row(&buf, 0), "l0  ");
    }

    #[test]
    fn align_center_and_end() {
        let mut l = Layout::new();
        let a = l.window(Control::text("a"));
        if let Some(w) = l.window_mut(a) {
            w.height = Some(Dimension::exact(1).with_weight(0));
        }
        let root = l.hsplit(vec![a]);
        if let Some(Node::Split(s)) = l.node_mut(root) {
            s.align = Align::Center;
        }
        l.set_root(root);
        let mut buf = screen(3, 5);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.region_of(a).unwrap().tl.y, 2);

        if let Some(Node::Split(s)) = l.node_mut(root) {
            s.align = Align::End;
        }
        let mut buf = screen(3, 5);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.region_of(a).unwrap().tl.y, 4);
    }

    #[test]
    fn hit_testing_prefers_floats() {
        let mut l = Layout::new();
        let base = l.window(Control::text("base"));
        let pop = l.window(Control::text("p"));
        if let Some(w) = l.window_mut(pop) {
            w.width = Some(Dimension::exact(1));
            w.height = Some(Dimension::exact(1));
        }
        let root = l.float_container(base);
        l.push_float(root, Float::new(pop));
        l.set_root(root);

        let mut buf = screen(3, 3);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
        assert_eq!(l.window_at(Point::new(1, 1)), Some(pop));
        assert_eq!(l.window_at(Point::new(0, 0)), Some(base));
    }

    #[test]
    fn focusable_order() {
        let mut l = Layout::new();
        let t = l.window(Control::text("t"));
        let b1 = l.window(Control::buffer(Buffer::new()));
        let b2 = l.window(Control::buffer(Buffer::new()));
        let root = l.hsplit(vec![t, b1, b2]);
        l.set_root(root);
        assert_eq!(l.focusable_windows(), vec![b1, b2]);
    }

    #[test]
    fn empty_space_does_not_fail() {
        let mut l = Layout::new();
        let a = l.window(Control::text("a"));
        let root = l.hsplit(vec![a]);
        l.set_root(root);
        let mut buf = screen(0, 0);
        l.render(&mut buf, &StyleSheet::default(), None).unwrap();
    }
}
