//! Window content: controls that produce fragments each frame.
//!
//! A control is the content object inside a window. The two fundamental
//! kinds are a formatted-text control (stateless beyond its text source)
//! and a buffer control (renders an editable [`Buffer`] through an optional
//! highlighter, with selection and search overlays). New widget kinds are
//! built by composing these, not by adding variants.

use crate::{
    buffer::Buffer,
    error::Result,
    geom::Point,
    style::{Attrs, StyleSheet},
    text::{FormattedText, Fragment, Text, display_width},
};

/// Produces per-line token styles for a buffer control.
pub trait Highlighter {
    /// Fragment the given line. `row` is the zero-based line number.
    fn highlight(&self, row: usize, line: &str) -> FormattedText;
}

/// What a control produced for one frame.
#[derive(Debug)]
pub struct RenderedControl {
    /// The content, with `\n` separating lines.
    pub text: FormattedText,
    /// Cursor cell relative to the control's top-left, if it shows one.
    pub cursor: Option<Point>,
}

/// A stateless control wrapping a text source, re-evaluated every render.
pub struct TextControl {
    /// The text source.
    pub text: Text,
}

/// A control rendering an editable buffer.
pub struct BufferControl {
    /// The buffer being edited.
    pub buffer: Buffer,
    /// Optional per-line syntax styling.
    pub highlighter: Option<Box<dyn Highlighter>>,
    /// When set, occurrences are painted with the `search` class.
    pub search: Option<String>,
}

impl BufferControl {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            highlighter: None,
            search: None,
        }
    }
}

/// The content of a window.
pub enum Control {
    /// Formatted text.
    Text(TextControl),
    /// An editable buffer.
    Buffer(BufferControl),
}

impl Control {
    /// A text control from any text input.
    pub fn text(text: impl Into<Text>) -> Self {
        Self::Text(TextControl { text: text.into() })
    }

    /// A buffer control.
    pub fn buffer(buffer: Buffer) -> Self {
        Self::Buffer(BufferControl::new(buffer))
    }

    /// Whether the control can take keyboard focus.
    pub fn is_focusable(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }

    /// The buffer, for buffer controls.
    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Self::Buffer(bc) => Some(&bc.buffer),
            Self::Text(_) => None,
        }
    }

    /// The buffer, mutably.
    pub fn as_buffer_mut(&mut self) -> Option<&mut Buffer> {
        match self {
            Self::Buffer(bc) => Some(&mut bc.buffer),
            Self::Text(_) => None,
        }
    }

    /// Width of the widest line the control would like.
    pub fn preferred_width(&self, sheet: &StyleSheet) -> Result<u32> {
        Ok(match self {
            Self::Text(tc) => tc.text.to_fragments(sheet)?.max_line_width() as u32,
            Self::Buffer(bc) => bc
                .buffer
                .text()
                .split('\n')
                .map(display_width)
                .max()
                .unwrap_or(0) as u32,
        })
    }

    /// Number of lines the control would like.
    pub fn preferred_height(&self, sheet: &StyleSheet) -> Result<u32> {
        Ok(match self {
            Self::Text(tc) => tc.text.to_fragments(sheet)?.line_count() as u32,
            Self::Buffer(bc) => bc.buffer.line_count() as u32,
        })
    }

    /// Produce this frame's content.
    pub fn render(&self, sheet: &StyleSheet, focused: bool) -> Result<RenderedControl> {
        match self {
            Self::Text(tc) => Ok(RenderedControl {
                text: tc.text.to_fragments(sheet)?,
                cursor: None,
            }),
            Self::Buffer(bc) => Ok(render_buffer(bc, sheet, focused)),
        }
    }
}

fn render_buffer(bc: &BufferControl, sheet: &StyleSheet, focused: bool) -> RenderedControl {
    let buffer = &bc.buffer;
    let selection_style = overlay_style(sheet, "selection");
    let search_style = overlay_style(sheet, "search");
    let selection = buffer.selection();

    let mut out = FormattedText::default();
    let mut line_start = 0usize;
    for row in 0..buffer.line_count() {
        if row > 0 {
            out.0.push(Fragment::raw("\n"));
        }
        let line = buffer.line(row);
        let mut ft = match &bc.highlighter {
            Some(h) => h.highlight(row, line),
            None => FormattedText::raw(line),
        };
        if let Some(range) = &selection {
            let len = line.chars().count();
            let lo = range.start.saturating_sub(line_start).min(len);
            let hi = range.end.saturating_sub(line_start).min(len);
            if lo < hi {
                ft = apply_overlay(&ft, lo..hi, selection_style);
            }
        }
        if let Some(needle) = &bc.search {
            if !needle.is_empty() {
                for range in match_ranges(line, needle) {
                    ft = apply_overlay(&ft, range, search_style);
                }
            }
        }
        out.0.extend(ft.0);
        line_start += line.chars().count() + 1;
    }

    let cursor = focused.then(|| {
        let (row, col) = buffer.cursor_row_col();
        let line = buffer.line(row);
        let prefix: String = line.chars().take(col).collect();
        Point {
            x: display_width(&prefix) as u32,
            y: row as u32,
        }
    });
    RenderedControl { text: out, cursor }
}

/// The style for a named overlay class, falling back to reverse video when
/// the sheet does not define it.
fn overlay_style(sheet: &StyleSheet, class: &str) -> Attrs {
    let s = sheet.parse(&format!("class:{class}"));
    if s.is_empty() { Attrs::default().with_reverse() } else { s }
}

/// Char ranges of each occurrence of `needle` in `line`.
fn match_ranges(line: &str, needle: &str) -> Vec<std::ops::Range<usize>> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(byte) = line[from..].find(needle) {
        let start_byte = from + byte;
        let start = line[..start_byte].chars().count();
        let len = needle.chars().count();
        out.push(start..start + len);
        from = start_byte + needle.len();
    }
    out
}

/// Re-style a char range of a single-line fragment sequence, splitting
/// fragments at the range boundaries.
fn apply_overlay(
    ft: &FormattedText,
    range: std::ops::Range<usize>,
    style: Attrs,
) -> FormattedText {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for frag in &ft.0 {
        let len = frag.text.chars().count();
        let (start, end) = (pos, pos + len);
        pos = end;
        let lo = range.start.clamp(start, end) - start;
        let hi = range.end.clamp(start, end) - start;
        if lo >= hi {
            out.push(frag.clone());
            continue;
        }
        let chars: Vec<char> = frag.text.chars().collect();
        let piece = |r: std::ops::Range<usize>| chars[r].iter().collect::<String>();
        if lo > 0 {
            let mut f = Fragment::new(frag.style, piece(0..lo));
            f.handler = frag.handler.clone();
            out.push(f);
        }
        let mut mid = Fragment::new(frag.style.combine(&style), piece(lo..hi));
        mid.handler = frag.handler.clone();
        out.push(mid);
        if hi < len {
            let mut f = Fragment::new(frag.style, piece(hi..len));
            f.handler = frag.handler.clone();
            out.push(f);
        }
    }
    FormattedText(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::parse_style;

    #[test]
    fn text_control_dimensions() {
        let c = Control::text("ab\ncdef");
        let sheet = StyleSheet::default();
        assert_eq!(c.preferred_width(&sheet).unwrap(), 4);
        assert_eq!(c.preferred_height(&sheet).unwrap(), 2);
        assert!(!c.is_focusable());
    }

    #[test]
    fn buffer_control_cursor() {
        let mut b = Buffer::with_text("one\ntwo");
        b.multiline = true;
        b.set_cursor(6);
        let c = Control::buffer(b);
        assert!(c.is_focusable());
        let sheet = StyleSheet::default();
        let r = c.render(&sheet, true).unwrap();
        assert_eq!(r.cursor, Some(Point { x: 2, y: 1 }));
        assert_eq!(r.text.to_plain_text(), "one\ntwo");
        let r = c.render(&sheet, false).unwrap();
        assert!(r.cursor.is_none());
    }

    #[test]
    fn selection_overlay_splits_fragments() {
        let mut b = Buffer::with_text("abcdef");
        b.set_cursor(1);
        b.start_selection();
        b.move_right(3);
        let c = Control::buffer(b);
        let r = c.render(&StyleSheet::default(), true).unwrap();
        assert_eq!(r.text.0.len(), 3);
        assert_eq!(r.text.0[1].text, "bcd");
        assert_eq!(r.text.0[1].style.reverse, Some(true));
        assert_eq!(r.text.0[0].style, Attrs::default());
    }

    #[test]
    fn search_overlay() {
        let b = Buffer::with_text("ab ab");
        let mut bc = BufferControl::new(b);
        bc.search = Some("ab".into());
        let c = Control::Buffer(bc);
        let r = c.render(&StyleSheet::default(), false).unwrap();
        let hits: Vec<_> = r
            .text
            .0
            .iter()
            .filter(|f| f.style.reverse == Some(true))
            .collect();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|f| f.text == "ab"));
    }

    #[test]
    fn highlighter_is_applied() {
        struct Caps;
        impl Highlighter for Caps {
            fn highlight(&self, _row: usize, line: &str) -> FormattedText {
                FormattedText(vec![Fragment::new(parse_style("bold"), line)])
            }
        }
        let mut bc = BufferControl::new(Buffer::with_text("xy"));
        bc.highlighter = Some(Box::new(Caps));
        let r = Control::Buffer(bc)
            .render(&StyleSheet::default(), false)
            .unwrap();
        assert_eq!(r.text.0[0].style.bold, Some(true));
    }

    #[test]
    fn sheet_defined_selection_class() {
        let sheet = StyleSheet::new([("selection", "bg:ansiblue")]);
        let mut b = Buffer::with_text("abc");
        b.set_cursor(0);
        b.start_selection();
        b.move_right(3);
        let r = Control::buffer(b).render(&sheet, true).unwrap();
        assert_eq!(r.text.0[0].style, parse_style("bg:ansiblue"));
    }
}
