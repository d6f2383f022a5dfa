//! The formatted-text model: styled fragments and the inputs that produce
//! them.
//!
//! Everything that ends up on screen is first normalized into a
//! [`FormattedText`]: an ordered sequence of `(style, text, handler?)`
//! fragments. Inputs arrive in five shapes, captured by [`Text`]: a raw
//! string, an existing fragment list, markup, ANSI-escape-bearing text, or a
//! callable re-evaluated on each render.

/// ANSI-SGR text parsing.
mod ansi;
/// HTML-like markup parsing.
mod markup;

use std::{fmt, rc::Rc};

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub use ansi::parse_ansi;
pub use markup::{parse_markup, to_markup};

use crate::{
    error::Result,
    input::MouseEvent,
    style::{Attrs, StyleSheet},
};

/// A mouse callback bound to a fragment's screen footprint.
pub type MouseHandler = Rc<dyn Fn(&MouseEvent)>;

/// One styled run of text, with an optional mouse handler.
#[derive(Clone)]
pub struct Fragment {
    /// Style applied to the run.
    pub style: Attrs,
    /// The text. May contain `\n`; consumers split when needed.
    pub text: String,
    /// Mouse callback for the fragment's footprint.
    pub handler: Option<MouseHandler>,
}

impl Fragment {
    /// A fragment with the given style.
    pub fn new(style: Attrs, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
            handler: None,
        }
    }

    /// An unstyled fragment.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(Attrs::default(), text)
    }

    /// Attach a mouse handler.
    pub fn with_handler(mut self, handler: MouseHandler) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("style", &self.style)
            .field("text", &self.text)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.style == other.style
            && self.text == other.text
            && match (&self.handler, &other.handler) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

/// An ordered sequence of fragments. Pure data; cheap to clone per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedText(pub Vec<Fragment>);

impl FormattedText {
    /// A single unstyled fragment.
    pub fn raw(text: impl Into<String>) -> Self {
        Self(vec![Fragment::raw(text)])
    }

    /// Total visible width of all fragments, ignoring newlines.
    pub fn fragment_list_len(&self) -> usize {
        self.0
            .iter()
            .map(|f| f.text.split('\n').map(display_width).sum::<usize>())
            .sum()
    }

    /// Width of the widest line.
    pub fn max_line_width(&self) -> usize {
        self.split_lines()
            .iter()
            .map(|l| l.fragment_list_len())
            .max()
            .unwrap_or(0)
    }

    /// Number of lines the text occupies.
    pub fn line_count(&self) -> usize {
        self.split_lines().len()
    }

    /// Split fragments on `\n`, carrying style (and handler) across lines.
    pub fn split_lines(&self) -> Vec<Self> {
        let mut lines = vec![Self::default()];
        for frag in &self.0 {
            let mut parts = frag.text.split('\n').peekable();
            while let Some(part) = parts.next() {
                if !part.is_empty() {
                    let mut f = Fragment::new(frag.style, part);
                    f.handler = frag.handler.clone();
                    lines.last_mut().expect("lines never empty").0.push(f);
                }
                if parts.peek().is_some() {
                    lines.push(Self::default());
                }
            }
        }
        lines
    }

    /// Strip styles, returning the concatenated text.
    pub fn to_plain_text(&self) -> String {
        self.0.iter().map(|f| f.text.as_str()).collect()
    }
}

impl From<Vec<Fragment>> for FormattedText {
    fn from(v: Vec<Fragment>) -> Self {
        Self(v)
    }
}

/// Any of the input shapes that can be rendered as formatted text.
#[derive(Clone)]
pub enum Text {
    /// A raw string: one unstyled fragment.
    Raw(String),
    /// An explicit fragment sequence.
    Fragments(FormattedText),
    /// Markup parsed with the tiny HTML-like grammar.
    Markup(String),
    /// A string whose SGR escapes are parsed into styles.
    Ansi(String),
    /// A callable re-invoked on each render for dynamic content.
    Dynamic(Rc<dyn Fn() -> Text>),
}

impl Text {
    /// Markup input.
    pub fn markup(s: impl Into<String>) -> Self {
        Self::Markup(s.into())
    }

    /// ANSI-escape input.
    pub fn ansi(s: impl Into<String>) -> Self {
        Self::Ansi(s.into())
    }

    /// Dynamic content, re-evaluated each render.
    pub fn dynamic(f: impl Fn() -> Self + 'static) -> Self {
        Self::Dynamic(Rc::new(f))
    }

    /// Normalize to the canonical fragment sequence.
    pub fn to_fragments(&self, sheet: &StyleSheet) -> Result<FormattedText> {
        match self {
            Self::Raw(s) => Ok(FormattedText::raw(s.clone())),
            Self::Fragments(ft) => Ok(ft.clone()),
            Self::Markup(s) => parse_markup(s, sheet),
            Self::Ansi(s) => Ok(parse_ansi(s)),
            Self::Dynamic(f) => f().to_fragments(sheet),
        }
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(s) => f.debug_tuple("Raw").field(s).finish(),
            Self::Fragments(ft) => f.debug_tuple("Fragments").field(ft).finish(),
            Self::Markup(s) => f.debug_tuple("Markup").field(s).finish(),
            Self::Ansi(s) => f.debug_tuple("Ansi").field(s).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::Raw(s.to_string())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self::Raw(s)
    }
}

impl From<FormattedText> for Text {
    fn from(ft: FormattedText) -> Self {
        Self::Fragments(ft)
    }
}

/// Display width of a grapheme cluster, clamped to terminal cell widths.
pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }
    UnicodeWidthStr::width(grapheme).clamp(1, 2)
}

/// Display width of a string in terminal cells. Newlines count zero.
pub fn display_width(s: &str) -> usize {
    s.graphemes(true)
        .filter(|g| *g != "\n")
        .map(grapheme_width)
        .sum()
}
