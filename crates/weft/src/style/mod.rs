//! The style model: cascading attribute sets, style strings, and SGR output.
//!
//! A *style string* is a whitespace-separated list of terms such as
//! `"bg:#00aa00 #ffffff bold"`. Each string parses into an [`Attrs`] delta;
//! deltas compose left to right with later terms overriding earlier ones, so
//! application is associative. `noinherit` clears everything set so far in
//! the cascade.

mod color;

use std::{collections::HashMap, fmt::Write as _};

pub use color::{AnsiColor, Color, ColorDepth, nearest_ansi, nearest_palette, palette_rgb};

/// A set of style attributes. Unset fields inherit from the cascade below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Attrs {
    /// Foreground color.
    pub fg: Option<Color>,
    /// Background color.
    pub bg: Option<Color>,
    /// Bold.
    pub bold: Option<bool>,
    /// Italic.
    pub italic: Option<bool>,
    /// Underline.
    pub underline: Option<bool>,
    /// Blink.
    pub blink: Option<bool>,
    /// Reverse video.
    pub reverse: Option<bool>,
    /// Hidden (concealed) text.
    pub hidden: Option<bool>,
    /// Strikethrough.
    pub strike: Option<bool>,
}

impl Attrs {
    /// An attribute set with every field explicitly reset to its default.
    ///
    /// This is what `noinherit` resolves to: it stops the cascade below it
    /// from showing through.
    pub fn reset() -> Self {
        Self {
            fg: Some(Color::Default),
            bg: Some(Color::Default),
            bold: Some(false),
            italic: Some(false),
            underline: Some(false),
            blink: Some(false),
            reverse: Some(false),
            hidden: Some(false),
            strike: Some(false),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `over` on top of this set; set fields in `over` win.
    pub fn combine(&self, over: &Self) -> Self {
        Self {
            fg: over.fg.or(self.fg),
            bg: over.bg.or(self.bg),
            bold: over.bold.or(self.bold),
            italic: over.italic.or(self.italic),
            underline: over.underline.or(self.underline),
            blink: over.blink.or(self.blink),
            reverse: over.reverse.or(self.reverse),
            hidden: over.hidden.or(self.hidden),
            strike: over.strike.or(self.strike),
        }
    }

    /// Builder: set the foreground.
    pub fn with_fg(mut self, c: Color) -> Self {
        self.fg = Some(c);
        self
    }

    /// Builder: set the background.
    pub fn with_bg(mut self, c: Color) -> Self {
        self.bg = Some(c);
        self
    }

    /// Builder: set bold.
    pub fn with_bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    /// Builder: set reverse video.
    pub fn with_reverse(mut self) -> Self {
        self.reverse = Some(true);
        self
    }

    /// Builder: set underline.
    pub fn with_underline(mut self) -> Self {
        self.underline = Some(true);
        self
    }
}

/// Emit the SGR escape sequence selecting this attribute set at a depth.
///
/// The sequence always starts from a full reset so that emission does not
/// depend on the terminal's current state.
pub fn sgr(attrs: &Attrs, depth: ColorDepth) -> String {
    let mut s = String::from("\x1b[0");
    if attrs.bold == Some(true) {
        s.push_str(";1");
    }
    if attrs.italic == Some(true) {
        s.push_str(";3");
    }
    if attrs.underline == Some(true) {
        s.push_str(";4");
    }
    if attrs.blink == Some(true) {
        s.push_str(";5");
    }
    if attrs.reverse == Some(true) {
        s.push_str(";7");
    }
    if attrs.hidden == Some(true) {
        s.push_str(";8");
    }
    if attrs.strike == Some(true) {
        s.push_str(";9");
    }
    if let Some(fg) = attrs.fg {
        push_color(&mut s, fg.degrade(depth), false);
    }
    if let Some(bg) = attrs.bg {
        push_color(&mut s, bg.degrade(depth), true);
    }
    s.push('m');
    s
}

/// Append the SGR parameters for a single color.
fn push_color(out: &mut String, c: Color, bg: bool) {
    match c {
        Color::Default => {}
        Color::Ansi(a) => {
            let code = if bg { a.bg_code() } else { a.fg_code() };
            let _ = write!(out, ";{code}");
        }
        Color::Palette(i) => {
            let base = if bg { 48 } else { 38 };
            let _ = write!(out, ";{base};5;{i}");
        }
        Color::Rgb(r, g, b) => {
            let base = if bg { 48 } else { 38 };
            let _ = write!(out, ";{base};2;{r};{g};{b}");
        }
    }
}

/// Parse a style string without class resolution.
pub fn parse_style(s: &str) -> Attrs {
    StyleSheet::default().parse(s)
}

/// Look up a color name in the fixed table. Unknown names yield `None`.
fn named_color(name: &str) -> Option<Color> {
    use AnsiColor::*;
    let ansi = |a| Some(Color::Ansi(a));
    match name {
        "default" => Some(Color::Default),
        "ansiblack" | "black" => ansi(Black),
        "ansired" | "darkred" => ansi(Red),
        "ansigreen" | "darkgreen" => ansi(Green),
        "ansiyellow" | "olive" => ansi(Yellow),
        "ansiblue" | "darkblue" | "navy" => ansi(Blue),
        "ansimagenta" | "purple" => ansi(Magenta),
        "ansicyan" | "teal" => ansi(Cyan),
        "ansiwhite" | "silver" => ansi(White),
        "ansibrightblack" | "gray" | "grey" => ansi(BrightBlack),
        "ansibrightred" | "red" => ansi(BrightRed),
        "ansibrightgreen" | "green" | "lime" => ansi(BrightGreen),
        "ansibrightyellow" | "yellow" => ansi(BrightYellow),
        "ansibrightblue" | "blue" => ansi(BrightBlue),
        "ansibrightmagenta" | "magenta" | "fuchsia" => ansi(BrightMagenta),
        "ansibrightcyan" | "cyan" | "aqua" => ansi(BrightCyan),
        "ansibrightwhite" | "white" => ansi(BrightWhite),
        "orange" => Some(Color::Rgb(255, 165, 0)),
        "brown" => Some(Color::Rgb(165, 42, 42)),
        "pink" => Some(Color::Rgb(255, 192, 203)),
        _ => None,
    }
}

/// Maximum depth of `class:` indirection before we give up.
const MAX_CLASS_DEPTH: usize = 16;

/// A table of named style classes.
///
/// Markup tags and `class:<name>` terms in style strings resolve through the
/// sheet. The sheet is immutable once built and safe to share.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// Class name to style-string mapping.
    classes: HashMap<String, String>,
}

impl StyleSheet {
    /// Build a sheet from `(class, style string)` pairs.
    pub fn new<I, K, V>(classes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            classes: classes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The style string registered for a class, if any.
    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    /// Parse a style string, resolving `class:` references through the sheet.
    pub fn parse(&self, s: &str) -> Attrs {
        self.parse_depth(s, 0)
    }

    /// Resolve an ordered list of style strings left to right.
    pub fn resolve<'a>(&self, strings: impl IntoIterator<Item = &'a str>) -> Attrs {
        let mut acc = Attrs::default();
        for s in strings {
            acc = acc.combine(&self.parse(s));
        }
        acc
    }

    fn parse_depth(&self, s: &str, depth: usize) -> Attrs {
        let mut acc = Attrs::default();
        for term in s.split_whitespace() {
            acc = self.apply_term(acc, term, depth);
        }
        acc
    }

    /// Apply one style term to the accumulated attrs.
    fn apply_term(&self, acc: Attrs, term: &str, depth: usize) -> Attrs {
        let mut acc = acc;
        match term {
            "noinherit" => return Attrs::reset(),
            "bold" => acc.bold = Some(true),
            "nobold" => acc.bold = Some(false),
            "italic" => acc.italic = Some(true),
            "noitalic" => acc.italic = Some(false),
            "underline" => acc.underline = Some(true),
            "nounderline" => acc.underline = Some(false),
            "blink" => acc.blink = Some(true),
            "noblink" => acc.blink = Some(false),
            "reverse" => acc.reverse = Some(true),
            "noreverse" => acc.reverse = Some(false),
            "hidden" => acc.hidden = Some(true),
            "nohidden" => acc.hidden = Some(false),
            "strike" | "strikethrough" => acc.strike = Some(true),
            "nostrike" => acc.strike = Some(false),
            _ => {
                if let Some(name) = term.strip_prefix("class:") {
                    if depth < MAX_CLASS_DEPTH
                        && let Some(body) = self.class(name)
                    {
                        let class_attrs = self.parse_depth(body, depth + 1);
                        acc = acc.combine(&class_attrs);
                    }
                } else if let Some(c) = term.strip_prefix("bg:") {
                    acc.bg = Some(parse_color(c));
                } else if let Some(c) = term.strip_prefix("fg:") {
                    acc.fg = Some(parse_color(c));
                } else {
                    acc.fg = Some(parse_color(term));
                }
            }
        }
        acc
    }
}

/// Parse a color term. Unknown names become the default color.
fn parse_color(s: &str) -> Color {
    if s.starts_with('#') {
        return Color::from_hex(s).unwrap_or_default();
    }
    named_color(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_terms() {
        let a = parse_style("bg:#00aa00 #ffffff bold");
        assert_eq!(a.bg, Some(Color::Rgb(0, 170, 0)));
        assert_eq!(a.fg, Some(Color::Rgb(255, 255, 255)));
        assert_eq!(a.bold, Some(true));
        assert_eq!(a.italic, None);
    }

    #[test]
    fn unknown_names_become_default() {
        let a = parse_style("fg:notacolor");
        assert_eq!(a.fg, Some(Color::Default));
    }

    #[test]
    fn garbage_hex_degrades_without_failing() {
        let a = parse_style("fg:#¢a bold");
        assert_eq!(a.fg, Some(Color::Default));
        assert_eq!(a.bold, Some(true));
    }

    #[test]
    fn negations() {
        let a = parse_style("bold nobold");
        assert_eq!(a.bold, Some(false));
    }

    #[test]
    fn noinherit_clears_cascade() {
        let sheet = StyleSheet::default();
        let a = sheet.resolve(["bold fg:red", "noinherit underline"]);
        assert_eq!(a.bold, Some(false));
        assert_eq!(a.fg, Some(Color::Default));
        assert_eq!(a.underline, Some(true));
    }

    #[test]
    fn cascade_associativity() {
        // resolve(s1 s2 s3) == resolve(resolve(s1 s2) applied, then s3)
        let sheet = StyleSheet::default();
        let s1 = "fg:red bold";
        let s2 = "bg:blue nobold";
        let s3 = "underline fg:#00ff00";
        let all = sheet.resolve([s1, s2, s3]);
        let left = sheet.resolve([s1, s2]);
        let stepwise = left.combine(&sheet.parse(s3));
        assert_eq!(all, stepwise);
    }

    #[test]
    fn class_resolution() {
        let sheet = StyleSheet::new([("warn", "fg:yellow bold"), ("loud", "class:warn underline")]);
        let a = sheet.parse("class:loud");
        assert_eq!(a.fg, Some(Color::Ansi(AnsiColor::BrightYellow)));
        assert_eq!(a.bold, Some(true));
        assert_eq!(a.underline, Some(true));
        // Unknown classes resolve to nothing.
        assert!(sheet.parse("class:missing").is_empty());
    }

    #[test]
    fn class_cycles_terminate() {
        let sheet = StyleSheet::new([("a", "class:b bold"), ("b", "class:a")]);
        let a = sheet.parse("class:a");
        assert_eq!(a.bold, Some(true));
    }

    #[test]
    fn sgr_output() {
        let a = Attrs::default()
            .with_fg(Color::Ansi(AnsiColor::Red))
            .with_bg(Color::Rgb(0, 170, 0))
            .with_bold();
        assert_eq!(sgr(&a, ColorDepth::TrueColor), "\x1b[0;1;31;48;2;0;170;0m");
        // Degradation at 16 colors quantizes the background.
        let s = sgr(&a, ColorDepth::Ansi16);
        assert!(s.starts_with("\x1b[0;1;31;4"));
        // Monochrome drops colors but keeps attributes.
        assert_eq!(sgr(&a, ColorDepth::Monochrome), "\x1b[0;1m");
    }

    proptest::proptest! {
        #[test]
        fn combine_associative(
            s1 in "[a-z:# ]{0,20}",
            s2 in "[a-z:# ]{0,20}",
            s3 in "[a-z:# ]{0,20}",
        ) {
            let sheet = StyleSheet::default();
            let (a1, a2, a3) = (sheet.parse(&s1), sheet.parse(&s2), sheet.parse(&s3));
            let left = a1.combine(&a2).combine(&a3);
            let right = a1.combine(&a2.combine(&a3));
            proptest::prop_assert_eq!(left, right);
        }
    }
}
