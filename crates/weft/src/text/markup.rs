//! The tiny HTML-like markup grammar.
//!
//! Named tags `b i u s blink reverse hidden` toggle attributes,
//! `<style fg="…" bg="…">` sets colors, and any other tag name resolves to
//! the style class of the same name. Tags are strictly balanced; mismatches
//! fail with a markup error carrying the byte offset of the offending tag.

use std::fmt::Write as _;

use crate::{
    error::{Error, Result},
    style::{AnsiColor, Attrs, Color, StyleSheet, palette_rgb},
    text::{Fragment, FormattedText},
};

/// Parse markup into a fragment sequence, resolving unknown tags through the
/// sheet.
pub fn parse_markup(src: &str, sheet: &StyleSheet) -> Result<FormattedText> {
    let mut frags: Vec<Fragment> = Vec::new();
    // Stack of (tag name, open position, attrs in effect inside the tag).
    let mut stack: Vec<(String, usize, Attrs)> = Vec::new();
    let mut text = String::new();
    let mut rest = src;
    let mut pos = 0usize;

    let flush = |frags: &mut Vec<Fragment>, text: &mut String, style: Attrs| {
        if !text.is_empty() {
            frags.push(Fragment::new(style, std::mem::take(text)));
        }
    };

    while let Some(c) = rest.chars().next() {
        let current = stack.last().map(|(_, _, a)| *a).unwrap_or_default();
        match c {
            '<' => {
                let end = rest
                    .find('>')
                    .ok_or_else(|| Error::markup(pos, "unterminated tag"))?;
                let body = &rest[1..end];
                if let Some(name) = body.strip_prefix('/') {
                    let name = name.trim();
                    match stack.pop() {
                        Some((open, _, _)) if open == name => {
                            flush(&mut frags, &mut text, current);
                        }
                        Some((open, _, _)) => {
                            return Err(Error::markup(
                                pos,
                                format!("mismatched closing tag </{name}>, expected </{open}>"),
                            ));
                        }
                        None => {
                            return Err(Error::markup(
                                pos,
                                format!("closing tag </{name}> with no open tag"),
                            ));
                        }
                    }
                } else {
                    let delta = tag_attrs(body, sheet).map_err(|m| Error::markup(pos, m))?;
                    flush(&mut frags, &mut text, current);
                    let name = body.split_whitespace().next().unwrap_or("").to_string();
                    stack.push((name, pos, current.combine(&delta)));
                }
                pos += end + 1;
                rest = &rest[end + 1..];
            }
            '&' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| Error::markup(pos, "unterminated entity"))?;
                let entity = &rest[1..end];
                text.push(match entity {
                    "lt" => '<',
                    "gt" => '>',
                    "amp" => '&',
                    "quot" => '"',
                    _ => {
                        return Err(Error::markup(pos, format!("unknown entity &{entity};")));
                    }
                });
                pos += end + 1;
                rest = &rest[end + 1..];
            }
            c => {
                text.push(c);
                let len = c.len_utf8();
                pos += len;
                rest = &rest[len..];
            }
        }
    }

    if let Some((open, open_pos, _)) = stack.pop() {
        return Err(Error::markup(open_pos, format!("unclosed tag <{open}>")));
    }
    let current = Attrs::default();
    if !text.is_empty() {
        frags.push(Fragment::new(current, text));
    }
    Ok(FormattedText(frags))
}

/// The attribute delta introduced by an opening tag body.
fn tag_attrs(body: &str, sheet: &StyleSheet) -> std::result::Result<Attrs, String> {
    let mut parts = body.split_whitespace();
    let name = parts.next().ok_or_else(|| "empty tag".to_string())?;

    let mut delta = match name {
        "b" => Attrs::default().with_bold(),
        "i" => {
            let mut a = Attrs::default();
            a.italic = Some(true);
            a
        }
        "u" => Attrs::default().with_underline(),
        "s" => {
            let mut a = Attrs::default();
            a.strike = Some(true);
            a
        }
        "blink" => {
            let mut a = Attrs::default();
            a.blink = Some(true);
            a
        }
        "reverse" => Attrs::default().with_reverse(),
        "hidden" => {
            let mut a = Attrs::default();
            a.hidden = Some(true);
            a
        }
        "style" => Attrs::default(),
        other => sheet.parse(&format!("class:{other}")),
    };

    for attr in parts {
        let (key, value) = attr
            .split_once('=')
            .ok_or_else(|| format!("malformed attribute {attr:?}"))?;
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| format!("attribute {key} must be quoted"))?;
        match key {
            "fg" => delta = delta.combine(&sheet.parse(&format!("fg:{value}"))),
            "bg" => delta = delta.combine(&sheet.parse(&format!("bg:{value}"))),
            _ => return Err(format!("unknown attribute {key:?}")),
        }
    }
    Ok(delta)
}

/// Render a fragment sequence back into markup that resolves to the same
/// fragments.
pub fn to_markup(ft: &FormattedText) -> String {
    let mut out = String::new();
    for frag in &ft.0 {
        let mut close = Vec::new();
        let a = &frag.style;
        for (on, tag) in [
            (a.bold, "b"),
            (a.italic, "i"),
            (a.underline, "u"),
            (a.strike, "s"),
            (a.blink, "blink"),
            (a.reverse, "reverse"),
            (a.hidden, "hidden"),
        ] {
            if on == Some(true) {
                let _ = write!(out, "<{tag}>");
                close.push(tag);
            }
        }
        if a.fg.is_some() || a.bg.is_some() {
            out.push_str("<style");
            if let Some(fg) = a.fg {
                let _ = write!(out, " fg=\"{}\"", color_term(fg));
            }
            if let Some(bg) = a.bg {
                let _ = write!(out, " bg=\"{}\"", color_term(bg));
            }
            out.push('>');
            close.push("style");
        }
        for c in frag.text.chars() {
            match c {
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '&' => out.push_str("&amp;"),
                '"' => out.push_str("&quot;"),
                c => out.push(c),
            }
        }
        for tag in close.iter().rev() {
            let _ = write!(out, "</{tag}>");
        }
    }
    out
}

/// A style-string color term naming the given color.
fn color_term(c: Color) -> String {
    match c {
        Color::Default => "default".into(),
        Color::Ansi(a) => ansi_name(a).into(),
        Color::Palette(i) => {
            let (r, g, b) = palette_rgb(i);
            format!("#{r:02x}{g:02x}{b:02x}")
        }
        Color::Rgb(r, g, b) => format!("#{r:02x}{g:02x}{b:02x}"),
    }
}

/// The canonical style-string name for an ANSI color.
fn ansi_name(a: AnsiColor) -> &'static str {
    use AnsiColor::*;
    match a {
        Black => "ansiblack",
        Red => "ansired",
        Green => "ansigreen",
        Yellow => "ansiyellow",
        Blue => "ansiblue",
        Magenta => "ansimagenta",
        Cyan => "ansicyan",
        White => "ansiwhite",
        BrightBlack => "ansibrightblack",
        BrightRed => "ansibrightred",
        BrightGreen => "ansibrightgreen",
        BrightYellow => "ansibrightyellow",
        BrightBlue => "ansibrightblue",
        BrightMagenta => "ansibrightmagenta",
        BrightCyan => "ansibrightcyan",
        BrightWhite => "ansibrightwhite",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::parse_style;

    fn sheet() -> StyleSheet {
        StyleSheet::new([("alert", "fg:red bold")])
    }

    #[test]
    fn plain() {
        let ft = parse_markup("hello", &sheet()).unwrap();
        assert_eq!(ft, FormattedText::raw("hello"));
    }

    #[test]
    fn bold_tag() {
        let ft = parse_markup("a<b>bc</b>d", &sheet()).unwrap();
        assert_eq!(ft.0.len(), 3);
        assert_eq!(ft.0[1].text, "bc");
        assert_eq!(ft.0[1].style.bold, Some(true));
        assert_eq!(ft.0[2].style, Attrs::default());
    }

    #[test]
    fn nested_tags_combine() {
        let ft = parse_markup("<b><i>x</i></b>", &sheet()).unwrap();
        assert_eq!(ft.0[0].style.bold, Some(true));
        assert_eq!(ft.0[0].style.italic, Some(true));
    }

    #[test]
    fn style_tag_colors() {
        let ft =
            parse_markup(r##"<style fg="#ffffff" bg="#00aa00">x</style>"##, &sheet()).unwrap();
        assert_eq!(ft.0[0].style.fg, Some(Color::Rgb(255, 255, 255)));
        assert_eq!(ft.0[0].style.bg, Some(Color::Rgb(0, 170, 0)));
    }

    #[test]
    fn user_tag_resolves_class() {
        let ft = parse_markup("<alert>boom</alert>", &sheet()).unwrap();
        assert_eq!(ft.0[0].style, parse_style("fg:red bold"));
    }

    #[test]
    fn mismatched_closing_tag() {
        let err = parse_markup("<b>hello</i>", &sheet()).unwrap_err();
        match err {
            Error::Markup { position, message } => {
                assert_eq!(position, 8);
                assert!(message.contains("</i>"), "message was {message:?}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unclosed_tag() {
        let err = parse_markup("ab<b>cd", &sheet()).unwrap_err();
        assert!(matches!(err, Error::Markup { position: 2, .. }));
    }

    #[test]
    fn entities() {
        let ft = parse_markup("&lt;b&gt; &amp; &quot;", &sheet()).unwrap();
        assert_eq!(ft.to_plain_text(), "<b> & \"");
        assert!(parse_markup("&bogus;", &sheet()).is_err());
    }

    #[test]
    fn roundtrip_plain_text() {
        let src = "<b>one</b> two <i>three</i>";
        let ft = parse_markup(src, &sheet()).unwrap();
        assert_eq!(ft.to_plain_text(), "one two three");
    }

    #[test]
    fn roundtrip_markup() {
        let src = r#"plain <b>bold <i>both</i></b> <style fg="ansired">red</style>"#;
        let sheet = sheet();
        let ft = parse_markup(src, &sheet).unwrap();
        let re = to_markup(&ft);
        let ft2 = parse_markup(&re, &sheet).unwrap();
        assert_eq!(ft, ft2);
    }
}
