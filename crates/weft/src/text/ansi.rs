//! Parsing of ANSI-escape-bearing text into styled fragments.
//!
//! Only SGR sequences (`ESC [ … m`) affect the output; every other escape
//! sequence is dropped and the text between them is kept.

use crate::{
    style::{AnsiColor, Attrs, Color},
    text::{Fragment, FormattedText},
};

/// Parse a string containing SGR escapes into a fragment sequence.
pub fn parse_ansi(src: &str) -> FormattedText {
    let mut frags: Vec<Fragment> = Vec::new();
    let mut style = Attrs::default();
    let mut text = String::new();
    let mut chars = src.chars().peekable();

    let mut flush = |text: &mut String, style: Attrs| {
        if !text.is_empty() {
            frags.push(Fragment::new(style, std::mem::take(text)));
        }
    };

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            text.push(c);
            continue;
        }
        match chars.peek() {
            Some('[') => {
                chars.next();
                let mut params = String::new();
                let mut terminator = None;
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        terminator = Some(c);
                        break;
                    }
                    params.push(c);
                }
                if terminator == Some('m') {
                    flush(&mut text, style);
                    apply_sgr(&mut style, &params);
                }
            }
            Some(']') => {
                // OSC, terminated by BEL or ST.
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\x07' || (prev == '\x1b' && c == '\\') {
                        break;
                    }
                    prev = c;
                }
            }
            Some('(' | ')') => {
                // Charset designation; drop the designator byte too.
                chars.next();
                chars.next();
            }
            Some(_) => {
                // Two-byte escape; drop it.
                chars.next();
            }
            None => {}
        }
    }
    flush(&mut text, style);
    FormattedText(frags)
}

/// Apply a semicolon-separated SGR parameter list to the running style.
fn apply_sgr(style: &mut Attrs, params: &str) {
    let mut it = params
        .split(';')
        .map(|p| p.parse::<u16>().unwrap_or(0))
        .peekable();
    if params.is_empty() {
        *style = Attrs::default();
        return;
    }
    while let Some(code) = it.next() {
        match code {
            0 => *style = Attrs::default(),
            1 => style.bold = Some(true),
            3 => style.italic = Some(true),
            4 => style.underline = Some(true),
            5 => style.blink = Some(true),
            7 => style.reverse = Some(true),
            8 => style.hidden = Some(true),
            9 => style.strike = Some(true),
            22 => style.bold = None,
            23 => style.italic = None,
            24 => style.underline = None,
            25 => style.blink = None,
            27 => style.reverse = None,
            28 => style.hidden = None,
            29 => style.strike = None,
            30..=37 => style.fg = Some(Color::Ansi(AnsiColor::ALL[(code - 30) as usize])),
            39 => style.fg = None,
            40..=47 => style.bg = Some(Color::Ansi(AnsiColor::ALL[(code - 40) as usize])),
            49 => style.bg = None,
            90..=97 => style.fg = Some(Color::Ansi(AnsiColor::ALL[(code - 90 + 8) as usize])),
            100..=107 => style.bg = Some(Color::Ansi(AnsiColor::ALL[(code - 100 + 8) as usize])),
            38 | 48 => {
                let color = match it.next() {
                    Some(5) => it.next().map(|n| Color::Palette(n as u8)),
                    Some(2) => {
                        let (r, g, b) = (it.next(), it.next(), it.next());
                        match (r, g, b) {
                            (Some(r), Some(g), Some(b)) => {
                                Some(Color::Rgb(r as u8, g as u8, b as u8))
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let Some(color) = color {
                    if code == 38 {
                        style.fg = Some(color);
                    } else {
                        style.bg = Some(color);
                    }
                }
            }
            _ => {}
        }
    }
}
