//! One-shot styled output for programs that are not full applications:
//! render a [`Text`] to an escaped string, or print it straight to stdout
//! with sensible fallbacks for pipes and `NO_COLOR`.

use std::io::{self, Write};

use crossterm::tty::IsTty;

use crate::{
    error::Result,
    style::{Attrs, ColorDepth, StyleSheet},
    text::Text,
};

/// Render styled text to a string of escape sequences at the given depth.
/// Every fragment's style is emitted from a clean reset, and the string ends
/// reset, so output composes with surrounding shell text.
pub fn render_text(text: &Text, sheet: &StyleSheet, depth: ColorDepth) -> Result<String> {
    use crate::style::sgr;

    let ft = text.to_fragments(sheet)?;
    let mut out = String::new();
    for frag in &ft.0 {
        out.push_str(&sgr(&frag.style, depth));
        out.push_str(&frag.text);
    }
    out.push_str(&sgr(&Attrs::default(), depth));
    Ok(out)
}

/// Print styled text to stdout, followed by a newline. Output degrades to
/// plain text when stdout is not a terminal or `NO_COLOR` is set.
pub fn print_text(text: &Text, sheet: &StyleSheet) -> Result<()> {
    let mut out = io::stdout();
    let plain = !out.is_tty() || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    let rendered = if plain {
        text.to_fragments(sheet)?.to_plain_text()
    } else {
        render_text(text, sheet, ColorDepth::detect())?
    };
    writeln!(out, "{rendered}")?;
    Ok(())
}
