//! A deterministic automaton turning raw terminal bytes into input events.
//!
//! The decoder understands xterm/VT key sequences, SGR-1006 mouse reports
//! and bracketed paste. It never fails: invalid UTF-8 becomes U+FFFD and
//! unrecognized escape sequences are discarded.
//!
//! Timeouts are the caller's concern. After feeding bytes, the caller checks
//! [`Parser::has_pending`] and, once its escape-ambiguity deadline elapses
//! with no further input, calls [`Parser::flush`].

use crate::{
    geom::Point,
    input::{
        Event,
        key::{Key, KeyCode, Mods},
        mouse::{Button, MouseAction, MouseEvent},
    },
};

/// Bracketed paste terminator.
const PASTE_END: &[u8] = b"\x1b[201~";

/// Decoder state.
#[derive(Debug)]
enum State {
    /// Plain text input.
    Normal,
    /// Saw ESC; waiting to disambiguate.
    Escape,
    /// Inside a CSI sequence; collecting parameter bytes.
    Csi(Vec<u8>),
    /// Saw ESC O; waiting for the SS3 final byte.
    Ss3,
    /// Inside an OSC sequence; discarding until BEL or ST.
    Osc { saw_esc: bool },
    /// Inside a bracketed paste; collecting until the terminator.
    Paste(Vec<u8>),
}

/// The key decoder.
#[derive(Debug)]
pub struct Parser {
    state: State,
    /// Partial UTF-8 scalar being accumulated.
    utf8: Vec<u8>,
    /// The next decoded character carries the Alt modifier.
    pending_alt: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Construct a decoder in the normal state.
    pub fn new() -> Self {
        Self {
            state: State::Normal,
            utf8: Vec::new(),
            pending_alt: false,
        }
    }

    /// True when the decoder holds input that a timeout should resolve.
    pub fn has_pending(&self) -> bool {
        !matches!(self.state, State::Normal) || !self.utf8.is_empty()
    }

    /// Feed bytes, returning the events decoded so far.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut out = Vec::new();
        for &b in bytes {
            self.step(b, &mut out);
        }
        out
    }

    /// Resolve pending state after the escape-ambiguity timeout.
    ///
    /// A lone ESC becomes an `Esc` key; incomplete sequences are discarded.
    pub fn flush(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        match std::mem::replace(&mut self.state, State::Normal) {
            State::Escape => out.push(Event::Key(Key::new(KeyCode::Esc))),
            State::Paste(buf) => {
                // Unterminated paste: deliver what we have.
                out.push(Event::Paste(String::from_utf8_lossy(&buf).into_owned()));
            }
            State::Normal | State::Csi(_) | State::Ss3 | State::Osc { .. } => {}
        }
        if !self.utf8.is_empty() {
            self.utf8.clear();
            self.emit_char('\u{fffd}', &mut out);
        }
        self.pending_alt = false;
        out
    }

    fn step(&mut self, b: u8, out: &mut Vec<Event>) {
        match &mut self.state {
            State::Normal => self.step_normal(b, out),
            State::Escape => self.step_escape(b, out),
            State::Csi(params) => {
                // Final bytes are 0x40..=0x7E; everything else accumulates.
                if (0x40..=0x7e).contains(&b) {
                    let params = std::mem::take(params);
                    self.state = State::Normal;
                    self.finish_csi(&params, b, out);
                } else {
                    params.push(b);
                }
            }
            State::Ss3 => {
                self.state = State::Normal;
                if let Some(code) = ss3_key(b) {
                    out.push(Event::Key(Key::new(code)));
                }
            }
            State::Osc { saw_esc } => match b {
                0x07 => self.state = State::Normal,
                0x1b => *saw_esc = true,
                b'\\' if *saw_esc => self.state = State::Normal,
                _ => *saw_esc = false,
            },
            State::Paste(buf) => {
                buf.push(b);
                if buf.ends_with(PASTE_END) {
                    buf.truncate(buf.len() - PASTE_END.len());
                    let text = String::from_utf8_lossy(buf).into_owned();
                    out.push(Event::Paste(text));
                    self.state = State::Normal;
                }
            }
        }
    }

    fn step_normal(&mut self, b: u8, out: &mut Vec<Event>) {
        if b == 0x1b && self.utf8.is_empty() {
            self.state = State::Escape;
            return;
        }
        if let Some(c) = self.decode_utf8(b, out) {
            self.emit_char(c, out);
        }
    }

    fn step_escape(&mut self, b: u8, out: &mut Vec<Event>) {
        match b {
            // ESC ESC: the first escape is no longer ambiguous.
            0x1b => out.push(Event::Key(Key::new(KeyCode::Esc))),
            b'[' => self.state = State::Csi(Vec::new()),
            b'O' => self.state = State::Ss3,
            b']' => self.state = State::Osc { saw_esc: false },
            _ => {
                // Alt-modified input.
                self.state = State::Normal;
                self.pending_alt = true;
                if let Some(c) = self.decode_utf8(b, out) {
                    self.emit_char(c, out);
                }
            }
        }
    }

    /// Incremental UTF-8 decoding; invalid sequences become U+FFFD.
    fn decode_utf8(&mut self, b: u8, out: &mut Vec<Event>) -> Option<char> {
        if self.utf8.is_empty() {
            if b < 0x80 {
                return Some(b as char);
            }
            if (0xc0..=0xf4).contains(&b) {
                self.utf8.push(b);
                return None;
            }
            return Some('\u{fffd}');
        }

        if (0x80..=0xbf).contains(&b) {
            self.utf8.push(b);
            let need = utf8_len(self.utf8[0]);
            if self.utf8.len() == need {
                let bytes = std::mem::take(&mut self.utf8);
                return match std::str::from_utf8(&bytes) {
                    Ok(s) => s.chars().next(),
                    Err(_) => Some('\u{fffd}'),
                };
            }
            return None;
        }

        // The byte does not continue the sequence: the partial scalar is
        // invalid, and the new byte is processed from scratch.
        self.utf8.clear();
        self.emit_char('\u{fffd}', out);
        self.step(b, out);
        None
    }

    /// Translate a decoded character into a key event.
    fn emit_char(&mut self, c: char, out: &mut Vec<Event>) {
        let alt = std::mem::take(&mut self.pending_alt);
        let mods = if alt { Mods::ALT } else { Mods::NONE };
        let key = match c {
            '\r' | '\n' => Key {
                mods,
                code: KeyCode::Enter,
            },
            '\t' => Key {
                mods,
                code: KeyCode::Tab,
            },
            '\u{7f}' => Key {
                mods,
                code: KeyCode::Backspace,
            },
            '\0' => Key {
                mods,
                code: KeyCode::Null,
            },
            c if (c as u32) < 0x20 => {
                let letter = ((c as u8) + 0x60) as char;
                Key {
                    mods: Mods {
                        ctrl: true,
                        alt,
                        shift: false,
                    },
                    code: KeyCode::Char(letter),
                }
            }
            c => Key {
                mods,
                code: KeyCode::Char(c),
            },
        };
        out.push(Event::Key(key));
    }

    /// Decode a complete CSI sequence.
    fn finish_csi(&mut self, params: &[u8], final_byte: u8, out: &mut Vec<Event>) {
        if params.first() == Some(&b'<') {
            if let Some(ev) = decode_sgr_mouse(&params[1..], final_byte) {
                out.push(Event::Mouse(ev));
            }
            return;
        }

        let fields: Vec<u32> = params
            .split(|&b| b == b';')
            .map(|f| {
                std::str::from_utf8(f)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0)
            })
            .collect();
        let mods = fields
            .get(1)
            .copied()
            .filter(|&m| m > 0)
            .map(decode_mods)
            .unwrap_or(Mods::NONE);

        let code = match final_byte {
            b'A' => Some(KeyCode::Up),
            b'B' => Some(KeyCode::Down),
            b'C' => Some(KeyCode::Right),
            b'D' => Some(KeyCode::Left),
            b'H' => Some(KeyCode::Home),
            b'F' => Some(KeyCode::End),
            b'Z' => Some(KeyCode::BackTab),
            b'~' => {
                if fields.first() == Some(&200) {
                    self.state = State::Paste(Vec::new());
                    return;
                }
                tilde_key(fields.first().copied().unwrap_or(0))
            }
            _ => None,
        };
        // Unrecognized sequences are dropped without raising.
        if let Some(code) = code {
            out.push(Event::Key(Key { mods, code }));
        }
    }
}

/// Number of bytes in a UTF-8 sequence starting with this byte.
fn utf8_len(first: u8) -> usize {
    if first >= 0xf0 {
        4
    } else if first >= 0xe0 {
        3
    } else {
        2
    }
}

/// Decode the xterm modifier parameter (value minus one is a bitfield).
fn decode_mods(param: u32) -> Mods {
    let bits = param.saturating_sub(1);
    Mods {
        shift: bits & 1 != 0,
        alt: bits & 2 != 0,
        ctrl: bits & 4 != 0,
    }
}

/// Key selected by a `CSI Ps ~` sequence.
fn tilde_key(code: u32) -> Option<KeyCode> {
    Some(match code {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11..=15 => KeyCode::F((code - 10) as u8),
        17..=21 => KeyCode::F((code - 11) as u8),
        23 => KeyCode::F(11),
        24 => KeyCode::F(12),
        _ => return None,
    })
}

/// Key selected by an SS3 (`ESC O`) final byte.
fn ss3_key(b: u8) -> Option<KeyCode> {
    Some(match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return None,
    })
}

/// Decode an SGR-1006 mouse report (`CSI < b ; x ; y M/m`).
fn decode_sgr_mouse(params: &[u8], final_byte: u8) -> Option<MouseEvent> {
    let fields: Vec<u32> = params
        .split(|&b| b == b';')
        .map(|f| {
            std::str::from_utf8(f)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0)
        })
        .collect();
    if fields.len() != 3 {
        return None;
    }
    let (b, x, y) = (fields[0], fields[1], fields[2]);
    let mods = Mods {
        shift: b & 4 != 0,
        alt: b & 8 != 0,
        ctrl: b & 16 != 0,
    };
    let position = Point::new(x.saturating_sub(1), y.saturating_sub(1));

    let (action, button) = if b & 64 != 0 {
        let action = if b & 1 == 0 {
            MouseAction::ScrollUp
        } else {
            MouseAction::ScrollDown
        };
        (action, Button::None)
    } else {
        let button = match b & 3 {
            0 => Button::Left,
            1 => Button::Middle,
            2 => Button::Right,
            _ => Button::None,
        };
        let action = if b & 32 != 0 {
            if button == Button::None {
                MouseAction::Moved
            } else {
                MouseAction::Drag
            }
        } else if final_byte == b'm' {
            MouseAction::Up
        } else {
            MouseAction::Down
        };
        (action, button)
    };

    Some(MouseEvent {
        action,
        button,
        mods,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(events: &[Event]) -> Vec<Key> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Key(k) => Some(*k),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn plain_chars() {
        let mut p = Parser::new();
        let ev = p.feed(b"ab");
        assert_eq!(keys(&ev), vec![Key::new('a'), Key::new('b')]);
    }

    #[test]
    fn control_bytes() {
        let mut p = Parser::new();
        let ev = p.feed(&[0x03, 0x0d, 0x09, 0x7f]);
        assert_eq!(
            keys(&ev),
            vec![
                Key::ctrl('c'),
                Key::new(KeyCode::Enter),
                Key::new(KeyCode::Tab),
                Key::new(KeyCode::Backspace),
            ]
        );
    }

    #[test]
    fn csi_arrows_and_mods() {
        let mut p = Parser::new();
        assert_eq!(
            keys(&p.feed(b"\x1b[A")),
            vec![Key::new(KeyCode::Up)]
        );
        assert_eq!(
            keys(&p.feed(b"\x1b[1;5A")),
            vec![Key::ctrl(KeyCode::Up)]
        );
        assert_eq!(
            keys(&p.feed(b"\x1b[Z")),
            vec![Key::new(KeyCode::BackTab)]
        );
        assert_eq!(
            keys(&p.feed(b"\x1b[3~")),
            vec![Key::new(KeyCode::Delete)]
        );
        assert_eq!(keys(&p.feed(b"\x1b[15~")), vec![Key::new(KeyCode::F(5))]);
    }

    #[test]
    fn alt_chord_and_lone_escape() {
        let mut p = Parser::new();
        assert_eq!(keys(&p.feed(b"\x1bx")), vec![Key::alt('x')]);

        // A lone escape stays pending until the timeout flush.
        assert!(p.feed(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(keys(&p.flush()), vec![Key::new(KeyCode::Esc)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn double_escape() {
        let mut p = Parser::new();
        let ev = p.feed(b"\x1b\x1b");
        assert_eq!(keys(&ev), vec![Key::new(KeyCode::Esc)]);
        // The second escape is still pending.
        assert_eq!(keys(&p.flush()), vec![Key::new(KeyCode::Esc)]);
    }

    #[test]
    fn bracketed_paste_is_one_event() {
        let mut p = Parser::new();
        let ev = p.feed(b"\x1b[200~abc\x1b[201~");
        assert_eq!(ev, vec![Event::Paste("abc".into())]);
    }

    #[test]
    fn paste_with_embedded_escapes() {
        let mut p = Parser::new();
        let ev = p.feed(b"\x1b[200~a\x1b[Ab\x1b[201~");
        assert_eq!(ev, vec![Event::Paste("a\x1b[Ab".into())]);
    }

    #[test]
    fn sgr_mouse_press_and_release() {
        let mut p = Parser::new();
        let ev = p.feed(b"\x1b[<0;5;3M");
        assert_eq!(
            ev,
            vec![Event::Mouse(MouseEvent {
                action: MouseAction::Down,
                button: Button::Left,
                mods: Mods::NONE,
                position: Point::new(4, 2),
            })]
        );
        let ev = p.feed(b"\x1b[<0;5;3m");
        assert_eq!(
            ev,
            vec![Event::Mouse(MouseEvent {
                action: MouseAction::Up,
                button: Button::Left,
                mods: Mods::NONE,
                position: Point::new(4, 2),
            })]
        );
    }

    #[test]
    fn sgr_mouse_scroll() {
        let mut p = Parser::new();
        let ev = p.feed(b"\x1b[<64;1;1M\x1b[<65;1;1M");
        assert_eq!(
            ev.iter()
                .map(|e| match e {
                    Event::Mouse(m) => m.action,
                    _ => panic!("unexpected event"),
                })
                .collect::<Vec<_>>(),
            vec![MouseAction::ScrollUp, MouseAction::ScrollDown]
        );
    }

    #[test]
    fn invalid_utf8_replaced() {
        let mut p = Parser::new();
        let ev = p.feed(&[0xff, b'a']);
        assert_eq!(keys(&ev), vec![Key::new('\u{fffd}'), Key::new('a')]);

        // Truncated multibyte sequence flushed by timeout.
        assert!(p.feed(&[0xe4]).is_empty());
        assert_eq!(keys(&p.flush()), vec![Key::new('\u{fffd}')]);
    }

    #[test]
    fn multibyte_utf8() {
        let mut p = Parser::new();
        let ev = p.feed("界".as_bytes());
        assert_eq!(keys(&ev), vec![Key::new('界')]);
    }

    #[test]
    fn unrecognized_csi_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b[99q").is_empty());
        assert!(!p.has_pending());
        assert_eq!(keys(&p.feed(b"a")), vec![Key::new('a')]);
    }

    #[test]
    fn osc_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b]0;title\x07").is_empty());
        assert!(!p.has_pending());
        assert!(p.feed(b"\x1b]0;title\x1b\\").is_empty());
        assert!(!p.has_pending());
    }

    #[test]
    fn ss3_function_keys() {
        let mut p = Parser::new();
        assert_eq!(keys(&p.feed(b"\x1bOP")), vec![Key::new(KeyCode::F(1))]);
        assert_eq!(keys(&p.feed(b"\x1bOA")), vec![Key::new(KeyCode::Up)]);
    }

    proptest::proptest! {
        // Decoding is a deterministic function of the byte stream.
        #[test]
        fn deterministic(bytes in proptest::collection::vec(0u8..=255, 0..64)) {
            let mut a = Parser::new();
            let mut b = Parser::new();
            let mut ev_a = a.feed(&bytes);
            ev_a.extend(a.flush());
            let mut ev_b = b.feed(&bytes);
            ev_b.extend(b.flush());
            proptest::prop_assert_eq!(ev_a, ev_b);
        }

        // Feeding byte-at-a-time matches feeding in one chunk.
        #[test]
        fn chunking_invariant(bytes in proptest::collection::vec(0u8..=255, 0..64)) {
            let mut a = Parser::new();
            let mut ev_a = a.feed(&bytes);
            ev_a.extend(a.flush());

            let mut b = Parser::new();
            let mut ev_b = Vec::new();
            for byte in &bytes {
                ev_b.extend(b.feed(std::slice::from_ref(byte)));
            }
            ev_b.extend(b.flush());
            proptest::prop_assert_eq!(ev_a, ev_b);
        }
    }
}
