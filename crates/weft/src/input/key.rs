//! Logical keyboard input primitives.

use std::fmt;

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

impl Mods {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };
    /// Control only.
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        alt: false,
    };
    /// Alt only.
    pub const ALT: Self = Self {
        shift: false,
        ctrl: false,
        alt: true,
    };
    /// Shift only.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };

    /// True when no modifier is active.
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt)
    }
}

/// Logical key codes.
#[derive(Debug, PartialOrd, PartialEq, Hash, Eq, Clone, Copy)]
pub enum KeyCode {
    /// Backspace key.
    Backspace,
    /// Enter/return key.
    Enter,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page up key.
    PageUp,
    /// Page down key.
    PageDown,
    /// Tab key.
    Tab,
    /// Shift + Tab.
    BackTab,
    /// Delete key.
    Delete,
    /// Insert key.
    Insert,
    /// Escape key.
    Esc,
    /// Function key; `F(1)` is F1.
    F(u8),
    /// A character key.
    Char(char),
    /// The NUL key (Ctrl-Space).
    Null,
}

impl From<char> for KeyCode {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

/// A single logical key press: a key code plus modifier state.
#[derive(Debug, PartialEq, Hash, Eq, Clone, Copy)]
pub struct Key {
    /// Active modifiers.
    pub mods: Mods,
    /// The key code.
    pub code: KeyCode,
}

impl Key {
    /// A plain key with no modifiers.
    pub fn new(code: impl Into<KeyCode>) -> Self {
        Self {
            mods: Mods::NONE,
            code: code.into(),
        }
    }

    /// A Ctrl chord.
    pub fn ctrl(code: impl Into<KeyCode>) -> Self {
        Self {
            mods: Mods::CTRL,
            code: code.into(),
        }
    }

    /// An Alt chord.
    pub fn alt(code: impl Into<KeyCode>) -> Self {
        Self {
            mods: Mods::ALT,
            code: code.into(),
        }
    }

    /// Normalize for binding lookup: fold the shift modifier into uppercase
    /// characters so `Shift+a` and `A` match the same binding.
    pub fn normalize(self) -> Self {
        let mut k = self;
        if let KeyCode::Char(c) = k.code
            && k.mods.shift
        {
            if c.is_ascii_alphabetic() {
                k.code = KeyCode::Char(c.to_ascii_uppercase());
            }
            k.mods.shift = false;
        }
        k
    }

    /// The printable character this key inserts, if any.
    pub fn text(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if !self.mods.ctrl && !self.mods.alt => Some(c),
            _ => None,
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self::new(c)
    }
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.mods.alt {
            write!(f, "Alt+")?;
        }
        if self.mods.shift {
            write!(f, "Shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            ref other => write!(f, "{other:?}"),
        }
    }
}
