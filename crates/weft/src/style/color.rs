//! Terminal color values and depth degradation.

/// One of the sixteen base ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnsiColor {
    /// Black.
    Black,
    /// Red.
    Red,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
    /// Blue.
    Blue,
    /// Magenta.
    Magenta,
    /// Cyan.
    Cyan,
    /// White.
    White,
    /// Bright black.
    BrightBlack,
    /// Bright red.
    BrightRed,
    /// Bright green.
    BrightGreen,
    /// Bright yellow.
    BrightYellow,
    /// Bright blue.
    BrightBlue,
    /// Bright magenta.
    BrightMagenta,
    /// Bright cyan.
    BrightCyan,
    /// Bright white.
    BrightWhite,
}

impl AnsiColor {
    /// The sixteen base colors in SGR order.
    pub const ALL: [Self; 16] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::BrightWhite,
    ];

    /// Index of this color in SGR order (0-15).
    pub fn index(self) -> u8 {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0) as u8
    }

    /// SGR foreground parameter for this color.
    pub fn fg_code(self) -> u8 {
        let i = self.index();
        if i < 8 { 30 + i } else { 90 + (i - 8) }
    }

    /// SGR background parameter for this color.
    pub fn bg_code(self) -> u8 {
        let i = self.index();
        if i < 8 { 40 + i } else { 100 + (i - 8) }
    }

    /// Nominal RGB value, used when quantizing richer colors down.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Black => (0, 0, 0),
            Self::Red => (205, 0, 0),
            Self::Green => (0, 205, 0),
            Self::Yellow => (205, 205, 0),
            Self::Blue => (0, 0, 238),
            Self::Magenta => (205, 0, 205),
            Self::Cyan => (0, 205, 205),
            Self::White => (229, 229, 229),
            Self::BrightBlack => (127, 127, 127),
            Self::BrightRed => (255, 0, 0),
            Self::BrightGreen => (0, 255, 0),
            Self::BrightYellow => (255, 255, 0),
            Self::BrightBlue => (92, 92, 255),
            Self::BrightMagenta => (255, 0, 255),
            Self::BrightCyan => (0, 255, 255),
            Self::BrightWhite => (255, 255, 255),
        }
    }
}

/// A color at any of the supported depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default color.
    #[default]
    Default,
    /// One of the sixteen named ANSI colors.
    Ansi(AnsiColor),
    /// An index into the 256-color palette.
    Palette(u8),
    /// A 24-bit RGB triplet.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Construct a color from a hex string, accepting `#rgb` and `#rrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        // Slicing below is by byte offset; multibyte input is just invalid.
        if !hex.is_ascii() {
            return None;
        }
        let parse = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = parse(&hex[0..1])?;
                let g = parse(&hex[1..2])?;
                let b = parse(&hex[2..3])?;
                Some(Self::Rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::Rgb(
                parse(&hex[0..2])?,
                parse(&hex[2..4])?,
                parse(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// RGB value of this color, using nominal palettes for named colors.
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Default => None,
            Self::Ansi(a) => Some(a.rgb()),
            Self::Palette(i) => Some(palette_rgb(i)),
            Self::Rgb(r, g, b) => Some((r, g, b)),
        }
    }

    /// Reduce this color to what the given depth can express.
    pub fn degrade(self, depth: ColorDepth) -> Self {
        match depth {
            ColorDepth::Monochrome => Self::Default,
            ColorDepth::TrueColor => self,
            ColorDepth::Ansi256 => match self {
                Self::Rgb(r, g, b) => Self::Palette(nearest_palette(r, g, b)),
                c => c,
            },
            ColorDepth::Ansi16 => match self.to_rgb() {
                None => Self::Default,
                Some(_) if matches!(self, Self::Ansi(_)) => self,
                Some((r, g, b)) => Self::Ansi(nearest_ansi(r, g, b)),
            },
        }
    }
}

/// The color resolution negotiated with the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorDepth {
    /// No color at all (`NO_COLOR`).
    Monochrome,
    /// Sixteen colors.
    Ansi16,
    /// The 256-color palette.
    Ansi256,
    /// 24-bit true color.
    TrueColor,
}

impl ColorDepth {
    /// Negotiate a depth from the standard environment variables.
    ///
    /// `NO_COLOR` forces monochrome; `COLORTERM` containing `truecolor` or
    /// `24bit` selects true color; a `TERM` containing `256color` selects the
    /// palette; anything else gets sixteen colors.
    pub fn detect() -> Self {
        Self::from_env(
            std::env::var("NO_COLOR").ok().as_deref(),
            std::env::var("COLORTERM").ok().as_deref(),
            std::env::var("TERM").ok().as_deref(),
        )
    }

    /// Depth selection from explicit environment values, for testability.
    pub fn from_env(
        no_color: Option<&str>,
        colorterm: Option<&str>,
        term: Option<&str>,
    ) -> Self {
        if no_color.is_some() {
            return Self::Monochrome;
        }
        if let Some(ct) = colorterm
            && (ct.contains("truecolor") || ct.contains("24bit"))
        {
            return Self::TrueColor;
        }
        if let Some(t) = term
            && t.contains("256color")
        {
            return Self::Ansi256;
        }
        Self::Ansi16
    }
}

/// RGB value of a 256-palette index.
pub fn palette_rgb(i: u8) -> (u8, u8, u8) {
    match i {
        0..=15 => AnsiColor::ALL[i as usize].rgb(),
        16..=231 => {
            let i = i - 16;
            let cube = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (cube(i / 36), cube((i / 6) % 6), cube(i % 6))
        }
        232..=255 => {
            let v = 8 + (i - 232) * 10;
            (v, v, v)
        }
    }
}

/// Nearest 256-palette index for an RGB triplet, using the 6x6x6 cube and the
/// grayscale ramp.
pub fn nearest_palette(r: u8, g: u8, b: u8) -> u8 {
    let level = |v: u8| {
        if v < 48 {
            0
        } else if v < 115 {
            1
        } else {
            ((v as u16 - 35) / 40).min(5) as u8
        }
    };
    let (cr, cg, cb) = (level(r), level(g), level(b));
    let cube_idx = 16 + 36 * cr + 6 * cg + cb;
    let cube_rgb = palette_rgb(cube_idx);

    // Also consider the closest gray ramp entry.
    let avg = (r as u16 + g as u16 + b as u16) / 3;
    let gray_step = ((avg.saturating_sub(3)) / 10).min(23) as u8;
    let gray_idx = 232 + gray_step;
    let gray_rgb = palette_rgb(gray_idx);

    if distance((r, g, b), gray_rgb) < distance((r, g, b), cube_rgb) {
        gray_idx
    } else {
        cube_idx
    }
}

/// Nearest of the sixteen ANSI colors for an RGB triplet.
pub fn nearest_ansi(r: u8, g: u8, b: u8) -> AnsiColor {
    let mut best = AnsiColor::Black;
    let mut best_d = u32::MAX;
    for c in AnsiColor::ALL {
        let d = distance((r, g, b), c.rgb());
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// Squared RGB distance.
fn distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let d = |x: u8, y: u8| {
        let d = x as i32 - y as i32;
        (d * d) as u32
    };
    d(a.0, b.0) + d(a.1, b.1) + d(a.2, b.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("#f00"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("ff0000"), None);
        assert_eq!(Color::from_hex("#ff00"), None);
        // Multibyte input must be rejected, not sliced.
        assert_eq!(Color::from_hex("#¢a"), None);
        assert_eq!(Color::from_hex("#¢¢¢"), None);
    }

    #[test]
    fn depth_detection() {
        assert_eq!(
            ColorDepth::from_env(Some(""), Some("truecolor"), None),
            ColorDepth::Monochrome
        );
        assert_eq!(
            ColorDepth::from_env(None, Some("truecolor"), Some("xterm")),
            ColorDepth::TrueColor
        );
        assert_eq!(
            ColorDepth::from_env(None, None, Some("xterm-256color")),
            ColorDepth::Ansi256
        );
        assert_eq!(
            ColorDepth::from_env(None, None, Some("linux")),
            ColorDepth::Ansi16
        );
    }

    #[test]
    fn degrade_rgb() {
        let c = Color::Rgb(255, 0, 0);
        assert_eq!(c.degrade(ColorDepth::TrueColor), c);
        assert_eq!(c.degrade(ColorDepth::Ansi256), Color::Palette(196));
        assert_eq!(
            c.degrade(ColorDepth::Ansi16),
            Color::Ansi(AnsiColor::BrightRed)
        );
        assert_eq!(c.degrade(ColorDepth::Monochrome), Color::Default);
    }

    #[test]
    fn palette_cube() {
        assert_eq!(palette_rgb(16), (0, 0, 0));
        assert_eq!(palette_rgb(196), (255, 0, 0));
        assert_eq!(palette_rgb(231), (255, 255, 255));
        assert_eq!(palette_rgb(232), (8, 8, 8));
    }

    #[test]
    fn gray_ramp_preferred_for_grays() {
        let idx = nearest_palette(128, 128, 128);
        assert!((232..=255).contains(&idx) || idx == 16 + 36 * 2 + 6 * 2 + 2);
        let (r, g, b) = palette_rgb(idx);
        assert!(r == g && g == b);
    }
}
