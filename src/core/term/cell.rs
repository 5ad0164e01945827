//! Cell model
//!
//! Plain value types shared by the emulator, the layout tree and the
//! compositor: a styled screen position (`Cursor`) and a grid cell (`Char`).

use bitflags::bitflags;

/// Position plus the style in effect at that position
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cursor {
    pub x: u16,
    pub y: u16,
    pub style: Style,
}

impl Cursor {
    pub fn at(x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            style: Style::default(),
        }
    }
}

/// One grid cell. A rune of `'\0'` marks a cell that was never written.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Char {
    pub rune: char,
    pub cursor: Cursor,
}

impl Char {
    pub const EMPTY_RUNE: char = '\0';

    pub fn new(rune: char, cursor: Cursor) -> Self {
        Self { rune, cursor }
    }

    /// Unwritten cell at the given position
    pub fn blank(x: u16, y: u16) -> Self {
        Self {
            rune: Self::EMPTY_RUNE,
            cursor: Cursor::at(x, y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rune == Self::EMPTY_RUNE
    }

    /// Character to paint (space for unwritten cells)
    pub fn display_char(&self) -> char {
        if self.is_empty() {
            ' '
        } else {
            self.rune
        }
    }
}

/// Text style attributes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl Style {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply a list of SGR parameters
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut iter = params.iter().copied();

        while let Some(param) = iter.next() {
            match param {
                0 => self.reset(),
                1 => self.flags |= AttrFlags::BOLD,
                2 => self.flags |= AttrFlags::DIM,
                3 => self.flags |= AttrFlags::ITALIC,
                4 => self.flags |= AttrFlags::UNDERLINE,
                5 => self.flags |= AttrFlags::BLINK,
                7 => self.flags |= AttrFlags::INVERSE,
                8 => self.flags |= AttrFlags::HIDDEN,
                9 => self.flags |= AttrFlags::STRIKETHROUGH,

                22 => self.flags &= !(AttrFlags::BOLD | AttrFlags::DIM),
                23 => self.flags &= !AttrFlags::ITALIC,
                24 => self.flags &= !AttrFlags::UNDERLINE,
                25 => self.flags &= !AttrFlags::BLINK,
                27 => self.flags &= !AttrFlags::INVERSE,
                28 => self.flags &= !AttrFlags::HIDDEN,
                29 => self.flags &= !AttrFlags::STRIKETHROUGH,

                30..=37 => self.fg = Color::Indexed((param - 30) as u8),
                38 => {
                    if let Some(color) = Self::extended_color(&mut iter) {
                        self.fg = color;
                    }
                }
                39 => self.fg = Color::Default,

                40..=47 => self.bg = Color::Indexed((param - 40) as u8),
                48 => {
                    if let Some(color) = Self::extended_color(&mut iter) {
                        self.bg = color;
                    }
                }
                49 => self.bg = Color::Default,

                90..=97 => self.fg = Color::Indexed((param - 90 + 8) as u8),
                100..=107 => self.bg = Color::Indexed((param - 100 + 8) as u8),

                _ => {}
            }
        }
    }

    /// `5;n` (256 colors) or `2;r;g;b` (true color)
    fn extended_color(iter: &mut impl Iterator<Item = u16>) -> Option<Color> {
        match iter.next()? {
            5 => iter.next().map(|n| Color::Indexed(n as u8)),
            2 => {
                let r = iter.next().unwrap_or(0) as u8;
                let g = iter.next().unwrap_or(0) as u8;
                let b = iter.next().unwrap_or(0) as u8;
                Some(Color::Rgb(r, g, b))
            }
            _ => None,
        }
    }
}

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            Color::Default => crossterm::style::Color::Reset,
            Color::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            Color::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const DIM           = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
    }
}
