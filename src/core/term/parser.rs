//! VT sequence decoder
//!
//! Splits a pane's output byte stream into `Output` events: the raw bytes
//! of one directive plus its parsed meaning. The emulator only ever sees
//! `Parsed` values; the raw bytes travel along for callers that need to
//! forward them untouched.

use unicode_width::UnicodeWidthChar;

/// Screen direction, shared by cursor movement and pane navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Whether movement in this direction runs along a vertically stacked split
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Whether this direction points towards lower indices
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::Up | Direction::Left)
    }
}

/// One decoded terminal directive
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    /// Printable code point (never `'\0'`)
    Char(char),
    CursorMove { direction: Direction, n: u16 },
    /// Absolute position, 0-indexed. `None` keeps that coordinate.
    CursorPosition { row: Option<u16>, col: Option<u16> },
    CarriageReturn,
    LineFeed,
    Backspace,
    Tab,
    EraseInLine(u16),
    EraseInDisplay(u16),
    Sgr(Vec<u16>),
    SaveCursor,
    RestoreCursor,
    MouseDown { x: u16, y: u16 },
    MouseUp { x: u16, y: u16 },
    MouseDrag,
    ScrollUp,
    ScrollDown,
    /// C0 control without a dedicated meaning (BEL, SO, ...)
    Control(u8),
    Unrecognized,
}

/// Raw bytes of a directive together with its parsed form
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    pub raw: Vec<u8>,
    pub parsed: Parsed,
}

impl Output {
    pub fn new(raw: Vec<u8>, parsed: Parsed) -> Self {
        Self { raw, parsed }
    }
}

/// Decoder state machine
pub struct VtParser {
    state: ParserState,
    params: Vec<u16>,
    intermediates: Vec<u8>,
    current_param: Option<u16>,
    raw: Vec<u8>,
    utf8_needed: usize,
}

#[derive(Clone, Copy, Default, PartialEq, Debug)]
enum ParserState {
    #[default]
    Ground,
    Utf8,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    OscString,
    EscapeInOsc, // ESC received within OSC, waiting for backslash
}

impl Default for VtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VtParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            params: Vec::with_capacity(16),
            intermediates: Vec::with_capacity(4),
            current_param: None,
            raw: Vec::with_capacity(16),
            utf8_needed: 0,
        }
    }

    /// Decode a chunk of bytes. Incomplete sequences are kept for the next call.
    pub fn advance(&mut self, bytes: &[u8]) -> Vec<Output> {
        let mut out = Vec::new();
        for &byte in bytes {
            self.feed(byte, &mut out);
        }
        out
    }

    /// Feed a single byte to the decoder
    pub fn feed(&mut self, byte: u8, out: &mut Vec<Output>) {
        let in_string = matches!(self.state, ParserState::OscString | ParserState::EscapeInOsc);

        // C0 controls act immediately, even in the middle of a sequence
        if byte < 0x20 && !in_string {
            if byte == 0x1B {
                if self.state == ParserState::Utf8 {
                    self.emit(Parsed::Unrecognized, out);
                }
                self.enter_escape();
                return;
            }
            if self.state == ParserState::Utf8 {
                self.emit(Parsed::Unrecognized, out);
                self.state = ParserState::Ground;
            }
            out.push(Output::new(vec![byte], Self::control(byte)));
            return;
        }

        self.raw.push(byte);
        match self.state {
            ParserState::Ground => self.ground(byte, out),
            ParserState::Utf8 => self.utf8(byte, out),
            ParserState::Escape => self.escape(byte, out),
            ParserState::EscapeIntermediate => self.escape_intermediate(byte, out),
            ParserState::CsiEntry => self.csi_entry(byte, out),
            ParserState::CsiParam => self.csi_param(byte, out),
            ParserState::CsiIntermediate => self.csi_intermediate(byte, out),
            ParserState::OscString => self.osc_string_state(byte, out),
            ParserState::EscapeInOsc => self.escape_in_osc(byte, out),
        }
    }

    fn control(byte: u8) -> Parsed {
        match byte {
            0x08 => Parsed::Backspace,
            0x09 => Parsed::Tab,
            0x0A | 0x0B | 0x0C => Parsed::LineFeed,
            0x0D => Parsed::CarriageReturn,
            _ => Parsed::Control(byte),
        }
    }

    /// Push the accumulated raw bytes as one event and return to ground
    fn emit(&mut self, parsed: Parsed, out: &mut Vec<Output>) {
        out.push(Output::new(std::mem::take(&mut self.raw), parsed));
        self.state = ParserState::Ground;
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.params.clear();
        self.intermediates.clear();
        self.current_param = None;
        self.raw.clear();
        self.raw.push(0x1B);
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            0x20..=0x7E => self.emit_char(byte as char, out),
            0x7F => self.emit(Parsed::Control(byte), out),
            0xC0..=0xDF => self.begin_utf8(1),
            0xE0..=0xEF => self.begin_utf8(2),
            0xF0..=0xF7 => self.begin_utf8(3),
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn begin_utf8(&mut self, continuation_bytes: usize) {
        self.utf8_needed = continuation_bytes;
        self.state = ParserState::Utf8;
    }

    fn utf8(&mut self, byte: u8, out: &mut Vec<Output>) {
        if byte & 0xC0 != 0x80 {
            // Cut short: report what came before, then start over with this byte
            self.raw.pop();
            self.emit(Parsed::Unrecognized, out);
            self.raw.push(byte);
            self.ground(byte, out);
            return;
        }
        self.utf8_needed -= 1;
        if self.utf8_needed > 0 {
            return;
        }
        match std::str::from_utf8(&self.raw).ok().and_then(|s| s.chars().next()) {
            Some(ch) => self.emit_char(ch, out),
            None => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn emit_char(&mut self, ch: char, out: &mut Vec<Output>) {
        // zero-width code points have no cell of their own
        let parsed = match ch.width() {
            Some(w) if w > 0 => Parsed::Char(ch),
            _ => Parsed::Unrecognized,
        };
        self.emit(parsed, out);
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            b'[' => {
                self.state = ParserState::CsiEntry;
                self.params.clear();
                self.intermediates.clear();
                self.current_param = None;
            }
            b']' | b'P' | b'_' | b'^' => {
                // OSC, DCS, APC and PM strings are skipped whole
                self.state = ParserState::OscString;
            }
            b'7' => self.emit(Parsed::SaveCursor, out),
            b'8' => self.emit(Parsed::RestoreCursor, out),
            b'D' => self.emit(Parsed::LineFeed, out),
            b'E' => {
                out.push(Output::new(Vec::new(), Parsed::CarriageReturn));
                self.emit(Parsed::LineFeed, out);
            }
            b'M' => self.emit(
                Parsed::CursorMove {
                    direction: Direction::Up,
                    n: 1,
                },
                out,
            ),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn escape_intermediate(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            0x20..=0x2F => self.intermediates.push(byte),
            // charset selections and the like
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn csi_entry(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            b'0'..=b'9' => {
                self.current_param = Some((byte - b'0') as u16);
                self.state = ParserState::CsiParam;
            }
            b';' => {
                self.params.push(0);
                self.state = ParserState::CsiParam;
            }
            b'?' | b'>' | b'!' | b'=' | b'<' => {
                self.intermediates.push(byte);
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => self.execute_csi(byte, out),
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn csi_param(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            b'0'..=b'9' => {
                let digit = (byte - b'0') as u16;
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            b';' | b':' => {
                self.params.push(self.current_param.unwrap_or(0));
                self.current_param = None;
            }
            0x20..=0x2F => {
                if let Some(p) = self.current_param.take() {
                    self.params.push(p);
                }
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => {
                if let Some(p) = self.current_param.take() {
                    self.params.push(p);
                }
                self.execute_csi(byte, out);
            }
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn csi_intermediate(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            0x20..=0x2F => self.intermediates.push(byte),
            // no CSI with intermediates is interpreted
            _ => self.emit(Parsed::Unrecognized, out),
        }
    }

    fn osc_string_state(&mut self, byte: u8, out: &mut Vec<Output>) {
        match byte {
            // 0x9C is not ST here: it is also a UTF-8 continuation byte
            0x07 => self.emit(Parsed::Unrecognized, out),
            0x1B => self.state = ParserState::EscapeInOsc,
            _ => {}
        }
    }

    fn escape_in_osc(&mut self, byte: u8, out: &mut Vec<Output>) {
        if byte == b'\\' {
            self.emit(Parsed::Unrecognized, out);
        } else {
            // Not ST: close the string and treat the byte as a fresh escape
            self.raw.pop();
            self.raw.pop();
            self.emit(Parsed::Unrecognized, out);
            self.enter_escape();
            self.raw.push(byte);
            self.escape(byte, out);
        }
    }

    fn execute_csi(&mut self, final_byte: u8, out: &mut Vec<Output>) {
        let plain = self.intermediates.is_empty();
        let first = self.params.first().copied();
        let count = first.unwrap_or(1).max(1);
        let mv = |direction| Parsed::CursorMove { direction, n: count };

        let parsed = match (plain, final_byte) {
            (true, b'A') => mv(Direction::Up),
            (true, b'B') | (true, b'e') => mv(Direction::Down),
            (true, b'C') | (true, b'a') => mv(Direction::Right),
            (true, b'D') => mv(Direction::Left),
            (true, b'E') => {
                out.push(Output::new(Vec::new(), Parsed::CarriageReturn));
                mv(Direction::Down)
            }
            (true, b'F') => {
                out.push(Output::new(Vec::new(), Parsed::CarriageReturn));
                mv(Direction::Up)
            }
            (true, b'G') | (true, b'`') => Parsed::CursorPosition {
                row: None,
                col: Some(count - 1),
            },
            (true, b'd') => Parsed::CursorPosition {
                row: Some(count - 1),
                col: None,
            },
            (true, b'H') | (true, b'f') => Parsed::CursorPosition {
                row: Some(first.unwrap_or(1).max(1) - 1),
                col: Some(self.params.get(1).copied().unwrap_or(1).max(1) - 1),
            },
            (true, b'J') => Parsed::EraseInDisplay(first.unwrap_or(0)),
            (true, b'K') => Parsed::EraseInLine(first.unwrap_or(0)),
            (true, b'm') => Parsed::Sgr(self.params.clone()),
            (true, b's') => Parsed::SaveCursor,
            (true, b'u') => Parsed::RestoreCursor,
            _ => {
                tracing::debug!(
                    "Unknown CSI: intermediates={:?}, params={:?}, final={:?}",
                    self.intermediates,
                    self.params,
                    final_byte as char
                );
                Parsed::Unrecognized
            }
        };

        self.emit(parsed, out);
    }
}
