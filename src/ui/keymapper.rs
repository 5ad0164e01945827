//! Key mapping for host input
//!
//! Converts crossterm events into `HostEvent`s: a human-readable chord name
//! used for bindings, the bytes a shell would expect, and the parsed form
//! the input router matches on.

use bitflags::bitflags;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::core::term::{Direction, Parsed};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// One decoded host input event
#[derive(Clone, Debug, PartialEq)]
pub struct HostEvent {
    /// Chord name such as `Ctrl+B`, `Alt+R`, `Up` or `%`
    pub human: String,
    /// Bytes to forward to a shell when nothing else handles the event
    pub raw: Vec<u8>,
    pub parsed: Parsed,
}

/// Translate a host event. Returns `None` for events the router has no use
/// for (key releases, focus changes, resizes, unsupported mouse buttons).
pub fn translate(event: &Event) -> Option<HostEvent> {
    match event {
        Event::Key(key) => {
            if key.kind == KeyEventKind::Release {
                return None;
            }
            Some(HostEvent {
                human: KeyMapper::human(key)?,
                raw: KeyMapper::map_key(key),
                parsed: KeyMapper::parse_key(key),
            })
        }
        Event::Mouse(mouse) => KeyMapper::map_mouse(mouse).map(|parsed| HostEvent {
            human: String::new(),
            raw: Vec::new(),
            parsed,
        }),
        Event::Paste(text) => Some(HostEvent {
            human: String::new(),
            raw: text.as_bytes().to_vec(),
            parsed: Parsed::Unrecognized,
        }),
        _ => None,
    }
}

/// Key mapper for converting key events to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to bytes for the pty
    pub fn map_key(event: &KeyEvent) -> Vec<u8> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, mods),
            KeyCode::Enter => vec![0x0D],
            KeyCode::Backspace => {
                if mods.contains(Modifiers::ALT) {
                    vec![0x1B, 0x7F]
                } else {
                    vec![0x7F]
                }
            }
            KeyCode::Tab => vec![0x09],
            KeyCode::BackTab => b"\x1b[Z".to_vec(),
            KeyCode::Esc => vec![0x1B],

            KeyCode::Up => Self::special_key(b'A', mods),
            KeyCode::Down => Self::special_key(b'B', mods),
            KeyCode::Right => Self::special_key(b'C', mods),
            KeyCode::Left => Self::special_key(b'D', mods),

            KeyCode::Home => Self::special_key(b'H', mods),
            KeyCode::End => Self::special_key(b'F', mods),
            KeyCode::PageUp => Self::tilde_key(5, mods),
            KeyCode::PageDown => Self::tilde_key(6, mods),
            KeyCode::Insert => Self::tilde_key(2, mods),
            KeyCode::Delete => Self::tilde_key(3, mods),

            KeyCode::F(n) => Self::function_key(n, mods),

            _ => Vec::new(),
        }
    }

    /// Parsed form of a key press
    pub fn parse_key(event: &KeyEvent) -> Parsed {
        let mods = Modifiers::from(event.modifiers);
        let direction = match event.code {
            KeyCode::Up => Some(Direction::Up),
            KeyCode::Down => Some(Direction::Down),
            KeyCode::Left => Some(Direction::Left),
            KeyCode::Right => Some(Direction::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            return Parsed::CursorMove { direction, n: 1 };
        }

        match event.code {
            KeyCode::Char(ch) if !mods.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                Parsed::Char(ch)
            }
            KeyCode::Char(_) => match Self::map_key(event).as_slice() {
                [byte] if *byte < 0x20 => Parsed::Control(*byte),
                _ => Parsed::Unrecognized,
            },
            KeyCode::Enter => Parsed::CarriageReturn,
            KeyCode::Backspace => Parsed::Backspace,
            KeyCode::Tab => Parsed::Tab,
            KeyCode::Esc => Parsed::Control(0x1B),
            _ => Parsed::Unrecognized,
        }
    }

    /// Chord name used by key bindings. Letters under Ctrl or Alt are
    /// upper-cased (`Ctrl+B`); plain characters are their own name.
    pub fn human(event: &KeyEvent) -> Option<String> {
        let mods = Modifiers::from(event.modifiers);
        let name = match event.code {
            KeyCode::Char(ch) => {
                if mods.intersects(Modifiers::CTRL | Modifiers::ALT) {
                    ch.to_ascii_uppercase().to_string()
                } else {
                    return Some(ch.to_string());
                }
            }
            KeyCode::Enter => "Enter".into(),
            KeyCode::Backspace => "Backspace".into(),
            KeyCode::Tab => "Tab".into(),
            KeyCode::BackTab => "BackTab".into(),
            KeyCode::Esc => "Esc".into(),
            KeyCode::Up => "Up".into(),
            KeyCode::Down => "Down".into(),
            KeyCode::Left => "Left".into(),
            KeyCode::Right => "Right".into(),
            KeyCode::Home => "Home".into(),
            KeyCode::End => "End".into(),
            KeyCode::PageUp => "PageUp".into(),
            KeyCode::PageDown => "PageDown".into(),
            KeyCode::Insert => "Insert".into(),
            KeyCode::Delete => "Delete".into(),
            KeyCode::F(n) => format!("F{}", n),
            _ => return None,
        };

        let mut human = String::new();
        if mods.contains(Modifiers::CTRL) {
            human.push_str("Ctrl+");
        }
        if mods.contains(Modifiers::ALT) {
            human.push_str("Alt+");
        }
        if mods.contains(Modifiers::SHIFT) && !matches!(event.code, KeyCode::Char(_)) {
            human.push_str("Shift+");
        }
        human.push_str(&name);
        Some(human)
    }

    /// Mouse events the router acts on; coordinates are 0-based
    pub fn map_mouse(event: &MouseEvent) -> Option<Parsed> {
        let (x, y) = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Parsed::MouseDown { x, y }),
            MouseEventKind::Up(MouseButton::Left) => Some(Parsed::MouseUp { x, y }),
            MouseEventKind::Drag(MouseButton::Left) => Some(Parsed::MouseDrag),
            MouseEventKind::ScrollUp => Some(Parsed::ScrollUp),
            MouseEventKind::ScrollDown => Some(Parsed::ScrollDown),
            _ => None,
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        // Ctrl + letter = control character
        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            if ch.is_ascii_lowercase() {
                return vec![(ch as u8) - b'a' + 1];
            } else if ch.is_ascii_uppercase() {
                return vec![(ch as u8) - b'A' + 1];
            }
            match ch {
                '@' | '`' | ' ' => return vec![0x00],
                '[' => return vec![0x1B],
                '\\' => return vec![0x1C],
                ']' => return vec![0x1D],
                '^' | '~' => return vec![0x1E],
                '_' | '?' => return vec![0x1F],
                _ => {}
            }
        }

        // Ctrl + Alt + letter
        if mods.contains(Modifiers::CTRL | Modifiers::ALT) && ch.is_ascii_alphabetic() {
            let ctrl_code = (ch.to_ascii_lowercase() as u8) - b'a' + 1;
            return vec![0x1B, ctrl_code];
        }

        // Alt + key = ESC + key
        if mods.contains(Modifiers::ALT) && !mods.contains(Modifiers::CTRL) {
            let mut bytes = vec![0x1B];
            bytes.extend(ch.to_string().as_bytes());
            return bytes;
        }

        ch.to_string().into_bytes()
    }

    /// CSI letter keys (arrows, Home, End)
    fn special_key(key: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            vec![0x1B, b'[', key]
        } else {
            let mod_code = Self::modifier_code(mods);
            format!("\x1b[1;{}{}", mod_code, key as char).into_bytes()
        }
    }

    /// Tilde key sequence (PageUp, PageDown, Insert, Delete)
    fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            format!("\x1b[{}~", code).into_bytes()
        } else {
            let mod_code = Self::modifier_code(mods);
            format!("\x1b[{};{}~", code, mod_code).into_bytes()
        }
    }

    /// Function key sequence
    fn function_key(n: u8, mods: Modifiers) -> Vec<u8> {
        let code = match n {
            1..=4 => {
                let key = b"PQRS"[(n - 1) as usize];
                return if mods.is_empty() {
                    vec![0x1B, b'O', key]
                } else {
                    format!("\x1b[1;{}{}", Self::modifier_code(mods), key as char).into_bytes()
                };
            }
            5 => 15,
            6..=10 => n + 11,
            11 | 12 => n + 12,
            _ => return Vec::new(),
        };
        Self::tilde_key(code, mods)
    }

    /// Calculate xterm modifier code
    fn modifier_code(mods: Modifiers) -> u8 {
        1 + if mods.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if mods.contains(Modifiers::ALT) { 2 } else { 0 }
            + if mods.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, mods))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_char_keys() {
        let ev = translate(&key(KeyCode::Char('a'), KeyModifiers::NONE)).unwrap();
        assert_eq!(ev.human, "a");
        assert_eq!(ev.raw, b"a".to_vec());
        assert_eq!(ev.parsed, Parsed::Char('a'));

        let ev = translate(&key(KeyCode::Char('%'), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(ev.human, "%");
        assert_eq!(ev.raw, b"%".to_vec());
    }

    #[test]
    fn test_chords() {
        let ev = translate(&key(KeyCode::Char('b'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(ev.human, "Ctrl+B");
        assert_eq!(ev.raw, vec![0x02]);
        assert_eq!(ev.parsed, Parsed::Control(0x02));

        let ev = translate(&key(KeyCode::Char('r'), KeyModifiers::ALT)).unwrap();
        assert_eq!(ev.human, "Alt+R");
        assert_eq!(ev.raw, vec![0x1B, b'r']);
        assert_eq!(ev.parsed, Parsed::Unrecognized);
    }

    #[test]
    fn test_arrow_keys() {
        let ev = translate(&key(KeyCode::Up, KeyModifiers::NONE)).unwrap();
        assert_eq!(ev.human, "Up");
        assert_eq!(ev.raw, b"\x1b[A".to_vec());
        assert_eq!(
            ev.parsed,
            Parsed::CursorMove {
                direction: Direction::Up,
                n: 1
            }
        );

        let ev = translate(&key(KeyCode::Left, KeyModifiers::CONTROL)).unwrap();
        assert_eq!(ev.human, "Ctrl+Left");
        assert_eq!(ev.raw, b"\x1b[1;5D".to_vec());
    }

    #[test]
    fn test_function_keys() {
        let ev = translate(&key(KeyCode::F(1), KeyModifiers::NONE)).unwrap();
        assert_eq!(ev.raw, b"\x1bOP".to_vec());
        let ev = translate(&key(KeyCode::F(5), KeyModifiers::NONE)).unwrap();
        assert_eq!(ev.raw, b"\x1b[15~".to_vec());
        let ev = translate(&key(KeyCode::F(12), KeyModifiers::SHIFT)).unwrap();
        assert_eq!(ev.human, "Shift+F12");
        assert_eq!(ev.raw, b"\x1b[24;2~".to_vec());
    }

    #[test]
    fn test_key_release_ignored() {
        let mut release = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(translate(&Event::Key(release)), None);
    }

    #[test]
    fn test_mouse_events() {
        let ev = translate(&mouse(MouseEventKind::Down(MouseButton::Left), 5, 6)).unwrap();
        assert_eq!(ev.parsed, Parsed::MouseDown { x: 5, y: 6 });

        let ev = translate(&mouse(MouseEventKind::Up(MouseButton::Left), 40, 6)).unwrap();
        assert_eq!(ev.parsed, Parsed::MouseUp { x: 40, y: 6 });

        let ev = translate(&mouse(MouseEventKind::Drag(MouseButton::Left), 7, 6)).unwrap();
        assert_eq!(ev.parsed, Parsed::MouseDrag);

        let ev = translate(&mouse(MouseEventKind::ScrollUp, 0, 0)).unwrap();
        assert_eq!(ev.parsed, Parsed::ScrollUp);

        assert_eq!(translate(&mouse(MouseEventKind::Down(MouseButton::Right), 1, 1)), None);
        assert_eq!(translate(&mouse(MouseEventKind::Moved, 1, 1)), None);
    }

    #[test]
    fn test_paste_keeps_bytes() {
        let ev = translate(&Event::Paste("echo hi".into())).unwrap();
        assert_eq!(ev.raw, b"echo hi".to_vec());
        assert_eq!(ev.parsed, Parsed::Unrecognized);
    }
}
