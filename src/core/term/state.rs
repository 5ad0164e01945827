//! Terminal grid state
//!
//! The grid is one growing sequence of rows: the last `height` rows are the
//! live screen, everything before them is scrollback. Mutations report what
//! changed as `VtOutput` values so the owner can forward them to a renderer
//! after releasing its lock.

use unicode_width::UnicodeWidthChar;

use super::cell::{Char, Cursor};
use super::parser::{Direction, Parsed};

/// Default number of rows kept above the live screen
pub const DEFAULT_SCROLLBACK: usize = 10_000;

const TAB_STOP: u16 = 8;

/// Change notification produced by the grid
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VtOutput {
    /// A cell to paint, positioned relative to the pane
    Char(Char),
    /// New cursor position for the host cursor
    Cursor(Cursor),
    /// The whole pane area must be blanked before the cells that follow
    Clear,
}

/// Character grid with scrollback
pub struct Grid {
    width: u16,
    height: u16,
    rows: Vec<Vec<Char>>,
    cursor: Cursor,
    saved: Option<(u16, u16)>,
    /// 0 = live screen, >0 = number of rows scrolled back
    scroll_offset: usize,
    scrollback_limit: usize,
}

impl Grid {
    /// Caller guarantees `width > 0 && height > 0`
    pub fn new(width: u16, height: u16, scrollback_limit: usize) -> Self {
        Self {
            width,
            height,
            rows: (0..height).map(|_| Self::blank_row(width)).collect(),
            cursor: Cursor::default(),
            saved: None,
            scroll_offset: 0,
            scrollback_limit,
        }
    }

    fn blank_row(width: u16) -> Vec<Char> {
        (0..width).map(|x| Char::blank(x, 0)).collect()
    }

    #[cfg(test)]
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Number of rows above the live screen
    pub fn scrollback_depth(&self) -> usize {
        self.rows.len().saturating_sub(self.height as usize)
    }

    /// Index into `rows` of live screen row `y`
    fn live_row(&self, y: u16) -> usize {
        self.scrollback_depth() + y as usize
    }

    /// Cell at a live screen position, if it has been allocated
    #[cfg(test)]
    pub fn cell(&self, x: u16, y: u16) -> Option<&Char> {
        self.rows.get(self.live_row(y))?.get(x as usize)
    }

    fn is_live(&self) -> bool {
        self.scroll_offset == 0
    }

    /// Update the declared size. Stored rows are not reallocated; they grow
    /// lazily on write and are truncated on redraw.
    pub fn reshape(&mut self, width: u16, height: u16) {
        let cursor_row = self.live_row(self.cursor.y);

        // Shrinking: drop blank rows below the cursor instead of pushing
        // content into scrollback
        while self.rows.len() > cursor_row + 1
            && self.rows.len() > height as usize
            && self.rows.last().map_or(false, |row| row.iter().all(Char::is_empty))
        {
            self.rows.pop();
        }
        while self.rows.len() < height as usize {
            self.rows.push(Self::blank_row(width));
        }

        self.width = width;
        self.height = height;

        let top = self.scrollback_depth();
        self.cursor.y = cursor_row
            .saturating_sub(top)
            .min(height as usize - 1) as u16;
        self.cursor.x = self.cursor.x.min(width - 1);
        self.scroll_offset = self.scroll_offset.min(self.scrollback_depth());
    }

    /// Apply one parsed directive. Unknown directives are ignored.
    pub fn consume(&mut self, parsed: &Parsed, out: &mut Vec<VtOutput>) {
        match parsed {
            Parsed::Char(ch) => self.put_char(*ch, out),
            Parsed::CursorMove { direction, n } => self.cursor_move(*direction, *n),
            Parsed::CursorPosition { row, col } => {
                if let Some(row) = row {
                    self.cursor.y = (*row).min(self.height - 1);
                }
                if let Some(col) = col {
                    self.cursor.x = (*col).min(self.width - 1);
                }
            }
            Parsed::CarriageReturn => self.cursor.x = 0,
            Parsed::LineFeed => self.linefeed(out),
            Parsed::Backspace => self.cursor.x = self.cursor.x.saturating_sub(1),
            Parsed::Tab => {
                self.cursor.x = ((self.cursor.x / TAB_STOP + 1) * TAB_STOP).min(self.width - 1);
            }
            Parsed::EraseInLine(mode) => self.erase_in_line(*mode, out),
            Parsed::EraseInDisplay(mode) => self.erase_in_display(*mode, out),
            Parsed::Sgr(params) => self.cursor.style.apply_sgr(params),
            Parsed::SaveCursor => self.saved = Some((self.cursor.x, self.cursor.y)),
            Parsed::RestoreCursor => {
                if let Some((x, y)) = self.saved {
                    self.cursor.x = x.min(self.width - 1);
                    self.cursor.y = y.min(self.height - 1);
                }
            }
            Parsed::ScrollUp => self.scroll_view(1, out),
            Parsed::ScrollDown => self.scroll_view(-1, out),
            Parsed::MouseDown { .. }
            | Parsed::MouseUp { .. }
            | Parsed::MouseDrag
            | Parsed::Control(_)
            | Parsed::Unrecognized => {}
        }
    }

    /// Write a character at the cursor and advance, wrapping at the right edge
    pub fn put_char(&mut self, ch: char, out: &mut Vec<VtOutput>) {
        let cell_width = ch.width().unwrap_or(1).clamp(1, 2) as u16;

        // A wide character that does not fit wraps first
        if cell_width > 1 && self.cursor.x + cell_width > self.width && self.cursor.x > 0 {
            self.cursor.x = 0;
            self.linefeed(out);
        }

        let (x, y) = (self.cursor.x, self.cursor.y);
        let live = self.is_live();
        let index = self.live_row(y);
        let row = &mut self.rows[index];
        let last = if cell_width > 1 && x + 1 < self.width { x + 1 } else { x };
        if row.len() <= last as usize {
            let start = row.len() as u16;
            row.extend((start..=last).map(|col| Char::blank(col, y)));
        }

        let mut cleared = Vec::new();
        // Overwriting the right half of a wide rune orphans its left half
        if x > 0 && row[x as usize].is_empty() && is_wide(&row[x as usize - 1]) {
            cleared.push(x - 1);
        }
        // The cell under the right half of a wide rune stays empty
        if last > x {
            cleared.push(last);
        }
        for col in cleared {
            let blank = Char::blank(col, y);
            row[col as usize] = blank;
            if live {
                out.push(VtOutput::Char(blank));
            }
        }

        let written = Char::new(ch, self.cursor);
        row[x as usize] = written;
        if live {
            out.push(VtOutput::Char(written));
        }

        self.cursor.x += cell_width;
        if self.cursor.x >= self.width {
            self.cursor.x = 0;
            self.linefeed(out);
        }
    }

    fn cursor_move(&mut self, direction: Direction, n: u16) {
        match direction {
            Direction::Up => self.cursor.y = self.cursor.y.saturating_sub(n),
            Direction::Down => {
                self.cursor.y = self.cursor.y.saturating_add(n).min(self.height - 1);
            }
            Direction::Left => self.cursor.x = self.cursor.x.saturating_sub(n),
            Direction::Right => {
                self.cursor.x = self.cursor.x.saturating_add(n).min(self.width - 1);
            }
        }
    }

    /// Move down one row, scrolling the screen at the bottom edge
    fn linefeed(&mut self, out: &mut Vec<VtOutput>) {
        if self.cursor.y + 1 < self.height {
            self.cursor.y += 1;
            return;
        }

        self.rows.push(Self::blank_row(self.width));
        let max_rows = self.height as usize + self.scrollback_limit;
        if self.rows.len() > max_rows {
            let excess = self.rows.len() - max_rows;
            self.rows.drain(..excess);
        }

        if self.is_live() {
            self.redraw(out);
        } else {
            // keep the rows being viewed in place
            self.scroll_offset = (self.scroll_offset + 1).min(self.scrollback_depth());
        }
    }

    fn erase_in_line(&mut self, mode: u16, out: &mut Vec<VtOutput>) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        let range = match mode {
            0 => x..self.width,
            1 => 0..x + 1,
            2 => 0..self.width,
            _ => return,
        };
        self.blank_cells(y, range, out);
    }

    fn erase_in_display(&mut self, mode: u16, out: &mut Vec<VtOutput>) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        match mode {
            0 => {
                self.blank_cells(y, x..self.width, out);
                for row in y + 1..self.height {
                    self.blank_cells(row, 0..self.width, out);
                }
            }
            1 => {
                for row in 0..y {
                    self.blank_cells(row, 0..self.width, out);
                }
                self.blank_cells(y, 0..x + 1, out);
            }
            2 | 3 => {
                for row in 0..self.height {
                    let index = self.live_row(row);
                    self.rows[index] = Self::blank_row(self.width);
                }
                if self.is_live() {
                    out.push(VtOutput::Clear);
                }
            }
            _ => {}
        }
    }

    fn blank_cells(&mut self, y: u16, cols: std::ops::Range<u16>, out: &mut Vec<VtOutput>) {
        let live = self.is_live();
        let index = self.live_row(y);
        let row = &mut self.rows[index];
        for x in cols {
            if let Some(cell) = row.get_mut(x as usize) {
                *cell = Char::blank(x, y);
            }
            if live {
                out.push(VtOutput::Char(Char::blank(x, y)));
            }
        }
    }

    /// Move the scrollback view; positive deltas look further back
    pub fn scroll_view(&mut self, delta: isize, out: &mut Vec<VtOutput>) {
        let target = if delta >= 0 {
            self.scroll_offset.saturating_add(delta as usize)
        } else {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        };
        let target = target.min(self.scrollback_depth());
        if target != self.scroll_offset {
            self.scroll_offset = target;
            self.redraw(out);
        }
    }

    /// Emit a clear followed by every visible non-empty cell
    pub fn redraw(&self, out: &mut Vec<VtOutput>) {
        out.push(VtOutput::Clear);
        self.visible_cells(out);
    }

    /// Every non-empty cell of the visible window, positioned by visible row
    pub fn visible_cells(&self, out: &mut Vec<VtOutput>) {
        let end = self.rows.len() - self.scroll_offset;
        let start = end.saturating_sub(self.height as usize);

        for (y, row) in self.rows[start..end].iter().enumerate() {
            for (x, ch) in row.iter().enumerate() {
                // truncate characters past the width
                if x >= self.width as usize {
                    break;
                }
                if !ch.is_empty() {
                    let mut cell = *ch;
                    cell.cursor.x = x as u16;
                    cell.cursor.y = y as u16;
                    out.push(VtOutput::Char(cell));
                }
            }
        }
    }
}

fn is_wide(cell: &Char) -> bool {
    !cell.is_empty() && cell.rune.width() == Some(2)
}
