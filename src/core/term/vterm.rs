//! Virtual terminal
//!
//! `VTerm` sits between a pane's decoded output stream and the renderer.
//! It owns the pane's grid behind a lock and forwards every change as a
//! `VtOutput` on its channel. Clones share the same grid and channel, so the
//! session's consumption loop and the window manager can both hold one.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::cell::Cursor;
use super::parser::Parsed;
use super::state::{Grid, VtOutput};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VtError {
    #[error("Invalid terminal geometry: {width}x{height}")]
    InvalidGeometry { width: u16, height: u16 },
}

#[derive(Clone)]
pub struct VTerm {
    grid: Arc<Mutex<Grid>>,
    out: Sender<VtOutput>,
}

impl VTerm {
    pub fn new(
        width: u16,
        height: u16,
        scrollback_limit: usize,
        out: Sender<VtOutput>,
    ) -> Result<Self, VtError> {
        check_geometry(width, height)?;
        Ok(Self {
            grid: Arc::new(Mutex::new(Grid::new(width, height, scrollback_limit))),
            out,
        })
    }

    /// Safely update the terminal's width and height. Rejected sizes leave
    /// the previous geometry in place.
    pub fn reshape(&self, width: u16, height: u16) -> Result<(), VtError> {
        check_geometry(width, height)?;
        self.grid.lock().reshape(width, height);
        Ok(())
    }

    /// Apply one parsed directive and forward the resulting changes
    pub fn consume(&self, parsed: &Parsed) {
        let mut changes = Vec::new();
        self.grid.lock().consume(parsed, &mut changes);
        self.send(changes);
    }

    /// Apply a batch of directives under a single lock
    pub fn consume_all<'a>(&self, events: impl IntoIterator<Item = &'a Parsed>) {
        let mut changes = Vec::new();
        {
            let mut grid = self.grid.lock();
            for parsed in events {
                grid.consume(parsed, &mut changes);
            }
        }
        self.send(changes);
    }

    /// Send every non-empty visible cell from scratch
    pub fn redraw_window(&self) {
        let mut changes = Vec::new();
        self.grid.lock().visible_cells(&mut changes);
        self.send(changes);
    }

    /// Clear the pane area, then redraw it
    pub fn repaint(&self) {
        self.send(vec![VtOutput::Clear]);
        self.redraw_window();
    }

    /// Scroll back one page
    pub fn scrollback_up(&self) {
        self.scroll_pages(1);
    }

    /// Scroll forward one page
    pub fn scrollback_down(&self) {
        self.scroll_pages(-1);
    }

    fn scroll_pages(&self, pages: isize) {
        let mut changes = Vec::new();
        {
            let mut grid = self.grid.lock();
            let page = grid.height() as isize;
            grid.scroll_view(pages * page, &mut changes);
        }
        self.send(changes);
    }

    /// Return to the live screen if the view is scrolled back
    pub fn scroll_to_bottom(&self) {
        let mut changes = Vec::new();
        {
            let mut grid = self.grid.lock();
            let offset = grid.scroll_offset() as isize;
            grid.scroll_view(-offset, &mut changes);
        }
        self.send(changes);
    }

    /// Report the current cursor position to the renderer
    pub fn refresh_cursor(&self) {
        let cursor = self.cursor();
        self.send(vec![VtOutput::Cursor(cursor)]);
    }

    pub fn cursor(&self) -> Cursor {
        self.grid.lock().cursor()
    }

    #[cfg(test)]
    pub fn size(&self) -> (u16, u16) {
        let grid = self.grid.lock();
        (grid.width(), grid.height())
    }

    #[cfg(test)]
    pub fn scroll_offset(&self) -> usize {
        self.grid.lock().scroll_offset()
    }

    fn send(&self, changes: Vec<VtOutput>) {
        for change in changes {
            // receiver is gone once the pane is closing
            if self.out.send(change).is_err() {
                break;
            }
        }
    }
}

fn check_geometry(width: u16, height: u16) -> Result<(), VtError> {
    if width == 0 || height == 0 {
        return Err(VtError::InvalidGeometry { width, height });
    }
    Ok(())
}
