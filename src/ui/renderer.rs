//! Terminal renderer using crossterm
//!
//! Each pane owns a render pipe thread that turns its terminal's
//! pane-relative output into screen-absolute `RenderCommand`s. A single
//! compositor drains those commands and writes escape sequences to the host.

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use parking_lot::Mutex;

use crate::core::term::cell::{AttrFlags, Char, Style};
use crate::core::term::VtOutput;
use crate::wm::layout::Rect;
use crate::wm::pane::{PaneId, PaneView};

/// One drawing instruction in screen coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderCommand {
    Cell { x: u16, y: u16, ch: Char },
    /// Blank a rectangle
    Clear(Rect),
    /// Separator line between two panes
    Separator { x: u16, y: u16, len: u16, vertical: bool },
    /// Place the host cursor
    Cursor { x: u16, y: u16 },
}

/// Translate one pane-relative change using the pane's current view.
/// Cells outside the pane are dropped; the cursor only follows the focused
/// pane.
pub fn translate_output(view: &PaneView, output: VtOutput) -> Option<RenderCommand> {
    if view.closed {
        return None;
    }
    let rect = view.rect;
    match output {
        VtOutput::Char(ch) => {
            let (x, y) = (ch.cursor.x, ch.cursor.y);
            (x < rect.w && y < rect.h).then_some(RenderCommand::Cell {
                x: rect.x + x,
                y: rect.y + y,
                ch,
            })
        }
        VtOutput::Clear => (!rect.is_empty()).then_some(RenderCommand::Clear(rect)),
        VtOutput::Cursor(cursor) => {
            let visible = view.selected && cursor.x < rect.w && cursor.y < rect.h;
            visible.then_some(RenderCommand::Cursor {
                x: rect.x + cursor.x,
                y: rect.y + cursor.y,
            })
        }
    }
}

/// Forward a pane's terminal output to the compositor until either side
/// hangs up or the pane is closed
pub fn spawn_render_pipe(
    id: PaneId,
    view: Arc<Mutex<PaneView>>,
    output: Receiver<VtOutput>,
    compositor: Sender<RenderCommand>,
) {
    thread::spawn(move || {
        for change in output {
            let snapshot = *view.lock();
            if snapshot.closed {
                break;
            }
            if let Some(command) = translate_output(&snapshot, change) {
                if compositor.send(command).is_err() {
                    break;
                }
            }
        }
        tracing::debug!(pane = id, "render pipe finished");
    });
}

/// Writes render commands to a host terminal stream
pub struct Compositor<W: Write> {
    out: W,
    style: Option<Style>,
    cursor: Option<(u16, u16)>,
}

impl<W: Write> Compositor<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            style: None,
            cursor: None,
        }
    }

    /// Draw commands as they arrive, flushing whenever the queue drains.
    /// Returns when every sender is gone.
    pub fn run(mut self, commands: Receiver<RenderCommand>) -> io::Result<()> {
        while let Ok(first) = commands.recv() {
            self.apply(first)?;
            for command in commands.try_iter() {
                self.apply(command)?;
            }
            self.flush()?;
        }
        Ok(())
    }

    pub fn apply(&mut self, command: RenderCommand) -> io::Result<()> {
        match command {
            RenderCommand::Cell { x, y, ch } => {
                self.set_style(ch.cursor.style)?;
                queue!(self.out, MoveTo(x, y), Print(ch.display_char()))?;
            }
            RenderCommand::Clear(rect) => {
                self.set_style(Style::default())?;
                let blank = " ".repeat(rect.w as usize);
                for row in rect.y..rect.y + rect.h {
                    queue!(self.out, MoveTo(rect.x, row), Print(&blank))?;
                }
            }
            RenderCommand::Separator { x, y, len, vertical } => {
                self.set_style(Style::default())?;
                if vertical {
                    for row in y..y + len {
                        queue!(self.out, MoveTo(x, row), Print('│'))?;
                    }
                } else {
                    let line = "─".repeat(len as usize);
                    queue!(self.out, MoveTo(x, y), Print(line))?;
                }
            }
            RenderCommand::Cursor { x, y } => self.cursor = Some((x, y)),
        }
        Ok(())
    }

    /// Park the host cursor and push everything out
    pub fn flush(&mut self) -> io::Result<()> {
        match self.cursor {
            Some((x, y)) => queue!(self.out, MoveTo(x, y), Show)?,
            None => queue!(self.out, Hide)?,
        }
        self.out.flush()
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        if self.style == Some(style) {
            return Ok(());
        }
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;

        let flags = [
            (AttrFlags::BOLD, Attribute::Bold),
            (AttrFlags::DIM, Attribute::Dim),
            (AttrFlags::ITALIC, Attribute::Italic),
            (AttrFlags::UNDERLINE, Attribute::Underlined),
            (AttrFlags::BLINK, Attribute::SlowBlink),
            (AttrFlags::INVERSE, Attribute::Reverse),
            (AttrFlags::HIDDEN, Attribute::Hidden),
            (AttrFlags::STRIKETHROUGH, Attribute::CrossedOut),
        ];
        for (flag, attribute) in flags {
            if style.flags.contains(flag) {
                queue!(self.out, SetAttribute(attribute))?;
            }
        }

        let fg = style.fg.to_crossterm();
        if fg != crossterm::style::Color::Reset {
            queue!(self.out, SetForegroundColor(fg))?;
        }
        let bg = style.bg.to_crossterm();
        if bg != crossterm::style::Color::Reset {
            queue!(self.out, SetBackgroundColor(bg))?;
        }

        self.style = Some(style);
        Ok(())
    }
}

/// Raw-mode, alternate-screen session on the host terminal
pub struct HostTerminal {
    initialized: bool,
}

impl HostTerminal {
    /// Initialize the terminal for rendering
    pub fn init() -> io::Result<Self> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            crossterm::event::EnableMouseCapture,
            crossterm::event::EnableBracketedPaste,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        tracing::debug!("host terminal initialized");

        Ok(Self { initialized: true })
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        let _ = execute!(
            stdout,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Show,
            EnableLineWrap,
            crossterm::event::DisableBracketedPaste,
            crossterm::event::DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = stdout.flush();

        terminal::disable_raw_mode()
    }
}

impl Drop for HostTerminal {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
