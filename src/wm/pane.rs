//! Pane - A single terminal pane within the layout tree

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use parking_lot::Mutex;

use super::layout::{LayoutError, Rect};
use crate::core::session::{Session, SessionEvent};
use crate::core::term::VTerm;
use crate::ui::renderer::{spawn_render_pipe, RenderCommand};

/// Unique identifier for a pane
pub type PaneId = u64;

/// What the render pipe needs to place a pane's output on screen. Shared
/// with the pipe thread so it always reads a consistent rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PaneView {
    pub rect: Rect,
    pub selected: bool,
    /// Set once the pane is closed; the pipe drops everything after that
    pub closed: bool,
}

/// A single pane containing a terminal session
pub struct Pane {
    pub id: PaneId,
    pub vterm: VTerm,
    selected: bool,
    rect: Rect,
    view: Arc<Mutex<PaneView>>,
    /// Bytes bound for the shell
    input: Sender<Vec<u8>>,
    session: Option<Session>,
}

impl Pane {
    pub fn new(
        id: PaneId,
        vterm: VTerm,
        view: Arc<Mutex<PaneView>>,
        input: Sender<Vec<u8>>,
        session: Option<Session>,
    ) -> Self {
        Self {
            id,
            vterm,
            selected: false,
            rect: Rect::default(),
            view,
            input,
            session,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        self.view.lock().selected = selected;
    }

    #[cfg(test)]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Move the pane to a new rectangle. The terminal and the pty are
    /// reshaped and the pane repainted when the rectangle changed.
    pub fn apply_geometry(&mut self, rect: Rect, force: bool) {
        if rect == self.rect && !force {
            return;
        }
        self.rect = rect;
        self.view.lock().rect = rect;

        if let Err(e) = self.vterm.reshape(rect.w, rect.h) {
            tracing::debug!(pane = self.id, "reshape rejected: {}", e);
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.resize(rect.w, rect.h) {
                tracing::warn!(pane = self.id, "pty resize failed: {}", e);
            }
        }
        self.vterm.repaint();
        if self.selected {
            self.vterm.refresh_cursor();
        }
    }

    /// Forward bytes to the shell
    pub fn handle_stdin(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.input.send(bytes.to_vec()).is_err() {
            tracing::debug!(pane = self.id, "input dropped, shell is gone");
        }
    }
}

impl Drop for Pane {
    fn drop(&mut self) {
        self.view.lock().closed = true;
    }
}

/// Creates panes for the window manager
pub trait PaneSpawner {
    fn spawn(&mut self, id: PaneId, width: u16, height: u16) -> Result<Pane, LayoutError>;
}

/// Spawns a shell in a pty for every pane
pub struct ShellSpawner<E> {
    shell: Option<String>,
    scrollback_limit: usize,
    compositor: Sender<RenderCommand>,
    events: Sender<E>,
}

impl<E> ShellSpawner<E> {
    pub fn new(
        shell: Option<String>,
        scrollback_limit: usize,
        compositor: Sender<RenderCommand>,
        events: Sender<E>,
    ) -> Self {
        Self {
            shell,
            scrollback_limit,
            compositor,
            events,
        }
    }
}

impl<E> PaneSpawner for ShellSpawner<E>
where
    E: From<SessionEvent> + Send + 'static,
{
    fn spawn(&mut self, id: PaneId, width: u16, height: u16) -> Result<Pane, LayoutError> {
        let (width, height) = (width.max(1), height.max(1));
        let (vt_tx, vt_rx) = mpsc::channel();
        let vterm = VTerm::new(width, height, self.scrollback_limit, vt_tx)
            .map_err(|e| LayoutError::Spawn(e.to_string()))?;

        let view = Arc::new(Mutex::new(PaneView::default()));
        spawn_render_pipe(id, view.clone(), vt_rx, self.compositor.clone());

        let (input_tx, input_rx) = mpsc::channel();
        let session = Session::start(
            id,
            width,
            height,
            self.shell.as_deref(),
            vterm.clone(),
            input_rx,
            self.events.clone(),
        )
        .map_err(|e| LayoutError::Spawn(e.to_string()))?;

        tracing::info!(pane = id, width, height, "pane spawned");
        Ok(Pane::new(id, vterm, view, input_tx, Some(session)))
    }
}
