//! Modal input router
//!
//! Every decoded host event runs through a fixed chain of sieves: tmux mode,
//! resize mode, mouse, configured global bindings, then passthrough to the
//! focused pane. The first sieve that consumes an event ends the chain.

use crate::config::{Action, KeyConfig};
use crate::core::term::{Direction, Parsed};
use crate::ui::keymapper::HostEvent;
use crate::wm::{LayoutError, Orientation, WindowManager};

/// Multi-key modes, updated one event at a time
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModalState {
    /// The prefix was seen; the next key is a command
    pub tmux_mode: bool,
    /// Directional keys resize the focused pane
    pub resize_mode: bool,
    /// Where the left button went down
    pub mouse_down: Option<(u16, u16)>,
}

pub struct InputRouter {
    mode: ModalState,
    keys: KeyConfig,
}

impl InputRouter {
    pub fn new(keys: KeyConfig) -> Self {
        Self {
            mode: ModalState::default(),
            keys,
        }
    }

    /// Route one event. Only `InvalidSelection` is returned; it means the
    /// tree has no focused pane and the caller cannot continue.
    pub fn handle(&mut self, wm: &mut WindowManager, event: &HostEvent) -> Result<(), LayoutError> {
        if self.tmux_sieve(wm, event)?
            || self.resize_sieve(wm, event)?
            || self.mouse_sieve(wm, event)?
            || self.config_sieve(wm, event)?
        {
            return Ok(());
        }
        passthrough(wm, event)
    }

    fn tmux_sieve(&mut self, wm: &mut WindowManager, event: &HostEvent) -> Result<bool, LayoutError> {
        if !is_key(event) {
            return Ok(false);
        }
        if !self.mode.tmux_mode {
            if event.human == self.keys.prefix {
                self.mode.tmux_mode = true;
                return Ok(true);
            }
            return Ok(false);
        }

        // One key after the prefix, bound or not
        self.mode.tmux_mode = false;
        let Some(action) = self.keys.prefix_bindings.get(&event.human).copied() else {
            tracing::debug!(key = %event.human, "unbound key after prefix");
            return Ok(true);
        };
        self.run_action(wm, action)?;
        wm.simplify();
        wm.refresh_render_rect();
        Ok(true)
    }

    fn resize_sieve(&mut self, wm: &mut WindowManager, event: &HostEvent) -> Result<bool, LayoutError> {
        if !self.mode.resize_mode || !is_key(event) {
            return Ok(false);
        }
        let direction = match event.parsed {
            Parsed::CursorMove { direction, .. } => Some(direction),
            Parsed::Char('k') => Some(Direction::Up),
            Parsed::Char('j') => Some(Direction::Down),
            Parsed::Char('h') => Some(Direction::Left),
            Parsed::Char('l') => Some(Direction::Right),
            _ => None,
        };
        match direction {
            Some(direction) => absorb(wm.resize_focused(direction, self.keys.resize_step))?,
            None => {
                tracing::debug!("leaving resize mode");
                self.mode.resize_mode = false;
            }
        }
        Ok(true)
    }

    fn mouse_sieve(&mut self, wm: &mut WindowManager, event: &HostEvent) -> Result<bool, LayoutError> {
        match event.parsed {
            Parsed::MouseDown { x, y } => {
                self.mode.mouse_down = Some((x, y));
                absorb(wm.select_at_coords(x, y))?;
            }
            Parsed::MouseUp { x, y } => {
                if let Some((x0, y0)) = self.mode.mouse_down.take() {
                    absorb(wm.drag_border(x0, y0, x, y))?;
                }
            }
            Parsed::MouseDrag => {}
            Parsed::ScrollUp => wm.focused_pane()?.vterm.scrollback_up(),
            Parsed::ScrollDown => wm.focused_pane()?.vterm.scrollback_down(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn config_sieve(&mut self, wm: &mut WindowManager, event: &HostEvent) -> Result<bool, LayoutError> {
        if !is_key(event) {
            return Ok(false);
        }
        match self.keys.global_bindings.get(&event.human).copied() {
            Some(action) => {
                self.run_action(wm, action)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn run_action(&mut self, wm: &mut WindowManager, action: Action) -> Result<(), LayoutError> {
        tracing::debug!(?action, "key binding");
        let result = match action {
            Action::SplitVertical => wm.split_selection(Orientation::Vertical),
            Action::SplitHorizontal => wm.split_selection(Orientation::Horizontal),
            Action::FocusNext => wm.focus_next(),
            Action::FocusPrev => wm.focus_prev(),
            Action::MoveLeft => wm.move_window(Direction::Left),
            Action::MoveRight => wm.move_window(Direction::Right),
            Action::MoveUp => wm.move_window(Direction::Up),
            Action::MoveDown => wm.move_window(Direction::Down),
            Action::ClosePane => wm.close_focused(),
            Action::ResizeMode => {
                self.mode.resize_mode = true;
                Ok(())
            }
            Action::ScrollUp => wm.focused_pane().map(|p| p.vterm.scrollback_up()),
            Action::ScrollDown => wm.focused_pane().map(|p| p.vterm.scrollback_down()),
        };
        absorb(result)
    }
}

/// Send the event to the focused pane's shell
fn passthrough(wm: &mut WindowManager, event: &HostEvent) -> Result<(), LayoutError> {
    let bytes: &[u8] = match event.parsed {
        Parsed::CursorMove { direction, .. } => match direction {
            Direction::Up => b"\x1bOA",
            Direction::Down => b"\x1bOB",
            Direction::Right => b"\x1bOC",
            Direction::Left => b"\x1bOD",
        },
        _ => &event.raw,
    };
    if bytes.is_empty() {
        return Ok(());
    }
    let pane = wm.focused_pane()?;
    pane.vterm.scroll_to_bottom();
    pane.handle_stdin(bytes);
    Ok(())
}

// Mouse events carry no chord name; pastes neither
fn is_key(event: &HostEvent) -> bool {
    !event.human.is_empty()
}

/// Keep `InvalidSelection`, log and drop the rest
fn absorb(result: Result<(), LayoutError>) -> Result<(), LayoutError> {
    match result {
        Err(LayoutError::InvalidSelection) => Err(LayoutError::InvalidSelection),
        Err(e) => {
            tracing::debug!(error = %e, "layout operation skipped");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;

    use crossterm::event::{
        Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };

    use super::*;
    use crate::ui::keymapper::translate;
    use crate::wm::layout::Node;
    use crate::wm::pane::testing::{Probe, TestSpawner};
    use crate::wm::pane::PaneId;

    struct Fixture {
        wm: WindowManager,
        router: InputRouter,
        probe: Rc<RefCell<Probe>>,
    }

    impl Fixture {
        fn new(width: u16, height: u16) -> Self {
            let spawner = TestSpawner::default();
            let probe = spawner.probe.clone();
            let (tx, _rx) = mpsc::channel();
            let mut wm = WindowManager::new(width, height, Box::new(spawner), tx);
            wm.add_pane().unwrap();
            Self {
                wm,
                router: InputRouter::new(KeyConfig::default()),
                probe,
            }
        }

        fn send(&mut self, event: Event) {
            let ev = translate(&event).unwrap();
            self.router.handle(&mut self.wm, &ev).unwrap();
        }

        fn press(&mut self, code: KeyCode, mods: KeyModifiers) {
            self.send(Event::Key(KeyEvent::new(code, mods)));
        }

        fn char(&mut self, ch: char) {
            self.press(KeyCode::Char(ch), KeyModifiers::NONE);
        }

        fn prefix(&mut self) {
            self.press(KeyCode::Char('b'), KeyModifiers::CONTROL);
        }

        fn mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
            self.send(Event::Mouse(MouseEvent {
                kind,
                column,
                row,
                modifiers: KeyModifiers::NONE,
            }));
        }

        fn focused(&self) -> PaneId {
            self.wm.focused_pane().map(|p| p.id).unwrap_or(0)
        }

        fn sizes(&self) -> Vec<f32> {
            self.wm
                .root()
                .and_then(Node::as_split)
                .map(|s| s.elements.iter().map(|e| e.size).collect())
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_prefix_split_horizontal() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        assert!(f.router.mode.tmux_mode);
        f.char('"');

        assert!(!f.router.mode.tmux_mode);
        assert_eq!(f.wm.pane_ids(), vec![1, 2]);
        let split = f.wm.root().and_then(Node::as_split).unwrap();
        assert!(!split.vertically_stacked);
        // neither key reached a shell
        assert!(f.probe.borrow().stdin(1).is_empty());
        assert!(f.probe.borrow().stdin(2).is_empty());
    }

    #[test]
    fn test_prefix_percent_stacks() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('%');
        let split = f.wm.root().and_then(Node::as_split).unwrap();
        assert!(split.vertically_stacked);
        assert_eq!(split.elements.len(), 2);
    }

    #[test]
    fn test_tmux_mode_exits_after_one_key() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('z');
        assert_eq!(f.router.mode, ModalState::default());
        assert!(f.probe.borrow().stdin(1).is_empty());

        f.char('z');
        assert_eq!(f.probe.borrow().stdin(1), b"z".to_vec());
    }

    #[test]
    fn test_prefix_twice_leaves_tmux_mode() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.prefix();
        assert!(!f.router.mode.tmux_mode);
        assert!(f.probe.borrow().stdin(1).is_empty());
    }

    #[test]
    fn test_focus_bindings() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('%');
        assert_eq!(f.focused(), 2);

        f.prefix();
        f.char('o');
        assert_eq!(f.focused(), 1);
        f.prefix();
        f.char(';');
        assert_eq!(f.focused(), 2);
    }

    #[test]
    fn test_resize_mode_scenario() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('"');
        assert_eq!(f.focused(), 2);

        f.press(KeyCode::Char('r'), KeyModifiers::ALT);
        assert!(f.router.mode.resize_mode);
        for _ in 0..3 {
            f.press(KeyCode::Left, KeyModifiers::NONE);
        }
        let sizes = f.sizes();
        assert!((sizes[0] - 0.2).abs() < 1e-5);
        assert!((sizes[1] - 0.8).abs() < 1e-5);
        assert!(f.router.mode.resize_mode);

        f.char('x');
        assert!(!f.router.mode.resize_mode);
        assert!(f.probe.borrow().stdin(2).is_empty());
    }

    #[test]
    fn test_resize_mode_vi_keys_and_rejection() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('"');
        f.prefix();
        f.char('r');
        assert!(f.router.mode.resize_mode);

        f.char('h');
        assert!((f.sizes()[0] - 0.4).abs() < 1e-5);
        // no stacked ancestor, so vertical keys are no-ops
        f.char('k');
        assert!((f.sizes()[0] - 0.4).abs() < 1e-5);
        assert!(f.router.mode.resize_mode);
    }

    #[test]
    fn test_arrow_keys_are_normalized() {
        let mut f = Fixture::new(80, 24);
        f.press(KeyCode::Up, KeyModifiers::NONE);
        f.press(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(f.probe.borrow().stdin(1), b"\x1bOA\x1bOD".to_vec());
    }

    #[test]
    fn test_passthrough_forwards_raw_bytes() {
        let mut f = Fixture::new(80, 24);
        f.char('l');
        f.char('s');
        f.press(KeyCode::Enter, KeyModifiers::NONE);
        f.send(Event::Paste("pwd".into()));
        assert_eq!(f.probe.borrow().stdin(1), b"ls\rpwd".to_vec());
    }

    #[test]
    fn test_mouse_drag_scenario() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('"');
        f.press(KeyCode::Char('r'), KeyModifiers::ALT);
        for _ in 0..3 {
            f.press(KeyCode::Left, KeyModifiers::NONE);
        }
        f.char('q');
        let pane1 = f.wm.root().unwrap().panes()[0].rect();
        assert_eq!(pane1.w, 16);

        f.mouse(MouseEventKind::Down(MouseButton::Left), 5, 5);
        assert_eq!(f.focused(), 1);
        f.mouse(MouseEventKind::Drag(MouseButton::Left), 20, 5);
        f.mouse(MouseEventKind::Up(MouseButton::Left), 40, 5);

        let panes = f.wm.root().unwrap().panes();
        assert_eq!(panes[0].rect().w, 40);
        assert_eq!(panes[1].rect().x, 41);
        assert_eq!(f.router.mode.mouse_down, None);
        assert!(f.probe.borrow().stdin(1).is_empty());
    }

    #[test]
    fn test_scroll_then_typing_snaps_back() {
        let mut f = Fixture::new(10, 3);
        {
            let pane = f.wm.focused_pane().unwrap();
            for _ in 0..100 {
                pane.vterm.consume(&Parsed::Char('a'));
            }
        }

        f.mouse(MouseEventKind::ScrollUp, 1, 1);
        assert!(f.wm.focused_pane().unwrap().vterm.scroll_offset() > 0);

        f.char('a');
        assert_eq!(f.wm.focused_pane().unwrap().vterm.scroll_offset(), 0);
        assert_eq!(f.probe.borrow().stdin(1), b"a".to_vec());
    }

    #[test]
    fn test_close_last_pane_then_input_is_invalid_selection() {
        let mut f = Fixture::new(80, 24);
        f.prefix();
        f.char('x');
        assert!(f.wm.is_empty());

        let ev = translate(&Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE))).unwrap();
        assert_eq!(
            f.router.handle(&mut f.wm, &ev),
            Err(LayoutError::InvalidSelection)
        );
    }
}
