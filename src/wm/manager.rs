//! Window Manager - Owns the layout tree and performs every structural
//! operation on it
//!
//! All mutation happens on the input-handling thread. Each operation ends by
//! recomputing render rectangles so panes and separators stay in sync with
//! the tree.

use std::sync::mpsc::Sender;

use super::layout::{Contents, LayoutError, Node, Orientation, Path, Rect, Split, MIN_SIZE};
use super::pane::{Pane, PaneId, PaneSpawner};
use crate::core::term::Direction;
use crate::ui::renderer::RenderCommand;

/// Window Manager - handles the pane tree and focus
pub struct WindowManager {
    root: Option<Node>,
    spawner: Box<dyn PaneSpawner>,
    compositor: Sender<RenderCommand>,
    next_pane_id: PaneId,
    /// Terminal dimensions
    pub width: u16,
    pub height: u16,
}

impl WindowManager {
    pub fn new(
        width: u16,
        height: u16,
        spawner: Box<dyn PaneSpawner>,
        compositor: Sender<RenderCommand>,
    ) -> Self {
        Self {
            root: None,
            spawner,
            compositor,
            next_pane_id: 1,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[cfg(test)]
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    fn root_mut(&mut self) -> Result<&mut Node, LayoutError> {
        self.root.as_mut().ok_or(LayoutError::InvalidSelection)
    }

    fn screen(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// The pane at the end of the selection path
    pub fn focused_pane(&self) -> Result<&Pane, LayoutError> {
        let root = self.root.as_ref().ok_or(LayoutError::InvalidSelection)?;
        let path = root.selection_path();
        root.node_at(&path.0)
            .and_then(Node::as_pane)
            .ok_or(LayoutError::InvalidSelection)
    }

    /// Pane ids in tree order
    #[cfg(test)]
    pub fn pane_ids(&self) -> Vec<PaneId> {
        self.root
            .as_ref()
            .map(|root| root.panes().iter().map(|p| p.id).collect())
            .unwrap_or_default()
    }

    fn spawn_pane(&mut self, width: u16, height: u16) -> Result<Pane, LayoutError> {
        let id = self.next_pane_id;
        let pane = self.spawner.spawn(id, width, height)?;
        self.next_pane_id += 1;
        Ok(pane)
    }

    /// Insert a new pane right after the current selection and focus it
    pub fn add_pane(&mut self) -> Result<(), LayoutError> {
        let Some(root) = self.root.as_ref() else {
            let screen = self.screen();
            let mut pane = self
                .spawn_pane(screen.w, screen.h)
                .map_err(|_| LayoutError::NoActiveSelection)?;
            pane.set_selected(true);
            self.root = Some(Node::pane(1.0, pane));
            self.refresh_render_rect();
            return Ok(());
        };

        let path = root.selection_path();
        let rect = root.node_at(&path.0).ok_or(LayoutError::InvalidSelection)?.rect;
        let pane = self.spawn_pane(rect.w / 2, rect.h)?;
        self.insert_after_selection(pane, Orientation::Horizontal)
    }

    /// Wrap the selected pane in a new split of the given orientation and
    /// add a second pane next to it. The tree is untouched if the pane
    /// cannot be spawned.
    pub fn split_selection(&mut self, orientation: Orientation) -> Result<(), LayoutError> {
        let root = self.root.as_ref().ok_or(LayoutError::InvalidSelection)?;
        let path = root.selection_path();
        let node = root.node_at(&path.0).ok_or(LayoutError::InvalidSelection)?;
        if node.as_pane().is_none() {
            return Err(LayoutError::InvalidSelection);
        }
        let rect = node.rect;
        let (width, height) = if orientation.is_stacked() {
            (rect.w, rect.h / 2)
        } else {
            (rect.w / 2, rect.h)
        };
        let pane = self.spawn_pane(width, height)?;

        let root = self.root_mut()?;
        let node = root
            .node_at_mut(&path.0)
            .ok_or(LayoutError::InvalidSelection)?;
        wrap_in_split(node, orientation);
        self.insert_after_selection(pane, orientation)
    }

    fn insert_after_selection(
        &mut self,
        pane: Pane,
        orientation: Orientation,
    ) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let mut path = root.selection_path();
        if path.is_empty() {
            // A lone pane at the root becomes the first element of a split
            wrap_in_split(root, orientation);
            path = Path(vec![0]);
        }
        let (parent_path, idx) = path.split_last().ok_or(LayoutError::InvalidSelection)?;
        let parent_path = parent_path.to_vec();

        deselect_at(root, &path.0);
        let split = root
            .split_at_mut(&parent_path)
            .ok_or(LayoutError::InvalidSelection)?;
        let half = split.elements[idx].size / 2.0;
        split.elements[idx].size = half;
        split.elements.insert(idx + 1, Node::pane(half, pane));
        split.selection_idx = idx + 1;

        self.focus_selection()?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Focus the next pane in tree order, wrapping to the first
    pub fn focus_next(&mut self) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let mut path = root.selection_path();
        deselect_at(root, &path.0);

        loop {
            let Some((parent_path, idx)) = path.split_last() else {
                // Past the last leaf: restart from the first one
                root.descend_selecting(|_| 0);
                break;
            };
            let parent_path = parent_path.to_vec();
            let split = root
                .split_at_mut(&parent_path)
                .ok_or(LayoutError::InvalidSelection)?;

            if idx + 1 >= split.elements.len() {
                path.0.pop();
                continue;
            }
            split.selection_idx = idx + 1;
            split.elements[idx + 1].descend_selecting(|_| 0);
            break;
        }

        self.focus_selection()?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Focus the previous pane in tree order.
    ///
    /// Wrapping from the first pane points every split on the leftmost
    /// spine at its last element, then follows the existing selection from
    /// the root. With nested splits this lands on the last element's
    /// remembered pane, which is not always the last leaf.
    pub fn focus_prev(&mut self) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let mut path = root.selection_path();
        deselect_at(root, &path.0);

        loop {
            let Some((parent_path, idx)) = path.split_last() else {
                let mut node = &mut *root;
                while let Contents::Split(split) = &mut node.contents {
                    if split.elements.is_empty() {
                        break;
                    }
                    split.selection_idx = split.elements.len() - 1;
                    node = &mut split.elements[0];
                }
                break;
            };
            let parent_path = parent_path.to_vec();
            let split = root
                .split_at_mut(&parent_path)
                .ok_or(LayoutError::InvalidSelection)?;

            if idx == 0 {
                path.0.pop();
                continue;
            }
            split.selection_idx = idx - 1;
            split.elements[idx - 1].descend_selecting(|s| s.elements.len() - 1);
            break;
        }

        self.focus_selection()?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Swap the focused pane with its neighbour in `direction` inside the
    /// same split
    pub fn move_window(&mut self, direction: Direction) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let path = root.selection_path();
        let (parent_path, idx) = path.split_last().ok_or(LayoutError::NoAdjacentSibling)?;
        let split = root
            .split_at_mut(parent_path)
            .ok_or(LayoutError::InvalidSelection)?;

        if split.vertically_stacked != direction.is_vertical() {
            return Err(LayoutError::NoAdjacentSibling);
        }
        let target = sibling_index(split, idx, direction).ok_or(LayoutError::NoAdjacentSibling)?;

        split.elements.swap(idx, target);
        split.selection_idx = target;
        self.refresh_render_rect();
        Ok(())
    }

    /// Grow the focused node toward `direction` by `delta`, taking the
    /// weight from the neighbour on that side. Uses the nearest enclosing
    /// split whose axis matches and which has such a neighbour.
    pub fn resize_focused(&mut self, direction: Direction, delta: f32) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let path = root.selection_path();

        for depth in (0..path.len()).rev() {
            let idx = path.0[depth];
            let split = root
                .split_at_mut(&path.0[..depth])
                .ok_or(LayoutError::InvalidSelection)?;
            if split.vertically_stacked != direction.is_vertical() {
                continue;
            }
            let Some(target) = sibling_index(split, idx, direction) else {
                continue;
            };

            let grown = split.elements[idx].size + delta;
            let shrunk = split.elements[target].size - delta;
            if grown <= MIN_SIZE || shrunk <= MIN_SIZE {
                return Err(LayoutError::InvalidGeometry);
            }
            split.elements[idx].size = grown;
            split.elements[target].size = shrunk;
            self.refresh_render_rect();
            return Ok(());
        }

        Err(LayoutError::NoAdjacentSibling)
    }

    /// Collapse degenerate splits
    pub fn simplify(&mut self) {
        if let Some(root) = self.root.as_mut() {
            root.simplify();
            if root.is_empty() {
                self.root = None;
            }
        }
    }

    /// Recompute every node's rectangle and redraw separators
    pub fn refresh_render_rect(&mut self) {
        self.refresh(false);
    }

    fn refresh(&mut self, force: bool) {
        let screen = self.screen();
        let Some(root) = self.root.as_mut() else {
            return;
        };
        let mut borders = Vec::new();
        root.refresh_render_rect(screen, force, &mut borders);

        for border in borders {
            let _ = self.compositor.send(RenderCommand::Separator {
                x: border.x,
                y: border.y,
                len: border.len,
                vertical: border.vertical,
            });
        }
    }

    /// Focus the pane under (x, y)
    pub fn select_at_coords(&mut self, x: u16, y: u16) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let Some(target) = root.pane_path_at(x, y) else {
            return Ok(());
        };
        let current = root.selection_path();
        if current == target {
            return Ok(());
        }

        deselect_at(root, &current.0);
        root.select_path(&target.0);
        self.focus_selection()?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Move the split border nearest (x0, y0) so that it lands on (x1, y1)
    pub fn drag_border(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), LayoutError> {
        if (x0, y0) == (x1, y1) {
            return Ok(());
        }
        let root = self.root_mut()?;
        let (path, i) = root
            .nearest_border(x0, y0)
            .ok_or(LayoutError::NoAdjacentSibling)?;
        let node = root.node_at_mut(&path.0).ok_or(LayoutError::InvalidSelection)?;
        let stacked = node.as_split().map_or(false, |s| s.vertically_stacked);
        node.move_border(i, if stacked { y1 } else { x1 })?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Remove a pane from the tree. Its weight goes to the remaining
    /// siblings. Unknown ids are ignored.
    pub fn close_pane(&mut self, id: PaneId) -> Result<(), LayoutError> {
        let Some(root) = self.root.as_mut() else {
            return Ok(());
        };
        let Some(path) = root.find_pane(id) else {
            return Ok(());
        };

        let Some((parent_path, idx)) = path.split_last() else {
            tracing::info!(pane = id, "last pane closed");
            self.root = None;
            return Ok(());
        };

        let split = root
            .split_at_mut(parent_path)
            .ok_or(LayoutError::InvalidSelection)?;
        let removed = split.elements.remove(idx);
        split.normalize();
        if split.selection_idx > idx || split.selection_idx >= split.elements.len() {
            split.selection_idx = split.selection_idx.saturating_sub(1);
        }
        drop(removed);
        tracing::info!(pane = id, "pane closed");

        self.simplify();
        if self.root.is_none() {
            return Ok(());
        }
        self.focus_selection()?;
        self.refresh_render_rect();
        Ok(())
    }

    /// Close whichever pane has focus
    pub fn close_focused(&mut self) -> Result<(), LayoutError> {
        let id = self.focused_pane()?.id;
        self.close_pane(id)
    }

    /// The host terminal changed size
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let _ = self.compositor.send(RenderCommand::Clear(self.screen()));
        self.refresh(true);
    }

    /// Make the pane on the selection path the only selected pane and
    /// report its cursor
    fn focus_selection(&mut self) -> Result<(), LayoutError> {
        let root = self.root_mut()?;
        let path = root.selection_path();
        let target = root
            .node_at(&path.0)
            .and_then(Node::as_pane)
            .map(|p| p.id)
            .ok_or(LayoutError::InvalidSelection)?;

        root.for_each_pane_mut(&mut |pane| {
            let selected = pane.id == target;
            if pane.is_selected() != selected {
                pane.set_selected(selected);
            }
        });

        let pane = self.focused_pane()?;
        pane.vterm.refresh_cursor();
        Ok(())
    }
}

/// Replace the node's contents with a one-element split holding them
fn wrap_in_split(node: &mut Node, orientation: Orientation) {
    let placeholder = Contents::Split(Split::new(orientation, Vec::new()));
    let old = std::mem::replace(&mut node.contents, placeholder);
    if let Contents::Split(split) = &mut node.contents {
        split.elements.push(Node {
            size: 1.0,
            rect: node.rect,
            contents: old,
        });
    }
}

fn deselect_at(root: &mut Node, path: &[usize]) {
    if let Some(pane) = root.node_at_mut(path).and_then(Node::as_pane_mut) {
        pane.set_selected(false);
    }
}

fn sibling_index(split: &Split, idx: usize, direction: Direction) -> Option<usize> {
    if direction.is_backward() {
        idx.checked_sub(1)
    } else {
        Some(idx + 1).filter(|&i| i < split.elements.len())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc::{self, Receiver};

    use super::*;
    use crate::core::term::VtOutput;
    use crate::wm::pane::testing::{Probe, TestSpawner};

    struct Fixture {
        wm: WindowManager,
        probe: Rc<RefCell<Probe>>,
        render: Receiver<RenderCommand>,
    }

    fn fixture(width: u16, height: u16) -> Fixture {
        let spawner = TestSpawner::default();
        let probe = spawner.probe.clone();
        let (tx, render) = mpsc::channel();
        let mut wm = WindowManager::new(width, height, Box::new(spawner), tx);
        wm.add_pane().unwrap();
        Fixture { wm, probe, render }
    }

    fn selected_count(wm: &WindowManager) -> usize {
        wm.root()
            .map(|r| r.panes().iter().filter(|p| p.is_selected()).count())
            .unwrap_or(0)
    }

    fn focused(wm: &WindowManager) -> PaneId {
        wm.focused_pane().map(|p| p.id).unwrap_or(0)
    }

    fn root_split(wm: &WindowManager) -> &Split {
        wm.root().and_then(Node::as_split).expect("root is a split")
    }

    fn no_degenerate_splits(node: &Node) -> bool {
        match &node.contents {
            Contents::Pane(_) => true,
            Contents::Split(split) => {
                split.elements.len() >= 2 && split.elements.iter().all(no_degenerate_splits)
            }
        }
    }

    fn rect_of(wm: &WindowManager, id: PaneId) -> Rect {
        wm.root()
            .and_then(|r| r.panes().into_iter().find(|p| p.id == id).map(|p| p.rect()))
            .unwrap_or_default()
    }

    #[test]
    fn test_first_pane_fills_screen() {
        let f = fixture(80, 24);
        assert_eq!(f.wm.pane_ids(), vec![1]);
        assert_eq!(rect_of(&f.wm, 1), Rect::new(0, 0, 80, 24));
        assert_eq!(selected_count(&f.wm), 1);
    }

    #[test]
    fn test_split_vertical_scenario() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Vertical).unwrap();

        let split = root_split(&f.wm);
        assert!(split.vertically_stacked);
        assert_eq!(split.elements.len(), 2);

        f.wm.simplify();
        let split = root_split(&f.wm);
        assert!(split.vertically_stacked);
        assert_eq!(split.elements.len(), 2);

        // stacked with a separator row between them
        assert_eq!(rect_of(&f.wm, 1), Rect::new(0, 0, 80, 12));
        assert_eq!(rect_of(&f.wm, 2), Rect::new(0, 13, 80, 11));
        assert_eq!(focused(&f.wm), 2);
        assert_eq!(selected_count(&f.wm), 1);

        let separators: Vec<RenderCommand> = f
            .render
            .try_iter()
            .filter(|c| matches!(c, RenderCommand::Separator { .. }))
            .collect();
        assert!(separators.contains(&RenderCommand::Separator {
            x: 0,
            y: 12,
            len: 80,
            vertical: false,
        }));
    }

    #[test]
    fn test_add_pane_halves_weight() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.add_pane().unwrap();

        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert_eq!(sizes, vec![0.5, 0.25, 0.25]);
        assert_eq!(f.wm.pane_ids(), vec![1, 2, 3]);
        assert_eq!(focused(&f.wm), 3);
    }

    #[test]
    fn test_nested_split_has_no_degenerate_splits() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();
        f.wm.simplify();

        let root = f.wm.root().unwrap();
        assert!(no_degenerate_splits(root));
        assert_eq!(f.wm.pane_ids(), vec![1, 2, 3]);
        assert_eq!(selected_count(&f.wm), 1);
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();

        // degenerate split in the middle of the tree
        let root = f.wm.root.as_mut().unwrap();
        wrap_in_split(root.node_at_mut(&[0]).unwrap(), Orientation::Vertical);

        f.wm.simplify();
        let once = f.wm.pane_ids();
        let shape_once = describe(f.wm.root().unwrap());
        f.wm.simplify();
        assert_eq!(f.wm.pane_ids(), once);
        assert_eq!(describe(f.wm.root().unwrap()), shape_once);
        assert!(no_degenerate_splits(f.wm.root().unwrap()));
    }

    fn describe(node: &Node) -> String {
        match &node.contents {
            Contents::Pane(p) => format!("{}@{:.2}", p.id, node.size),
            Contents::Split(s) => format!(
                "{}[{}]",
                if s.vertically_stacked { "V" } else { "H" },
                s.elements.iter().map(describe).collect::<Vec<_>>().join(",")
            ),
        }
    }

    #[test]
    fn test_focus_next_cycles_all_leaves() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();
        f.wm.add_pane().unwrap();
        let leaves = f.wm.pane_ids();
        assert_eq!(leaves.len(), 4);

        let start = focused(&f.wm);
        let mut seen = vec![start];
        for _ in 0..leaves.len() {
            f.wm.focus_next().unwrap();
            assert_eq!(selected_count(&f.wm), 1);
            seen.push(focused(&f.wm));
        }
        assert_eq!(seen.last(), Some(&start));

        let mut visited = seen.clone();
        visited.sort_unstable();
        visited.dedup();
        assert_eq!(visited.len(), leaves.len());
    }

    #[test]
    fn test_focus_next_wraps_from_last_leaf() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();

        // tree order is [1, [2, 3]]; 3 is last
        assert_eq!(focused(&f.wm), 3);
        f.wm.focus_next().unwrap();
        assert_eq!(focused(&f.wm), 1);
    }

    #[test]
    fn test_focus_prev_steps_back_in_order() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.add_pane().unwrap();
        assert_eq!(focused(&f.wm), 3);

        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 2);
        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 1);
        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 3);
    }

    #[test]
    fn test_focus_prev_wrap_follows_remembered_selection() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();
        // [1, [2, 3]]: focus 2 so the inner split remembers index 0
        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 2);
        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 1);

        f.wm.focus_prev().unwrap();
        assert_eq!(focused(&f.wm), 2);
        assert_eq!(selected_count(&f.wm), 1);
    }

    #[test]
    fn test_focus_refreshes_cursor_of_new_pane() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.probe.borrow().output[&1].try_iter().count();

        f.wm.focus_next().unwrap();
        assert_eq!(focused(&f.wm), 1);
        let got_cursor = f.probe.borrow().output[&1]
            .try_iter()
            .any(|o| matches!(o, VtOutput::Cursor(_)));
        assert!(got_cursor);
        assert!(f.probe.borrow().view(1).selected);
        assert!(!f.probe.borrow().view(2).selected);
    }

    #[test]
    fn test_move_window_swaps_within_parent() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        assert_eq!(f.wm.pane_ids(), vec![1, 2]);

        f.wm.move_window(Direction::Left).unwrap();
        assert_eq!(f.wm.pane_ids(), vec![2, 1]);
        assert_eq!(focused(&f.wm), 2);

        assert_eq!(
            f.wm.move_window(Direction::Left),
            Err(LayoutError::NoAdjacentSibling)
        );
        assert_eq!(
            f.wm.move_window(Direction::Up),
            Err(LayoutError::NoAdjacentSibling)
        );
        assert_eq!(f.wm.pane_ids(), vec![2, 1]);
    }

    #[test]
    fn test_resize_focused_moves_weight() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        assert_eq!(focused(&f.wm), 2);

        for _ in 0..3 {
            f.wm.resize_focused(Direction::Left, 0.1).unwrap();
        }
        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert!((sizes[0] - 0.2).abs() < 1e-5);
        assert!((sizes[1] - 0.8).abs() < 1e-5);
        assert!(rect_of(&f.wm, 2).w > rect_of(&f.wm, 1).w);
    }

    #[test]
    fn test_resize_focused_rejects_below_minimum() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        assert_eq!(
            f.wm.resize_focused(Direction::Left, 0.46),
            Err(LayoutError::InvalidGeometry)
        );
        assert_eq!(
            f.wm.resize_focused(Direction::Right, 0.1),
            Err(LayoutError::NoAdjacentSibling)
        );
        assert_eq!(
            f.wm.resize_focused(Direction::Up, 0.1),
            Err(LayoutError::NoAdjacentSibling)
        );
        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert_eq!(sizes, vec![0.5, 0.5]);
    }

    #[test]
    fn test_resize_uses_matching_ancestor() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.split_selection(Orientation::Vertical).unwrap();
        // pane 3 sits in a stacked split; Left resizes the outer split
        f.wm.resize_focused(Direction::Left, 0.1).unwrap();
        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert!((sizes[0] - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_select_at_coords() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        assert_eq!(focused(&f.wm), 2);

        f.wm.select_at_coords(3, 3).unwrap();
        assert_eq!(focused(&f.wm), 1);
        assert_eq!(selected_count(&f.wm), 1);

        // separator column belongs to no pane
        f.wm.select_at_coords(40, 3).unwrap();
        assert_eq!(focused(&f.wm), 1);
    }

    #[test]
    fn test_drag_border_scenario() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        {
            let root = f.wm.root.as_mut().unwrap();
            let split = root.as_split_mut().unwrap();
            split.elements[0].size = 0.2;
            split.elements[1].size = 0.8;
        }
        f.wm.refresh_render_rect();
        assert_eq!(rect_of(&f.wm, 1).w, 16);

        f.wm.select_at_coords(5, 5).unwrap();
        f.wm.drag_border(5, 5, 40, 5).unwrap();

        assert_eq!(rect_of(&f.wm, 1), Rect::new(0, 0, 40, 24));
        assert_eq!(rect_of(&f.wm, 2).x, 41);
        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert!((sizes[0] + sizes[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_drag_border_clamps_and_ignores_clicks() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();

        f.wm.drag_border(10, 5, 10, 5).unwrap();
        assert_eq!(rect_of(&f.wm, 1).w, 40);

        f.wm.drag_border(10, 5, 79, 5).unwrap();
        let sizes: Vec<f32> = root_split(&f.wm).elements.iter().map(|e| e.size).collect();
        assert!((sizes[1] - MIN_SIZE).abs() < 1e-5);
    }

    #[test]
    fn test_drag_border_without_split_is_noop() {
        let mut f = fixture(80, 24);
        assert_eq!(
            f.wm.drag_border(5, 5, 40, 5),
            Err(LayoutError::NoAdjacentSibling)
        );
    }

    #[test]
    fn test_close_pane_repairs_focus_and_weights() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.add_pane().unwrap();
        assert_eq!(focused(&f.wm), 3);

        f.wm.close_pane(3).unwrap();
        assert_eq!(f.wm.pane_ids(), vec![1, 2]);
        assert_eq!(selected_count(&f.wm), 1);
        let total: f32 = root_split(&f.wm).elements.iter().map(|e| e.size).sum();
        assert!((total - 1.0).abs() < 1e-5);

        f.wm.close_pane(1).unwrap();
        // single pane hoisted to the root
        assert!(f.wm.root().and_then(Node::as_pane).is_some());
        assert_eq!(rect_of(&f.wm, 2), Rect::new(0, 0, 80, 24));
        assert_eq!(focused(&f.wm), 2);

        f.wm.close_pane(42).unwrap();
        f.wm.close_pane(2).unwrap();
        assert!(f.wm.is_empty());
        assert_eq!(f.wm.focused_pane().err(), Some(LayoutError::InvalidSelection));
    }

    #[test]
    fn test_resize_reflows_panes() {
        let mut f = fixture(80, 24);
        f.wm.split_selection(Orientation::Horizontal).unwrap();
        f.wm.resize(100, 30);
        assert_eq!(rect_of(&f.wm, 1), Rect::new(0, 0, 50, 30));
        assert_eq!(rect_of(&f.wm, 2), Rect::new(51, 0, 49, 30));
    }

    #[test]
    fn test_failed_split_keeps_tree() {
        let spawner = TestSpawner {
            limit: Some(2),
            ..Default::default()
        };
        let (tx, _rx) = mpsc::channel();
        let mut wm = WindowManager::new(80, 24, Box::new(spawner), tx);
        wm.add_pane().unwrap();
        wm.split_selection(Orientation::Horizontal).unwrap();
        let before = describe(wm.root().unwrap());

        assert_eq!(
            wm.split_selection(Orientation::Vertical),
            Err(LayoutError::Spawn("test spawner".into()))
        );
        assert_eq!(describe(wm.root().unwrap()), before);
        assert!(no_degenerate_splits(wm.root().unwrap()));
        assert_eq!(focused(&wm), 2);

        // lone root pane stays a pane
        let spawner = TestSpawner {
            limit: Some(1),
            ..Default::default()
        };
        let (tx, _rx) = mpsc::channel();
        let mut wm = WindowManager::new(80, 24, Box::new(spawner), tx);
        wm.add_pane().unwrap();
        assert!(wm.split_selection(Orientation::Vertical).is_err());
        assert!(wm.root().and_then(Node::as_pane).is_some());
    }

    #[test]
    fn test_spawn_failure_leaves_tree_untouched() {
        let spawner = TestSpawner {
            fail: true,
            ..Default::default()
        };
        let (tx, _rx) = mpsc::channel();
        let mut wm = WindowManager::new(80, 24, Box::new(spawner), tx);
        assert_eq!(wm.add_pane(), Err(LayoutError::NoActiveSelection));
        assert!(wm.is_empty());
    }
}
