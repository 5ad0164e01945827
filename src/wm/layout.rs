//! Layout - The split tree that partitions the screen between panes
//!
//! Every node carries a relative `size` weight. A split divides its own
//! rectangle among its elements along one axis, leaving a one-cell gap
//! between neighbours for the separator line.

use thiserror::Error;

use super::pane::{Pane, PaneId};

/// Smallest weight a node may have inside its split
pub const MIN_SIZE: f32 = 0.05;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Selection path does not resolve to a pane")]
    InvalidSelection,

    #[error("No pane is selected and none could be created")]
    NoActiveSelection,

    #[error("Geometry change rejected")]
    InvalidGeometry,

    #[error("No adjacent sibling in that direction")]
    NoAdjacentSibling,

    #[error("Failed to spawn pane: {0}")]
    Spawn(String),
}

/// Screen rectangle in host cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Start and extent along a split axis
    fn along(&self, stacked: bool) -> (u16, u16) {
        if stacked {
            (self.y, self.h)
        } else {
            (self.x, self.w)
        }
    }
}

/// Split orientation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    /// Elements stacked top to bottom
    Vertical,
    /// Elements side by side
    Horizontal,
}

impl Orientation {
    pub fn is_stacked(self) -> bool {
        self == Orientation::Vertical
    }
}

/// Indices from the root to a node, one per split level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(pub Vec<usize>);

impl Path {
    /// Parent path and index within the parent, or `None` at the root
    pub fn split_last(&self) -> Option<(&[usize], usize)> {
        self.0.split_last().map(|(idx, parent)| (parent, *idx))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A separator cell run between two siblings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Border {
    pub x: u16,
    pub y: u16,
    pub len: u16,
    /// Vertical line between side-by-side elements
    pub vertical: bool,
}

pub enum Contents {
    Pane(Pane),
    Split(Split),
}

pub struct Split {
    pub vertically_stacked: bool,
    pub selection_idx: usize,
    pub elements: Vec<Node>,
}

pub struct Node {
    pub size: f32,
    pub rect: Rect,
    pub contents: Contents,
}

impl Split {
    pub fn new(orientation: Orientation, elements: Vec<Node>) -> Self {
        Self {
            vertically_stacked: orientation.is_stacked(),
            selection_idx: 0,
            elements,
        }
    }

    fn total_size(&self) -> f32 {
        self.elements.iter().map(|e| e.size).sum()
    }

    /// Rescale weights so they sum to 1.0
    pub fn normalize(&mut self) {
        let total = self.total_size();
        if total > 0.0 {
            for element in &mut self.elements {
                element.size /= total;
            }
        }
    }

    /// Offsets along the axis at which each element starts and ends, for a
    /// parent extent of `extent`. Gaps are excluded from the result.
    fn spans(&self, extent: u16) -> Vec<(u16, u16)> {
        let n = self.elements.len();
        let gaps = n.saturating_sub(1) as u16;
        let avail = extent.saturating_sub(gaps) as f32;
        let total = self.total_size();

        let mut spans = Vec::with_capacity(n);
        let mut cumulative = 0.0;
        let mut start = 0u16;
        for (i, element) in self.elements.iter().enumerate() {
            cumulative += element.size;
            let end = if i + 1 == n || total <= 0.0 {
                avail as u16
            } else {
                ((cumulative / total) * avail).round() as u16
            };
            let end = end.max(start);
            spans.push((start + i as u16, end - start));
            start = end;
        }
        spans
    }

    /// Weight for element `i` that puts the gap after it at `target`
    fn weight_for_border(&self, rect: Rect, i: usize, target: u16) -> f32 {
        let (origin, extent) = rect.along(self.vertically_stacked);
        let gaps = self.elements.len().saturating_sub(1) as f32;
        let avail = (extent as f32 - gaps).max(1.0);
        let total = self.total_size();
        let before: f32 = self.elements[..i].iter().map(|e| e.size).sum();

        let offset = target as f32 - origin as f32 - i as f32;
        (offset / avail) * total - before
    }
}

impl Node {
    pub fn pane(size: f32, pane: Pane) -> Self {
        Self {
            size,
            rect: Rect::default(),
            contents: Contents::Pane(pane),
        }
    }

    #[cfg(test)]
    pub fn split(size: f32, split: Split) -> Self {
        Self {
            size,
            rect: Rect::default(),
            contents: Contents::Split(split),
        }
    }

    pub fn as_pane(&self) -> Option<&Pane> {
        match &self.contents {
            Contents::Pane(pane) => Some(pane),
            Contents::Split(_) => None,
        }
    }

    pub fn as_pane_mut(&mut self) -> Option<&mut Pane> {
        match &mut self.contents {
            Contents::Pane(pane) => Some(pane),
            Contents::Split(_) => None,
        }
    }

    pub fn as_split(&self) -> Option<&Split> {
        match &self.contents {
            Contents::Split(split) => Some(split),
            Contents::Pane(_) => None,
        }
    }

    pub fn as_split_mut(&mut self) -> Option<&mut Split> {
        match &mut self.contents {
            Contents::Split(split) => Some(split),
            Contents::Pane(_) => None,
        }
    }

    /// Follow `selection_idx` at every split down to a pane
    pub fn selection_path(&self) -> Path {
        let mut path = Vec::new();
        let mut node = self;
        while let Contents::Split(split) = &node.contents {
            match split.elements.get(split.selection_idx) {
                Some(next) => {
                    path.push(split.selection_idx);
                    node = next;
                }
                None => break,
            }
        }
        Path(path)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &idx in path {
            node = node.as_split()?.elements.get(idx)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &idx in path {
            node = node.as_split_mut()?.elements.get_mut(idx)?;
        }
        Some(node)
    }

    pub fn split_at_mut(&mut self, path: &[usize]) -> Option<&mut Split> {
        self.node_at_mut(path)?.as_split_mut()
    }

    /// Point every split on `path` at the next index, so the path becomes
    /// the selection
    pub fn select_path(&mut self, path: &[usize]) {
        let mut node = self;
        for &idx in path {
            match &mut node.contents {
                Contents::Split(split) if idx < split.elements.len() => {
                    split.selection_idx = idx;
                    node = &mut split.elements[idx];
                }
                _ => return,
            }
        }
    }

    /// Descend from this node to a pane, choosing the index returned by
    /// `pick` at every split and recording it as the selection
    pub fn descend_selecting(&mut self, pick: impl Fn(&Split) -> usize) {
        let mut node = self;
        while let Contents::Split(split) = &mut node.contents {
            if split.elements.is_empty() {
                return;
            }
            let idx = pick(split).min(split.elements.len() - 1);
            split.selection_idx = idx;
            node = &mut split.elements[idx];
        }
    }

    /// Path to the pane with the given id
    pub fn find_pane(&self, id: PaneId) -> Option<Path> {
        fn walk(node: &Node, id: PaneId, path: &mut Vec<usize>) -> bool {
            match &node.contents {
                Contents::Pane(pane) => pane.id == id,
                Contents::Split(split) => {
                    for (i, element) in split.elements.iter().enumerate() {
                        path.push(i);
                        if walk(element, id, path) {
                            return true;
                        }
                        path.pop();
                    }
                    false
                }
            }
        }

        let mut path = Vec::new();
        walk(self, id, &mut path).then_some(Path(path))
    }

    /// Path to the pane whose rectangle contains the point
    pub fn pane_path_at(&self, x: u16, y: u16) -> Option<Path> {
        let mut path = Vec::new();
        let mut node = self;
        loop {
            match &node.contents {
                Contents::Pane(_) => {
                    return node.rect.contains(x, y).then_some(Path(path));
                }
                Contents::Split(split) => {
                    let (idx, next) = split
                        .elements
                        .iter()
                        .enumerate()
                        .find(|(_, e)| e.rect.contains(x, y))?;
                    path.push(idx);
                    node = next;
                }
            }
        }
    }

    /// Panes in pre-order
    #[cfg(test)]
    pub fn panes(&self) -> Vec<&Pane> {
        fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Pane>) {
            match &node.contents {
                Contents::Pane(pane) => out.push(pane),
                Contents::Split(split) => {
                    for element in &split.elements {
                        walk(element, out);
                    }
                }
            }
        }

        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    pub fn for_each_pane_mut(&mut self, f: &mut impl FnMut(&mut Pane)) {
        match &mut self.contents {
            Contents::Pane(pane) => f(pane),
            Contents::Split(split) => {
                for element in &mut split.elements {
                    element.for_each_pane_mut(f);
                }
            }
        }
    }

    /// True for a split with no elements
    pub fn is_empty(&self) -> bool {
        matches!(&self.contents, Contents::Split(split) if split.elements.is_empty())
    }

    /// Collapse every split holding one element into that element and drop
    /// empty splits. Children are simplified first, so one pass reaches the
    /// fixed point.
    pub fn simplify(&mut self) {
        let Contents::Split(split) = &mut self.contents else {
            return;
        };

        for element in &mut split.elements {
            element.simplify();
        }

        let before = split.elements.len();
        split.elements.retain(|e| !e.is_empty());
        if split.elements.len() != before {
            split.normalize();
        }
        if split.selection_idx >= split.elements.len() {
            split.selection_idx = split.elements.len().saturating_sub(1);
        }

        if split.elements.len() == 1 {
            if let Some(only) = split.elements.pop() {
                self.contents = only.contents;
            }
        }
    }

    /// Recompute rectangles top-down starting from `rect`. Panes whose
    /// rectangle changed (or every pane, with `force`) are reshaped and
    /// repainted; separator runs are appended to `borders`.
    pub fn refresh_render_rect(&mut self, rect: Rect, force: bool, borders: &mut Vec<Border>) {
        self.rect = rect;
        match &mut self.contents {
            Contents::Pane(pane) => pane.apply_geometry(rect, force),
            Contents::Split(split) => {
                let stacked = split.vertically_stacked;
                let (origin, extent) = rect.along(stacked);
                let spans = split.spans(extent);
                let count = spans.len();

                for (i, (element, (offset, len))) in
                    split.elements.iter_mut().zip(spans).enumerate()
                {
                    let start = origin + offset;
                    let child = if stacked {
                        Rect::new(rect.x, start, rect.w, len)
                    } else {
                        Rect::new(start, rect.y, len, rect.h)
                    };
                    element.refresh_render_rect(child, force, borders);

                    if i + 1 < count {
                        let gap = start + len;
                        borders.push(if stacked {
                            Border { x: rect.x, y: gap, len: rect.w, vertical: false }
                        } else {
                            Border { x: gap, y: rect.y, len: rect.h, vertical: true }
                        });
                    }
                }
            }
        }
    }

    /// Find the split border closest to (x, y) among the splits containing
    /// that point. Returns the split's path and the index of the element
    /// before the border.
    pub fn nearest_border(&self, x: u16, y: u16) -> Option<(Path, usize)> {
        let mut best: Option<(Path, usize, u16)> = None;
        let mut path = Vec::new();
        let mut node = self;

        while node.rect.contains(x, y) {
            let Contents::Split(split) = &node.contents else {
                break;
            };
            let point = if split.vertically_stacked { y } else { x };

            let borders = split.elements.len().saturating_sub(1);
            for (i, element) in split.elements.iter().enumerate().take(borders) {
                let (start, len) = element.rect.along(split.vertically_stacked);
                let gap = start + len;
                let distance = gap.abs_diff(point);
                if best.as_ref().map_or(true, |(_, _, d)| distance < *d) {
                    best = Some((Path(path.clone()), i, distance));
                }
            }

            match split.elements.iter().position(|e| e.rect.contains(x, y)) {
                Some(idx) => {
                    path.push(idx);
                    node = &split.elements[idx];
                }
                None => break,
            }
        }

        best.map(|(path, i, _)| (path, i))
    }

    /// Move the border after element `i` of the split at this node so the
    /// gap lands on `target` (clamped to keep both weights above the
    /// minimum)
    pub fn move_border(&mut self, i: usize, target: u16) -> Result<(), LayoutError> {
        let rect = self.rect;
        let split = self.as_split_mut().ok_or(LayoutError::InvalidSelection)?;
        if i + 1 >= split.elements.len() {
            return Err(LayoutError::NoAdjacentSibling);
        }

        let pair = split.elements[i].size + split.elements[i + 1].size;
        if pair - MIN_SIZE <= MIN_SIZE {
            return Err(LayoutError::InvalidGeometry);
        }

        let wanted = split.weight_for_border(rect, i, target);
        let first = wanted.clamp(MIN_SIZE, pair - MIN_SIZE);
        split.elements[i].size = first;
        split.elements[i + 1].size = pair - first;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_of(sizes: &[f32], stacked: bool) -> Split {
        Split {
            vertically_stacked: stacked,
            selection_idx: 0,
            elements: sizes
                .iter()
                .map(|&size| Node::split(size, Split::new(Orientation::Horizontal, Vec::new())))
                .collect(),
        }
    }

    #[test]
    fn test_spans_tile_extent_with_gaps() {
        let split = split_of(&[0.5, 0.5], false);
        assert_eq!(split.spans(80), vec![(0, 40), (41, 39)]);

        let split = split_of(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], true);
        let spans = split.spans(24);
        // three rows of content plus two gaps fill the extent exactly
        let (last_start, last_len) = spans[2];
        assert_eq!(last_start + last_len, 24);
        assert_eq!(spans.iter().map(|(_, l)| l).sum::<u16>(), 22);
    }

    #[test]
    fn test_weight_for_border_lands_on_target() {
        let split = split_of(&[0.2, 0.8], false);
        let rect = Rect::new(0, 0, 80, 24);
        let weight = split.weight_for_border(rect, 0, 40);

        let moved = split_of(&[weight, 1.0 - weight], false);
        assert_eq!(moved.spans(80)[0], (0, 40));
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(2, 3, 4, 5);
        assert!(rect.contains(2, 3));
        assert!(rect.contains(5, 7));
        assert!(!rect.contains(6, 3));
        assert!(!rect.contains(2, 8));
        assert!(Rect::new(0, 0, 0, 4).is_empty());
    }

    #[test]
    fn test_path_split_last() {
        assert_eq!(Path(vec![]).split_last(), None);
        let path = Path(vec![1, 0, 2]);
        assert_eq!(path.split_last(), Some((&[1usize, 0][..], 2)));
    }

    #[test]
    fn test_simplify_drops_empty_splits() {
        let mut root = Node::split(1.0, split_of(&[0.5, 0.5], false));
        root.simplify();
        assert!(root.is_empty());
    }
}
