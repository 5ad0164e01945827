//! Window Manager - split-tree pane management.
//!
//! - **manager**: `WindowManager`, owner of the tree and its operations
//! - **pane**: terminal panes and the spawner seam
//! - **layout**: tree nodes, geometry and simplification
//!
//! # Module Hierarchy
//!
//! ```text
//! wm/
//! ├── mod.rs      - Module exports
//! ├── manager.rs  - WindowManager (focus, split, resize, drag, close)
//! ├── pane.rs     - Pane (VTerm + session + render view)
//! └── layout.rs   - Node / Split tree and rectangles
//! ```

pub mod layout;
pub mod manager;
pub mod pane;

pub use layout::{LayoutError, Orientation};
pub use manager::WindowManager;
pub use pane::ShellSpawner;
