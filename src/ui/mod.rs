//! User interface rendering and input handling.
//!
//! - **keymapper**: host key and mouse events to chord names and pty bytes
//! - **router**: modal input routing (prefix, resize mode, mouse, bindings)
//! - **renderer**: render pipes, the compositor and host terminal setup

pub mod keymapper;
pub mod renderer;
pub mod router;
