//! Core terminal emulation components.
//!
//! - **pty**: pseudo terminal wrapper around `portable-pty`
//! - **term**: byte decoder, character grid and virtual terminal
//! - **session**: shell process wired to a virtual terminal
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── Pty (shell process I/O)
//! ├── reader thread: VtParser -> VTerm
//! └── writer thread: pane input -> Pty
//!
//! VTerm
//! └── Grid (cells + scrollback + cursor)
//! ```

pub mod pty;
pub mod session;
pub mod term;
