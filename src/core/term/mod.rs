//! Terminal emulation
//!
//! - **parser**: byte stream decoder producing `Parsed` directives
//! - **state**: character grid with scrollback
//! - **vterm**: shared handle that feeds the grid and reports changes
//! - **cell**: cell, cursor and style values

pub mod cell;
pub mod parser;
pub mod state;
pub mod vterm;

pub use parser::{Direction, Parsed, VtParser};
pub use state::VtOutput;
pub use vterm::VTerm;
