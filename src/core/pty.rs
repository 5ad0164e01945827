//! Pseudo terminal wrapper
//!
//! Thin layer over `portable-pty`: opens a pty pair, spawns the shell on the
//! slave side and hands out the master's reader and writer.

use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open pseudo terminal: {0}")]
    Open(String),

    #[error("Failed to spawn process: {0}")]
    ProcessSpawn(String),

    #[error("Failed to resize pseudo terminal: {0}")]
    Resize(String),

    #[error("Failed to access PTY stream: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// A running shell attached to a pseudo terminal
pub struct Pty {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    cols: u16,
    rows: u16,
}

impl Pty {
    /// Open a pty of the given size and spawn `command` (or the user's
    /// default shell) inside it
    pub fn spawn(cols: u16, rows: u16, command: Option<&str>) -> Result<Self> {
        let pair = native_pty_system()
            .openpty(pty_size(cols, rows))
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let cmd = match command {
            Some(shell) => CommandBuilder::new(shell),
            None => CommandBuilder::new_default_prog(),
        };

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::ProcessSpawn(e.to_string()))?;
        // The child holds the only reference to the slave side from here on
        drop(pair.slave);

        tracing::debug!(cols, rows, ?command, "spawned pty");

        Ok(Self {
            master: pair.master,
            child,
            cols,
            rows,
        })
    }

    pub fn reader(&self) -> Result<Box<dyn Read + Send>> {
        self.master
            .try_clone_reader()
            .map_err(|e| PtyError::Stream(e.to_string()))
    }

    /// Can only be taken once
    pub fn writer(&self) -> Result<Box<dyn Write + Send>> {
        self.master
            .take_writer()
            .map_err(|e| PtyError::Stream(e.to_string()))
    }

    /// Resize the pseudo console. No-op when the size is unchanged.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        if (cols, rows) == (self.cols, self.rows) {
            return Ok(());
        }
        self.master
            .resize(pty_size(cols, rows))
            .map_err(|e| PtyError::Resize(e.to_string()))?;
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn kill(&mut self) {
        if self.is_running() {
            if let Err(e) = self.child.kill() {
                tracing::warn!("failed to kill child process: {}", e);
            }
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        self.kill();
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
