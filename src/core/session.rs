//! Session management
//!
//! A session couples a shell running in a pty with the pane's virtual
//! terminal. One thread decodes shell output into the terminal, another
//! drains the pane's input channel into the shell.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;

use super::pty::{Pty, PtyError};
use super::term::{VTerm, VtParser};

/// Session events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// The shell behind pane `id` has exited
    Exited(u64),
}

/// A shell session
pub struct Session {
    id: u64,
    pty: Pty,
    running: Arc<AtomicBool>,
}

impl Session {
    /// Spawn the shell and start both I/O threads. `input` carries bytes
    /// bound for the shell; `events` is notified when the shell goes away.
    pub fn start<E>(
        id: u64,
        cols: u16,
        rows: u16,
        command: Option<&str>,
        vterm: VTerm,
        input: Receiver<Vec<u8>>,
        events: Sender<E>,
    ) -> Result<Self, PtyError>
    where
        E: From<SessionEvent> + Send + 'static,
    {
        let pty = Pty::spawn(cols, rows, command)?;
        let reader = pty.reader()?;
        let writer = pty.writer()?;
        let running = Arc::new(AtomicBool::new(true));

        spawn_reader(id, reader, vterm, events, running.clone());
        spawn_writer(id, writer, input);

        Ok(Self { id, pty, running })
    }

    /// Resize the pty so the shell sees the pane's new geometry
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.pty.resize(cols, rows)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closed on purpose: the reader must not report an exit
        self.running.store(false, Ordering::SeqCst);
        tracing::debug!(pane = self.id, "closing session");
        self.pty.kill();
    }
}

fn spawn_reader<E>(
    id: u64,
    mut reader: Box<dyn Read + Send>,
    vterm: VTerm,
    events: Sender<E>,
    running: Arc<AtomicBool>,
) where
    E: From<SessionEvent> + Send + 'static,
{
    thread::spawn(move || {
        let mut parser = VtParser::new();
        let mut buffer = vec![0u8; 4096];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    let outputs = parser.advance(&buffer[..n]);
                    vterm.consume_all(outputs.iter().map(|o| &o.parsed));
                    vterm.refresh_cursor();
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(pane = id, "pty read ended: {}", e);
                    break;
                }
            }
        }

        if running.swap(false, Ordering::SeqCst) {
            tracing::info!(pane = id, "shell exited");
            let _ = events.send(SessionEvent::Exited(id).into());
        }
    });
}

fn spawn_writer(id: u64, mut writer: Box<dyn Write + Send>, input: Receiver<Vec<u8>>) {
    thread::spawn(move || {
        for bytes in input {
            if let Err(e) = writer.write_all(&bytes).and_then(|_| writer.flush()) {
                tracing::debug!(pane = id, "pty write failed: {}", e);
                break;
            }
        }
    });
}
