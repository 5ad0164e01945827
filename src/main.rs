//! tilemux - A tiling terminal multiplexer
//!
//! tilemux splits one host terminal into a tree of panes, each running its
//! own shell in a pseudo terminal. Panes are arranged by nested splits and
//! driven with tmux-style keybindings and the mouse.
//!
//! # Quick Start
//!
//! ```text
//! tilemux                # Start with the default shell
//! tilemux -s /bin/zsh    # Start every pane with zsh
//! ```
//!
//! # Keybindings (Ctrl+B prefix)
//!
//! | Key | Action |
//! |-----|--------|
//! | % | Split stacked |
//! | " | Split side by side |
//! | o / ; | Next/Previous pane |
//! | { / } | Move pane left/right |
//! | x | Close pane |
//! | r | Resize mode (arrows or hjkl, any other key leaves) |
//!
//! `Alt+R` enters resize mode without the prefix. Dragging a separator with
//! the mouse moves it; the wheel scrolls the focused pane's history.

mod config;
mod core;
mod ui;
mod wm;

use std::env;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crossterm::event::{self, Event};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::session::SessionEvent;
use crate::ui::keymapper::translate;
use crate::ui::renderer::{Compositor, HostTerminal, RenderCommand};
use crate::ui::router::InputRouter;
use crate::wm::{ShellSpawner, WindowManager};

/// Command line options
#[derive(Default)]
struct Options {
    /// Shell command, overrides the config file
    shell: Option<String>,
    /// Alternative config file
    config: Option<PathBuf>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("tilemux {}", VERSION);
}

fn print_help() {
    eprintln!("tilemux {} - A tiling terminal multiplexer", VERSION);
    eprintln!();
    eprintln!("Usage: tilemux [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --shell <CMD>     Shell command for new panes");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.tilemux/config.toml)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keybindings (Ctrl+B prefix, configurable):");
    eprintln!("  Ctrl+B, %             Split pane stacked");
    eprintln!("  Ctrl+B, \"             Split pane side by side");
    eprintln!("  Ctrl+B, o             Next pane");
    eprintln!("  Ctrl+B, ;             Previous pane");
    eprintln!("  Ctrl+B, {{ / }}         Move pane left / right");
    eprintln!("  Ctrl+B, x             Close pane");
    eprintln!("  Ctrl+B, r             Resize mode");
    eprintln!("  Alt+R                 Resize mode");
    eprintln!();
    eprintln!("Resize mode: arrows or h/j/k/l grow the focused pane, any other key exits.");
    eprintln!();
    eprintln!("Logs: ~/.tilemux/tilemux.log (filter with RUST_LOG)");
    eprintln!();
    eprintln!("Exit: close every pane, or type 'exit' in each shell");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-s" | "--shell" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing shell argument".to_string());
                }
                options.shell = Some(args[i].clone());
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config path".to_string());
                }
                options.config = Some(PathBuf::from(&args[i]));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.tilemux/tilemux.log`; stdout belongs to the compositor
fn init_logging(level: &str) {
    let log_path = config::config_dir()
        .map(|dir| dir.join("tilemux.log"))
        .unwrap_or_else(|| PathBuf::from("tilemux.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Everything the main loop reacts to
enum AppEvent {
    Host(Event),
    Session(SessionEvent),
}

impl From<SessionEvent> for AppEvent {
    fn from(event: SessionEvent) -> Self {
        AppEvent::Session(event)
    }
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let loaded = match options.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load_from(&path),
        None => Ok(Config::default()),
    };
    let level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level);

    let mut config = loaded.unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        Config::default()
    });
    if options.shell.is_some() {
        config.shell = options.shell;
    }

    info!("tilemux {} starting", VERSION);
    info!("Shell: {}", config.shell.as_deref().unwrap_or("(default)"));

    // Let child processes detect they run inside tilemux
    env::set_var("TILEMUX", "1");

    let result = run(config);
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    info!("tilemux exiting");
    result
}

fn run(config: Config) -> anyhow::Result<()> {
    let host = HostTerminal::init()?;
    let (cols, rows) = HostTerminal::size()?;
    info!("Terminal size: {}x{}", cols, rows);

    let (render_tx, render_rx) = mpsc::channel::<RenderCommand>();
    thread::spawn(move || {
        let out = BufWriter::new(io::stdout());
        if let Err(e) = Compositor::new(out).run(render_rx) {
            error!("compositor stopped: {}", e);
        }
    });

    let (events_tx, events_rx) = mpsc::channel::<AppEvent>();
    spawn_input_thread(events_tx.clone());

    let spawner = ShellSpawner::new(
        config.shell.clone(),
        config.scrollback_limit,
        render_tx.clone(),
        events_tx,
    );
    let mut wm = WindowManager::new(cols, rows, Box::new(spawner), render_tx);
    wm.add_pane()?;

    let mut router = InputRouter::new(config.keys);
    let result = run_main_loop(&mut wm, &mut router, events_rx);

    // Panes first so their shells are gone before the screen is restored
    drop(wm);
    drop(host);
    result
}

fn spawn_input_thread(events: Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if events.send(AppEvent::Host(ev)).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("host input failed: {}", e);
                break;
            }
        }
    });
}

/// Main event loop, runs until the last pane closes
fn run_main_loop(
    wm: &mut WindowManager,
    router: &mut InputRouter,
    events: mpsc::Receiver<AppEvent>,
) -> anyhow::Result<()> {
    while let Ok(event) = events.recv() {
        match event {
            AppEvent::Host(Event::Resize(cols, rows)) => {
                debug!("host resized to {}x{}", cols, rows);
                wm.resize(cols, rows);
            }
            AppEvent::Host(ev) => {
                let Some(ev) = translate(&ev) else {
                    continue;
                };
                router.handle(wm, &ev)?;
            }
            AppEvent::Session(SessionEvent::Exited(id)) => {
                info!(pane = id, "shell exited");
                wm.close_pane(id)?;
            }
        }

        if wm.is_empty() {
            info!("last pane closed");
            break;
        }
    }
    Ok(())
}
