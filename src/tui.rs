use std::io::{self, Stderr};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEvent, KeyEventKind,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransportError;
use crate::shell::Viewport;
use crate::upload::UploadTicket;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Bracketed paste. Files dropped onto the terminal arrive this way.
    Paste(String),
    Resize(u16, u16),
    Tick,
    ChatSettled(Result<String, TransportError>),
    UploadProgress {
        ticket: UploadTicket,
        loaded: u64,
        total: u64,
    },
    UploadSettled {
        ticket: UploadTicket,
        outcome: Result<String, TransportError>,
    },
}

/// Owns the terminal event subscription (keys, paste, resize) and the tick
/// timer. Dropping the handler aborts both tasks, so nothing is delivered to
/// a shell that has been torn down.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // Spawn event reader task
        let tx_events = tx.clone();
        let reader = tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let evt = match evt {
                    Ok(evt) => evt,
                    Err(err) => {
                        tracing::error!(error = %err, "terminal event stream failed");
                        break;
                    }
                };
                let app_event = match evt {
                    Event::Key(key) => {
                        // Only handle key press events, not release
                        if key.kind == KeyEventKind::Press {
                            Some(AppEvent::Key(key))
                        } else {
                            None
                        }
                    }
                    Event::Paste(text) => Some(AppEvent::Paste(text)),
                    Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
                    _ => None,
                };

                if let Some(event) = app_event {
                    if tx_events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        // Spawn tick timer for animations (300ms interval)
        let tx_tick = tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(300));
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            tx,
            tasks: vec![reader, ticker],
        }
    }

    /// Sender for completions of background work (network calls).
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Current window measurement, preferring the pixel size reported by the
/// terminal.
pub fn measure_viewport() -> Viewport {
    match terminal::window_size() {
        Ok(size) => Viewport::from_terminal(size.columns, size.rows, Some((size.width, size.height))),
        Err(_) => {
            let (columns, rows) = terminal::size().unwrap_or((80, 24));
            Viewport::from_terminal(columns, rows, None)
        }
    }
}

/// Measurement after a resize event, falling back to the event's cell size.
pub fn viewport_after_resize(columns: u16, rows: u16) -> Viewport {
    let pixels = terminal::window_size().ok().map(|size| (size.width, size.height));
    Viewport::from_terminal(columns, rows, pixels)
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;

    // Enable mouse capture and bracketed paste (drag-and-drop of files)
    execute!(io::stderr(), crossterm::event::EnableMouseCapture, EnableBracketedPaste)?;

    // Lets Shift+Enter be told apart from Enter where the terminal supports it
    if terminal::supports_keyboard_enhancement().unwrap_or(false) {
        execute!(
            io::stderr(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    if terminal::supports_keyboard_enhancement().unwrap_or(false) {
        let _ = execute!(io::stderr(), PopKeyboardEnhancementFlags);
    }
    execute!(io::stderr(), DisableBracketedPaste, crossterm::event::DisableMouseCapture)?;
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
