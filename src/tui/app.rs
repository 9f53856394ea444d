//! TUI application: main loop and key handling
//!
//! ```text
//! TuiApp (select! loop)                 DebateRuntime (tokio::spawn)
//!   ├─ crossterm EventStream              ├─ commands
//!   ├─ snapshot changes  <──── watch ─────┤
//!   └─ tick (spinner)                     └─ generation events
//!        └── submit / stop ──────────>────┘
//! ```

use super::view;
use crate::runtime::{DebateHandle, DebateSnapshot};
use crate::state_machine::DebatePhase;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

/// Longest topic accepted by the input view, in characters
pub const MAX_TOPIC_CHARS: usize = 200;

const PAGE: usize = 10;

/// What a key press asks the app to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Submit(String),
    Stop,
    Quit,
}

/// Everything the view renders
#[derive(Debug, Clone)]
pub struct TuiState {
    pub snapshot: DebateSnapshot,
    pub input: String,
    /// Validation error shown under the topic input
    pub input_error: Option<String>,
    /// Lines scrolled up from the bottom; 0 follows new output
    pub scroll_offset: usize,
    /// Spinner frame counter
    pub tick: usize,
    pub should_quit: bool,
}

impl TuiState {
    pub fn new(snapshot: DebateSnapshot) -> Self {
        Self {
            snapshot,
            input: String::new(),
            input_error: None,
            scroll_offset: 0,
            tick: 0,
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'));

        match self.snapshot.phase {
            DebatePhase::AwaitingTopic => self.handle_input_key(key, ctrl_c),
            DebatePhase::Running => {
                if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Some(Action::Stop);
                }
                self.scroll(key.code);
                None
            }
            DebatePhase::Stopped => Some(Action::Quit),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, ctrl_c: bool) -> Option<Action> {
        if ctrl_c || key.code == KeyCode::Esc {
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Enter => return Some(Action::Submit(self.input.clone())),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.input.chars().count() < MAX_TOPIC_CHARS {
                    self.input.push(c);
                }
            }
            _ => return None,
        }
        self.input_error = None;
        None
    }

    fn scroll(&mut self, code: KeyCode) {
        self.scroll_offset = match code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll_offset.saturating_add(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_offset.saturating_sub(1),
            KeyCode::PageUp => self.scroll_offset.saturating_add(PAGE),
            KeyCode::PageDown => self.scroll_offset.saturating_sub(PAGE),
            KeyCode::Home | KeyCode::Char('g') => usize::MAX,
            KeyCode::End | KeyCode::Char('G') => 0,
            _ => return,
        };
    }

    /// Keep the offset within what the last frame could show.
    pub fn clamp_scroll(&mut self, max_scroll: usize) {
        self.scroll_offset = self.scroll_offset.min(max_scroll);
    }
}

/// Main TUI application
pub struct TuiApp {
    handle: DebateHandle,
    state: TuiState,
}

impl TuiApp {
    pub fn new(handle: DebateHandle) -> Self {
        let state = TuiState::new(handle.snapshot());
        Self { handle, state }
    }

    /// Run until the user quits. The terminal is restored even on error.
    pub async fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook to restore terminal
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(info);
        }));

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(300));

        loop {
            let mut max_scroll = 0;
            terminal.draw(|frame| {
                max_scroll = view::render(frame, &self.state);
            })?;
            self.state.clamp_scroll(max_scroll);

            if self.state.should_quit {
                break;
            }

            tokio::select! {
                Some(event) = events.next() => {
                    if let Event::Key(key) = event? {
                        if let Some(action) = self.state.handle_key(key) {
                            self.perform(action).await;
                        }
                    }
                }

                snapshot = self.handle.changed() => match snapshot {
                    Some(snapshot) => self.state.snapshot = snapshot,
                    None => self.state.should_quit = true,
                },

                _ = tick.tick() => {
                    self.state.tick = self.state.tick.wrapping_add(1);
                }
            }
        }

        Ok(())
    }

    async fn perform(&mut self, action: Action) {
        match action {
            Action::Submit(topic) => match self.handle.submit(topic).await {
                Ok(()) => {
                    self.state.input.clear();
                    self.state.input_error = None;
                    self.state.snapshot = self.handle.snapshot();
                }
                Err(e) => self.state.input_error = Some(e.to_string()),
            },
            Action::Stop => self.handle.stop().await,
            Action::Quit => {
                self.handle.stop().await;
                self.state.should_quit = true;
            }
        }
    }
}
