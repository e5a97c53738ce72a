//! Event polling and redraw loop for the chat interface.
//!
//! Terminal events arrive over an mpsc channel from a reader task, transport
//! messages arrive from [`ChatStreamService`]. Both are applied to the
//! [`App`] on this task only, then the frame is redrawn.

use std::{
    error::Error,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::app::App;
use crate::core::chat_stream::{ChatStreamService, StreamParams};
use crate::core::config::ResolvedSettings;
use crate::ui::input_box::InputBox;
use crate::ui::lifecycle::{restore_terminal, setup_terminal};
use crate::ui::renderer::{ui, ChatView};
use crate::utils::input::sanitize_text_input;

const PULSE_FRAME: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

/// What a key press means to the chat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyCommand {
    Quit,
    Submit,
    Newline,
    ScrollUp(u16),
    ScrollDown(u16),
    ScrollToBottom,
    Edit,
}

fn classify_key(key: &KeyEvent, page: u16) -> KeyCommand {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyCommand::Quit,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            KeyCommand::Newline
        }
        KeyCode::Enter => KeyCommand::Submit,
        KeyCode::PageUp => KeyCommand::ScrollUp(page),
        KeyCode::PageDown => KeyCommand::ScrollDown(page),
        KeyCode::Up if ctrl => KeyCommand::ScrollUp(1),
        KeyCode::Down if ctrl => KeyCommand::ScrollDown(1),
        KeyCode::End if ctrl => KeyCommand::ScrollToBottom,
        _ => KeyCommand::Edit,
    }
}

/// Mutable UI state that lives outside the [`App`].
struct ChatLoopState {
    input: InputBox,
    scroll_from_bottom: u16,
    pulse_start: Instant,
}

impl ChatLoopState {
    fn new() -> Self {
        Self {
            input: InputBox::new(),
            scroll_from_bottom: 0,
            pulse_start: Instant::now(),
        }
    }

    fn scroll_up(&mut self, rows: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(rows);
    }

    fn scroll_down(&mut self, rows: u16) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(rows);
    }

    fn follow_tail(&mut self) {
        self.scroll_from_bottom = 0;
    }
}

/// Run the edited text through the budget and write back whatever it kept.
fn sync_input_with_budget(app: &mut App, input: &mut InputBox) {
    let proposed = input.text();
    let accepted = app.on_input_change(&proposed);
    if accepted != proposed {
        debug!(
            proposed_len = proposed.len(),
            accepted_len = accepted.len(),
            "input rewritten by token budget"
        );
        let accepted = accepted.to_string();
        input.set_text(&accepted);
    }
}

/// Submit the committed input; the box is cleared only if a request went out.
fn submit_input(app: &mut App, state: &mut ChatLoopState) -> Option<StreamParams> {
    let params = app.submit()?;
    state.input.clear();
    state.follow_tail();
    state.pulse_start = Instant::now();
    Some(params)
}

fn handle_key(
    app: &mut App,
    state: &mut ChatLoopState,
    stream_service: &ChatStreamService,
    key: KeyEvent,
    page: u16,
) {
    match classify_key(&key, page) {
        KeyCommand::Quit => app.request_exit(),
        KeyCommand::Submit => {
            if let Some(params) = submit_input(app, state) {
                stream_service.spawn_stream(params);
            }
        }
        KeyCommand::Newline => {
            state.input.insert_newline();
            sync_input_with_budget(app, &mut state.input);
        }
        KeyCommand::ScrollUp(rows) => state.scroll_up(rows),
        KeyCommand::ScrollDown(rows) => state.scroll_down(rows),
        KeyCommand::ScrollToBottom => state.follow_tail(),
        KeyCommand::Edit => {
            if state.input.input(key) {
                sync_input_with_budget(app, &mut state.input);
            }
        }
    }
}

fn handle_paste(app: &mut App, state: &mut ChatLoopState, text: &str) {
    let sanitized = sanitize_text_input(text);
    if state.input.insert_str(&sanitized) {
        sync_input_with_budget(app, &mut state.input);
    }
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(settings: ResolvedSettings) -> Result<(), Box<dyn Error>> {
    let mut app = App::from_settings(&settings)?;
    let mut state = ChatLoopState::new();

    let mut terminal = setup_terminal()?;

    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);
    let mut pulse = tokio::time::interval(PULSE_FRAME);

    let result: Result<(), Box<dyn Error>> = loop {
        let page = terminal
            .size()
            .map(|size| size.height.saturating_sub(4).max(1))
            .unwrap_or(10);

        let drawn = terminal.draw(|f| {
            ui(
                f,
                &ChatView {
                    app: &app,
                    input: &state.input,
                    scroll_from_bottom: state.scroll_from_bottom,
                    pulse_elapsed: state.pulse_start.elapsed(),
                },
            )
        });
        if let Err(e) = drawn {
            break Err(e.into());
        }

        tokio::select! {
            Some(ev) = event_rx.recv() => match ev {
                UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, &mut state, &stream_service, key, page);
                }
                UiEvent::Crossterm(Event::Paste(text)) => handle_paste(&mut app, &mut state, &text),
                UiEvent::Crossterm(_) => {}
            },
            Some((message, stream_id)) = stream_rx.recv() => {
                app.handle_stream_message(message, stream_id);
            }
            _ = pulse.tick(), if app.is_busy() => {}
            else => break Ok(()),
        }

        if app.exit_requested {
            break Ok(());
        }
    };

    app.request_exit();
    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    result
}
