use std::time::Duration;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::core::admission::InputBudgetState;
use crate::core::app::App;
use crate::core::constants::{INDICATOR_SPACE, LIMIT_REACHED_NOTICE};
use crate::core::message::{ConversationLog, Role};
use crate::ui::input_box::InputBox;
use crate::ui::text_wrapping::wrap_lines;

const STREAMING_CURSOR: &str = "▌";

/// Everything a frame needs, borrowed from the chat loop.
pub struct ChatView<'a> {
    pub app: &'a App,
    pub input: &'a InputBox,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_from_bottom: u16,
    /// Time since the current exchange started, drives the pulse indicator.
    pub pulse_elapsed: Duration,
}

pub fn ui(f: &mut Frame, view: &ChatView) {
    let input_height = view.input.visible_rows();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(input_height + 2), // +2 for borders
        ])
        .split(f.area());

    render_transcript(f, view, chunks[0]);
    render_input(f, view, chunks[1]);
}

fn render_transcript(f: &mut Frame, view: &ChatView, area: Rect) {
    let lines = build_transcript_lines(view.app.log(), view.app.is_busy());
    let rows = wrap_lines(&lines, area.width);

    let title = format!("jerseychat v{} - Tony Soprano", env!("CARGO_PKG_VERSION"));
    let available_height = area.height.saturating_sub(1); // Account for title
    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    let max_offset = total.saturating_sub(available_height);
    let scroll_offset = max_offset.saturating_sub(view.scroll_from_bottom);

    let transcript = Paragraph::new(rows)
        .block(Block::default().title(title))
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, area);
}

fn render_input(f: &mut Frame, view: &ChatView, area: Rect) {
    let state = view.app.input();
    let busy = view.app.is_busy();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Reset))
        .title(input_title(state, view.app.budget.max_tokens(), busy));
    if state.limit_reached {
        block = block.title_bottom(
            Line::from(Span::styled(
                LIMIT_REACHED_NOTICE,
                Style::default().fg(Color::Yellow),
            ))
            .right_aligned(),
        );
    }

    let inner = block.inner(area);
    f.render_widget(block, area);

    if busy && inner.width > INDICATOR_SPACE {
        let parts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(INDICATOR_SPACE)])
            .split(inner);
        f.render_widget(view.input.textarea(), parts[0]);
        let indicator = Paragraph::new(format!(" {} ", pulse_symbol(view.pulse_elapsed)))
            .style(Style::default().fg(Color::Cyan));
        f.render_widget(indicator, parts[1]);
    } else {
        f.render_widget(view.input.textarea(), inner);
    }
}

/// Title for the input box, carrying the live token counter.
pub fn input_title(state: &InputBudgetState, max_tokens: usize, busy: bool) -> String {
    let hint = if busy {
        "Tony's talking... (Shift+Enter for new line, Ctrl+C to quit)"
    } else {
        "Type your message (Enter to send, Shift+Enter for new line, Ctrl+C to quit)"
    };
    format!("{hint} • tokens {}/{max_tokens}", state.token_count)
}

/// Flatten the conversation log into display lines.
///
/// While an exchange is in flight the trailing assistant entry gets a
/// streaming cursor so an empty placeholder is still visible.
pub fn build_transcript_lines(log: &ConversationLog, streaming: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let last_index = log.last_index();

    for (index, entry) in log.entries().iter().enumerate() {
        let (label, color) = match entry.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("Tony", Color::Magenta),
        };
        lines.push(Line::from(vec![
            Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}", entry.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let show_cursor = streaming && entry.is_assistant() && Some(index) == last_index;
        let mut body: Vec<Line<'static>> = entry
            .content
            .split('\n')
            .map(|text| Line::from(text.to_string()))
            .collect();
        if show_cursor {
            if let Some(last) = body.last_mut() {
                last.push_span(Span::styled(
                    STREAMING_CURSOR,
                    Style::default().fg(Color::Magenta),
                ));
            }
        }
        lines.extend(body);
        lines.push(Line::default());
    }

    lines
}

/// Pulsing indicator shown while a reply streams, two cycles per second.
pub fn pulse_symbol(elapsed: Duration) -> &'static str {
    let phase = (elapsed.as_millis() % 500) as f32 / 250.0;
    let intensity = if phase < 1.0 { phase } else { 2.0 - phase };
    if intensity < 0.33 {
        "○"
    } else if intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat_stream::{ResponseMode, StreamMessage};
    use crate::core::constants::GREETING;
    use crate::core::message::ConversationEntry;
    use bytes::Bytes;
    use ratatui::{backend::TestBackend, Terminal};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn transcript_has_header_body_and_spacer_per_entry() {
        let mut log = ConversationLog::seeded(GREETING);
        log.push(ConversationEntry::user("what's up\nwith you"));

        let lines = build_transcript_lines(&log, false);
        assert_eq!(lines.len(), 3 + 4);
        assert!(line_text(&lines[0]).starts_with("Tony "));
        assert_eq!(line_text(&lines[1]), GREETING);
        assert!(line_text(&lines[3]).starts_with("You "));
        assert_eq!(line_text(&lines[4]), "what's up");
        assert_eq!(line_text(&lines[5]), "with you");
    }

    #[test]
    fn streaming_cursor_marks_trailing_assistant_entry_only() {
        let mut log = ConversationLog::seeded(GREETING);
        log.push(ConversationEntry::user("hi"));
        log.push(ConversationEntry::assistant(""));

        let lines = build_transcript_lines(&log, true);
        let cursor_lines: Vec<String> = lines
            .iter()
            .map(line_text)
            .filter(|text| text.contains(STREAMING_CURSOR))
            .collect();
        assert_eq!(cursor_lines, vec![STREAMING_CURSOR.to_string()]);

        let idle = build_transcript_lines(&log, false);
        assert!(idle
            .iter()
            .all(|line| !line_text(line).contains(STREAMING_CURSOR)));
    }

    #[test]
    fn no_cursor_when_last_entry_is_from_user() {
        let mut log = ConversationLog::seeded(GREETING);
        log.push(ConversationEntry::user("hi"));
        let lines = build_transcript_lines(&log, true);
        assert!(lines
            .iter()
            .all(|line| !line_text(line).contains(STREAMING_CURSOR)));
    }

    #[test]
    fn title_shows_token_counter() {
        let state = InputBudgetState {
            token_count: 42,
            ..Default::default()
        };
        assert!(input_title(&state, 512, false).ends_with("tokens 42/512"));
        assert!(input_title(&state, 512, true).starts_with("Tony's talking"));
    }

    #[test]
    fn pulse_cycles_through_symbols() {
        assert_eq!(pulse_symbol(Duration::from_millis(0)), "○");
        assert_eq!(pulse_symbol(Duration::from_millis(125)), "◐");
        assert_eq!(pulse_symbol(Duration::from_millis(250)), "●");
        assert_eq!(pulse_symbol(Duration::from_millis(500)), "○");
    }

    #[test]
    fn frame_renders_limit_notice_when_budget_is_exhausted() {
        let mut app = crate::utils::test_utils::create_test_app();
        app.on_input_change(&"z".repeat(40));
        let mut input = InputBox::new();
        input.set_text(app.input().raw_text.as_str());

        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|f| {
                ui(
                    f,
                    &ChatView {
                        app: &app,
                        input: &input,
                        scroll_from_bottom: 0,
                        pulse_elapsed: Duration::ZERO,
                    },
                )
            })
            .expect("draw");

        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("tokens 16/16"));
        assert!(rendered.contains("Character limit reached."));
        assert!(rendered.contains("Tony"));
    }

    #[test]
    fn long_reply_in_a_narrow_window_shows_its_tail() {
        let mut app = crate::utils::test_utils::create_test_app();
        app.on_input_change("talk to me");
        let params = app.submit().expect("dispatch");
        let reply = "abcdefg hijklmn ".repeat(40) + "TAILMARK";
        let event = format!("data: {}\n\n", serde_json::json!({ "token": reply }));
        app.handle_stream_message(
            StreamMessage::Opened(ResponseMode::EventStream),
            params.stream_id,
        );
        app.handle_stream_message(StreamMessage::Chunk(Bytes::from(event)), params.stream_id);
        app.handle_stream_message(StreamMessage::End, params.stream_id);
        assert!(!app.is_busy());
        let input = InputBox::new();

        let backend = TestBackend::new(20, 14);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|f| {
                ui(
                    f,
                    &ChatView {
                        app: &app,
                        input: &input,
                        scroll_from_bottom: 0,
                        pulse_elapsed: Duration::ZERO,
                    },
                )
            })
            .expect("draw");

        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(rendered.contains("TAILMARK"));
    }
}
