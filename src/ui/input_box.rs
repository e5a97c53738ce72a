//! Editable input area backed by `tui-textarea`.
//!
//! The text area is the editing surface only. Whatever the user types is run
//! through the input budget afterwards, and if the budget accepted something
//! different the area is rebuilt from the accepted text.

use ratatui::style::{Modifier, Style};
use tui_textarea::{CursorMove, Input, TextArea};

/// Rows the input box grows to before it starts scrolling.
pub const MAX_VISIBLE_INPUT_LINES: u16 = 6;

const PLACEHOLDER: &str = "Ask Tony something...";

pub struct InputBox {
    textarea: TextArea<'static>,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        let mut input = Self {
            textarea: TextArea::default(),
        };
        input.configure();
        input
    }

    fn configure(&mut self) {
        self.textarea.set_cursor_line_style(Style::default());
        self.textarea
            .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        self.textarea.set_placeholder_text(PLACEHOLDER);
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.textarea.lines().iter().all(|line| line.is_empty())
    }

    /// Feed a key to the editor. Returns whether the text changed.
    pub fn input(&mut self, input: impl Into<Input>) -> bool {
        self.textarea.input(input)
    }

    pub fn insert_newline(&mut self) {
        self.textarea.insert_newline();
    }

    pub fn insert_str(&mut self, text: &str) -> bool {
        self.textarea.insert_str(text)
    }

    /// Replace the contents and park the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        let lines: Vec<String> = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        self.textarea = TextArea::from(lines);
        self.textarea.move_cursor(CursorMove::Bottom);
        self.textarea.move_cursor(CursorMove::End);
        self.configure();
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    /// Rows needed to show the text, capped at [`MAX_VISIBLE_INPUT_LINES`].
    pub fn visible_rows(&self) -> u16 {
        let lines = u16::try_from(self.textarea.lines().len()).unwrap_or(u16::MAX);
        lines.clamp(1, MAX_VISIBLE_INPUT_LINES)
    }
}
