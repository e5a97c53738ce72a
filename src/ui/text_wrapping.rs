//! Word wrapping for the transcript.
//!
//! Lines are broken at word boundaries before they reach ratatui, and the
//! `Paragraph` renders them without wrapping. The row count used for
//! scrolling is then the number of lines produced here, so it always agrees
//! with what is drawn.

use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

type StyledChar = (char, Style);

/// Wrap every line to `width` columns.
pub fn wrap_lines(lines: &[Line<'static>], width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    lines.iter().flat_map(|line| wrap_line(line, width)).collect()
}

/// Wrap one line into rows of at most `width` columns.
///
/// Words move to the next row whole unless they are wider than a row, in
/// which case they are broken by character. A single space at a break is
/// dropped.
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let chars: Vec<StyledChar> = line
        .spans
        .iter()
        .flat_map(|span| {
            let style = line.style.patch(span.style);
            span.content.chars().map(move |ch| (ch, style))
        })
        .collect();

    let mut builder = RowBuilder::new(width.max(1));
    let mut rest = chars.as_slice();
    while let Some(&(first, _)) = rest.first() {
        let is_space = first.is_whitespace();
        let len = rest
            .iter()
            .position(|&(ch, _)| ch.is_whitespace() != is_space)
            .unwrap_or(rest.len());
        let (segment, tail) = rest.split_at(len);
        if is_space {
            builder.handle_spaces(segment);
        } else {
            builder.handle_word(segment);
        }
        rest = tail;
    }
    builder.finish()
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

struct RowBuilder {
    width: usize,
    rows: Vec<Vec<StyledChar>>,
    current: Vec<StyledChar>,
    current_width: usize,
}

impl RowBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            rows: Vec::new(),
            current: Vec::new(),
            current_width: 0,
        }
    }

    fn handle_word(&mut self, word: &[StyledChar]) {
        let word_width: usize = word.iter().map(|&(ch, _)| char_width(ch)).sum();
        if word_width > self.width {
            self.handle_long_word(word);
            return;
        }
        if self.current_width + word_width > self.width {
            self.break_row();
        }
        self.push_all(word, word_width);
    }

    fn handle_long_word(&mut self, word: &[StyledChar]) {
        for &(ch, style) in word {
            let w = char_width(ch);
            if self.current_width + w > self.width && self.current_width > 0 {
                self.break_row();
            }
            self.current.push((ch, style));
            self.current_width += w;
        }
    }

    fn handle_spaces(&mut self, spaces: &[StyledChar]) {
        // A lone space that would end the row is swallowed by the break.
        if spaces.len() == 1 && self.current_width + 1 > self.width {
            self.break_row();
            return;
        }
        for &(ch, style) in spaces {
            let w = char_width(ch).max(1);
            if self.current_width + w > self.width {
                self.break_row();
            }
            self.current.push((ch, style));
            self.current_width += w;
        }
    }

    fn push_all(&mut self, chars: &[StyledChar], width: usize) {
        self.current.extend_from_slice(chars);
        self.current_width += width;
    }

    fn break_row(&mut self) {
        let mut row = std::mem::take(&mut self.current);
        if row.last().is_some_and(|&(ch, _)| ch == ' ') {
            row.pop();
        }
        self.rows.push(row);
        self.current_width = 0;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() || self.rows.is_empty() {
            self.rows.push(std::mem::take(&mut self.current));
        }
        self.rows.into_iter().map(row_to_line).collect()
    }
}

fn row_to_line(row: Vec<StyledChar>) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut style = None;
    for (ch, ch_style) in row {
        if style.is_some_and(|s| s != ch_style) {
            spans.push(Span::styled(std::mem::take(&mut text), style.unwrap_or_default()));
        }
        style = Some(ch_style);
        text.push(ch);
    }
    if let Some(style) = style {
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn row_texts(line: &Line<'static>, width: usize) -> Vec<String> {
        wrap_line(line, width)
            .iter()
            .map(|row| row.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn words_move_to_the_next_row_whole() {
        let line = Line::from("fuggedaboutit you mook");
        assert_eq!(row_texts(&line, 16), vec!["fuggedaboutit", "you mook"]);
    }

    #[test]
    fn single_space_is_dropped_at_a_break() {
        let line = Line::from("abcd efgh");
        assert_eq!(row_texts(&line, 4), vec!["abcd", "efgh"]);
    }

    #[test]
    fn long_words_break_by_character() {
        let line = Line::from("x".repeat(25));
        assert_eq!(
            row_texts(&line, 10),
            vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]
        );
    }

    #[test]
    fn empty_line_still_takes_a_row() {
        assert_eq!(row_texts(&Line::default(), 10), vec![String::new()]);
    }

    #[test]
    fn double_width_characters_count_as_two_columns() {
        let line = Line::from("🍝🍝🍝");
        assert_eq!(row_texts(&line, 4), vec!["🍝🍝", "🍝"]);
    }

    #[test]
    fn repeated_phrase_wraps_one_phrase_per_row() {
        let line = Line::from("abcdefg hijklmn ".repeat(40) + "TAILMARK");
        let rows = row_texts(&line, 20);
        assert_eq!(rows.len(), 41);
        assert!(rows[..40].iter().all(|row| row == "abcdefg hijklmn"));
        assert_eq!(rows[40], "TAILMARK");
    }

    #[test]
    fn styles_survive_wrapping() {
        let bold = Style::default().fg(Color::Magenta);
        let line = Line::from(vec![Span::styled("Tony", bold), Span::raw(" 12:30")]);
        let rows = wrap_line(&line, 5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans[0].style, bold);
        assert_eq!(rows[1].spans[0].content, "12:30");
    }

    #[test]
    fn wrap_lines_never_exceeds_the_width() {
        let lines = vec![
            Line::from("one two three four five six seven"),
            Line::default(),
            Line::from("a".repeat(33)),
        ];
        for row in wrap_lines(&lines, 7) {
            assert!(row.width() <= 7);
        }
    }
}
