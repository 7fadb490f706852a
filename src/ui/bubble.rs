//! Message bubble rendering: fenced-code segmentation, word wrapping, and the
//! character-by-character reveal applied to assistant replies.

use std::collections::HashMap;

use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::events::Sender;
use crate::store::{Message, MessageId};
use crate::theme::Theme;

const FENCE: &str = "```";

/// One rendered slice of a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code(String),
}

/// Split a message body on paired triple-backtick fences.
///
/// An unterminated fence is kept as literal text, backticks included; the
/// renderer never guesses a closing fence.
pub fn split_fenced(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };

        if open > 0 {
            segments.push(Segment::Text(rest[..open].to_string()));
        }
        segments.push(Segment::Code(after_open[..close].to_string()));
        rest = &after_open[close + FENCE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }

    segments
}

#[derive(Debug, Clone)]
struct RevealState {
    /// The exact text this entry was keyed on
    text: String,
    revealed: usize,
}

/// Progressive reveal state for assistant messages, keyed by message id.
///
/// Purely local render state: it never touches the store and is independent of
/// the settle timer. One character is revealed per render tick.
#[derive(Debug, Default)]
pub struct Typewriter {
    entries: HashMap<MessageId, RevealState>,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the reveal for one message by a single character
    pub fn tick(&mut self, message: &Message) {
        let entry = self.entries.entry(message.id).or_insert_with(|| RevealState {
            text: message.text.clone(),
            revealed: 0,
        });

        // Text identity changed: start the reveal over.
        if entry.text != message.text {
            entry.text = message.text.clone();
            entry.revealed = 0;
        }

        if entry.revealed < entry.text.chars().count() {
            entry.revealed += 1;
        }
    }

    /// How many characters of this message should be visible right now
    pub fn revealed(&self, message: &Message) -> usize {
        match self.entries.get(&message.id) {
            Some(entry) if entry.text == message.text => entry.revealed,
            _ => 0,
        }
    }

    #[allow(dead_code)]
    pub fn is_revealing(&self, message: &Message) -> bool {
        self.revealed(message) < message.text.chars().count()
    }
}

/// Render one message into styled lines. `revealed` limits the visible prefix
/// (assistant messages mid-reveal); `None` renders the full text.
pub fn render_message(
    message: &Message,
    revealed: Option<usize>,
    theme: &Theme,
    width: u16,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let icon = match message.sender {
        Sender::User => "👤",
        Sender::Assistant => "🤖",
    };
    let timestamp = message.created_at.format("%H:%M:%S").to_string();
    let header = format!(
        "{} {} {} {}",
        icon,
        message.sender.display_name(),
        timestamp,
        "─".repeat(16)
    );
    lines.push(Line::from(vec![Span::styled(header, theme.dim())]));

    let body: String = match revealed {
        Some(count) => message.text.chars().take(count).collect(),
        None => message.text.clone(),
    };
    let mid_reveal = revealed.is_some_and(|count| count < message.text.chars().count());

    let body_style = content_style(message, theme);
    let wrap_width = width.saturating_sub(4) as usize;

    for segment in split_fenced(&body) {
        match segment {
            Segment::Text(text) => {
                for wrapped in wrap_text(&text, wrap_width) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(wrapped, body_style),
                    ]));
                }
            }
            Segment::Code(code) => {
                for code_line in code.trim_matches('\n').split('\n') {
                    lines.push(Line::from(vec![
                        Span::raw("    "),
                        Span::styled(code_line.to_string(), theme.code()),
                    ]));
                }
            }
        }
    }

    // Reveal cursor on the last line while the reply is still typing out.
    if mid_reveal {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled("▋", theme.accent()));
        }
    }

    lines
}

fn content_style(message: &Message, theme: &Theme) -> Style {
    if message.is_error {
        theme.error_text()
    } else {
        let style = match message.sender {
            Sender::User => theme.user_text(),
            Sender::Assistant => theme.assistant_text(),
        };
        if message.should_animate {
            style.patch(theme.entrance())
        } else {
            style
        }
    }
}

/// Word-wrap while preserving explicit newlines
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
