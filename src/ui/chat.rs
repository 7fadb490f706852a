//! Chat pane: the welcome screen with prompt starters, or the active
//! conversation's messages with a loading spinner while a reply is in flight.

use once_cell::sync::Lazy;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::events::Sender;
use crate::store::Store;
use crate::theme::Theme;
use crate::ui::bubble::{Typewriter, render_message};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// One clickable suggestion on the welcome screen
#[derive(Debug, Clone, Copy)]
pub struct PromptStarter {
    pub display_text: &'static str,
    pub full_text: &'static str,
}

pub static PROMPT_STARTERS: Lazy<Vec<PromptStarter>> = Lazy::new(|| {
    vec![
        PromptStarter {
            display_text: "Explain a concept",
            full_text: "Can you explain a concept to me in simple terms?",
        },
        PromptStarter {
            display_text: "Review some code",
            full_text: "I would like you to review a piece of code for me.",
        },
        PromptStarter {
            display_text: "Draft a message",
            full_text: "Help me draft a short, clear message.",
        },
    ]
});

/// Full prompt text for a welcome-screen starter, if the index exists
pub fn prompt_starter(index: usize) -> Option<&'static str> {
    PROMPT_STARTERS.get(index).map(|p| p.full_text)
}

pub struct ChatView {
    typewriter: Typewriter,
    spinner_frame: usize,
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            typewriter: Typewriter::new(),
            spinner_frame: 0,
        }
    }

    /// Render tick: advance the spinner and the reveal of assistant messages
    /// in the active conversation
    pub fn tick(&mut self, store: &Store) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();

        if let Some(convo) = store.active_conversation() {
            for message in &convo.messages {
                if message.sender == Sender::Assistant {
                    self.typewriter.tick(message);
                }
            }
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, store: &Store, theme: &Theme) {
        match store.active_conversation() {
            Some(convo) => {
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(convo.title.clone())
                    .style(theme.dim());
                let inner = block.inner(area);
                block.render(area, buf);

                let mut all_lines: Vec<Line> = Vec::new();
                for message in &convo.messages {
                    let revealed = match message.sender {
                        Sender::Assistant => Some(self.typewriter.revealed(message)),
                        Sender::User => None,
                    };
                    all_lines.extend(render_message(message, revealed, theme, inner.width));
                    all_lines.push(Line::from(vec![Span::raw("")]));
                }

                if store.is_loading() {
                    all_lines.push(Line::from(vec![
                        Span::styled(SPINNER_FRAMES[self.spinner_frame], theme.accent()),
                        Span::styled(" thinking...", theme.dim()),
                    ]));
                }

                // Follow the newest message: show the bottom of the transcript.
                let height = inner.height as usize;
                let start = all_lines.len().saturating_sub(height);
                for (i, line) in all_lines[start..].iter().enumerate() {
                    buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
                }
            }
            None => self.render_welcome(area, buf, theme),
        }
    }

    fn render_welcome(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Parley")
            .style(theme.dim());
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = vec![
            Line::from(vec![Span::styled(
                "Welcome to Parley 💬",
                theme.accent(),
            )]),
            Line::from(vec![Span::raw("")]),
            Line::from(vec![Span::styled(
                "Ask anything below, or start from a suggestion:",
                theme.dim(),
            )]),
            Line::from(vec![Span::raw("")]),
        ];

        for (i, starter) in PROMPT_STARTERS.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("  [{}] ", i + 1), theme.accent()),
                Span::styled(starter.display_text, theme.base()),
            ]));
        }

        lines.push(Line::from(vec![Span::raw("")]));
        lines.push(Line::from(vec![Span::styled(
            "Enter sends · Shift+Enter inserts a newline · / for commands · Tab then 1-3 picks a suggestion",
            theme.dim(),
        )]));

        // Centered vertically, left-aligned like the rest of the pane.
        let top = inner.y + inner.height.saturating_sub(lines.len() as u16) / 2;
        for (i, line) in lines.iter().enumerate() {
            if (i as u16) < inner.height {
                buf.set_line(inner.x + 2, top + i as u16, line, inner.width);
            }
        }
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_starters_cover_keys_one_to_three() {
        assert!(prompt_starter(0).is_some());
        assert!(prompt_starter(1).is_some());
        assert!(prompt_starter(2).is_some());
        assert!(prompt_starter(3).is_none());
    }

    #[test]
    fn ticking_reveals_assistant_text_gradually() {
        let mut store = Store::new();
        let id = store.submit_user_message("question");
        store.append_reply(id, "answer".to_string(), false);
        store.finish_loading();

        let mut view = ChatView::new();
        view.tick(&store);

        let reply = &store.active_conversation().unwrap().messages[1];
        assert_eq!(view.typewriter.revealed(reply), 1);
    }
}
