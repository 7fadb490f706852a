//! Sidebar: conversation history list and the new-chat affordance. Purely
//! presentational; selection is routed back to the store by the app.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::store::{Conversation, ConversationId};
use crate::theme::Theme;

/// Actions requested through the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarAction {
    Select(ConversationId),
    NewChat,
}

pub struct Sidebar {
    /// Index of the hovered entry, clamped to the list on render
    hovered: usize,
}

impl Sidebar {
    pub fn new() -> Self {
        Self { hovered: 0 }
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        conversations: &[Conversation],
    ) -> Option<SidebarAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Up => {
                self.hovered = self.hovered.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                if !conversations.is_empty() {
                    self.hovered = (self.hovered + 1).min(conversations.len() - 1);
                }
                None
            }
            KeyCode::Enter => conversations
                .get(self.hovered)
                .map(|convo| SidebarAction::Select(convo.id)),
            KeyCode::Char('n') => Some(SidebarAction::NewChat),
            _ => None,
        }
    }

    pub fn render(
        &self,
        area: Rect,
        buf: &mut Buffer,
        conversations: &[Conversation],
        active_id: Option<ConversationId>,
        theme: &Theme,
        focused: bool,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("History")
            .style(if focused { theme.accent() } else { theme.dim() });
        let inner = block.inner(area);
        block.render(area, buf);

        if conversations.is_empty() {
            let line = Line::from(vec![Span::styled("No conversations yet", theme.dim())]);
            buf.set_line(inner.x, inner.y, &line, inner.width);
        } else {
            let hovered = self.hovered.min(conversations.len() - 1);
            let list_height = inner.height.saturating_sub(2) as usize;

            for (i, convo) in conversations.iter().take(list_height).enumerate() {
                let is_active = active_id == Some(convo.id);
                let marker = if is_active { "● " } else { "  " };

                let style = if focused && i == hovered {
                    theme.selection()
                } else if is_active {
                    theme.accent()
                } else {
                    theme.base()
                };

                let line = Line::from(vec![
                    Span::styled(marker, theme.accent()),
                    Span::styled(convo.title.clone(), style),
                ]);
                buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
            }
        }

        // Key hints pinned to the bottom of the pane.
        if inner.height >= 2 {
            let hints = Line::from(vec![Span::styled(
                format!("n new · ^T {} · ^Q quit", theme.toggled().display_name()),
                theme.dim(),
            )]);
            buf.set_line(inner.x, inner.y + inner.height - 1, &hints, inner.width);
        }
    }
}

impl Default for Sidebar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_selects_the_hovered_conversation() {
        let mut store = Store::new();
        store.submit_user_message("older");
        store.finish_loading();
        store.start_new_chat();
        let newer = store.submit_user_message("newer");
        store.finish_loading();

        let mut sidebar = Sidebar::new();
        let action = sidebar.handle_key(press(KeyCode::Enter), store.conversations());
        // Newest conversation sits at the top of the list.
        assert_eq!(action, Some(SidebarAction::Select(newer)));
    }

    #[test]
    fn hover_moves_within_bounds() {
        let mut store = Store::new();
        store.submit_user_message("only");
        store.finish_loading();

        let mut sidebar = Sidebar::new();
        sidebar.handle_key(press(KeyCode::Down), store.conversations());
        sidebar.handle_key(press(KeyCode::Down), store.conversations());
        let action = sidebar.handle_key(press(KeyCode::Enter), store.conversations());
        assert!(matches!(action, Some(SidebarAction::Select(_))));
    }

    #[test]
    fn n_requests_a_new_chat() {
        let sidebar = &mut Sidebar::new();
        let action = sidebar.handle_key(press(KeyCode::Char('n')), &[]);
        assert_eq!(action, Some(SidebarAction::NewChat));
    }
}
