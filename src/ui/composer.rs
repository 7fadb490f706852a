//! Input composer: draft editing, submit, clipboard paste, and the slash
//! command palette.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::theme::Theme;
use crate::ui::commands::{CommandEntry, ParsedCommand, command_entries, parse_slash_command};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Trimmed, non-empty message text ready to submit
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Text input area at the bottom of the chat pane.
///
/// While a reply fetch is in flight the composer is disabled; that boundary is
/// what keeps submissions single-flight, the store itself does not gate them.
pub struct Composer {
    content: String,
    /// Cursor position in characters, not bytes
    cursor: usize,
    enabled: bool,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    palette_open: bool,
    selected_command: Option<usize>,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            enabled: true,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            palette_open: false,
            selected_command: None,
        }
    }

    /// Enable or disable input; disabled while a reply fetch is outstanding
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[allow(dead_code)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append pasted text to the current draft
    pub fn paste(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        self.content.push_str(text);
        self.cursor = self.content.chars().count();
        if self.palette_open {
            self.close_palette();
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press || !self.enabled {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if self.palette_open {
                    self.apply_selected_command();
                } else if !self.content.trim().is_empty() {
                    let content = self.content.trim().to_string();
                    self.content.clear();
                    self.cursor = 0;
                    self.close_palette();
                    if let Some(command) = parse_slash_command(&content) {
                        return ComposerResult::Command(command);
                    }
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Up if self.palette_open => self.move_selection(-1),
            KeyCode::Down if self.palette_open => self.move_selection(1),
            KeyCode::Esc if self.palette_open => self.close_palette(),
            KeyCode::Tab if self.palette_open => {
                self.apply_selected_command();
            }
            KeyCode::Char(c) => {
                self.insert_char(c);
                self.sync_palette(c.is_whitespace());
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = byte_index(&self.content, self.cursor);
                    self.content.remove(at);
                    self.sync_palette(false);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.content.chars().count() {
                    let at = byte_index(&self.content, self.cursor);
                    self.content.remove(at);
                    self.sync_palette(false);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.cursor < self.content.chars().count() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.content.chars().count(),
            _ => {}
        }

        ComposerResult::None
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn palette_is_open(&self) -> bool {
        self.palette_open
    }

    fn insert_char(&mut self, c: char) {
        let at = byte_index(&self.content, self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Keep the palette in sync with the draft after an edit. The palette
    /// opens only on a bare "/" draft; once a command keyword is completed,
    /// typing arguments does not reopen it.
    fn sync_palette(&mut self, typed_whitespace: bool) {
        if self.palette_open {
            if !self.content.starts_with('/') || typed_whitespace {
                self.close_palette();
            } else {
                self.refresh_palette();
            }
        } else if self.content == "/" {
            self.open_palette();
        }
    }

    fn open_palette(&mut self) {
        self.palette_open = true;
        self.selected_command = Some(0);
        self.refresh_palette();
    }

    fn refresh_palette(&mut self) {
        let query = self.content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .copied()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn close_palette(&mut self) {
        self.palette_open = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn move_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len);
        self.selected_command = Some(next as usize);
    }

    fn apply_selected_command(&mut self) {
        let Some(index) = self.selected_command else {
            return;
        };
        let Some(entry) = self.filtered_commands.get(index).copied() else {
            return;
        };

        self.content = format!("/{} ", entry.keyword);
        self.cursor = self.content.chars().count();
        self.close_palette();
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, focused: bool) {
        let title = if self.enabled {
            "Message"
        } else {
            "Message (waiting for reply...)"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if focused && self.enabled {
                theme.accent()
            } else {
                theme.dim()
            });

        let inner = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder = if self.enabled {
                "Ask your question... (/ for commands)"
            } else {
                "The assistant is typing..."
            };
            let line = Line::from(vec![Span::styled(placeholder, theme.dim())]);
            buf.set_line(inner.x, inner.y, &line, inner.width);
        } else {
            let mut content = self.content.clone();
            if focused && self.enabled {
                let at = byte_index(&content, self.cursor);
                content.insert(at, '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner.height as usize {
                    let line = Line::from(vec![Span::styled(line_text.to_string(), theme.base())]);
                    buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
                }
            }
        }

        if self.palette_open {
            self.render_palette(inner, buf, theme);
        }
    }

    fn render_palette(&self, inner: Rect, buf: &mut Buffer, theme: &Theme) {
        let palette_height = (self.filtered_commands.len().min(5) + 2) as u16;
        let palette_area = Rect {
            x: inner.x,
            y: inner.y.saturating_sub(palette_height),
            width: inner.width,
            height: palette_height,
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Commands")
            .style(theme.accent());
        let palette_inner = block.inner(palette_area);
        block.render(palette_area, buf);

        for (index, entry) in self.filtered_commands.iter().enumerate() {
            if index >= palette_inner.height as usize {
                break;
            }

            let style = if self.selected_command == Some(index) {
                theme.selection()
            } else {
                theme.base()
            };

            let line = Line::from(vec![
                Span::styled(format!("/{}", entry.keyword), style),
                Span::styled(" — ", theme.dim()),
                Span::styled(entry.description, theme.dim()),
            ]);
            buf.set_line(
                palette_inner.x,
                palette_inner.y + index as u16,
                &line,
                palette_inner.width,
            );
        }
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset of the given character position
fn byte_index(content: &str, char_pos: usize) -> usize {
    content
        .char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(content.len())
}
