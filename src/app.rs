//! Main application loop: owns the store and all views, and is the single
//! writer for every state transition.

use std::io::{Stdout, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent,
        KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
};
use tokio::sync::mpsc;

use crate::backend::{HttpBackend, ReplyFetcher};
use crate::config::Config;
use crate::events::{AppEvent, Sender};
use crate::settle::SettleTimer;
use crate::store::Store;
use crate::theme::Theme;
use crate::ui::commands::{ParsedCommand, SlashCommand, get_help_text};
use crate::ui::{ChatView, Composer, ComposerResult, Sidebar, SidebarAction, chat};

/// Render tick; also the typewriter reveal speed (one character per tick)
const TICK_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Sidebar,
    Composer,
}

pub struct App {
    store: Store,
    config: Config,
    theme: Theme,
    fetcher: ReplyFetcher,
    settle: SettleTimer,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    sidebar: Sidebar,
    chat: ChatView,
    composer: Composer,
    focus: Focus,
    clipboard: Option<arboard::Clipboard>,
    /// Transient status text shown above the composer (help output, copy result)
    notice: Option<String>,
    should_exit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let backend = HttpBackend::new(config.endpoint.clone(), config.request_timeout())?;
        let fetcher = ReplyFetcher::new(Arc::new(backend), events_tx.clone());
        let settle = SettleTimer::new(events_tx);
        let theme = config.theme;

        Ok(Self {
            store: Store::new(),
            config,
            theme,
            fetcher,
            settle,
            events_rx,
            sidebar: Sidebar::new(),
            chat: ChatView::new(),
            composer: Composer::new(),
            focus: Focus::Composer,
            clipboard: arboard::Clipboard::new().ok(),
            notice: None,
            should_exit: false,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;
        let mut terminal =
            Terminal::new(CrosstermBackend::new(out)).context("Failed to create terminal")?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode().ok();
        execute!(stdout(), LeaveAlternateScreen, DisableBracketedPaste).ok();
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        let mut input = EventStream::new();
        let mut tick = tokio::time::interval(TICK_INTERVAL);

        while !self.should_exit {
            // Input boundary: submissions are disabled while a reply is in flight.
            self.composer.set_enabled(!self.store.is_loading());
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_terminal_event(event),
                    Some(Err(err)) => return Err(err).context("Terminal event stream failed"),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_app_event(event),
                _ = tick.tick() => self.chat.tick(&self.store),
            }
        }

        Ok(())
    }

    fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => self.composer.paste(&text),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_exit = true;
                    return;
                }
                KeyCode::Char('n') => {
                    self.start_new_chat();
                    return;
                }
                KeyCode::Char('t') => {
                    self.toggle_theme(None);
                    return;
                }
                KeyCode::Char('v') => {
                    self.paste_from_clipboard();
                    return;
                }
                _ => {}
            }
        }

        // Tab switches panes unless the command palette is using it.
        if key.code == KeyCode::Tab
            && !(self.focus == Focus::Composer && self.composer.palette_is_open())
        {
            self.focus = match self.focus {
                Focus::Sidebar => Focus::Composer,
                Focus::Composer => Focus::Sidebar,
            };
            return;
        }

        // Welcome screen: digits pick a prompt starter, but only from the
        // sidebar so a composer draft can start with a digit.
        if self.focus == Focus::Sidebar
            && self.store.active_conversation().is_none()
            && !self.store.is_loading()
        {
            if let KeyCode::Char(c @ '1'..='3') = key.code {
                let index = (c as usize) - ('1' as usize);
                if let Some(prompt) = chat::prompt_starter(index) {
                    self.submit(prompt.to_string());
                }
                return;
            }
        }

        match self.focus {
            Focus::Sidebar => {
                if let Some(action) = self.sidebar.handle_key(key, self.store.conversations()) {
                    match action {
                        SidebarAction::Select(id) => self.select_conversation(id),
                        SidebarAction::NewChat => self.start_new_chat(),
                    }
                }
            }
            Focus::Composer => match self.composer.handle_key(key) {
                ComposerResult::Submitted(text) => self.submit(text),
                ComposerResult::Command(command) => self.handle_command(command),
                ComposerResult::None => {
                    if key.code == KeyCode::Esc {
                        self.notice = None;
                    }
                }
            },
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ReplyArrived {
                conversation_id,
                text,
                is_error,
            } => {
                self.store.append_reply(conversation_id, text, is_error);
                self.store.finish_loading();
                // Only a change to the active conversation re-arms the settle
                // timer; replies filed in the background do not.
                if self.store.active_id() == Some(conversation_id) {
                    self.settle.reschedule(conversation_id);
                }
            }
            // A settle queued for a conversation the user has since switched
            // away from must not clear the newly active one.
            AppEvent::Settle { conversation_id } => {
                if self.store.active_id() == Some(conversation_id) {
                    self.store.settle_active();
                }
            }
        }
    }

    /// Capture the target conversation synchronously, then fetch
    fn submit(&mut self, text: String) {
        if self.store.is_loading() {
            return;
        }

        self.notice = None;
        let conversation_id = self.store.submit_user_message(text.clone());
        tracing::debug!(id = %conversation_id, "submitted user message");
        self.fetcher.dispatch(text, conversation_id);
        self.settle.reschedule(conversation_id);
    }

    fn start_new_chat(&mut self) {
        self.store.start_new_chat();
        self.settle.cancel();
        self.focus = Focus::Composer;
    }

    fn select_conversation(&mut self, id: crate::store::ConversationId) {
        let before = self.store.active_id();
        self.store.select_conversation(id);
        if self.store.active_id() != before {
            self.settle.reschedule(id);
            self.focus = Focus::Composer;
        }
    }

    fn handle_command(&mut self, command: ParsedCommand) {
        match command.command {
            SlashCommand::New => self.start_new_chat(),
            SlashCommand::Theme => self.toggle_theme(command.theme_target()),
            SlashCommand::Copy => self.copy_last_reply(),
            SlashCommand::Help => self.notice = Some(get_help_text()),
            SlashCommand::Quit => self.should_exit = true,
        }
    }

    fn toggle_theme(&mut self, target: Option<Theme>) {
        self.theme = match target {
            Some(theme) => theme,
            None => self.theme.toggled(),
        };
        self.config.theme = self.theme;
        if let Err(err) = self.config.save() {
            tracing::warn!(error = %err, "failed to persist theme choice");
        }
    }

    fn paste_from_clipboard(&mut self) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            tracing::warn!("no clipboard available");
            return;
        };
        match clipboard.get_text() {
            Ok(text) => self.composer.paste(&text),
            Err(err) => tracing::warn!(error = %err, "failed to read clipboard"),
        }
    }

    fn copy_last_reply(&mut self) {
        let last_reply = self.store.active_conversation().and_then(|convo| {
            convo
                .messages
                .iter()
                .rev()
                .find(|m| m.sender == Sender::Assistant && !m.is_error)
                .map(|m| m.text.clone())
        });

        let Some(text) = last_reply else {
            self.notice = Some("Nothing to copy yet.".to_string());
            return;
        };

        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(text) {
                Ok(()) => self.notice = Some("Reply copied to clipboard.".to_string()),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to write clipboard");
                    self.notice = Some("Could not access the clipboard.".to_string());
                }
            },
            None => {
                tracing::warn!("no clipboard available");
                self.notice = Some("Could not access the clipboard.".to_string());
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(40)])
            .split(frame.size());

        let notice_lines: Vec<&str> = self
            .notice
            .as_deref()
            .map(|n| n.lines().collect())
            .unwrap_or_default();
        let notice_height = notice_lines.len().min(8) as u16;

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(notice_height),
                Constraint::Length(3),
            ])
            .split(panes[1]);

        let buf = frame.buffer_mut();
        self.sidebar.render(
            panes[0],
            buf,
            self.store.conversations(),
            self.store.active_id(),
            &self.theme,
            self.focus == Focus::Sidebar,
        );
        self.chat.render(right[0], buf, &self.store, &self.theme);

        for (i, text) in notice_lines.iter().take(notice_height as usize).enumerate() {
            let line = Line::from(vec![Span::styled(text.to_string(), self.theme.dim())]);
            buf.set_line(right[1].x + 1, right[1].y + i as u16, &line, right[1].width);
        }

        self.composer.render(
            right[2],
            buf,
            &self.theme,
            self.focus == Focus::Composer,
        );
    }
}
