use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

/// Process-wide light/dark preference, persisted through the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn base(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::Black).bg(Color::White),
            Theme::Dark => Style::default().fg(Color::Gray).bg(Color::Reset),
        }
    }

    pub fn dim(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::DarkGray),
            Theme::Dark => Style::default().fg(Color::DarkGray),
        }
    }

    pub fn accent(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::Blue),
            Theme::Dark => Style::default().fg(Color::Cyan),
        }
    }

    pub fn user_text(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::Blue),
            Theme::Dark => Style::default().fg(Color::LightBlue),
        }
    }

    pub fn assistant_text(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::Black),
            Theme::Dark => Style::default().fg(Color::Green),
        }
    }

    pub fn error_text(&self) -> Style {
        Style::default().fg(Color::Red)
    }

    pub fn code(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::Magenta),
            Theme::Dark => Style::default().fg(Color::Yellow),
        }
    }

    /// Style for messages whose entrance animation has not settled yet
    pub fn entrance(&self) -> Style {
        self.base().add_modifier(Modifier::BOLD)
    }

    pub fn selection(&self) -> Style {
        match self {
            Theme::Light => Style::default().fg(Color::White).bg(Color::Blue),
            Theme::Dark => Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_between_light_and_dark() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
