//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};
use taskdeck_proto::task::TaskStatus;

use crate::store::NotificationLevel;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

pub const SUCCESS: Color = Color::Green;

pub const WARNING: Color = Color::Yellow;

pub const ERROR: Color = Color::Red;

pub const INFO: Color = Color::Blue;

/// Placeholder cards not yet confirmed by the server.
pub const PENDING: Color = Color::DarkGray;

/// Column accent per status.
#[must_use]
pub const fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Todo => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Done => Color::Green,
    }
}

#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (metadata, help).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Selected card style.
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// A card lifted for dragging.
#[must_use]
pub fn lifted() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(WARNING)
        .add_modifier(Modifier::BOLD | Modifier::ITALIC)
}

/// Border of the column a lifted card would drop into.
#[must_use]
pub fn drop_target() -> Style {
    Style::default().fg(WARNING).add_modifier(Modifier::BOLD)
}

#[must_use]
pub fn pending() -> Style {
    Style::default().fg(PENDING).add_modifier(Modifier::ITALIC)
}

#[must_use]
pub fn overdue() -> Style {
    Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
}

#[must_use]
pub fn error() -> Style {
    Style::default().fg(ERROR)
}

/// Toast style per notification level.
#[must_use]
pub fn toast(level: NotificationLevel) -> Style {
    let bg = match level {
        NotificationLevel::Success => SUCCESS,
        NotificationLevel::Error => ERROR,
        NotificationLevel::Info => INFO,
    };
    Style::default().fg(Color::Black).bg(bg)
}

/// Style for the status bar background.
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Style for panel titles with a given color (bold).
#[must_use]
pub fn panel_title(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// The input cursor.
#[must_use]
pub fn input_cursor() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}
