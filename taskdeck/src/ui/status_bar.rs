//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Mode, Screen};

fn help_text(app: &App) -> &'static str {
    match (&app.screen, &app.mode) {
        (Screen::Login(_), _) => "Enter: sign in | Tab: next field | Ctrl-R: register | Esc: quit",
        (Screen::Register(_), _) => "Enter: register | Tab: next field | Ctrl-L: sign in | Esc: quit",
        (Screen::Board, _) if app.drag.item().is_some() => "←→: choose column | Space: drop | Esc: cancel",
        (Screen::Board, Mode::Normal) => {
            "←→↑↓: move | Space: drag | n: new | e: edit | d: delete | /: search | s: status | o/O: sort | f: dates | x: reset | [ ]: page | L: logout | q: quit"
        }
        (Screen::Board, Mode::Search) => "Type to search | Enter: apply now | Esc: close",
        (Screen::Board, Mode::DateRange(_)) => "Tab: next field | Enter: apply | Esc: cancel",
        (Screen::Board, Mode::Editor(_)) => "Tab: next field | ←→ on status: change | Enter: save | Esc: cancel",
        (Screen::Board, Mode::ConfirmDelete(_)) => "y: delete | n: keep",
        (Screen::Board, Mode::Detail) => "e: edit | Esc: close",
    }
}

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let (dot_color, status_text) = if app.loading || app.auth.is_loading() {
        (theme::WARNING, "Loading...".to_string())
    } else {
        match app.auth.user() {
            Some(user) if app.auth.is_authenticated() => (theme::SUCCESS, user.name.clone()),
            _ if app.auth.is_authenticated() => (theme::SUCCESS, "Signed in".to_string()),
            _ => (theme::PENDING, "Signed out".to_string()),
        }
    };

    let status_line = Line::from(vec![
        Span::styled(concat!("taskdeck v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
        Span::styled(help_text(app), theme::dimmed()),
    ]);

    let paragraph = Paragraph::new(status_line).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
