//! Terminal UI rendering.

pub mod board;
pub mod forms;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
};

use crate::app::{App, Mode, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    match &app.screen {
        Screen::Login(form) => forms::render_auth(frame, content_area, app, form, "Sign in"),
        Screen::Register(form) => forms::render_auth(frame, content_area, app, form, "Register"),
        Screen::Board => {
            board::render(frame, content_area, app);
            match &app.mode {
                Mode::Normal | Mode::Search => {}
                Mode::DateRange(form) => forms::render_date_range(frame, content_area, form),
                Mode::Editor(editor) => {
                    forms::render_editor(frame, content_area, editor, &app.task_field_errors);
                }
                Mode::ConfirmDelete(id) => {
                    let task = app.columns.iter().flatten().find(|t| &t.id == id);
                    forms::render_confirm_delete(frame, content_area, task);
                }
                Mode::Detail => forms::render_detail(frame, content_area, app.current.as_ref()),
            }
        }
    }

    render_toasts(frame, content_area, app);
    status_bar::render(frame, status_area, app);
}

/// Stacks toasts in the top-right corner, newest last.
fn render_toasts(frame: &mut Frame, area: Rect, app: &App) {
    for (offset, toast) in (0u16..).zip(app.toasts.iter()) {
        let text = format!(" {} ", toast.notification.message);
        let width = u16::try_from(text.chars().count())
            .unwrap_or(u16::MAX)
            .min(area.width);
        if offset >= area.height {
            break;
        }
        let rect = Rect {
            x: area.x + area.width - width,
            y: area.y + offset,
            width,
            height: 1,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                text,
                theme::toast(toast.notification.level),
            ))),
            rect,
        );
    }
}
