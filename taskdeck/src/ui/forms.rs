//! Sign-in screens and board dialogs.

use std::collections::BTreeMap;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use taskdeck_proto::task::{Task, TaskStatus};

use super::theme;
use crate::app::{App, Form, FormField, TaskEditor};
use crate::board;

/// A `width` x `height` rect centred in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn field_lines<'a>(form: &'a Form, errors: &'a BTreeMap<String, String>) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        lines.push(field_line(field, index == form.focus));
        if let Some(error) = field.error_in(errors) {
            lines.push(Line::from(Span::styled(format!("  {error}"), theme::error())));
        }
    }
    lines
}

fn field_line(field: &FormField, focused: bool) -> Line<'_> {
    let value = if field.secret {
        "•".repeat(field.input.value().chars().count())
    } else {
        field.input.value().to_string()
    };
    let label_style = if focused { theme::highlighted() } else { theme::dimmed() };
    let mut spans = vec![
        Span::styled(format!("{:<24}", field.label), label_style),
        Span::styled(value, theme::normal()),
    ];
    if focused {
        spans.push(Span::styled("▏", theme::input_cursor()));
    }
    Line::from(spans)
}

fn render_dialog(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'_>>) {
    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let rect = centered(area, 72, height);
    let block = Block::default()
        .title(Span::styled(title.to_string(), theme::bold()))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

/// The login or registration screen.
pub fn render_auth(frame: &mut Frame, area: Rect, app: &App, form: &Form, title: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(25), Constraint::Min(8)])
        .split(area);

    let mut lines = field_lines(form, app.auth.field_errors());
    lines.push(Line::default());
    if app.auth.is_loading() {
        lines.push(Line::from(Span::styled("Please wait…", theme::dimmed())));
    } else if let Some(error) = app.auth.error() {
        if app.auth.field_errors().is_empty() {
            lines.push(Line::from(Span::styled(error, theme::error())));
        }
    }
    render_dialog(frame, chunks[1], title, lines);
}

pub fn render_editor(frame: &mut Frame, area: Rect, editor: &TaskEditor, errors: &BTreeMap<String, String>) {
    let mut lines = field_lines(&editor.form, errors);
    let style = if editor.status_focused() {
        theme::highlighted()
    } else {
        theme::dimmed()
    };
    let mut status_spans = vec![Span::styled(format!("{:<24}", "Status"), style)];
    for status in TaskStatus::ALL {
        let label = format!(" {status} ");
        if status == editor.status {
            status_spans.push(Span::styled(label, theme::panel_title(theme::status_color(status))));
        } else {
            status_spans.push(Span::styled(label, theme::dimmed()));
        }
    }
    lines.push(Line::from(status_spans));
    if let Some(error) = &editor.form.error {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(error, theme::error())));
    }
    let title = if editor.target.is_some() { "Edit task" } else { "New task" };
    render_dialog(frame, area, title, lines);
}

pub fn render_date_range(frame: &mut Frame, area: Rect, form: &Form) {
    let empty = BTreeMap::new();
    let mut lines = field_lines(form, &empty);
    if let Some(error) = &form.error {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(error.clone(), theme::error())));
    }
    render_dialog(frame, area, "Due date range", lines);
}

pub fn render_confirm_delete(frame: &mut Frame, area: Rect, task: Option<&Task>) {
    let name = task.map_or("this task", |t| t.name.as_str());
    let lines = vec![
        Line::from(format!("Delete \"{name}\"?")),
        Line::from(Span::styled("y: delete | n: keep", theme::dimmed())),
    ];
    render_dialog(frame, area, "Delete task", lines);
}

pub fn render_detail(frame: &mut Frame, area: Rect, task: Option<&Task>) {
    let Some(task) = task else {
        render_dialog(frame, area, "Task", vec![Line::from("Loading…")]);
        return;
    };
    let mut lines = vec![
        Line::from(Span::styled(task.name.as_str(), theme::bold())),
        Line::from(Span::styled(
            task.status.label(),
            theme::panel_title(theme::status_color(task.status)),
        )),
        Line::default(),
        Line::from(task.description.as_deref().unwrap_or("No description")),
        Line::default(),
    ];
    if let Some(label) = board::due_label(task, board::today()) {
        lines.push(Line::from(format!("Due: {label}")));
    }
    lines.push(Line::from(Span::styled(
        format!("Created {}", task.created_at.format("%b %d, %Y %H:%M")),
        theme::dimmed(),
    )));
    lines.push(Line::from(Span::styled(
        format!("Updated {}", task.updated_at.format("%b %d, %Y %H:%M")),
        theme::dimmed(),
    )));
    render_dialog(frame, area, "Task", lines);
}
