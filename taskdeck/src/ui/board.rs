//! Kanban board rendering: filter bar, status columns and pagination.

use chrono::NaiveDate;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use taskdeck_proto::task::{Task, TaskStatus};

use super::theme;
use crate::app::{App, Mode};
use crate::board::{self, PageWindow};

/// Renders the filter bar, the three columns and the pagination line.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    render_filter_bar(frame, chunks[0], app);
    render_columns(frame, chunks[1], app);
    render_pagination(frame, chunks[2], app);
}

fn render_filter_bar(frame: &mut Frame, area: Rect, app: &App) {
    let applied = &app.applied;
    let searching = app.mode == Mode::Search;
    let search_text = if searching {
        app.search.value().to_string()
    } else {
        applied.search.clone().unwrap_or_default()
    };
    let date = |d: Option<NaiveDate>| d.map_or_else(|| "any".to_string(), |d| d.to_string());

    let mut spans = vec![
        Span::styled("Search: ", theme::dimmed()),
        Span::styled(search_text, if searching { theme::input_cursor() } else { theme::normal() }),
        Span::raw("  "),
        Span::styled("Status: ", theme::dimmed()),
        Span::raw(applied.status.map_or("All", TaskStatus::label)),
        Span::raw("  "),
        Span::styled("Due: ", theme::dimmed()),
        Span::raw(format!("{} → {}", date(applied.due_date_from), date(applied.due_date_to))),
        Span::raw("  "),
        Span::styled("Sort: ", theme::dimmed()),
        Span::raw(format!(
            "{} {}",
            applied.sort_by.as_str(),
            applied.sort_direction.as_str()
        )),
    ];
    if app.filters.search_deadline().is_some() {
        spans.push(Span::styled("  …", theme::dimmed()));
    }

    let border = if searching { theme::highlighted() } else { theme::normal() };
    let block = Block::default()
        .title("Filters")
        .borders(Borders::ALL)
        .border_style(border);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_columns(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    let today = board::today();

    for (index, status) in TaskStatus::ALL.into_iter().enumerate() {
        let tasks = &app.columns[index];
        let items: Vec<ListItem> = tasks
            .iter()
            .enumerate()
            .map(|(row, task)| card(app, task, index == app.column && row == app.row, today))
            .collect();

        let border = if app.drag.is_drop_target(status) {
            theme::drop_target()
        } else if index == app.column {
            theme::highlighted()
        } else {
            theme::normal()
        };
        let title = Span::styled(
            board::column_title(status, tasks.len()),
            theme::panel_title(theme::status_color(status)),
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border);
        frame.render_widget(List::new(items).block(block), chunks[index]);
    }
}

fn card<'a>(app: &App, task: &'a Task, cursor: bool, today: NaiveDate) -> ListItem<'a> {
    let style = if app.drag.is_lifted(&task.id) {
        theme::lifted()
    } else if cursor && app.drag.item().is_none() {
        theme::selected()
    } else if task.is_temporary() {
        theme::pending()
    } else {
        theme::normal()
    };

    let mut lines = vec![Line::from(Span::styled(task.name.as_str(), style))];
    if let Some(description) = task.description.as_deref() {
        lines.push(Line::from(Span::styled(description, theme::dimmed())));
    }
    if let Some(label) = board::due_label(task, today) {
        let due_style = if task.is_overdue(today) {
            theme::overdue()
        } else {
            theme::dimmed()
        };
        lines.push(Line::from(Span::styled(format!("Due: {label}"), due_style)));
    }
    if task.is_temporary() {
        lines.push(Line::from(Span::styled("saving…", theme::pending())));
    }
    lines.push(Line::default());
    ListItem::new(lines)
}

fn render_pagination(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(board::results_summary(&app.meta), theme::dimmed())];
    if let Some(window) = PageWindow::for_meta(&app.meta) {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("‹ ", nav_style(window.has_prev())));
        if window.shows_first() {
            spans.push(Span::raw("1 "));
            if window.leading_gap() {
                spans.push(Span::styled("… ", theme::dimmed()));
            }
        }
        for page in &window.pages {
            let style = if *page == window.current {
                theme::selected()
            } else {
                theme::normal()
            };
            spans.push(Span::styled(page.to_string(), style));
            spans.push(Span::raw(" "));
        }
        if window.shows_last() {
            if window.trailing_gap() {
                spans.push(Span::styled("… ", theme::dimmed()));
            }
            spans.push(Span::raw(format!("{} ", window.total)));
        }
        spans.push(Span::styled("›", nav_style(window.has_next())));
    }
    if let Some(error) = &app.task_error {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(error.as_str(), theme::error()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn nav_style(enabled: bool) -> ratatui::style::Style {
    if enabled { theme::normal() } else { theme::dimmed() }
}
