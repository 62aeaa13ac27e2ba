use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputField, InputMode, ViewMode};
use crate::clock::Clock;
use crate::models::{Priority, TaskStatus, Theme};
use crate::subtasks::sub_task_summary;
use crate::timer::{current_elapsed, format_duration};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Stats and view
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Help
        ].as_ref())
        .split(f.area());

    let accent = match app.store.theme().unwrap_or_default() {
        Theme::Light => Color::Cyan,
        Theme::Dark => Color::Magenta,
    };

    let stats = app.store.stats();
    let view = app.store.view();
    let mut summary = format!(
        "{} total | {} done | {} open | {}% weighted | filter: {} | sort: {}",
        stats.total, stats.completed, stats.in_progress, stats.completion_rate, view.filter, view.sort
    );
    if !view.search.is_empty() {
        summary.push_str(&format!(" | search: \"{}\"", view.search));
    }
    if !app.selected.is_empty() {
        summary.push_str(&format!(" | {} picked", app.selected.len()));
    }
    if let Some(msg) = &app.message {
        summary.push_str(&format!(" | {}", msg));
    }
    let header = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Todust"));
    f.render_widget(header, chunks[0]);

    match app.view_mode {
        ViewMode::Tasks => {
            let now = app.now();
            let today = app.store.clock().today();

            let rows: Vec<Row> = app
                .rows
                .iter()
                .filter_map(|id| app.store.get(*id))
                .map(|t| {
                    let overdue = !t.completed && t.due_date.is_some_and(|d| d < today);
                    let style = match t.status() {
                        TaskStatus::Completed => Style::default().fg(Color::DarkGray),
                        TaskStatus::Missed => Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT),
                        TaskStatus::Open if overdue => Style::default().fg(Color::Red),
                        TaskStatus::Open => match t.priority {
                            Priority::High => Style::default().fg(Color::Yellow),
                            _ => Style::default(),
                        },
                    };
                    let mark = if app.selected.contains(&t.id) { "*" } else { " " };
                    let check = match t.status() {
                        TaskStatus::Open => "[ ]",
                        TaskStatus::Completed => "[x]",
                        TaskStatus::Missed => "[-]",
                    };
                    let subs = sub_task_summary(t)
                        .map(|s| format!("{}/{}", s.completed, s.total))
                        .unwrap_or_default();
                    let mut time = format_duration(current_elapsed(t, now));
                    if t.time_tracking.is_running {
                        time.push_str(" ▶");
                    }
                    let mut title = t.title.clone();
                    if t.is_recurring {
                        title.push_str(" ↻");
                    }

                    Row::new(vec![
                        Cell::from(format!("{}{}", mark, check)),
                        Cell::from(title),
                        Cell::from(t.due_date.map(|d| d.to_string()).unwrap_or_default()),
                        Cell::from(t.categories.join(", ")),
                        Cell::from(t.priority.as_str()),
                        Cell::from(format!("{}%", t.progress)),
                        Cell::from(subs),
                        Cell::from(time),
                    ]).style(style)
                })
                .collect();

            let widths = [
                Constraint::Length(5),
                Constraint::Min(20),
                Constraint::Length(12),
                Constraint::Length(16),
                Constraint::Length(8),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(11),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["", "Title", "Due", "Categories", "Priority", "Prog", "Subs", "Time"])
                    .style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("Tasks"))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[1], &mut app.state);
        }
        ViewMode::Templates => {
            let rows: Vec<Row> = app
                .store
                .templates()
                .iter()
                .map(|t| {
                    let repeats = match (t.is_recurring, t.frequency) {
                        (true, Some(freq)) => format!("every {} × {}", t.interval, freq),
                        _ => String::new(),
                    };
                    Row::new(vec![
                        Cell::from(format!("{} {}", t.icon, t.name)),
                        Cell::from(t.title.clone()),
                        Cell::from(t.priority.as_str()),
                        Cell::from(repeats),
                    ])
                })
                .collect();

            let widths = [
                Constraint::Min(20),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(16),
            ];

            let table = Table::new(rows, widths)
                .header(Row::new(vec!["Name", "Title", "Priority", "Repeats"])
                    .style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
                    .bottom_margin(1))
                .block(Block::default().borders(Borders::ALL).title("Templates"))
                .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[1], &mut app.template_state);
        }
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | e: Title | c: Cats | Space: Done | +/-: Progress | t: Timer | s/S: Sub add/toggle | x/X: Pick | b/B: Bulk done/undo | d: Del | J/K: Move | f: Filter | o: Sort | /: Search | T: Theme | v: Templates",
            ViewMode::Templates => "q: Quit | Enter: Create Task from Template | d: Del | v: View Tasks",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if app.input_mode == InputMode::Editing {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_field {
            InputField::NewTask => "Add Task: Enter Title",
            InputField::Title => "Edit Title",
            InputField::Categories => "Edit Categories (comma-separated)",
            InputField::Search => "Search",
            InputField::SubTask => "Add Sub-task",
            InputField::None => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
