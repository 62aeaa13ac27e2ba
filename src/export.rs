//! Renders the task collection into the exchange formats offered to users:
//! JSON, CSV, a plain-text report and single-event iCalendar files.

use chrono::{DateTime, Days, Utc};
use csv::{QuoteStyle, Terminator};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};
use crate::models::{Priority, Task};

/// Header row of the CSV export.
pub const CSV_HEADER: &str = "Title,Description,Due Date,Categories,Priority,Progress,Completed,Created Date";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonExport {
    pub export_date: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub todos: Vec<Task>,
}

impl JsonExport {
    pub fn new(tasks: &[Task], now: DateTime<Utc>) -> Self {
        JsonExport {
            export_date: now,
            total_tasks: tasks.len(),
            completed_tasks: tasks.iter().filter(|t| t.completed).count(),
            todos: tasks.to_vec(),
        }
    }
}

pub fn to_json(tasks: &[Task], now: DateTime<Utc>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonExport::new(tasks, now))?)
}

/// CSV with a plain header row; every data field is quoted.
pub fn to_csv(tasks: &[Task]) -> Result<String> {
    let mut header = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(CSV_HEADER.split(','))?;
    let buf = header.into_inner().map_err(|e| e.into_error())?;

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buf);
    for t in tasks {
        wtr.write_record([
            t.title.clone(),
            t.description.clone().unwrap_or_default(),
            t.due_date.map(|d| d.to_string()).unwrap_or_default(),
            t.categories.join("; "),
            t.priority.to_string(),
            t.progress.to_string(),
            if t.completed { "Yes" } else { "No" }.to_string(),
            t.created_date.to_string(),
        ])?;
    }
    let buf = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(buf).map_err(|e| TodoError::format(format!("csv export is not UTF-8: {}", e)))
}

/// Human-readable report: open tasks first, then completed ones.
pub fn to_text(tasks: &[Task], now: DateTime<Utc>) -> String {
    let rule = "=".repeat(50);
    let open: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();
    let done: Vec<&Task> = tasks.iter().filter(|t| t.completed).collect();

    let mut lines = vec![
        rule.clone(),
        "TODO LIST EXPORT".to_string(),
        format!("Generated: {}", now.format("%Y-%m-%d %H:%M:%S UTC")),
        format!("Total Tasks: {}", tasks.len()),
        format!("Completed: {}", done.len()),
        format!("In Progress: {}", open.len()),
        rule,
        String::new(),
    ];

    if !open.is_empty() {
        lines.push("IN PROGRESS TASKS:".to_string());
        lines.push("-".repeat(30));
        for (i, t) in open.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, t.title));
            if let Some(desc) = &t.description {
                lines.push(format!("   Description: {}", desc));
            }
            if let Some(due) = t.due_date {
                lines.push(format!("   Due: {}", due));
            }
            if !t.categories.is_empty() {
                lines.push(format!("   Categories: {}", t.categories.join(", ")));
            }
            lines.push(format!("   Priority: {}", t.priority.as_str().to_uppercase()));
            lines.push(format!("   Progress: {}%", t.progress));
            lines.push(String::new());
        }
    }

    if !done.is_empty() {
        lines.push("COMPLETED TASKS:".to_string());
        lines.push("-".repeat(30));
        for (i, t) in done.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, t.title));
            if let Some(desc) = &t.description {
                lines.push(format!("   Description: {}", desc));
            }
            if !t.categories.is_empty() {
                lines.push(format!("   Categories: {}", t.categories.join(", ")));
            }
            if t.is_missed() {
                lines.push("   Missed".to_string());
            }
            lines.push(format!("   Created: {}", t.created_date));
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

/// iCalendar priority scale: 1 highest, 9 lowest.
pub fn ical_priority(priority: Priority) -> u8 {
    match priority {
        Priority::High => 1,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

/// A one-event calendar for `task`, as an all-day event on its due date
/// (or its creation date when it has none).
pub fn to_ical(task: &Task, now: DateTime<Utc>) -> String {
    let start = task.due_date.unwrap_or(task.created_date);
    let end = start.checked_add_days(Days::new(1)).unwrap_or(start);

    let mut description = String::new();
    if let Some(desc) = &task.description {
        description.push_str(desc);
        description.push('\n');
    }
    description.push_str(&format!("Priority: {}\n", task.priority.as_str().to_uppercase()));
    description.push_str(&format!("Progress: {}%", task.progress));

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//todust//Task Export//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", task.id),
        format!("DTSTAMP:{}", now.format("%Y%m%dT%H%M%SZ")),
        format!("DTSTART;VALUE=DATE:{}", start.format("%Y%m%d")),
        format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")),
        format!("SUMMARY:{}", escape_text(&format!("TODO: {}", task.title))),
        format!("DESCRIPTION:{}", escape_text(&description)),
        format!("PRIORITY:{}", ical_priority(task.priority)),
    ];
    if !task.categories.is_empty() {
        let cats: Vec<String> = task.categories.iter().map(|c| escape_text(c)).collect();
        lines.push(format!("CATEGORIES:{}", cats.join(",")));
    }
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold(&line));
        out.push_str("\r\n");
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Content lines longer than 75 octets continue on lines starting with a space.
fn fold(line: &str) -> String {
    const LIMIT: usize = 75;
    if line.len() <= LIMIT {
        return line.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}
