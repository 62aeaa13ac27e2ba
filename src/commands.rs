use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::backup::Backup;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, TodoError};
use crate::export;
use crate::models::{AttachmentKind, Frequency, Recurrence, Task, TaskFields, TaskStatus, Template, Theme};
use crate::storage::FileStore;
use crate::store::TaskStore;
use crate::subtasks::sub_task_summary;
use crate::timer::{current_elapsed, format_duration};
use crate::view::{process_categories, SortKey, StatusFilter};

/// The store the command line and the TUI work against.
pub type FileTaskStore = TaskStore<FileStore, SystemClock>;

/// Opens the store in the configured data directory with the configured
/// default view.
pub fn open_store() -> Result<FileTaskStore> {
    let config = Config::load()?;
    let kv = FileStore::open(config.data_dir())?;
    let mut store = TaskStore::open(kv, SystemClock)?;
    store.set_filter(config.default_filter);
    store.set_sort(config.default_sort);
    Ok(store)
}

/// Optional task form fields shared by `add`, `edit` and `template use`.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldArgs {
    /// Longer description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Due date in YYYY-MM-DD ("none" clears it)
    #[arg(short = 'D', long)]
    pub due: Option<String>,
    /// Comma-separated categories
    #[arg(short, long)]
    pub categories: Option<String>,
    /// Priority (high, medium, low)
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Progress (0, 25, 50, 75, 100)
    #[arg(short = 'P', long)]
    pub progress: Option<u8>,
    /// Recurrence (daily, weekly, monthly, yearly, none)
    #[arg(short, long)]
    pub recur: Option<String>,
    /// Repeat every N periods
    #[arg(short, long)]
    pub interval: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
    Ical,
}

/// Parses a due date in YYYY-MM-DD. `none` or an empty string clear it.
pub fn parse_due(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| TodoError::validation(format!("invalid due date '{}': {}. Use YYYY-MM-DD.", raw, e)))
}

/// Overlays the given command-line fields on `base`.
pub fn apply_fields(mut base: TaskFields, args: &FieldArgs) -> Result<TaskFields> {
    if let Some(d) = &args.description {
        base.description = Some(d.clone());
    }
    if let Some(d) = &args.due {
        base.due_date = parse_due(d)?;
    }
    if let Some(c) = &args.categories {
        base.categories = process_categories(c);
    }
    if let Some(p) = &args.priority {
        base.priority = p.parse().map_err(TodoError::Validation)?;
    }
    if let Some(p) = args.progress {
        base.progress = p;
    }
    match args.recur.as_deref().map(str::trim) {
        Some(r) if r.eq_ignore_ascii_case("none") => base.recurrence = None,
        Some(r) => {
            let frequency: Frequency = r.parse().map_err(TodoError::Validation)?;
            let interval = args
                .interval
                .or(base.recurrence.map(|r| r.interval))
                .unwrap_or(1);
            base.recurrence = Some(Recurrence::new(frequency, interval));
        }
        None => {
            if let (Some(interval), Some(rec)) = (args.interval, base.recurrence.as_mut()) {
                rec.interval = interval;
            }
        }
    }
    Ok(base)
}

fn with_store<F>(silent: bool, f: F)
where
    F: FnOnce(&mut FileTaskStore) -> Result<()>,
{
    let mut store = match open_store() {
        Ok(s) => s,
        Err(e) => {
            if !silent { eprintln!("Failed to open task store: {}", e); }
            return;
        }
    };
    if let Err(e) = f(&mut store) {
        if !silent { eprintln!("{}", e); }
    }
}

/// Adds a new task.
pub fn cmd_add(title: String, fields: FieldArgs, silent: bool) {
    with_store(silent, |store| {
        let fields = apply_fields(TaskFields::new(title), &fields)?;
        let id = store.create(fields)?;
        if !silent { println!("Task added (id = {})", id); }
        Ok(())
    });
}

/// Edits an existing task's details. Unspecified fields keep their value.
pub fn cmd_edit(id: u64, title: Option<String>, fields: FieldArgs, silent: bool) {
    with_store(silent, |store| {
        let Some(task) = store.get(id) else {
            if !silent { eprintln!("Task {} not found.", id); }
            return Ok(());
        };
        let mut base = TaskFields::from(task);
        if let Some(t) = title {
            base.title = t;
        }
        let fields = apply_fields(base, &fields)?;
        store.update(id, fields)?;
        if !silent { println!("Task {} updated.", id); }
        Ok(())
    });
}

/// Sets the progress of a task; 100 completes it.
pub fn cmd_progress(id: u64, progress: u8, silent: bool) {
    with_store(silent, |store| {
        if store.update_progress(id, progress)? {
            if !silent { println!("Task {} is at {}%.", id, progress); }
        } else if !silent {
            eprintln!("Task {} not found.", id);
        }
        Ok(())
    });
}

/// Marks tasks as complete (or incomplete with `completed = false`).
pub fn cmd_set_completion(ids: Vec<u64>, completed: bool, silent: bool) {
    with_store(silent, |store| {
        let before = store.tasks().len();
        let found = store.bulk_set_completion(&ids, completed)?;
        let spawned = store.tasks().len() - before;
        if !silent {
            let state = if completed { "complete" } else { "incomplete" };
            println!("{} task(s) marked as {}.", found, state);
            if spawned > 0 {
                println!("{} recurring task(s) rescheduled.", spawned);
            }
            if found < ids.len() {
                eprintln!("{} task(s) not found.", ids.len() - found);
            }
        }
        Ok(())
    });
}

/// Flips completion of a single task.
pub fn cmd_toggle(id: u64, silent: bool) {
    with_store(silent, |store| {
        if !store.toggle_completion(id)? && !silent {
            eprintln!("Task {} not found.", id);
        }
        Ok(())
    });
}

/// Removes tasks from the database by ID.
pub fn cmd_remove(ids: Vec<u64>, silent: bool) {
    with_store(silent, |store| {
        let removed = store.bulk_delete(&ids)?;
        if !silent {
            println!("{} task(s) removed.", removed);
        }
        Ok(())
    });
}

/// Moves a task in front of another one.
pub fn cmd_move(id: u64, before: u64, silent: bool) {
    with_store(silent, |store| {
        if store.reorder(id, before)? {
            if !silent { println!("Task {} moved before {}.", id, before); }
        } else if !silent {
            eprintln!("Nothing to move.");
        }
        Ok(())
    });
}

/// Lists tasks in a formatted table.
pub fn cmd_list(filter: Option<StatusFilter>, sort: Option<SortKey>, search: Option<String>, category: Option<String>) {
    with_store(false, |store| {
        if let Some(f) = filter {
            store.set_filter(f);
        }
        if let Some(s) = sort {
            store.set_sort(s);
        }
        if let Some(s) = search {
            store.set_search(&s);
        }
        if let Some(c) = category {
            store.filter_by_category(&c);
        }

        let tasks = store.visible();
        if tasks.is_empty() {
            println!("No tasks found.");
            return Ok(());
        }

        let now = store.clock().now();
        let today = store.clock().today();
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Title").add_attribute(Attribute::Bold),
                Cell::new("Due").add_attribute(Attribute::Bold),
                Cell::new("Categories").add_attribute(Attribute::Bold),
                Cell::new("Priority").add_attribute(Attribute::Bold),
                Cell::new("Progress").add_attribute(Attribute::Bold),
                Cell::new("Sub-tasks").add_attribute(Attribute::Bold),
                Cell::new("Time").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
            ]);

        for t in tasks {
            let overdue = !t.completed && t.due_date.is_some_and(|d| d < today);
            let due = match t.due_date {
                Some(d) => d.to_string(),
                None => "-".to_string(),
            };
            let subs = sub_task_summary(t)
                .map(|s| format!("{}/{}", s.completed, s.total))
                .unwrap_or_default();
            let mut time = format_duration(current_elapsed(t, now));
            if t.time_tracking.is_running {
                time.push_str(" ▶");
            }
            let priority_color = match t.priority.weight() {
                3 => Color::Red,
                2 => Color::Yellow,
                _ => Color::Green,
            };
            let (status, status_color) = status_label(t);
            let mut title = t.title.clone();
            if t.is_recurring {
                title.push_str(" ↻");
            }

            table.add_row(vec![
                Cell::new(t.id),
                Cell::new(title),
                Cell::new(due).fg(if overdue { Color::Red } else { Color::Reset }),
                Cell::new(t.categories.join(", ")),
                Cell::new(t.priority).fg(priority_color),
                Cell::new(format!("{}%", t.progress)),
                Cell::new(subs),
                Cell::new(time),
                Cell::new(status).fg(status_color),
            ]);
        }

        println!("{table}");
        let stats = store.stats();
        println!(
            "{} total, {} completed, {} in progress, {}% weighted completion",
            stats.total, stats.completed, stats.in_progress, stats.completion_rate
        );
        Ok(())
    });
}

fn status_label(task: &Task) -> (&'static str, Color) {
    match task.status() {
        TaskStatus::Open => ("Open", Color::Yellow),
        TaskStatus::Completed => ("Done", Color::Green),
        TaskStatus::Missed => ("Missed", Color::Grey),
    }
}

/// Prints every detail of one task.
pub fn cmd_show(id: u64) {
    with_store(false, |store| {
        let Some(t) = store.get(id) else {
            eprintln!("Task {} not found.", id);
            return Ok(());
        };
        println!("#{} {}", t.id, t.title);
        if let Some(d) = &t.description {
            println!("  {}", d);
        }
        println!("  Status:     {} ({}%)", status_label(t).0, t.progress);
        println!("  Priority:   {}", t.priority);
        if let Some(d) = t.due_date {
            println!("  Due:        {}", d);
        }
        if !t.categories.is_empty() {
            println!("  Categories: {}", t.categories.join(", "));
        }
        if let Some(r) = t.recurrence {
            println!("  Repeats:    every {} × {}", r.interval, r.frequency);
        }
        println!("  Created:    {}", t.created_date);
        println!(
            "  Tracked:    {} in {} session(s){}",
            format_duration(current_elapsed(t, store.clock().now())),
            t.time_tracking.sessions.len(),
            if t.time_tracking.is_running { ", running" } else { "" }
        );
        if let Some(s) = sub_task_summary(t) {
            println!("  Sub-tasks:  {}/{} ({}%)", s.completed, s.total, s.percentage);
            for sub in &t.sub_tasks {
                println!("    [{}] {} {}", if sub.completed { "x" } else { " " }, sub.id, sub.title);
            }
        }
        for a in &t.attachments {
            let detail = a.url.as_deref().or(a.note.as_deref()).unwrap_or_default();
            println!("  Attachment {} ({:?}): {} {}", a.id, a.kind, a.name, detail);
        }
        Ok(())
    });
}

/// Prints the task statistics.
pub fn cmd_stats() {
    with_store(false, |store| {
        let s = store.stats();
        println!("Total:        {}", s.total);
        println!("Completed:    {}", s.completed);
        println!("In progress:  {}", s.in_progress);
        println!("Completion:   {}%", s.completion_rate);
        Ok(())
    });
}

/// Adds a sub-task to a task.
pub fn cmd_sub_add(id: u64, title: String, silent: bool) {
    with_store(silent, |store| {
        match store.add_sub_task(id, &title)? {
            Some(sub) => { if !silent { println!("Sub-task added (id = {})", sub); } }
            None => { if !silent { eprintln!("Task {} not found.", id); } }
        }
        Ok(())
    });
}

/// Toggles a sub-task and reports the parent's new state.
pub fn cmd_sub_toggle(id: u64, sub_id: u64, silent: bool) {
    with_store(silent, |store| {
        if store.toggle_sub_task(id, sub_id)? {
            if let Some(t) = store.get(id) {
                if !silent { println!("Task {} is now {}.", id, status_label(t).0); }
            }
        } else if !silent {
            eprintln!("Sub-task {} of task {} not found.", sub_id, id);
        }
        Ok(())
    });
}

/// Removes a sub-task.
pub fn cmd_sub_remove(id: u64, sub_id: u64, silent: bool) {
    with_store(silent, |store| {
        if !store.remove_sub_task(id, sub_id)? && !silent {
            eprintln!("Sub-task {} of task {} not found.", sub_id, id);
        }
        Ok(())
    });
}

/// Attaches a link, file reference or note to a task.
pub fn cmd_attach(id: u64, kind: String, name: String, url: Option<String>, note: Option<String>, silent: bool) {
    with_store(silent, |store| {
        let kind: AttachmentKind = kind.parse().map_err(TodoError::Validation)?;
        match store.add_attachment(id, kind, &name, url, note)? {
            Some(a) => { if !silent { println!("Attachment added (id = {})", a); } }
            None => { if !silent { eprintln!("Task {} not found.", id); } }
        }
        Ok(())
    });
}

/// Removes an attachment from a task.
pub fn cmd_detach(id: u64, attachment_id: u64, silent: bool) {
    with_store(silent, |store| {
        if !store.remove_attachment(id, attachment_id)? && !silent {
            eprintln!("Attachment {} of task {} not found.", attachment_id, id);
        }
        Ok(())
    });
}

/// Starts the timer of a task, stopping any other running timer.
pub fn cmd_timer_start(id: u64, silent: bool) {
    with_store(silent, |store| {
        if store.start_timer(id)? {
            if !silent { println!("Timer started for task {}.", id); }
        } else if !silent {
            eprintln!("Task {} not found or its timer is already running.", id);
        }
        Ok(())
    });
}

/// Stops the timer of a task and prints the session length.
pub fn cmd_timer_stop(id: u64, silent: bool) {
    with_store(silent, |store| {
        match store.stop_timer(id)? {
            Some(secs) => { if !silent { println!("Timer stopped after {}.", format_duration(secs)); } }
            None => { if !silent { eprintln!("No timer running for task {}.", id); } }
        }
        Ok(())
    });
}

/// Shows the running timer, if any.
pub fn cmd_timer_show() {
    with_store(false, |store| {
        match store.running_timer() {
            Some(t) => println!(
                "Task {} ({}): {}",
                t.id,
                t.title,
                format_duration(current_elapsed(t, store.clock().now()))
            ),
            None => println!("No timer running."),
        }
        Ok(())
    });
}

/// Adds (or replaces) a task template.
pub fn cmd_template_add(name: String, title: String, icon: Option<String>, fields: FieldArgs, silent: bool) {
    with_store(silent, |store| {
        let base = apply_fields(TaskFields::new(title), &fields)?;
        store.add_template(Template {
            name: name.clone(),
            icon: icon.unwrap_or_default(),
            title: base.title,
            description: base.description,
            categories: base.categories,
            priority: base.priority,
            is_recurring: base.recurrence.is_some(),
            frequency: base.recurrence.map(|r| r.frequency),
            interval: base.recurrence.map(|r| r.interval).unwrap_or(1),
        })?;
        if !silent { println!("Template '{}' saved.", name); }
        Ok(())
    });
}

/// Lists all available templates.
pub fn cmd_template_list() {
    with_store(false, |store| {
        let templates = store.templates();
        if templates.is_empty() {
            println!("No templates found.");
            return Ok(());
        }
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Name", "Icon", "Title", "Priority", "Categories", "Repeats"]);
        for t in templates {
            let repeats = match (t.is_recurring, t.frequency) {
                (true, Some(f)) => format!("every {} × {}", t.interval, f),
                _ => "-".to_string(),
            };
            table.add_row(vec![
                t.name.clone(),
                t.icon.clone(),
                t.title.clone(),
                t.priority.to_string(),
                t.categories.join(", "),
                repeats,
            ]);
        }
        println!("{table}");
        Ok(())
    });
}

/// Removes a template by name.
pub fn cmd_template_remove(name: String, silent: bool) {
    with_store(silent, |store| {
        if store.remove_template(&name)? {
            if !silent { println!("Template '{}' removed.", name); }
        } else if !silent {
            eprintln!("Template '{}' not found.", name);
        }
        Ok(())
    });
}

/// Creates a task pre-filled from a template.
pub fn cmd_template_use(name: String, title: Option<String>, fields: FieldArgs, silent: bool) {
    with_store(silent, |store| {
        let Some(template) = store.template(&name) else {
            if !silent { eprintln!("Template '{}' not found.", name); }
            return Ok(());
        };
        let mut base = TaskFields::from_template(template);
        if let Some(t) = title {
            base.title = t;
        }
        let fields = apply_fields(base, &fields)?;
        let id = store.create(fields)?;
        if !silent { println!("Task added from template '{}' (id = {})", name, id); }
        Ok(())
    });
}

/// Writes an export to `output`, or stdout without one.
pub fn cmd_export(format: ExportFormat, id: Option<u64>, output: Option<PathBuf>, silent: bool) {
    with_store(silent, |store| {
        let now = store.clock().now();
        let content = match format {
            ExportFormat::Json => export::to_json(store.tasks(), now)?,
            ExportFormat::Csv => export::to_csv(store.tasks())?,
            ExportFormat::Text => export::to_text(store.tasks(), now),
            ExportFormat::Ical => {
                let Some(task) = id.and_then(|id| store.get(id)) else {
                    return Err(TodoError::validation("iCalendar export needs the id of an existing task"));
                };
                export::to_ical(task, now)
            }
        };
        write_output(&content, output.as_ref(), silent)
    });
}

/// Writes a full backup of tasks and templates.
pub fn cmd_backup(output: Option<PathBuf>, silent: bool) {
    with_store(silent, |store| {
        let content = store.backup().to_json()?;
        write_output(&content, output.as_ref(), silent)
    });
}

/// Replaces all tasks and templates with a backup file.
pub fn cmd_restore(path: PathBuf, force: bool, silent: bool) {
    with_store(silent, |store| {
        let raw = fs::read_to_string(&path)?;
        let backup = Backup::parse(&raw)?;

        if !force {
            print!(
                "Replace {} task(s) and {} template(s) with {} task(s) and {} template(s) from the backup? [y/N] ",
                store.tasks().len(),
                store.templates().len(),
                backup.todos.len(),
                backup.templates.len()
            );
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if input.trim().to_lowercase() != "y" {
                println!("Aborted.");
                return Ok(());
            }
        }

        store.restore(backup)?;
        if !silent { println!("Backup restored."); }
        Ok(())
    });
}

/// Shows the theme, sets it, or toggles it with `toggle`.
pub fn cmd_theme(theme: Option<String>, silent: bool) {
    with_store(silent, |store| {
        let theme = match theme.as_deref() {
            None => store.theme()?,
            Some("toggle") => store.toggle_theme()?,
            Some(raw) => {
                let theme: Theme = raw.parse().map_err(TodoError::Validation)?;
                store.set_theme(theme)?;
                theme
            }
        };
        if !silent { println!("Theme: {}", theme.as_str()); }
        Ok(())
    });
}

fn write_output(content: &str, output: Option<&PathBuf>, silent: bool) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            if !silent { println!("Written to {}", path.display()); }
        }
        None => println!("{}", content),
    }
    Ok(())
}
