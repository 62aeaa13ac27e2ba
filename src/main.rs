//! # Todust
//!
//! A terminal task manager: tasks with priorities, due dates, categories,
//! progress, recurrence, sub-tasks, attachments and time tracking, usable
//! from a fast CLI or an interactive TUI.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive mode
//! todust
//!
//! # Add a recurring task
//! todust add "Pay bills" --due 2025-12-01 --recur monthly --priority high
//!
//! # List open tasks by due date
//! todust list --filter in-progress --sort due
//!
//! # Complete tasks (recurring ones are rescheduled)
//! todust done 17 18
//!
//! # Sub-tasks and timers
//! todust sub add 17 "Collect receipts"
//! todust timer start 17
//! ```
//!
//! ## Data Storage
//!
//! Tasks, templates and the theme live in `~/.local/share/todust/` on Linux
//! (`TODUST_DIR` overrides it). Settings come from
//! `~/.config/todust/config.toml` (`TODUST_CONFIG` overrides it).

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use todust::commands::*;
use todust::config::Config;
use todust::tui::run_tui;
use todust::view::{SortKey, StatusFilter};

#[derive(Parser)]
#[command(name = "todust", version)]
#[command(about = "Task manager with recurrence, sub-tasks and time tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Edit a task
    Edit {
        id: u64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Set the progress of a task (0, 25, 50, 75, 100)
    Progress {
        id: u64,
        progress: u8,
    },
    /// Mark tasks as complete
    Done {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Mark tasks as incomplete
    Undo {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Toggle completion of a task
    Toggle {
        id: u64,
    },
    /// Remove tasks
    Remove {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Move a task in front of another one
    Move {
        id: u64,
        /// Task to place it before
        before: u64,
    },
    /// List tasks
    List {
        /// Status filter (all, completed, in-progress)
        #[arg(short, long)]
        filter: Option<StatusFilter>,
        /// Sort order (created, title, due, priority, progress)
        #[arg(short, long)]
        sort: Option<SortKey>,
        /// Search title, description and categories
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Show tasks in a category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one task in detail
    Show {
        id: u64,
    },
    /// Show completion statistics
    Stats,
    /// Manage sub-tasks
    Sub {
        #[command(subcommand)]
        command: SubCommands,
    },
    /// Attach a link, file or note to a task
    Attach {
        id: u64,
        /// Attachment type (url, file, note)
        kind: String,
        /// Display name
        name: String,
        #[arg(short, long)]
        url: Option<String>,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Remove an attachment
    Detach {
        id: u64,
        attachment_id: u64,
    },
    /// Track time on tasks
    Timer {
        #[command(subcommand)]
        command: TimerCommands,
    },
    /// Manage templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Export tasks
    Export {
        #[arg(value_enum)]
        format: ExportFormat,
        /// Task id (iCalendar export only)
        #[arg(long)]
        id: Option<u64>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a backup of all tasks and templates
    Backup {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all tasks and templates with a backup
    Restore {
        path: PathBuf,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show or set the theme (light, dark, toggle)
    Theme {
        theme: Option<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Add a sub-task
    Add { id: u64, title: String },
    /// Toggle a sub-task
    Toggle { id: u64, sub_id: u64 },
    /// Remove a sub-task
    Remove { id: u64, sub_id: u64 },
}

#[derive(Subcommand)]
enum TimerCommands {
    /// Start the timer (stops any other running timer)
    Start { id: u64 },
    /// Stop the timer
    Stop { id: u64 },
    /// Show the running timer
    Show,
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Add or replace a template
    Add {
        /// Template name
        name: String,
        /// Title of tasks created from it
        title: String,
        #[arg(long)]
        icon: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List templates
    List,
    /// Remove a template
    Remove {
        /// Template name
        name: String,
    },
    /// Create a task from a template
    Use {
        /// Template name
        name: String,
        /// Override the title
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
}

fn main() {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}", e);
        Config::default()
    });
    todust::logging::init(&config.log_level);

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Add { title, fields }) => cmd_add(title, fields, false),
        Some(Commands::Edit { id, title, fields }) => cmd_edit(id, title, fields, false),
        Some(Commands::Progress { id, progress }) => cmd_progress(id, progress, false),
        Some(Commands::Done { ids }) => cmd_set_completion(ids, true, false),
        Some(Commands::Undo { ids }) => cmd_set_completion(ids, false, false),
        Some(Commands::Toggle { id }) => cmd_toggle(id, false),
        Some(Commands::Remove { ids }) => cmd_remove(ids, false),
        Some(Commands::Move { id, before }) => cmd_move(id, before, false),
        Some(Commands::List { filter, sort, search, category }) => cmd_list(filter, sort, search, category),
        Some(Commands::Show { id }) => cmd_show(id),
        Some(Commands::Stats) => cmd_stats(),
        Some(Commands::Sub { command }) => match command {
            SubCommands::Add { id, title } => cmd_sub_add(id, title, false),
            SubCommands::Toggle { id, sub_id } => cmd_sub_toggle(id, sub_id, false),
            SubCommands::Remove { id, sub_id } => cmd_sub_remove(id, sub_id, false),
        },
        Some(Commands::Attach { id, kind, name, url, note }) => cmd_attach(id, kind, name, url, note, false),
        Some(Commands::Detach { id, attachment_id }) => cmd_detach(id, attachment_id, false),
        Some(Commands::Timer { command }) => match command {
            TimerCommands::Start { id } => cmd_timer_start(id, false),
            TimerCommands::Stop { id } => cmd_timer_stop(id, false),
            TimerCommands::Show => cmd_timer_show(),
        },
        Some(Commands::Template { command }) => match command {
            TemplateCommands::Add { name, title, icon, fields } => cmd_template_add(name, title, icon, fields, false),
            TemplateCommands::List => cmd_template_list(),
            TemplateCommands::Remove { name } => cmd_template_remove(name, false),
            TemplateCommands::Use { name, title, fields } => cmd_template_use(name, title, fields, false),
        },
        Some(Commands::Export { format, id, output }) => cmd_export(format, id, output, false),
        Some(Commands::Backup { output }) => cmd_backup(output, false),
        Some(Commands::Restore { path, force }) => cmd_restore(path, force, false),
        Some(Commands::Theme { theme }) => cmd_theme(theme, false),
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return;
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "todust", &mut io::stdout());
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui() {
                eprintln!("Error running TUI: {:#}", e);
            }
        }
    }
}
