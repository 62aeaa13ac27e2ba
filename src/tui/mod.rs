pub mod app;
pub mod ui;

use std::io;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::commands::open_store;
use app::{App, InputField, InputMode, ViewMode};
use ui::ui;

/// Redraw interval; keeps running timers live on screen.
const TICK: Duration = Duration::from_secs(1);

pub fn run_tui() -> anyhow::Result<()> {
    let store = open_store().context("failed to open task store")?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store);

    // Run loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res.context("terminal I/O failed")
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match app.view_mode {
                ViewMode::Tasks => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Char(' ') => app.toggle_selected(),
                    KeyCode::Char('+') | KeyCode::Char('=') => app.step_progress(true),
                    KeyCode::Char('-') => app.step_progress(false),
                    KeyCode::Char('a') => app.start_input(InputField::NewTask),
                    KeyCode::Char('e') => app.start_input(InputField::Title),
                    KeyCode::Char('c') => app.start_input(InputField::Categories),
                    KeyCode::Char('/') => app.start_input(InputField::Search),
                    KeyCode::Char('s') => app.start_input(InputField::SubTask),
                    KeyCode::Char('S') => app.toggle_next_sub_task(),
                    KeyCode::Char('t') => app.toggle_timer(),
                    KeyCode::Char('x') => app.toggle_pick(),
                    KeyCode::Char('X') => app.toggle_pick_all(),
                    KeyCode::Char('b') => app.bulk_complete(true),
                    KeyCode::Char('B') => app.bulk_complete(false),
                    KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                    KeyCode::Char('J') => app.move_selected(true),
                    KeyCode::Char('K') => app.move_selected(false),
                    KeyCode::Char('f') => app.cycle_filter(),
                    KeyCode::Char('o') => app.cycle_sort(),
                    KeyCode::Char('T') => app.toggle_theme(),
                    KeyCode::Esc => app.clear_search(),
                    KeyCode::Char('v') => app.toggle_view(),
                    _ => {}
                },
                ViewMode::Templates => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Enter => app.create_from_template(),
                    KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                    KeyCode::Char('v') => app.toggle_view(),
                    _ => {}
                },
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
