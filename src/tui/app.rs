use std::collections::HashSet;

use ratatui::widgets::TableState;

use crate::clock::Clock;
use crate::commands::FileTaskStore;
use crate::error::Result;
use crate::models::{TaskFields, PROGRESS_STEPS};
use crate::view::process_categories;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(PartialEq)]
pub enum ViewMode {
    Tasks,
    Templates,
}

#[derive(PartialEq)]
pub enum InputField {
    None,
    NewTask,
    Title,
    Categories,
    Search,
    SubTask,
}

pub struct App {
    pub store: FileTaskStore,
    /// Ids of the rows currently shown, in display order.
    pub rows: Vec<u64>,
    pub state: TableState,
    pub template_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<u64>,
    /// Tasks picked for bulk actions.
    pub selected: HashSet<u64>,
    pub message: Option<String>,
}

impl App {
    pub fn new(store: FileTaskStore) -> App {
        let mut app = App {
            store,
            rows: Vec::new(),
            state: TableState::default(),
            template_state: TableState::default(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            selected: HashSet::new(),
            message: None,
        };
        app.refresh();
        app
    }

    /// Re-runs the view pipeline and keeps the cursor in range.
    pub fn refresh(&mut self) {
        self.rows = self.store.visible().iter().map(|t| t.id).collect();
        self.selected.retain(|id| self.store.get(*id).is_some());
        clamp(&mut self.state, self.rows.len());
        clamp(&mut self.template_state, self.store.templates().len());
    }

    fn current_id(&self) -> Option<u64> {
        self.state.selected().and_then(|i| self.rows.get(i).copied())
    }

    /// Ids a bulk action applies to: the picked tasks, or the cursor row.
    fn action_ids(&self) -> Vec<u64> {
        if self.selected.is_empty() {
            self.current_id().into_iter().collect()
        } else {
            self.selected.iter().copied().collect()
        }
    }

    /// Runs a store mutation and reports its error in the status line.
    fn apply<F>(&mut self, f: F)
    where
        F: FnOnce(&mut FileTaskStore) -> Result<()>,
    {
        self.message = None;
        if let Err(e) = f(&mut self.store) {
            self.message = Some(e.to_string());
        }
        self.refresh();
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let (state, len) = self.active_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let (state, len) = self.active_list();
        if len == 0 { return; }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn active_list(&mut self) -> (&mut TableState, usize) {
        match self.view_mode {
            ViewMode::Tasks => (&mut self.state, self.rows.len()),
            ViewMode::Templates => (&mut self.template_state, self.store.templates().len()),
        }
    }

    /// Flips completion of the task under the cursor.
    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.current_id() {
            self.apply(|s| s.toggle_completion(id).map(|_| ()));
        }
    }

    /// Moves the progress of the task under the cursor one step up or down.
    pub fn step_progress(&mut self, up: bool) {
        let Some(id) = self.current_id() else { return };
        let Some(task) = self.store.get(id) else { return };
        let pos = PROGRESS_STEPS.iter().position(|p| *p == task.progress).unwrap_or(0);
        let next = if up {
            PROGRESS_STEPS[(pos + 1).min(PROGRESS_STEPS.len() - 1)]
        } else {
            PROGRESS_STEPS[pos.saturating_sub(1)]
        };
        self.apply(|s| s.update_progress(id, next).map(|_| ()));
    }

    pub fn toggle_pick(&mut self) {
        if let Some(id) = self.current_id() {
            if !self.selected.remove(&id) {
                self.selected.insert(id);
            }
        }
    }

    /// Picks every visible task, or clears the picks if all are picked.
    pub fn toggle_pick_all(&mut self) {
        if self.rows.iter().all(|id| self.selected.contains(id)) {
            self.selected.clear();
        } else {
            self.selected.extend(self.rows.iter().copied());
        }
    }

    pub fn bulk_complete(&mut self, completed: bool) {
        let ids = self.action_ids();
        self.apply(|s| s.bulk_set_completion(&ids, completed).map(|_| ()));
        self.selected.clear();
    }

    pub fn delete_selected(&mut self) {
        match self.view_mode {
            ViewMode::Tasks => {
                let ids = self.action_ids();
                self.apply(|s| s.bulk_delete(&ids).map(|_| ()));
                self.selected.clear();
            }
            ViewMode::Templates => {
                let Some(name) = self
                    .template_state
                    .selected()
                    .and_then(|i| self.store.templates().get(i))
                    .map(|t| t.name.clone())
                else {
                    return;
                };
                self.apply(|s| s.remove_template(&name).map(|_| ()));
            }
        }
    }

    /// Swaps the task under the cursor with its neighbour.
    pub fn move_selected(&mut self, down: bool) {
        let Some(i) = self.state.selected() else { return };
        let other = if down { i + 1 } else { i.wrapping_sub(1) };
        let (Some(&current), Some(&neighbour)) = (self.rows.get(i), self.rows.get(other)) else {
            return;
        };
        if down {
            self.apply(|s| s.reorder(neighbour, current).map(|_| ()));
        } else {
            self.apply(|s| s.reorder(current, neighbour).map(|_| ()));
        }
        if let Some(pos) = self.rows.iter().position(|id| *id == current) {
            self.state.select(Some(pos));
        }
    }

    /// Starts the timer of the task under the cursor, or stops it if running.
    pub fn toggle_timer(&mut self) {
        let Some(id) = self.current_id() else { return };
        let running = self
            .store
            .get(id)
            .is_some_and(|t| t.time_tracking.is_running);
        if running {
            self.apply(|s| s.stop_timer(id).map(|_| ()));
        } else {
            self.apply(|s| s.start_timer(id).map(|_| ()));
        }
    }

    pub fn cycle_filter(&mut self) {
        let next = self.store.view().filter.cycle();
        self.store.set_filter(next);
        self.refresh();
    }

    pub fn cycle_sort(&mut self) {
        let next = self.store.view().sort.cycle();
        self.store.set_sort(next);
        self.refresh();
    }

    pub fn clear_search(&mut self) {
        self.store.clear_search();
        self.refresh();
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Templates,
            ViewMode::Templates => ViewMode::Tasks,
        };
    }

    pub fn toggle_theme(&mut self) {
        self.apply(|s| s.toggle_theme().map(|_| ()));
    }

    /// Creates a task from the template under the cursor.
    pub fn create_from_template(&mut self) {
        let Some(fields) = self
            .template_state
            .selected()
            .and_then(|i| self.store.templates().get(i))
            .map(TaskFields::from_template)
        else {
            return;
        };
        self.apply(|s| s.create(fields).map(|_| ()));
        self.view_mode = ViewMode::Tasks;
    }

    /// Opens the input box for `field`.
    pub fn start_input(&mut self, field: InputField) {
        self.target_id = self.current_id();
        let needs_task = matches!(field, InputField::Title | InputField::Categories | InputField::SubTask);
        if needs_task && self.target_id.is_none() {
            return;
        }
        self.input_buffer = match (&field, self.target_id.and_then(|id| self.store.get(id))) {
            (InputField::Title, Some(t)) => t.title.clone(),
            (InputField::Categories, Some(t)) => t.categories.join(", "),
            (InputField::Search, _) => self.store.view().search.clone(),
            _ => String::new(),
        };
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Applies the text typed into the input box.
    pub fn handle_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        let target = self.target_id;
        match self.input_field {
            InputField::NewTask => {
                self.apply(|s| s.create(TaskFields::new(input)).map(|_| ()));
            }
            InputField::Title => {
                if let Some(id) = target {
                    self.apply(|s| {
                        let Some(task) = s.get(id) else { return Ok(()) };
                        let mut fields = TaskFields::from(task);
                        fields.title = input;
                        s.update(id, fields).map(|_| ())
                    });
                }
            }
            InputField::Categories => {
                if let Some(id) = target {
                    self.apply(|s| {
                        let Some(task) = s.get(id) else { return Ok(()) };
                        let mut fields = TaskFields::from(task);
                        fields.categories = process_categories(&input);
                        s.update(id, fields).map(|_| ())
                    });
                }
            }
            InputField::Search => {
                self.store.set_search(&input);
                self.refresh();
            }
            InputField::SubTask => {
                if let Some(id) = target {
                    self.apply(|s| s.add_sub_task(id, &input).map(|_| ()));
                }
            }
            InputField::None => {}
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
    }

    /// Toggles the first open sub-task of the task under the cursor, or the
    /// last one when all are done.
    pub fn toggle_next_sub_task(&mut self) {
        let Some(id) = self.current_id() else { return };
        let Some(task) = self.store.get(id) else { return };
        let sub = task
            .sub_tasks
            .iter()
            .find(|s| !s.completed)
            .or(task.sub_tasks.last())
            .map(|s| s.id);
        if let Some(sub_id) = sub {
            self.apply(|s| s.toggle_sub_task(id, sub_id).map(|_| ()));
        }
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.store.clock().now()
    }
}

fn clamp(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
