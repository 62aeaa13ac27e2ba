use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TodoError};
use crate::ids::IdAllocator;
use crate::models::{
    Attachment, AttachmentKind, NotificationKind, Task, TaskFields, Template, Theme, TimeTracking,
    PROGRESS_STEPS, REOPENED_PROGRESS,
};
use crate::recurrence;
use crate::storage::{notification_key, KeyValueStore, TASKS_KEY, TEMPLATES_KEY, THEME_KEY};
use crate::view::{self, SortKey, Stats, StatusFilter, ViewParams};

/// Owns the task and template collections and the current view selection.
///
/// Every mutation writes the affected collection back to the key-value
/// store before returning. Unknown ids turn a mutation into a no-op that
/// reports `false`/`None`.
pub struct TaskStore<S: KeyValueStore, C: Clock = SystemClock> {
    pub(crate) kv: S,
    pub(crate) clock: C,
    pub(crate) tasks: Vec<Task>,
    pub(crate) templates: Vec<Template>,
    pub(crate) view: ViewParams,
    pub(crate) ids: IdAllocator,
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    /// Loads both collections, repairs legacy records and catches up missed
    /// recurring instances.
    ///
    /// Fails with [`TodoError::Format`] if stored data cannot be decoded; the
    /// stored data is left untouched in that case.
    pub fn open(kv: S, clock: C) -> Result<Self> {
        let mut tasks: Vec<Task> = read_collection(&kv, TASKS_KEY)?;
        let templates: Vec<Template> = read_collection(&kv, TEMPLATES_KEY)?;

        let mut dirty = false;
        for task in tasks.iter_mut() {
            dirty |= task.normalize();
        }

        let mut ids = IdAllocator::seeded(&tasks, clock.now());
        let mut seen = HashSet::new();
        for task in tasks.iter_mut() {
            if !seen.insert(task.id) {
                let fresh = ids.next_id();
                warn!(old = task.id, new = fresh, "re-assigned duplicate task id");
                task.id = fresh;
                dirty = true;
            }
        }

        let missed = recurrence::catch_up_overdue(&mut tasks, clock.today(), &mut ids);

        let mut store = TaskStore {
            kv,
            clock,
            tasks,
            templates,
            view: ViewParams::default(),
            ids,
        };
        if dirty || missed > 0 {
            store.persist_tasks()?;
        }
        debug!(tasks = store.tasks.len(), templates = store.templates.len(), "task store loaded");
        Ok(store)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.kv
    }

    /// Adds a task built from the form fields and returns its id.
    pub fn create(&mut self, fields: TaskFields) -> Result<u64> {
        let fields = validate(fields)?;
        let completed = fields.progress == 100;
        let task = Task {
            id: self.ids.next_id(),
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            categories: fields.categories,
            priority: fields.priority,
            progress: fields.progress,
            completed,
            missed: false,
            created_date: self.clock.today(),
            is_recurring: fields.recurrence.is_some(),
            recurrence: fields.recurrence,
            time_tracking: TimeTracking::default(),
            attachments: Vec::new(),
            sub_tasks: Vec::new(),
        };
        let id = task.id;
        info!(id, title = %task.title, "task created");
        self.tasks.push(task);
        self.persist_tasks()?;
        Ok(id)
    }

    /// Replaces the form fields of a task, keeping its id, creation date,
    /// time tracking, attachments and sub-tasks.
    pub fn update(&mut self, id: u64, fields: TaskFields) -> Result<bool> {
        let fields = validate(fields)?;
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        let task = &mut self.tasks[idx];
        let was_completed = task.completed;
        task.title = fields.title;
        task.description = fields.description;
        task.due_date = fields.due_date;
        task.categories = fields.categories;
        task.priority = fields.priority;
        task.progress = fields.progress;
        task.completed = fields.progress == 100;
        task.missed = false;
        task.is_recurring = fields.recurrence.is_some();
        task.recurrence = fields.recurrence;
        debug!(id, "task updated");

        self.spawn_if_completed(idx, was_completed);
        self.persist_tasks()?;
        Ok(true)
    }

    /// Sets progress and derives completion from it.
    pub fn update_progress(&mut self, id: u64, progress: u8) -> Result<bool> {
        check_progress(progress)?;
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        let task = &mut self.tasks[idx];
        let was_completed = task.completed;
        task.progress = progress;
        task.completed = progress == 100;
        task.missed = false;
        debug!(id, progress, "progress updated");

        self.spawn_if_completed(idx, was_completed);
        self.persist_tasks()?;
        Ok(true)
    }

    /// Removes a task. Deleting an unknown id changes nothing.
    pub fn delete(&mut self, id: u64) -> Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        info!(id, "task deleted");
        self.persist_tasks()?;
        Ok(true)
    }

    /// Moves `moved_id` into the slot `before_id` currently occupies.
    pub fn reorder(&mut self, moved_id: u64, before_id: u64) -> Result<bool> {
        if moved_id == before_id {
            return Ok(false);
        }
        let (Some(from), Some(to)) = (self.index_of(moved_id), self.index_of(before_id)) else {
            return Ok(false);
        };
        // `to` is the target's index before removal, so a forward move lands
        // just after the target.
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        debug!(moved_id, before_id, "task reordered");
        self.persist_tasks()?;
        Ok(true)
    }

    /// Marks every listed task complete or incomplete.
    ///
    /// Completing sets progress to 100; reopening a task at 100 drops it to
    /// 75. Recurring tasks that become complete spawn one successor each.
    /// Returns how many tasks were found.
    pub fn bulk_set_completion(&mut self, ids: &[u64], completed: bool) -> Result<usize> {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let mut touched = 0;
        for idx in 0..self.tasks.len() {
            if !wanted.contains(&self.tasks[idx].id) {
                continue;
            }
            touched += 1;
            let task = &mut self.tasks[idx];
            let was_completed = task.completed;
            if completed {
                task.completed = true;
                task.progress = 100;
                task.missed = false;
            } else {
                task.completed = false;
                task.missed = false;
                if task.progress == 100 {
                    task.progress = REOPENED_PROGRESS;
                }
            }
            self.spawn_if_completed(idx, was_completed);
        }
        if touched > 0 {
            info!(count = touched, completed, "bulk completion applied");
            self.persist_tasks()?;
        }
        Ok(touched)
    }

    /// Flips completion of a single task, as a checkbox would.
    pub fn toggle_completion(&mut self, id: u64) -> Result<bool> {
        let Some(task) = self.get(id) else {
            return Ok(false);
        };
        let completed = !task.completed;
        Ok(self.bulk_set_completion(&[id], completed)? > 0)
    }

    /// Removes every listed task. Returns how many were removed.
    pub fn bulk_delete(&mut self, ids: &[u64]) -> Result<usize> {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let before = self.tasks.len();
        self.tasks.retain(|t| !wanted.contains(&t.id));
        let removed = before - self.tasks.len();
        if removed > 0 {
            info!(count = removed, "bulk delete applied");
            self.persist_tasks()?;
        }
        Ok(removed)
    }

    /// Attaches a link, file reference or note. Returns the attachment id.
    pub fn add_attachment(
        &mut self,
        task_id: u64,
        kind: AttachmentKind,
        name: &str,
        url: Option<String>,
        note: Option<String>,
    ) -> Result<Option<u64>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TodoError::validation("attachment name is required"));
        }
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        match kind {
            AttachmentKind::Url if url.is_none() => {
                return Err(TodoError::validation("url attachments need a url"));
            }
            AttachmentKind::Note if note.is_none() => {
                return Err(TodoError::validation("note attachments need note text"));
            }
            _ => {}
        }
        let Some(idx) = self.index_of(task_id) else {
            return Ok(None);
        };
        let attachment = Attachment {
            id: self.ids.next_id(),
            kind,
            name: name.to_string(),
            url,
            note,
            created_at: self.clock.now(),
        };
        let id = attachment.id;
        self.tasks[idx].attachments.push(attachment);
        self.persist_tasks()?;
        Ok(Some(id))
    }

    pub fn remove_attachment(&mut self, task_id: u64, attachment_id: u64) -> Result<bool> {
        let Some(idx) = self.index_of(task_id) else {
            return Ok(false);
        };
        let attachments = &mut self.tasks[idx].attachments;
        let before = attachments.len();
        attachments.retain(|a| a.id != attachment_id);
        if attachments.len() == before {
            return Ok(false);
        }
        self.persist_tasks()?;
        Ok(true)
    }

    /// Stores a template, replacing one with the same name.
    pub fn add_template(&mut self, mut template: Template) -> Result<()> {
        template.name = template.name.trim().to_string();
        template.title = template.title.trim().to_string();
        if template.name.is_empty() {
            return Err(TodoError::validation("template name is required"));
        }
        if template.title.is_empty() {
            return Err(TodoError::validation("template title is required"));
        }
        if template.is_recurring && template.frequency.is_none() {
            return Err(TodoError::validation("recurring templates need a frequency"));
        }
        if template.interval == 0 {
            return Err(TodoError::validation("recurrence interval must be at least 1"));
        }
        template.categories = normalize_categories(&template.categories);

        match self.templates.iter_mut().find(|t| t.name == template.name) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
        self.persist_templates()
    }

    pub fn remove_template(&mut self, name: &str) -> Result<bool> {
        let before = self.templates.len();
        self.templates.retain(|t| t.name != name);
        if self.templates.len() == before {
            return Ok(false);
        }
        self.persist_templates()?;
        Ok(true)
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn view(&self) -> &ViewParams {
        &self.view
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.view.filter = filter;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.view.sort = sort;
    }

    pub fn set_search(&mut self, search: &str) {
        self.view.search = search.trim().to_lowercase();
    }

    pub fn clear_search(&mut self) {
        self.view.search.clear();
    }

    /// Narrows the view to tasks mentioning `category`.
    pub fn filter_by_category(&mut self, category: &str) {
        self.set_search(category);
    }

    /// Tasks to display under the current filter, search and sort.
    pub fn visible(&self) -> Vec<&Task> {
        view::visible_tasks(&self.tasks, &self.view)
    }

    pub fn stats(&self) -> Stats {
        view::stats(&self.tasks)
    }

    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .kv
            .get(THEME_KEY)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.kv.set(THEME_KEY, theme.as_str())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme()?.toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    /// Records that a reminder of `kind` was delivered for a task just now.
    pub fn mark_notified(&mut self, task_id: u64, kind: NotificationKind) -> Result<()> {
        let now = self.clock.now().to_rfc3339();
        self.kv.set(&notification_key(task_id, kind.as_str()), &now)
    }

    pub fn last_notified(&self, task_id: u64, kind: NotificationKind) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(&notification_key(task_id, kind.as_str()))? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| TodoError::format(format!("bad notification timestamp: {}", e)))
    }

    /// Replaces both collections wholesale.
    pub(crate) fn replace_all(&mut self, mut tasks: Vec<Task>, templates: Vec<Template>) -> Result<()> {
        for task in tasks.iter_mut() {
            task.normalize();
        }
        self.ids = IdAllocator::seeded(&tasks, self.clock.now());
        self.tasks = tasks;
        self.templates = templates;
        self.persist_tasks()?;
        self.persist_templates()
    }

    pub(crate) fn index_of(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Appends the successor of the task at `idx` if this change is what
    /// completed it. Callers pass the completion state from before their
    /// change, so one logical action spawns at most once.
    pub(crate) fn spawn_if_completed(&mut self, idx: usize, was_completed: bool) -> Option<u64> {
        let task = &self.tasks[idx];
        if was_completed || !task.completed || !task.is_recurring {
            return None;
        }
        let today = self.clock.today();
        let next = recurrence::spawn_next(&self.tasks[idx], &mut self.ids, today)?;
        let id = next.id;
        info!(source = self.tasks[idx].id, id, "recurring task rescheduled");
        self.tasks.push(next);
        Some(id)
    }

    pub(crate) fn persist_tasks(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.tasks)?;
        self.kv.set(TASKS_KEY, &raw)
    }

    pub(crate) fn persist_templates(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.templates)?;
        self.kv.set(TEMPLATES_KEY, &raw)
    }
}

fn read_collection<T: DeserializeOwned, S: KeyValueStore>(kv: &S, key: &str) -> Result<Vec<T>> {
    match kv.get(key)? {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| TodoError::format(format!("stored '{}' could not be read: {}", key, e))),
    }
}

fn check_progress(progress: u8) -> Result<()> {
    if PROGRESS_STEPS.contains(&progress) {
        Ok(())
    } else {
        Err(TodoError::validation(format!(
            "progress must be one of 0, 25, 50, 75, 100 (got {})",
            progress
        )))
    }
}

fn validate(mut fields: TaskFields) -> Result<TaskFields> {
    fields.title = fields.title.trim().to_string();
    if fields.title.is_empty() {
        return Err(TodoError::validation("title is required"));
    }
    check_progress(fields.progress)?;
    if fields.recurrence.is_some_and(|r| r.interval == 0) {
        return Err(TodoError::validation("recurrence interval must be at least 1"));
    }
    fields.description = fields
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    fields.categories = normalize_categories(&fields.categories);
    Ok(fields)
}

fn normalize_categories(categories: &[String]) -> Vec<String> {
    categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
