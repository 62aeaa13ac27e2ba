use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{Result, TodoError};
use crate::models::{SubTask, Task, REOPENED_PROGRESS};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;

/// Completion counts of a task's checklist.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubTaskSummary {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Returns `None` for a task without sub-tasks.
pub fn sub_task_summary(task: &Task) -> Option<SubTaskSummary> {
    let total = task.sub_tasks.len();
    if total == 0 {
        return None;
    }
    let completed = task.sub_tasks.iter().filter(|s| s.completed).count();
    Some(SubTaskSummary {
        completed,
        total,
        percentage: (completed as f64 / total as f64 * 100.0).round() as u32,
    })
}

/// Brings the parent's completion in line with its sub-tasks.
///
/// All sub-tasks done completes the parent at 100%. Any open sub-task
/// reopens a completed parent, dropping 100% to 75%. Tasks without
/// sub-tasks and missed instances are left alone.
///
/// Returns `true` when the parent went from open to completed.
pub fn reconcile_parent(task: &mut Task) -> bool {
    if task.sub_tasks.is_empty() || task.missed {
        return false;
    }
    let all_done = task.sub_tasks.iter().all(|s| s.completed);
    if all_done && !task.completed {
        task.completed = true;
        task.progress = 100;
        return true;
    }
    if !all_done && task.completed {
        task.completed = false;
        if task.progress == 100 {
            task.progress = REOPENED_PROGRESS;
        }
    }
    false
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    /// Appends an open sub-task. Returns its id, or `None` for an unknown task.
    pub fn add_sub_task(&mut self, task_id: u64, title: &str) -> Result<Option<u64>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoError::validation("sub-task title is required"));
        }
        let Some(idx) = self.index_of(task_id) else {
            return Ok(None);
        };
        let sub = SubTask {
            id: self.ids.next_id(),
            title: title.to_string(),
            completed: false,
            created_at: self.clock.now(),
        };
        let id = sub.id;
        self.tasks[idx].sub_tasks.push(sub);
        debug!(task_id, sub_task_id = id, "sub-task added");
        self.persist_tasks()?;
        Ok(Some(id))
    }

    /// Flips a sub-task and rolls the result up into its parent.
    pub fn toggle_sub_task(&mut self, task_id: u64, sub_task_id: u64) -> Result<bool> {
        let Some(idx) = self.index_of(task_id) else {
            return Ok(false);
        };
        let task = &mut self.tasks[idx];
        let Some(sub) = task.sub_tasks.iter_mut().find(|s| s.id == sub_task_id) else {
            return Ok(false);
        };
        sub.completed = !sub.completed;

        let was_completed = task.completed;
        reconcile_parent(task);
        debug!(task_id, sub_task_id, parent_completed = task.completed, "sub-task toggled");

        self.spawn_if_completed(idx, was_completed);
        self.persist_tasks()?;
        Ok(true)
    }

    /// Deletes a sub-task without re-evaluating the parent.
    pub fn remove_sub_task(&mut self, task_id: u64, sub_task_id: u64) -> Result<bool> {
        let Some(idx) = self.index_of(task_id) else {
            return Ok(false);
        };
        let subs = &mut self.tasks[idx].sub_tasks;
        let before = subs.len();
        subs.retain(|s| s.id != sub_task_id);
        if subs.len() == before {
            return Ok(false);
        }
        self.persist_tasks()?;
        Ok(true)
    }
}
