use chrono::{DateTime, Utc};
use tracing::info;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Task, TimeSession};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;

/// Seconds tracked so far, including a session that is still running.
/// Reading never changes the task.
pub fn current_elapsed(task: &Task, now: DateTime<Utc>) -> u64 {
    let tracking = &task.time_tracking;
    let running = match (tracking.is_running, tracking.start_time) {
        (true, Some(start)) => whole_seconds(start, now),
        _ => 0,
    };
    tracking.total_time + running
}

/// Formats seconds as `HH:MM:SS`.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

fn whole_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}

/// Closes the running session of `task`, if any. Returns the session length.
fn close_session(task: &mut Task, now: DateTime<Utc>) -> Option<u64> {
    let tracking = &mut task.time_tracking;
    if !tracking.is_running {
        return None;
    }
    let start = tracking.start_time.unwrap_or(now);
    let duration = whole_seconds(start, now);
    tracking.sessions.push(TimeSession {
        start,
        end: now,
        duration,
    });
    tracking.total_time += duration;
    tracking.is_running = false;
    tracking.start_time = None;
    Some(duration)
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    /// Starts the timer of a task, stopping whichever other timer is running.
    ///
    /// Returns `false` for an unknown task or one whose timer already runs.
    pub fn start_timer(&mut self, task_id: u64) -> Result<bool> {
        let Some(idx) = self.index_of(task_id) else {
            return Ok(false);
        };
        if self.tasks[idx].time_tracking.is_running {
            return Ok(false);
        }
        let now = self.clock.now();
        for task in self.tasks.iter_mut().filter(|t| t.id != task_id) {
            if let Some(duration) = close_session(task, now) {
                info!(id = task.id, duration, "timer stopped");
            }
        }
        let tracking = &mut self.tasks[idx].time_tracking;
        tracking.is_running = true;
        tracking.start_time = Some(now);
        info!(id = task_id, "timer started");
        self.persist_tasks()?;
        Ok(true)
    }

    /// Stops the timer of a task and books the session.
    ///
    /// Returns the session length in seconds, or `None` if nothing was running.
    pub fn stop_timer(&mut self, task_id: u64) -> Result<Option<u64>> {
        let Some(idx) = self.index_of(task_id) else {
            return Ok(None);
        };
        let now = self.clock.now();
        let Some(duration) = close_session(&mut self.tasks[idx], now) else {
            return Ok(None);
        };
        info!(id = task_id, duration, "timer stopped");
        self.persist_tasks()?;
        Ok(Some(duration))
    }

    /// The task whose timer is currently running, if any.
    pub fn running_timer(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.time_tracking.is_running)
    }

    pub fn elapsed(&self, task_id: u64) -> Option<u64> {
        self.get(task_id).map(|t| current_elapsed(t, self.clock.now()))
    }
}
