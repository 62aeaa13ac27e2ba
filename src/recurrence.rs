use chrono::{Days, Months, NaiveDate};
use tracing::{debug, info};

use crate::ids::IdAllocator;
use crate::models::{Frequency, Task, TimeTracking};

/// Computes the due date that follows `date` for the given pattern.
///
/// Monthly and yearly steps clamp to the last day of the target month
/// (Jan 31 + 1 month = Feb 28/29). Returns `None` without a date or when the
/// result would leave the representable calendar.
pub fn next_due_date(date: Option<NaiveDate>, frequency: Frequency, interval: u32) -> Option<NaiveDate> {
    let date = date?;
    let interval = interval.max(1);
    match frequency {
        Frequency::Daily => date.checked_add_days(Days::new(u64::from(interval))),
        Frequency::Weekly => date.checked_add_days(Days::new(u64::from(interval) * 7)),
        Frequency::Monthly => date.checked_add_months(Months::new(interval)),
        Frequency::Yearly => date.checked_add_months(Months::new(interval.checked_mul(12)?)),
    }
}

/// Builds the successor of a completed recurring task.
///
/// Returns `None` when the task does not recur or has no due date.
pub fn spawn_next(task: &Task, ids: &mut IdAllocator, today: NaiveDate) -> Option<Task> {
    let recurrence = task.recurrence?;
    let due = next_due_date(task.due_date, recurrence.frequency, recurrence.interval)?;
    let next = next_instance(task, ids.next_id(), due, today);
    debug!(source = task.id, id = next.id, due = %due, "spawned recurring instance");
    Some(next)
}

/// Marks every overdue, unfinished recurring task as missed and appends one
/// fresh instance per task, due on the first occurrence on or after `today`.
///
/// Only tasks present before the call are inspected. Returns how many tasks
/// were marked missed.
pub fn catch_up_overdue(tasks: &mut Vec<Task>, today: NaiveDate, ids: &mut IdAllocator) -> usize {
    let mut spawned = Vec::new();
    let mut missed = 0;

    for task in tasks.iter_mut() {
        if !task.is_recurring || task.completed {
            continue;
        }
        let (Some(due), Some(recurrence)) = (task.due_date, task.recurrence) else {
            continue;
        };
        if due >= today {
            continue;
        }

        task.mark_missed();
        missed += 1;

        let mut date = due;
        let caught_up = loop {
            match next_due_date(Some(date), recurrence.frequency, recurrence.interval) {
                Some(d) if d >= today => break Some(d),
                Some(d) => date = d,
                None => break None,
            }
        };
        if let Some(due) = caught_up {
            spawned.push(next_instance(task, ids.next_id(), due, today));
        }
    }

    if missed > 0 {
        info!(missed, spawned = spawned.len(), "caught up overdue recurring tasks");
    }
    tasks.extend(spawned);
    missed
}

fn next_instance(task: &Task, id: u64, due: NaiveDate, today: NaiveDate) -> Task {
    let mut next = task.clone();
    next.id = id;
    next.progress = 0;
    next.completed = false;
    next.missed = false;
    next.due_date = Some(due);
    next.created_date = today;
    next.time_tracking = TimeTracking::default();
    for sub in next.sub_tasks.iter_mut() {
        sub.completed = false;
    }
    next
}
