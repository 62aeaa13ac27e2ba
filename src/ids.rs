use chrono::{DateTime, Utc};

use crate::models::Task;

/// Hands out ids for tasks, sub-tasks and attachments.
///
/// Ids stay close to the creation timestamp in milliseconds but never repeat:
/// the counter starts above every id already in use and only moves forward.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn seeded(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let highest = tasks
            .iter()
            .flat_map(|t| {
                std::iter::once(t.id)
                    .chain(t.sub_tasks.iter().map(|s| s.id))
                    .chain(t.attachments.iter().map(|a| a.id))
            })
            .max()
            .unwrap_or(0);
        let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        IdAllocator {
            next: stamp.max(highest.saturating_add(1)),
        }
    }

    /// The counter stops at `u64::MAX`; only hand-edited data gets there.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.checked_add(1).unwrap_or(u64::MAX);
        id
    }
}
