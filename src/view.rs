use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Task;

/// Which tasks to show by completion state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    InProgress,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Completed => "completed",
            StatusFilter::InProgress => "in-progress",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::InProgress => !task.completed,
        }
    }

    /// Next filter in display order, wrapping around.
    pub fn cycle(self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::InProgress,
            StatusFilter::InProgress => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "in-progress" | "inprogress" => Ok(StatusFilter::InProgress),
            other => Err(format!("unknown filter '{}' (expected all, completed or in-progress)", other)),
        }
    }
}

/// Ordering applied to the filtered list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest creation date first.
    #[default]
    Created,
    Title,
    /// Earliest due date first, undated tasks last.
    Due,
    /// Highest priority weight first.
    Priority,
    /// Highest progress first.
    Progress,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Created => "created",
            SortKey::Title => "title",
            SortKey::Due => "due",
            SortKey::Priority => "priority",
            SortKey::Progress => "progress",
        }
    }

    pub fn cycle(self) -> SortKey {
        match self {
            SortKey::Created => SortKey::Title,
            SortKey::Title => SortKey::Due,
            SortKey::Due => SortKey::Priority,
            SortKey::Priority => SortKey::Progress,
            SortKey::Progress => SortKey::Created,
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Created => b.created_date.cmp(&a.created_date),
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Due => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => b.priority.weight().cmp(&a.priority.weight()),
            SortKey::Progress => b.progress.cmp(&a.progress),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            "due" => Ok(SortKey::Due),
            "priority" => Ok(SortKey::Priority),
            "progress" => Ok(SortKey::Progress),
            other => Err(format!(
                "unknown sort '{}' (expected created, title, due, priority or progress)",
                other
            )),
        }
    }
}

/// Current filter, search and sort selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewParams {
    pub filter: StatusFilter,
    pub search: String,
    pub sort: SortKey,
}

/// Counts shown in the statistics panel.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Priority-weighted completion percentage, see [`weighted_completion_stat`].
    pub completion_rate: u32,
}

/// Filters, searches and sorts `tasks` without touching the collection.
pub fn visible_tasks<'a>(tasks: &'a [Task], params: &ViewParams) -> Vec<&'a Task> {
    let needle = params.search.trim().to_lowercase();
    let mut out: Vec<&Task> = tasks
        .iter()
        .filter(|t| params.filter.matches(t))
        .filter(|t| matches_search(t, &needle))
        .collect();
    // sort_by is stable: equal keys keep their collection order
    out.sort_by(|a, b| params.sort.compare(a, b));
    out
}

/// Case-insensitive substring match over title, description and categories.
/// `needle` must already be trimmed and lower-cased; empty matches everything.
pub fn matches_search(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
        || task.categories.iter().any(|c| c.to_lowercase().contains(needle))
}

/// Completed share of all tasks, weighted by priority, as a rounded
/// percentage. An empty collection yields 0.
pub fn weighted_completion_stat(tasks: &[Task]) -> u32 {
    let total: u32 = tasks.iter().map(|t| t.priority.weight()).sum();
    if total == 0 {
        return 0;
    }
    let done: u32 = tasks
        .iter()
        .filter(|t| t.completed)
        .map(|t| t.priority.weight())
        .sum();
    (f64::from(done) / f64::from(total) * 100.0).round() as u32
}

pub fn stats(tasks: &[Task]) -> Stats {
    let completed = tasks.iter().filter(|t| t.completed).count();
    Stats {
        total: tasks.len(),
        completed,
        in_progress: tasks.len() - completed,
        completion_rate: weighted_completion_stat(tasks),
    }
}

/// Splits a comma-separated category list into trimmed, lower-cased names,
/// dropping empty entries. Duplicates are kept.
pub fn process_categories(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
