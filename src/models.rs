use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Progress values a task may hold.
pub const PROGRESS_STEPS: [u8; 5] = [0, 25, 50, 75, 100];

/// Progress a task falls back to when it is marked incomplete from 100%.
pub const REOPENED_PROGRESS: u8 = 75;

/// Importance of a task. The weight feeds statistics and priority sorting.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn weight(self) -> u32 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}' (expected high, medium or low)", other)),
        }
    }
}

/// How often a recurring task comes back.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!(
                "unknown recurrence '{}' (expected daily, weekly, monthly or yearly)",
                other
            )),
        }
    }
}

/// Recurrence pattern of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub interval: u32,
}

impl Recurrence {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Recurrence { frequency, interval }
    }
}

/// One finished timer run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whole seconds between `start` and `end`.
    pub duration: u64,
}

/// Time tracked against a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimeTracking {
    /// Seconds accumulated over all finished sessions.
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions: Vec<TimeSession>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Url,
    File,
    Note,
}

impl FromStr for AttachmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "url" => Ok(AttachmentKind::Url),
            "file" => Ok(AttachmentKind::File),
            "note" => Ok(AttachmentKind::Note),
            other => Err(format!("unknown attachment type '{}' (expected url, file or note)", other)),
        }
    }
}

/// A link, file reference or free-form note attached to a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A checklist item of a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a task as seen by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Completed,
    /// A recurring instance whose due date passed before it was done.
    Missed,
}

/// Represents a single task (todo).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task.
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Calendar due date, compared without a time component.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub due_date: Option<NaiveDate>,
    /// Lowercase, trimmed category names.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    /// One of [`PROGRESS_STEPS`].
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub completed: bool,
    /// Set together with `completed = true, progress = 0` when a recurring
    /// instance was skipped over by the overdue catch-up.
    #[serde(default, skip_serializing_if = "is_false")]
    pub missed: bool,
    pub created_date: NaiveDate,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub time_tracking: TimeTracking,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.missed {
            TaskStatus::Missed
        } else if self.completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Open
        }
    }

    pub fn is_missed(&self) -> bool {
        self.missed
    }

    /// Flags the task as a missed recurring instance.
    pub fn mark_missed(&mut self) {
        self.completed = true;
        self.progress = 0;
        self.missed = true;
    }

    /// Repairs records written by older versions or edited by hand.
    ///
    /// Returns `true` when anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.is_recurring, self.missed);
        self.is_recurring = self.recurrence.is_some();
        if self.is_recurring && self.completed && self.progress == 0 {
            self.missed = true;
        }
        if !self.is_recurring {
            self.missed = false;
        }
        before != (self.is_recurring, self.missed)
    }
}

/// Fields of the creation/edit form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub priority: Priority,
    pub progress: u8,
    pub recurrence: Option<Recurrence>,
}

impl TaskFields {
    pub fn new(title: impl Into<String>) -> Self {
        TaskFields {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Pre-fills the form from a template.
    pub fn from_template(template: &Template) -> Self {
        let recurrence = if template.is_recurring {
            template
                .frequency
                .map(|frequency| Recurrence::new(frequency, template.interval.max(1)))
        } else {
            None
        };
        TaskFields {
            title: template.title.clone(),
            description: template.description.clone(),
            due_date: None,
            categories: template.categories.clone(),
            priority: template.priority,
            progress: 0,
            recurrence,
        }
    }
}

impl From<&Task> for TaskFields {
    fn from(task: &Task) -> Self {
        TaskFields {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            categories: task.categories.clone(),
            priority: task.priority,
            progress: task.progress,
            recurrence: task.recurrence,
        }
    }
}

/// Represents a reusable task template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// The unique name of the template.
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default = "default_interval")]
    pub interval: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Reminder kinds whose last delivery is remembered per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DueSoon,
    Overdue,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::DueSoon => "due-soon",
            NotificationKind::Overdue => "overdue",
        }
    }
}

fn default_interval() -> u32 {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Older records store a missing due date as an empty string.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
