use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::clock::Clock;
use crate::error::{Result, TodoError};
use crate::models::{Task, Template};
use crate::storage::KeyValueStore;
use crate::store::TaskStore;

/// Version string written into backups.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Full snapshot of tasks and templates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub todos: Vec<Task>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub total_tasks: usize,
    #[serde(default)]
    pub completed_tasks: usize,
}

impl Backup {
    pub fn new(tasks: &[Task], templates: &[Template], now: DateTime<Utc>) -> Self {
        Backup {
            todos: tasks.to_vec(),
            templates: templates.to_vec(),
            export_date: Some(now),
            app_version: APP_VERSION.to_string(),
            total_tasks: tasks.len(),
            completed_tasks: tasks.iter().filter(|t| t.completed).count(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a backup document, checking its shape before anything else.
    pub fn parse(raw: &str) -> Result<Backup> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| TodoError::format(format!("backup is not valid JSON: {}", e)))?;
        let Some(object) = value.as_object() else {
            return Err(TodoError::format("backup must be a JSON object"));
        };
        match object.get("todos") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(TodoError::format("backup field 'todos' must be an array")),
            None => return Err(TodoError::format("backup is missing the 'todos' array")),
        }
        if let Some(templates) = object.get("templates") {
            if !templates.is_array() && !templates.is_null() {
                return Err(TodoError::format("backup field 'templates' must be an array"));
            }
        }

        let todos: Vec<Task> = serde_json::from_value(object["todos"].clone())
            .map_err(|e| TodoError::format(format!("backup contains an invalid task: {}", e)))?;
        let templates: Vec<Template> = match object.get("templates") {
            Some(Value::Array(_)) => serde_json::from_value(object["templates"].clone())
                .map_err(|e| TodoError::format(format!("backup contains an invalid template: {}", e)))?,
            _ => Vec::new(),
        };
        check_unique_ids(&todos)?;
        let export_date = match object.get("exportDate") {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| TodoError::format(format!("backup has an invalid exportDate: {}", e)))?,
            None => None,
        };
        let app_version = object
            .get("appVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Backup {
            total_tasks: todos.len(),
            completed_tasks: todos.iter().filter(|t| t.completed).count(),
            todos,
            templates,
            export_date,
            app_version,
        })
    }
}

impl<S: KeyValueStore, C: Clock> TaskStore<S, C> {
    pub fn backup(&self) -> Backup {
        Backup::new(&self.tasks, &self.templates, self.clock.now())
    }

    /// Replaces all tasks and templates with the backup's content.
    ///
    /// A backup in which two tasks share an id is rejected before anything
    /// is replaced.
    pub fn restore(&mut self, backup: Backup) -> Result<()> {
        check_unique_ids(&backup.todos)?;
        info!(
            tasks = backup.todos.len(),
            templates = backup.templates.len(),
            version = %backup.app_version,
            "restoring backup"
        );
        self.replace_all(backup.todos, backup.templates)
    }

    /// Parses `raw` and restores it. Malformed input leaves the store as it was.
    pub fn restore_from_str(&mut self, raw: &str) -> Result<()> {
        let backup = Backup::parse(raw)?;
        self.restore(backup)
    }
}

fn check_unique_ids(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    match tasks.iter().find(|t| !seen.insert(t.id)) {
        Some(dup) => Err(TodoError::format(format!("backup holds more than one task with id {}", dup.id))),
        None => Ok(()),
    }
}
