//! Core of the `todust` task manager.
//!
//! [`store::TaskStore`] owns the tasks and templates and is the only way to
//! change them; every mutation is written through to a
//! [`storage::KeyValueStore`]. Around it sit the recurrence engine, the
//! sub-task roll-up, the time tracking ledger and the view pipeline that
//! filters, searches and sorts tasks for display.

pub mod backup;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod ids;
pub mod logging;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod store;
pub mod subtasks;
pub mod timer;
pub mod tui;
pub mod view;

pub use error::{Result, TodoError};
pub use store::TaskStore;
