//! Daybook: a daily todo list with a quota, a focus timer, notes, reminders backed by
//! host notifications, settings with JSON export and backups, and a keypad calculator.
//!
//! The library is platform-neutral. Hosts supply a [`store::KeyValueStore`], a
//! [`notify::NotificationService`] and, for sharing, [`notify::ShareTarget`] and
//! [`notify::Clipboard`] implementations.

pub mod app;
pub mod backup;
pub mod calculator;
pub mod error;
pub mod logging;
pub mod models;
pub mod notes;
pub mod notify;
pub mod pomodoro;
pub mod recurrence;
pub mod reminders;
pub mod settings;
pub mod store;
pub mod ticker;
pub mod todos;

pub use app::Daybook;
pub use error::{AppError, ValidationError};
pub use models::{BackupDocument, Note, Recurrence, RecurrenceKind, Reminder, Settings, Todo};
pub use store::{LocalStore, StorageError};
