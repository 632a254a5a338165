use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::backup::{self, BackupDir, BackupEntry};
use crate::error::AppError;
use crate::models::{BackupDocument, Note, Settings, Timestamp};
use crate::notes::NotesBook;
use crate::notify::{Clipboard, NotificationService, ShareError, ShareOutcome, ShareTarget};
use crate::reminders::ReminderBook;
use crate::settings::{SettingToggle, SettingsPanel};
use crate::store::{LocalStore, StorageError};
use crate::todos::TodoList;

/// Every feature controller wired to one store and one notification service.
pub struct Daybook {
    store: LocalStore,
    backups: Option<BackupDir>,
    todos: TodoList,
    notes: NotesBook,
    reminders: ReminderBook,
    settings: SettingsPanel,
}

impl Daybook {
    pub fn open_dir(
        root: PathBuf,
        notifier: Arc<dyn NotificationService>,
    ) -> Result<Self, StorageError> {
        let store = LocalStore::open_dir(root.clone())?;
        let backups = BackupDir::new(root);
        backups.ensure_dirs()?;
        Ok(Self::with_store(store, Some(backups), notifier))
    }

    /// Nothing touches disk; backups are unavailable.
    pub fn in_memory(notifier: Arc<dyn NotificationService>) -> Self {
        Self::with_store(LocalStore::in_memory(), None, notifier)
    }

    pub fn with_store(
        store: LocalStore,
        backups: Option<BackupDir>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        let settings = SettingsPanel::load(store.clone());
        let mut reminders = ReminderBook::load(store.clone(), notifier);
        reminders.set_notifications_enabled(settings.settings().notifications);
        Self {
            todos: TodoList::load(store.clone()),
            notes: NotesBook::load(store.clone()),
            reminders,
            settings,
            backups,
            store,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn todos(&self) -> &TodoList {
        &self.todos
    }

    pub fn todos_mut(&mut self) -> &mut TodoList {
        &mut self.todos
    }

    pub fn notes(&self) -> &NotesBook {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NotesBook {
        &mut self.notes
    }

    pub fn reminders(&self) -> &ReminderBook {
        &self.reminders
    }

    pub fn reminders_mut(&mut self) -> &mut ReminderBook {
        &mut self.reminders
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    /// Creates a note, filing it under the configured default category when `category` is
    /// blank.
    pub fn create_note(
        &mut self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<Note, AppError> {
        let category = if category.trim().is_empty() {
            self.settings.settings().default_category.clone()
        } else {
            category.to_string()
        };
        self.notes.create_note(title, content, &category)
    }

    /// Flips a setting. Switching notifications off cancels every scheduled alarm;
    /// switching them back on reschedules the upcoming reminders.
    pub fn toggle_setting(&mut self, key: SettingToggle) -> Result<bool, StorageError> {
        let value = self.settings.toggle(key)?;
        if key == SettingToggle::Notifications {
            self.reminders.set_notifications_enabled(value);
            if value {
                self.reminders.reload_and_reschedule(Utc::now())?;
            } else {
                self.reminders.cancel_all_notifications()?;
            }
        }
        Ok(value)
    }

    pub fn set_default_category(&mut self, category: &str) -> Result<(), AppError> {
        self.settings.set_default_category(category)
    }

    pub fn set_reminder_sound(&mut self, sound: &str) -> Result<(), AppError> {
        self.settings.set_reminder_sound(sound)
    }

    pub fn export(&self) -> BackupDocument {
        backup::export_data(&self.store, Utc::now())
    }

    pub fn export_json(&self) -> Result<String, StorageError> {
        backup::export_json(&self.export())
    }

    pub fn share_export(
        &self,
        target: &dyn ShareTarget,
        clipboard: &dyn Clipboard,
    ) -> Result<ShareOutcome, ShareError> {
        backup::share_export(&self.export(), target, clipboard)
    }

    /// Replaces every section with the imported document and rebuilds notifications for
    /// the imported reminders.
    pub fn import_json(&mut self, text: &str) -> Result<BackupDocument, StorageError> {
        let document = backup::import_json(&self.store, text)?;
        self.reload_all(Utc::now())?;
        Ok(document)
    }

    pub fn clear_all_data(&mut self) -> Result<(), StorageError> {
        self.reminders.cancel_all_notifications()?;
        backup::clear_all_data(&self.store)?;
        self.reload_all(Utc::now())
    }

    pub fn last_backup(&self) -> Option<Timestamp> {
        backup::last_backup(&self.store)
    }

    pub fn backups(&self) -> Option<&BackupDir> {
        self.backups.as_ref()
    }

    /// Returns `Ok(None)` for in-memory books.
    pub fn backup_now(&self) -> Result<Option<String>, StorageError> {
        match &self.backups {
            Some(backups) => backups.create_backup(&self.store, Utc::now()).map(Some),
            None => Ok(None),
        }
    }

    pub fn auto_backup<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<Option<String>, StorageError> {
        match &self.backups {
            Some(backups) => backups.maybe_auto_backup(&self.store, now),
            None => Ok(None),
        }
    }

    pub fn list_backups(&self) -> Result<Vec<BackupEntry>, StorageError> {
        match &self.backups {
            Some(backups) => backups.list_backups(),
            None => Ok(Vec::new()),
        }
    }

    pub fn restore_backup(&mut self, name: &str) -> Result<Option<BackupDocument>, StorageError> {
        let Some(backups) = &self.backups else {
            return Ok(None);
        };
        let document = backups.restore_backup(&self.store, name)?;
        self.reload_all(Utc::now())?;
        Ok(Some(document))
    }

    fn reload_all(&mut self, now: Timestamp) -> Result<(), StorageError> {
        self.settings.reload();
        self.todos.reload();
        self.notes.reload();
        self.reminders
            .set_notifications_enabled(self.settings.settings().notifications);
        self.reminders.reload_and_reschedule(now)
    }
}
