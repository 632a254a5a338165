use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{BackupDocument, Settings, Timestamp};
use crate::notify::{share_or_copy, Clipboard, ShareError, ShareOutcome, ShareTarget};
use crate::store::{
    write_atomic, LocalStore, StorageError, ALL_KEYS, KEY_LAST_BACKUP, KEY_NOTES, KEY_REMINDERS,
    KEY_SETTINGS, KEY_TODOS,
};

pub const EXPORT_MIME: &str = "application/json";
const EXPORT_TITLE: &str = "Export Notes & Reminders";
const BACKUP_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "backup-";
const BACKUP_LIMIT: usize = 5;

/// Snapshot of every key, stamped with `now` as the backup time.
pub fn export_data(store: &LocalStore, now: Timestamp) -> BackupDocument {
    BackupDocument {
        notes: store.load(KEY_NOTES),
        reminders: store.load(KEY_REMINDERS),
        settings: store.load(KEY_SETTINGS),
        todos: store.load(KEY_TODOS),
        last_backup: Some(now),
    }
}

pub fn export_json(document: &BackupDocument) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(document)?)
}

pub fn share_export(
    document: &BackupDocument,
    target: &dyn ShareTarget,
    clipboard: &dyn Clipboard,
) -> Result<ShareOutcome, ShareError> {
    let json = export_json(document).map_err(|err| ShareError(err.to_string()))?;
    share_or_copy(target, clipboard, &json, EXPORT_MIME, EXPORT_TITLE)
}

/// Writes every section of `document`, replacing what was stored.
pub fn import_data(store: &LocalStore, document: &BackupDocument) -> Result<(), StorageError> {
    store.save(KEY_NOTES, &document.notes)?;
    store.save(KEY_REMINDERS, &document.reminders)?;
    store.save(KEY_SETTINGS, &document.settings)?;
    store.save(KEY_TODOS, &document.todos)?;
    if let Some(last_backup) = &document.last_backup {
        store.save(KEY_LAST_BACKUP, last_backup)?;
    }
    log::info!(
        "imported backup notes={} reminders={} todos={}",
        document.notes.len(),
        document.reminders.len(),
        document.todos.len()
    );
    Ok(())
}

/// Parses before writing anything, so a malformed document leaves the store untouched.
pub fn import_json(store: &LocalStore, text: &str) -> Result<BackupDocument, StorageError> {
    let document: BackupDocument = serde_json::from_str(text)?;
    import_data(store, &document)?;
    Ok(document)
}

pub fn clear_all_data(store: &LocalStore) -> Result<(), StorageError> {
    store.remove(&ALL_KEYS)?;
    log::info!("cleared all stored data");
    Ok(())
}

pub fn last_backup(store: &LocalStore) -> Option<Timestamp> {
    store.load::<Option<Timestamp>>(KEY_LAST_BACKUP)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub modified_at: i64,
}

/// Rotating JSON backups under `<root>/backups`.
pub struct BackupDir {
    root: PathBuf,
}

impl BackupDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.dir())?;
        Ok(())
    }

    fn dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    /// Writes a backup file, records `lastBackup` and trims old files. Returns the file
    /// name.
    pub fn create_backup(&self, store: &LocalStore, now: Timestamp) -> Result<String, StorageError> {
        self.ensure_dirs()?;
        let document = export_data(store, now);
        let name = format!("{BACKUP_PREFIX}{}.json", now.format("%Y%m%d-%H%M%S"));
        let json = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.dir().join(&name), &json)?;
        store.save(KEY_LAST_BACKUP, &now)?;
        self.trim_backups()?;
        log::info!("backup created name={name}");
        Ok(name)
    }

    /// Oldest first.
    pub fn list_backups(&self) -> Result<Vec<BackupEntry>, StorageError> {
        let mut results = Vec::new();
        for path in self.backup_files()? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let modified_at = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|dur| dur.as_secs() as i64)
                .unwrap_or(0);
            results.push(BackupEntry {
                name: name.to_string(),
                modified_at,
            });
        }
        Ok(results)
    }

    pub fn restore_backup(
        &self,
        store: &LocalStore,
        name: &str,
    ) -> Result<BackupDocument, StorageError> {
        let path = self.checked_path(name)?;
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        import_json(store, &buf)
    }

    pub fn delete_backup(&self, name: &str) -> Result<(), StorageError> {
        fs::remove_file(self.checked_path(name)?)?;
        Ok(())
    }

    /// Backs up when auto-backup is on and the last backup was taken on an earlier local
    /// day. Returns the new file name, if any.
    pub fn maybe_auto_backup<Tz: TimeZone>(
        &self,
        store: &LocalStore,
        now: &DateTime<Tz>,
    ) -> Result<Option<String>, StorageError> {
        let settings: Settings = store.load(KEY_SETTINGS);
        if !settings.auto_backup || !is_new_day(last_backup(store), now) {
            return Ok(None);
        }
        self.create_backup(store, now.with_timezone(&Utc)).map(Some)
    }

    fn backup_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.dir())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_backup_file(path))
            .collect();
        // Names embed a sortable timestamp.
        files.sort();
        Ok(files)
    }

    fn trim_backups(&self) -> Result<(), StorageError> {
        let files = self.backup_files()?;
        let to_remove = files.len().saturating_sub(BACKUP_LIMIT);
        for path in files.into_iter().take(to_remove) {
            let _ = fs::remove_file(path);
        }
        Ok(())
    }

    fn checked_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let path = self.dir().join(name);
        if name.contains(['/', '\\']) || name.starts_with('.') || !is_backup_file(&path) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid backup name: {name}"),
            )));
        }
        Ok(path)
    }
}

fn is_backup_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.starts_with(BACKUP_PREFIX) && name.ends_with(".json")
}

fn is_new_day<Tz: TimeZone>(last: Option<Timestamp>, now: &DateTime<Tz>) -> bool {
    match last {
        None => true,
        Some(ts) => ts.with_timezone(&now.timezone()).date_naive() != now.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Note, Todo};
    use crate::notify::testing::{FakeClipboard, FakeShare};
    use chrono::Duration;
    use chrono_tz::Asia::Tokyo;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
    }

    fn sample_note() -> Note {
        Note {
            id: "n1".into(),
            title: "title".into(),
            content: "content".into(),
            created_at: t0(),
            updated_at: t0(),
            category: "General".into(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn export_then_import_on_empty_store_round_trips() {
        let source = LocalStore::in_memory();
        let document = export_data(&source, t0());
        assert!(document.notes.is_empty());
        assert_eq!(document.settings, Settings::default());

        let text = export_json(&document).unwrap();
        let target = LocalStore::in_memory();
        import_json(&target, &text).unwrap();

        let again = export_data(&target, t0());
        assert_eq!(again, document);
        assert_eq!(last_backup(&target), Some(t0()));
    }

    #[test]
    fn export_uses_camel_case_with_last_backup_stamp() {
        let store = LocalStore::in_memory();
        store.save(KEY_NOTES, &vec![sample_note()]).unwrap();
        let json = export_json(&export_data(&store, t0())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["lastBackup"], "2024-01-02T12:00:00Z");
        assert_eq!(value["notes"][0]["createdAt"], "2024-01-02T12:00:00Z");
        assert_eq!(value["settings"]["defaultCategory"], "General");
    }

    #[test]
    fn malformed_import_writes_nothing() {
        let store = LocalStore::in_memory();
        store.save(KEY_NOTES, &vec![sample_note()]).unwrap();
        let result = import_json(&store, r#"{ "notes": [{ "id": 1 }] }"#);
        assert!(matches!(result, Err(StorageError::Json(_))));
        assert_eq!(store.load::<Vec<Note>>(KEY_NOTES).len(), 1);
    }

    #[test]
    fn clear_all_removes_every_key() {
        let store = LocalStore::in_memory();
        store.save(KEY_NOTES, &vec![sample_note()]).unwrap();
        store.save(KEY_TODOS, &Vec::<Todo>::new()).unwrap();
        store.save(KEY_LAST_BACKUP, &t0()).unwrap();

        clear_all_data(&store).unwrap();
        for key in ALL_KEYS {
            assert!(store.try_load::<serde_json::Value>(key).unwrap().is_none());
        }
    }

    #[test]
    fn share_export_hands_json_to_the_sheet() {
        let store = LocalStore::in_memory();
        let share = FakeShare {
            available: true,
            ..FakeShare::default()
        };
        let clipboard = FakeClipboard::default();
        let outcome = share_export(&export_data(&store, t0()), &share, &clipboard).unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);
        assert_eq!(share.shared.lock().unwrap()[0].1, EXPORT_MIME);
    }

    #[test]
    fn backups_rotate_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let backups = BackupDir::new(dir.path().to_path_buf());
        store.save(KEY_NOTES, &vec![sample_note()]).unwrap();

        let mut names = Vec::new();
        for i in 0..7 {
            names.push(backups.create_backup(&store, t0() + Duration::minutes(i)).unwrap());
        }
        let listed = backups.list_backups().unwrap();
        assert_eq!(listed.len(), BACKUP_LIMIT);
        assert_eq!(listed[0].name, names[2]);
        assert_eq!(listed[4].name, names[6]);
        assert_eq!(last_backup(&store), Some(t0() + Duration::minutes(6)));

        clear_all_data(&store).unwrap();
        let restored = backups.restore_backup(&store, &names[6]).unwrap();
        assert_eq!(restored.notes.len(), 1);
        assert_eq!(store.load::<Vec<Note>>(KEY_NOTES).len(), 1);

        backups.delete_backup(&names[6]).unwrap();
        assert_eq!(backups.list_backups().unwrap().len(), BACKUP_LIMIT - 1);
    }

    #[test]
    fn backup_names_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let backups = BackupDir::new(dir.path().to_path_buf());
        backups.ensure_dirs().unwrap();
        assert!(backups.restore_backup(&store, "../settings.json").is_err());
        assert!(backups.restore_backup(&store, "notes.json").is_err());
    }

    #[test]
    fn auto_backup_runs_once_per_local_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let backups = BackupDir::new(dir.path().to_path_buf());

        let morning = Tokyo.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        assert!(backups.maybe_auto_backup(&store, &morning).unwrap().is_none());

        let settings = Settings {
            auto_backup: true,
            ..Settings::default()
        };
        store.save(KEY_SETTINGS, &settings).unwrap();
        assert!(backups.maybe_auto_backup(&store, &morning).unwrap().is_some());

        let evening = Tokyo.with_ymd_and_hms(2024, 1, 2, 22, 0, 0).unwrap();
        assert!(backups.maybe_auto_backup(&store, &evening).unwrap().is_none());

        let next_day = Tokyo.with_ymd_and_hms(2024, 1, 3, 0, 30, 0).unwrap();
        assert!(backups.maybe_auto_backup(&store, &next_day).unwrap().is_some());
        assert_eq!(backups.list_backups().unwrap().len(), 2);
    }
}
