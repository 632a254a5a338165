use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const KEY_TODOS: &str = "todos";
pub const KEY_NOTES: &str = "notes";
pub const KEY_REMINDERS: &str = "reminders";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_LAST_BACKUP: &str = "lastBackup";

/// Every key the app writes. Bulk export/import and clear-all walk this list.
pub const ALL_KEYS: [&str; 5] = [
    KEY_TODOS,
    KEY_NOTES,
    KEY_REMINDERS,
    KEY_SETTINGS,
    KEY_LAST_BACKUP,
];

const FILE_SUFFIX: &str = "json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// A string-valued device store. Implementations hold raw text only; typing lives in
/// [`LocalStore`].
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// One `<key>.json` file per key under `root`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{FILE_SUFFIX}"))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            match fs::remove_file(self.path_for(key)) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

/// Writes through a sibling temp file so a crash never leaves a half-written document.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.items.lock().expect("store poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.items.lock().expect("store poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut guard = self.items.lock().expect("store poisoned");
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }
}

/// Typed JSON view over a [`KeyValueStore`], shared by every feature controller.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn open_dir(root: PathBuf) -> Result<Self, StorageError> {
        let store = FileStore::new(root);
        store.ensure_dirs()?;
        log::info!("opened file store dir={}", store.root().display());
        Ok(Self::new(store))
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set_item(key, &text).inspect_err(|error| {
            log::error!("failed to save key={key}: {error}");
        })
    }

    /// Strict read: `Ok(None)` when the key is absent, an error when the stored text does
    /// not match the expected shape.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get_item(key)? {
            None => Ok(None),
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        }
    }

    /// Lenient read: absent or unreadable documents fall back to `T::default()`.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(error) => {
                log::warn!("failed to load key={key}, using default: {error}");
                T::default()
            }
        }
    }

    pub fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.backend.remove_items(keys)
    }
}
