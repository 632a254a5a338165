use crate::error::{AppError, ValidationError};
use crate::models::Settings;
use crate::store::{LocalStore, StorageError, KEY_SETTINGS};

/// Boolean switches on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingToggle {
    DarkMode,
    Notifications,
    AutoBackup,
}

pub struct SettingsPanel {
    store: LocalStore,
    settings: Settings,
}

impl SettingsPanel {
    pub fn load(store: LocalStore) -> Self {
        let settings: Settings = store.load(KEY_SETTINGS);
        Self { store, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Flips one switch and returns its new value.
    pub fn toggle(&mut self, key: SettingToggle) -> Result<bool, StorageError> {
        let mut next = self.settings.clone();
        let slot = match key {
            SettingToggle::DarkMode => &mut next.dark_mode,
            SettingToggle::Notifications => &mut next.notifications,
            SettingToggle::AutoBackup => &mut next.auto_backup,
        };
        *slot = !*slot;
        let value = *slot;
        self.commit(next)?;
        log::info!("setting toggled key={key:?} value={value}");
        Ok(value)
    }

    pub fn set_default_category(&mut self, category: &str) -> Result<(), AppError> {
        let category = non_blank(category)?;
        let mut next = self.settings.clone();
        next.default_category = category;
        Ok(self.commit(next)?)
    }

    pub fn set_reminder_sound(&mut self, sound: &str) -> Result<(), AppError> {
        let sound = non_blank(sound)?;
        let mut next = self.settings.clone();
        next.reminder_sound = sound;
        Ok(self.commit(next)?)
    }

    pub fn replace(&mut self, settings: Settings) -> Result<(), StorageError> {
        self.commit(settings)
    }

    pub fn reload(&mut self) {
        self.settings = self.store.load(KEY_SETTINGS);
    }

    // In-memory settings stay on the previous value when the write fails.
    fn commit(&mut self, next: Settings) -> Result<(), StorageError> {
        self.store.save(KEY_SETTINGS, &next)?;
        self.settings = next;
        Ok(())
    }
}

fn non_blank(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::BlankValue);
    }
    Ok(value.to_string())
}
