use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::{Note, Timestamp};
use crate::notify::{share_or_copy, Clipboard, ShareError, ShareOutcome, ShareTarget};
use crate::store::{LocalStore, StorageError, KEY_NOTES};

pub const SHARE_MIME: &str = "text/plain";

pub struct NotesBook {
    store: LocalStore,
    notes: Vec<Note>,
}

impl NotesBook {
    pub fn load(store: LocalStore) -> Self {
        let notes: Vec<Note> = store.load(KEY_NOTES);
        log::debug!("loaded notes count={}", notes.len());
        Self { store, notes }
    }

    /// Newest first.
    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Case-insensitive substring match on title or content. A blank query matches all.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        if query.trim().is_empty() {
            return self.notes.iter().collect();
        }
        let needle = query.to_lowercase();
        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn create_note(
        &mut self,
        title: &str,
        content: &str,
        category: &str,
    ) -> Result<Note, AppError> {
        self.create_note_at(title, content, category, Utc::now())
    }

    pub fn create_note_at(
        &mut self,
        title: &str,
        content: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<Note, AppError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let category = if category.trim().is_empty() {
            crate::models::default_category()
        } else {
            category.to_string()
        };
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            category,
            tags: Vec::new(),
        };
        let mut next = Vec::with_capacity(self.notes.len() + 1);
        next.push(note.clone());
        next.extend(self.notes.iter().cloned());
        self.commit(next)?;
        Ok(note)
    }

    pub fn update_note(&mut self, id: &str, title: &str, content: &str) -> Result<Note, AppError> {
        self.update_note_at(id, title, content, Utc::now())
    }

    pub fn update_note_at(
        &mut self,
        id: &str,
        title: &str,
        content: &str,
        now: Timestamp,
    ) -> Result<Note, AppError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let mut next = self.notes.clone();
        let note = next
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or(ValidationError::NotFound)?;
        note.title = title.to_string();
        note.content = content.to_string();
        note.updated_at = now;
        let updated = note.clone();
        self.commit(next)?;
        Ok(updated)
    }

    pub fn set_tags(&mut self, id: &str, tags: Vec<String>) -> Result<Note, AppError> {
        let mut next = self.notes.clone();
        let note = next
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or(ValidationError::NotFound)?;
        note.tags = tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        let updated = note.clone();
        self.commit(next)?;
        Ok(updated)
    }

    pub fn delete_note(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut next = self.notes.clone();
        let before = next.len();
        next.retain(|note| note.id != id);
        let removed = next.len() != before;
        self.commit(next)?;
        Ok(removed)
    }

    pub fn share_note(
        &self,
        id: &str,
        target: &dyn ShareTarget,
        clipboard: &dyn Clipboard,
    ) -> Result<ShareOutcome, ShareError> {
        let note = self
            .get(id)
            .ok_or_else(|| ShareError(ValidationError::NotFound.to_string()))?;
        share_or_copy(target, clipboard, &share_text(note), SHARE_MIME, "Share Note")
    }

    pub fn reload(&mut self) {
        self.notes = self.store.load(KEY_NOTES);
    }

    fn commit(&mut self, next: Vec<Note>) -> Result<(), StorageError> {
        self.store.save(KEY_NOTES, &next)?;
        self.notes = next;
        Ok(())
    }
}

pub fn share_text(note: &Note) -> String {
    format!("{}\n\n{}", note.title, note.content)
}
