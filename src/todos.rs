use chrono::{DateTime, Local, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::Todo;
use crate::store::{LocalStore, StorageError, KEY_TODOS};

/// At most this many todos may be created per calendar day.
pub const DAILY_TODO_LIMIT: usize = 5;

/// Today's todos with the daily creation quota.
///
/// The full history stays persisted; only the entries whose `created_at` falls on the
/// viewer's current calendar day are shown and counted against the quota.
pub struct TodoList {
    store: LocalStore,
    todos: Vec<Todo>,
}

impl TodoList {
    pub fn load(store: LocalStore) -> Self {
        let todos: Vec<Todo> = store.load(KEY_TODOS);
        log::debug!("loaded todos count={}", todos.len());
        Self { store, todos }
    }

    /// Every stored todo, including earlier days.
    pub fn all(&self) -> &[Todo] {
        &self.todos
    }

    pub fn todays_todos(&self) -> Vec<Todo> {
        self.todays_todos_at(&Local::now())
    }

    pub fn todays_todos_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<Todo> {
        self.todos
            .iter()
            .filter(|todo| same_day(&todo.created_at, now))
            .cloned()
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.task_count_at(&Local::now())
    }

    pub fn task_count_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> usize {
        self.todos
            .iter()
            .filter(|todo| same_day(&todo.created_at, now))
            .count()
    }

    pub fn can_add(&self) -> bool {
        self.can_add_at(&Local::now())
    }

    pub fn can_add_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.task_count_at(now) < DAILY_TODO_LIMIT
    }

    pub fn remaining_today(&self) -> usize {
        self.remaining_today_at(&Local::now())
    }

    pub fn remaining_today_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> usize {
        DAILY_TODO_LIMIT.saturating_sub(self.task_count_at(now))
    }

    pub fn add_todo(&mut self, text: &str) -> Result<Todo, AppError> {
        self.add_todo_at(text, &Local::now())
    }

    pub fn add_todo_at<Tz: TimeZone>(
        &mut self,
        text: &str,
        now: &DateTime<Tz>,
    ) -> Result<Todo, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if !self.can_add_at(now) {
            log::info!("todo rejected: daily limit of {DAILY_TODO_LIMIT} reached");
            return Err(ValidationError::DailyQuotaReached.into());
        }

        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
            created_at: now.with_timezone(&Utc),
        };
        let mut next = self.todos.clone();
        next.push(todo.clone());
        self.commit(next)?;
        Ok(todo)
    }

    /// Flips `completed` on the matching todo. The list is written back even when no todo
    /// matches.
    pub fn toggle_todo(&mut self, id: &str) -> Result<Option<Todo>, StorageError> {
        let mut next = self.todos.clone();
        let toggled = next.iter_mut().find(|todo| todo.id == id).map(|todo| {
            todo.completed = !todo.completed;
            todo.clone()
        });
        self.commit(next)?;
        Ok(toggled)
    }

    pub fn delete_todo(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut next = self.todos.clone();
        let before = next.len();
        next.retain(|todo| todo.id != id);
        let removed = next.len() != before;
        self.commit(next)?;
        Ok(removed)
    }

    /// Re-reads the list after another writer (import, clear-all) touched the store.
    pub fn reload(&mut self) {
        self.todos = self.store.load(KEY_TODOS);
    }

    // The in-memory list only moves forward once the write succeeded.
    fn commit(&mut self, next: Vec<Todo>) -> Result<(), StorageError> {
        self.store.save(KEY_TODOS, &next)?;
        self.todos = next;
        Ok(())
    }
}

fn same_day<Tz: TimeZone>(created_at: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    created_at.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}
