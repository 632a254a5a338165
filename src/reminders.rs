use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::{Recurrence, Reminder, Timestamp};
use crate::notify::{NotificationHandle, NotificationService, NotifyError};
use crate::recurrence::next_occurrence_after;
use crate::store::{LocalStore, StorageError, KEY_REMINDERS};

/// Notification body used when a reminder has no description.
pub const DEFAULT_BODY: &str = "Reminder notification";

#[derive(Debug, Clone, Default)]
pub struct ReminderDraft {
    pub title: String,
    pub description: String,
    pub datetime: Timestamp,
    pub recurring: Option<Recurrence>,
}

/// Reminders sorted by due time, each optionally backed by a live host notification.
///
/// A stored `notification_id` always names a notification that is still scheduled: every
/// path that completes, deletes or clears a reminder cancels the handle first.
pub struct ReminderBook {
    store: LocalStore,
    notifier: Arc<dyn NotificationService>,
    reminders: Vec<Reminder>,
    notifications_enabled: bool,
}

impl ReminderBook {
    pub fn load(store: LocalStore, notifier: Arc<dyn NotificationService>) -> Self {
        let reminders: Vec<Reminder> = store.load(KEY_REMINDERS);
        log::debug!("loaded reminders count={}", reminders.len());
        Self {
            store,
            notifier,
            reminders,
            notifications_enabled: true,
        }
    }

    pub fn all(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    /// Incomplete reminders whose time has already passed.
    pub fn overdue(&self, now: Timestamp) -> Vec<&Reminder> {
        self.reminders
            .iter()
            .filter(|reminder| !reminder.completed && reminder.datetime < now)
            .collect()
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// While disabled, new and re-opened reminders are stored without a notification.
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }

    pub fn create_reminder(&mut self, draft: ReminderDraft) -> Result<Reminder, AppError> {
        self.create_reminder_at(draft, Utc::now())
    }

    pub fn create_reminder_at(
        &mut self,
        draft: ReminderDraft,
        now: Timestamp,
    ) -> Result<Reminder, AppError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if draft.datetime <= now {
            return Err(ValidationError::PastDateTime.into());
        }

        let mut reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            description: draft.description,
            datetime: draft.datetime,
            completed: false,
            notification_id: None,
            recurring: draft.recurring,
        };
        reminder.notification_id = self.request_handle(&reminder);

        let mut next = self.reminders.clone();
        next.push(reminder.clone());
        if let Err(error) = self.commit(next) {
            self.release(&reminder);
            return Err(error.into());
        }
        Ok(reminder)
    }

    pub fn toggle_complete(&mut self, id: &str) -> Result<Reminder, AppError> {
        self.toggle_complete_at(id, &Local::now())
    }

    /// Completing cancels the live notification; re-opening a future reminder schedules a
    /// new one. Completing a recurring reminder hands its rule to a freshly spawned next
    /// occurrence, so a reopened and re-completed entry never spawns a second one.
    pub fn toggle_complete_at<Tz: TimeZone>(
        &mut self,
        id: &str,
        now: &DateTime<Tz>,
    ) -> Result<Reminder, AppError> {
        let now_utc = now.with_timezone(&Utc);
        let index = self
            .reminders
            .iter()
            .position(|reminder| reminder.id == id)
            .ok_or(ValidationError::NotFound)?;

        let mut updated = self.reminders[index].clone();
        updated.completed = !updated.completed;
        let mut spawned = None;
        if updated.completed {
            if let Some(handle) = updated.notification_id.take() {
                self.notifier.cancel(&handle);
            }
            if let Some(rule) = updated.recurring.take() {
                spawned = self.follow_up(&updated, &rule, now, now_utc);
            }
        } else if updated.notification_id.is_none() && updated.datetime > now_utc {
            updated.notification_id = self.request_handle(&updated);
        }

        let mut next = self.reminders.clone();
        next[index] = updated.clone();
        next.extend(spawned.iter().cloned());
        if let Err(error) = self.commit(next) {
            // The host-side change already happened; keep the record but drop any handle
            // this call touched.
            if let Some(follow_up) = &spawned {
                self.release(follow_up);
            }
            if updated.completed {
                self.reminders[index].notification_id = None;
            } else {
                self.release(&updated);
            }
            return Err(error.into());
        }
        Ok(updated)
    }

    /// Cancels any live notification, then removes the reminder.
    pub fn delete_reminder(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.reminders.iter().position(|reminder| reminder.id == id) else {
            return Ok(false);
        };
        if let Some(handle) = self.reminders[index].notification_id.take() {
            self.notifier.cancel(&handle);
        }
        let mut next = self.reminders.clone();
        next.remove(index);
        self.commit(next)?;
        Ok(true)
    }

    /// Cancels every scheduled notification and forgets the stored handles.
    pub fn cancel_all_notifications(&mut self) -> Result<(), StorageError> {
        self.notifier.cancel_all();
        let mut next = self.reminders.clone();
        for reminder in &mut next {
            reminder.notification_id = None;
        }
        for reminder in &mut self.reminders {
            reminder.notification_id = None;
        }
        self.commit(next)
    }

    /// Re-reads the stored list and rebuilds notifications from scratch: every incomplete
    /// future reminder gets a fresh handle, everything else none.
    pub fn reload_and_reschedule(&mut self, now: Timestamp) -> Result<(), StorageError> {
        self.notifier.cancel_all();
        let mut next: Vec<Reminder> = self.store.load(KEY_REMINDERS);
        for reminder in &mut next {
            reminder.notification_id = None;
            if !reminder.completed && reminder.datetime > now {
                reminder.notification_id = self.request_handle(reminder);
            }
        }
        self.reminders = next.clone();
        self.commit(next)
    }

    /// Re-reads the stored list without touching notifications.
    pub fn reload(&mut self) {
        self.reminders = self.store.load(KEY_REMINDERS);
    }

    fn follow_up<Tz: TimeZone>(
        &self,
        completed: &Reminder,
        rule: &Recurrence,
        now: &DateTime<Tz>,
        now_utc: Timestamp,
    ) -> Option<Reminder> {
        let Some(datetime) =
            next_occurrence_after(completed.datetime, rule, &now.timezone(), now_utc)
        else {
            log::warn!(
                "recurrence out of range, series ends id={} rule={rule:?}",
                completed.id
            );
            return None;
        };
        let mut next = Reminder {
            id: Uuid::new_v4().to_string(),
            title: completed.title.clone(),
            description: completed.description.clone(),
            datetime,
            completed: false,
            notification_id: None,
            recurring: Some(*rule),
        };
        next.notification_id = self.request_handle(&next);
        log::debug!(
            "recurring reminder id={} next_id={} at={}",
            completed.id,
            next.id,
            datetime
        );
        Some(next)
    }

    /// Scheduling failures never block saving; the reminder just stays silent.
    fn request_handle(&self, reminder: &Reminder) -> Option<NotificationHandle> {
        if !self.notifications_enabled {
            return None;
        }
        let body = if reminder.description.trim().is_empty() {
            DEFAULT_BODY
        } else {
            reminder.description.as_str()
        };
        match self
            .notifier
            .schedule(&reminder.title, body, reminder.datetime)
        {
            Ok(handle) => Some(handle),
            Err(NotifyError::PermissionDenied) => {
                log::info!("notification permission not granted; reminder stays silent");
                None
            }
            Err(error) => {
                log::warn!("failed to schedule notification: {error}");
                None
            }
        }
    }

    fn release(&self, reminder: &Reminder) {
        if let Some(handle) = &reminder.notification_id {
            self.notifier.cancel(handle);
        }
    }

    fn commit(&mut self, mut next: Vec<Reminder>) -> Result<(), StorageError> {
        next.sort_by_key(|reminder| reminder.datetime);
        self.store.save(KEY_REMINDERS, &next)?;
        self.reminders = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurrenceKind;
    use crate::notify::testing::FakeNotifier;
    use chrono::Duration;
    use std::fs;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn draft(title: &str, hours_ahead: i64) -> ReminderDraft {
        ReminderDraft {
            title: title.to_string(),
            description: String::new(),
            datetime: now() + Duration::hours(hours_ahead),
            recurring: None,
        }
    }

    fn book(notifier: &Arc<FakeNotifier>) -> ReminderBook {
        ReminderBook::load(LocalStore::in_memory(), notifier.clone())
    }

    #[test]
    fn create_schedules_and_sorts_by_time() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let later = reminders.create_reminder_at(draft("later", 5), now()).unwrap();
        let sooner = reminders.create_reminder_at(draft("sooner", 1), now()).unwrap();

        assert_eq!(reminders.all()[0].id, sooner.id);
        assert_eq!(reminders.all()[1].id, later.id);
        assert!(notifier.is_live(later.notification_id.as_ref().unwrap()));

        let scheduled = notifier.scheduled.lock().unwrap();
        assert_eq!(scheduled[0].0, "later");
        assert_eq!(scheduled[0].1, DEFAULT_BODY);
        assert_eq!(scheduled[0].2, now() + Duration::hours(5));
    }

    #[test]
    fn create_rejects_blank_title_and_non_future_times() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);

        let err = reminders.create_reminder_at(draft(" ", 1), now()).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::EmptyTitle));

        let err = reminders.create_reminder_at(draft("now", 0), now()).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::PastDateTime));

        let err = reminders.create_reminder_at(draft("past", -1), now()).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::PastDateTime));
        assert!(reminders.all().is_empty());
        assert_eq!(notifier.live_count(), 0);
    }

    #[test]
    fn permission_denied_still_saves_a_silent_reminder() {
        let notifier = Arc::new(FakeNotifier::denying());
        let store = LocalStore::in_memory();
        let mut reminders = ReminderBook::load(store.clone(), notifier.clone());
        let created = reminders.create_reminder_at(draft("quiet", 2), now()).unwrap();
        assert!(created.notification_id.is_none());

        let reloaded = ReminderBook::load(store, notifier);
        assert_eq!(reloaded.all().len(), 1);
    }

    #[test]
    fn disabled_notifications_skip_scheduling() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        reminders.set_notifications_enabled(false);
        let created = reminders.create_reminder_at(draft("muted", 2), now()).unwrap();
        assert!(created.notification_id.is_none());
        assert!(notifier.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn toggle_cancels_then_reschedules() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let created = reminders.create_reminder_at(draft("call", 3), now()).unwrap();
        let first = created.notification_id.clone().unwrap();

        let done = reminders.toggle_complete_at(&created.id, &now()).unwrap();
        assert!(done.completed);
        assert!(done.notification_id.is_none());
        assert!(!notifier.is_live(&first));

        let reopened = reminders.toggle_complete_at(&created.id, &now()).unwrap();
        assert!(!reopened.completed);
        let second = reopened.notification_id.unwrap();
        assert_ne!(second, first);
        assert!(notifier.is_live(&second));
        assert_eq!(notifier.live_count(), 1);
    }

    #[test]
    fn reopening_a_past_reminder_stays_silent() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let created = reminders.create_reminder_at(draft("call", 1), now()).unwrap();
        reminders.toggle_complete_at(&created.id, &now()).unwrap();

        let later = now() + Duration::hours(2);
        let reopened = reminders.toggle_complete_at(&created.id, &later).unwrap();
        assert!(reopened.notification_id.is_none());
        assert_eq!(notifier.live_count(), 0);
        assert_eq!(reminders.overdue(later).len(), 1);
    }

    #[test]
    fn delete_leaves_no_live_handle_for_the_reminder() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let keep = reminders.create_reminder_at(draft("keep", 4), now()).unwrap();
        let gone = reminders.create_reminder_at(draft("gone", 2), now()).unwrap();
        let gone_handle = gone.notification_id.clone().unwrap();

        assert!(reminders.delete_reminder(&gone.id).unwrap());
        assert!(!notifier.is_live(&gone_handle));
        assert!(notifier.is_live(keep.notification_id.as_ref().unwrap()));
        assert!(reminders.get(&gone.id).is_none());
        assert!(!reminders.delete_reminder("missing").unwrap());
    }

    #[test]
    fn completing_a_recurring_reminder_spawns_the_next_one() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let mut weekly = draft("standup", 1);
        weekly.recurring = Some(Recurrence {
            kind: RecurrenceKind::Weekly,
            interval: 1,
        });
        let created = reminders.create_reminder_at(weekly, now()).unwrap();

        reminders.toggle_complete_at(&created.id, &now()).unwrap();
        assert_eq!(reminders.all().len(), 2);
        let follow_up = reminders
            .all()
            .iter()
            .find(|reminder| reminder.id != created.id)
            .unwrap();
        assert_eq!(follow_up.datetime, created.datetime + Duration::weeks(1));
        assert!(!follow_up.completed);
        assert!(notifier.is_live(follow_up.notification_id.as_ref().unwrap()));
        assert_eq!(notifier.live_count(), 1);
    }

    #[test]
    fn complete_reopen_complete_spawns_a_single_successor() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let mut weekly = draft("standup", 1);
        weekly.recurring = Some(Recurrence {
            kind: RecurrenceKind::Weekly,
            interval: 1,
        });
        let created = reminders.create_reminder_at(weekly, now()).unwrap();

        reminders.toggle_complete_at(&created.id, &now()).unwrap();
        let reopened = reminders.toggle_complete_at(&created.id, &now()).unwrap();
        assert!(reopened.recurring.is_none());
        assert_eq!(notifier.live_count(), 2);
        reminders.toggle_complete_at(&created.id, &now()).unwrap();

        assert_eq!(reminders.all().len(), 2);
        assert_eq!(notifier.live_count(), 1);
        let successor = reminders
            .all()
            .iter()
            .find(|reminder| reminder.id != created.id)
            .unwrap();
        assert!(successor.recurring.is_some());
        assert!(notifier.is_live(successor.notification_id.as_ref().unwrap()));
    }

    #[test]
    fn out_of_range_recurrence_ends_the_series() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let mut daily = draft("forever", 1);
        daily.recurring = Some(Recurrence {
            kind: RecurrenceKind::Daily,
            interval: 100_000_000,
        });
        let created = reminders.create_reminder_at(daily, now()).unwrap();

        let done = reminders.toggle_complete_at(&created.id, &now()).unwrap();
        assert!(done.completed);
        assert_eq!(reminders.all().len(), 1);
        assert_eq!(notifier.live_count(), 0);
    }

    #[test]
    fn cancel_all_clears_every_handle() {
        let notifier = Arc::new(FakeNotifier::default());
        let store = LocalStore::in_memory();
        let mut reminders = ReminderBook::load(store.clone(), notifier.clone());
        reminders.create_reminder_at(draft("a", 1), now()).unwrap();
        reminders.create_reminder_at(draft("b", 2), now()).unwrap();

        reminders.cancel_all_notifications().unwrap();
        assert_eq!(notifier.live_count(), 0);
        assert!(reminders.all().iter().all(|r| r.notification_id.is_none()));
        let reloaded = ReminderBook::load(store, notifier);
        assert!(reloaded.all().iter().all(|r| r.notification_id.is_none()));
    }

    #[test]
    fn reschedule_only_covers_incomplete_future_reminders() {
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = book(&notifier);
        let soon = reminders.create_reminder_at(draft("soon", 1), now()).unwrap();
        let far = reminders.create_reminder_at(draft("far", 10), now()).unwrap();
        let done = reminders.create_reminder_at(draft("done", 12), now()).unwrap();
        reminders.toggle_complete_at(&done.id, &now()).unwrap();

        reminders
            .reload_and_reschedule(now() + Duration::hours(2))
            .unwrap();
        assert!(reminders.get(&soon.id).unwrap().notification_id.is_none());
        assert!(reminders.get(&done.id).unwrap().notification_id.is_none());
        let far_handle = reminders.get(&far.id).unwrap().notification_id.clone();
        assert!(notifier.is_live(&far_handle.unwrap()));
        assert_eq!(notifier.live_count(), 1);
    }

    #[test]
    fn failed_write_on_create_cancels_the_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(dir.path().join("reminders.json")).unwrap();
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = ReminderBook::load(store, notifier.clone());

        let err = reminders.create_reminder_at(draft("x", 1), now()).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(reminders.all().is_empty());
        assert_eq!(notifier.live_count(), 0);
    }

    // Swaps the stored document for a directory so the next write fails.
    fn break_store(dir: &std::path::Path) {
        fs::remove_file(dir.join("reminders.json")).unwrap();
        fs::create_dir_all(dir.join("reminders.json")).unwrap();
    }

    fn assert_handles_match(reminders: &ReminderBook, notifier: &FakeNotifier) {
        let handles: Vec<&NotificationHandle> = reminders
            .all()
            .iter()
            .filter_map(|reminder| reminder.notification_id.as_ref())
            .collect();
        assert!(handles.iter().all(|handle| notifier.is_live(handle)));
        assert_eq!(handles.len(), notifier.live_count());
    }

    #[test]
    fn failed_write_on_complete_drops_cancelled_and_spawned_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = ReminderBook::load(store.clone(), notifier.clone());
        let mut weekly = draft("standup", 1);
        weekly.recurring = Some(Recurrence {
            kind: RecurrenceKind::Weekly,
            interval: 1,
        });
        let created = reminders.create_reminder_at(weekly, now()).unwrap();
        break_store(dir.path());

        let err = reminders.toggle_complete_at(&created.id, &now()).unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(reminders.all().len(), 1);
        let kept = reminders.get(&created.id).unwrap();
        assert!(!kept.completed);
        assert!(kept.notification_id.is_none());
        assert!(kept.recurring.is_some());
        assert_eq!(notifier.live_count(), 0);
        assert_handles_match(&reminders, &notifier);
        assert!(store.load::<Vec<Reminder>>(KEY_REMINDERS).is_empty());
    }

    #[test]
    fn failed_write_on_reopen_releases_the_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = ReminderBook::load(store, notifier.clone());
        let created = reminders.create_reminder_at(draft("call", 3), now()).unwrap();
        reminders.toggle_complete_at(&created.id, &now()).unwrap();
        break_store(dir.path());

        assert!(reminders.toggle_complete_at(&created.id, &now()).is_err());
        let kept = reminders.get(&created.id).unwrap();
        assert!(kept.completed);
        assert!(kept.notification_id.is_none());
        assert_eq!(notifier.live_count(), 0);
        assert_eq!(notifier.scheduled.lock().unwrap().len(), 2);
        assert_handles_match(&reminders, &notifier);
    }

    #[test]
    fn failed_write_on_delete_keeps_the_record_without_its_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open_dir(dir.path().to_path_buf()).unwrap();
        let notifier = Arc::new(FakeNotifier::default());
        let mut reminders = ReminderBook::load(store, notifier.clone());
        let keep = reminders.create_reminder_at(draft("keep", 4), now()).unwrap();
        let gone = reminders.create_reminder_at(draft("gone", 2), now()).unwrap();
        break_store(dir.path());

        assert!(reminders.delete_reminder(&gone.id).is_err());
        assert_eq!(reminders.all().len(), 2);
        assert!(reminders.get(&gone.id).unwrap().notification_id.is_none());
        assert!(notifier.is_live(keep.notification_id.as_ref().unwrap()));
        assert_eq!(notifier.live_count(), 1);
        assert_handles_match(&reminders, &notifier);
    }
}
