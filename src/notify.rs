//! Host collaborators: local notifications, the native share sheet and the clipboard.
//!
//! The library never talks to a platform API directly. A shell implements these traits
//! and hands them to the feature controllers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque id returned by the host notification service for one scheduled alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    PermissionDenied,
    Unavailable(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::PermissionDenied => f.write_str("notification permission not granted"),
            NotifyError::Unavailable(reason) => write!(f, "notifications unavailable: {reason}"),
        }
    }
}

impl std::error::Error for NotifyError {}

pub trait NotificationService: Send + Sync {
    fn schedule(
        &self,
        title: &str,
        body: &str,
        trigger: DateTime<Utc>,
    ) -> Result<NotificationHandle, NotifyError>;
    fn cancel(&self, handle: &NotificationHandle);
    fn cancel_all(&self);
}

/// Used by hosts without a notification center. Every request is refused, so reminders
/// are stored as silent entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifications;

impl NotificationService for NoNotifications {
    fn schedule(
        &self,
        _title: &str,
        _body: &str,
        _trigger: DateTime<Utc>,
    ) -> Result<NotificationHandle, NotifyError> {
        Err(NotifyError::PermissionDenied)
    }

    fn cancel(&self, _handle: &NotificationHandle) {}

    fn cancel_all(&self) {}
}

pub trait ShareTarget {
    fn is_available(&self) -> bool;
    fn share(&self, payload: &str, mime_type: &str, title: &str) -> Result<(), String>;
}

pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareError(pub String);

impl std::fmt::Display for ShareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "share failed: {}", self.0)
    }
}

impl std::error::Error for ShareError {}

/// Hands `payload` to the share sheet; the clipboard takes over when the sheet is missing
/// or refuses the payload.
pub fn share_or_copy(
    target: &dyn ShareTarget,
    clipboard: &dyn Clipboard,
    payload: &str,
    mime_type: &str,
    title: &str,
) -> Result<ShareOutcome, ShareError> {
    if target.is_available() {
        match target.share(payload, mime_type, title) {
            Ok(()) => return Ok(ShareOutcome::Shared),
            Err(reason) => log::warn!("share sheet failed, copying instead: {reason}"),
        }
    }
    clipboard.copy(payload).map_err(ShareError)?;
    Ok(ShareOutcome::Copied)
}
