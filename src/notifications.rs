// src/notifications.rs

//! Toast notifications
//!
//! Newest toasts come first. Each carries a time-to-live; the host calls
//! [`NotificationCenter::prune`] on its own tick to drop expired ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};

use crate::config::NotificationConfig;
use crate::error::{Error, ErrorKind};
use crate::event::Subject;
use crate::utils::Time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: Option<String>,
    pub message: String,
    pub ttl_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = chrono::Duration::milliseconds(self.ttl_ms as i64);
        now >= self.created_at + ttl
    }
}

#[derive(Debug)]
pub struct NotificationCenter {
    seq: AtomicU64,
    default_ttl: Duration,
    toasts: Subject<Vec<Toast>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(&NotificationConfig::default())
    }
}

impl NotificationCenter {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            seq: AtomicU64::new(1),
            default_ttl: Duration::from_millis(config.ttl_ms),
            toasts: Subject::new(Vec::new()),
        }
    }

    pub fn show(
        &self,
        kind: ToastKind,
        message: impl Into<String>,
        title: Option<String>,
        ttl: Option<Duration>,
    ) -> u64 {
        let toast = Toast {
            id: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
            title,
            message: message.into(),
            ttl_ms: ttl.unwrap_or(self.default_ttl).as_millis() as u64,
            created_at: Time::now(),
        };
        let id = toast.id;
        self.toasts.update(|list| list.insert(0, toast));
        id
    }

    pub fn success(&self, message: impl Into<String>, title: Option<&str>) -> u64 {
        self.show(ToastKind::Success, message, title.map(str::to_string), None)
    }

    pub fn error(&self, message: impl Into<String>, title: Option<&str>) -> u64 {
        self.show(ToastKind::Error, message, title.map(str::to_string), None)
    }

    pub fn info(&self, message: impl Into<String>, title: Option<&str>) -> u64 {
        self.show(ToastKind::Info, message, title.map(str::to_string), None)
    }

    pub fn dismiss(&self, id: u64) {
        self.toasts.update(|list| list.retain(|t| t.id != id));
    }

    /// Drops toasts whose ttl has elapsed, returns how many were removed
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let expired = self
            .toasts
            .with(|list| list.iter().filter(|t| t.is_expired(now)).count());
        if expired > 0 {
            self.toasts.update(|list| list.retain(|t| !t.is_expired(now)));
        }
        expired
    }

    pub fn clear(&self) {
        self.toasts.set(Vec::new());
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.get()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<Toast>> {
        self.toasts.subscribe()
    }

    /// Shows the toast a failed call maps to
    pub fn report(&self, error: &Error) -> u64 {
        let (kind, title, message) = describe(error);
        self.show(kind, message, Some(title.to_string()), None)
    }
}

/// Toast kind, title and message for an error
pub fn describe(error: &Error) -> (ToastKind, &'static str, String) {
    match error.status_code() {
        Some(0) => (
            ToastKind::Error,
            "Network error",
            "Check your connection.".to_string(),
        ),
        Some(401) => (
            ToastKind::Info,
            "Unauthorized",
            "Please sign in again.".to_string(),
        ),
        Some(403) => (
            ToastKind::Info,
            "Forbidden",
            "You do not have permission.".to_string(),
        ),
        Some(404) => (
            ToastKind::Info,
            "Not found",
            "Requested resource does not exist.".to_string(),
        ),
        Some(status) if status >= 500 => (
            ToastKind::Error,
            "Server error",
            "Please try again shortly.".to_string(),
        ),
        Some(_) => (ToastKind::Error, "Request failed", error.message.clone()),
        None => {
            let title = match &error.kind {
                ErrorKind::Validation { .. } => "Check the form",
                ErrorKind::BusinessRule { .. } => "Not allowed",
                ErrorKind::Authentication { .. } => "Sign in required",
                _ => "Unexpected error",
            };
            (ToastKind::Error, title, error.message.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusinessRule;

    #[test]
    fn test_newest_first_and_dismiss() {
        let center = NotificationCenter::default();
        let first = center.success("Saved", None);
        let second = center.info("Heads up", Some("Note"));

        let toasts = center.toasts();
        assert_eq!(toasts[0].id, second);
        assert_eq!(toasts[1].id, first);
        assert_eq!(toasts[1].ttl_ms, 2800);

        center.dismiss(second);
        assert_eq!(center.toasts().len(), 1);
        center.clear();
        assert!(center.toasts().is_empty());
    }

    #[test]
    fn test_prune_expired() {
        let center = NotificationCenter::default();
        center.show(ToastKind::Info, "short", None, Some(Duration::from_millis(10)));
        center.success("long", None);

        let later = Time::now() + chrono::Duration::milliseconds(100);
        assert_eq!(center.prune(later), 1);
        assert_eq!(center.toasts()[0].message, "long");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (0, ToastKind::Error, "Network error"),
            (401, ToastKind::Info, "Unauthorized"),
            (403, ToastKind::Info, "Forbidden"),
            (404, ToastKind::Info, "Not found"),
            (502, ToastKind::Error, "Server error"),
            (422, ToastKind::Error, "Request failed"),
        ];
        for (status, kind, title) in cases {
            let (k, t, _) = describe(&Error::from_status(status, "/orders", "Out of stock"));
            assert_eq!((k, t), (kind, title), "status {}", status);
        }

        let (_, _, message) = describe(&Error::from_status(422, "/orders", "Out of stock"));
        assert_eq!(message, "Out of stock");
    }

    #[test]
    fn test_report_local_error() {
        let center = NotificationCenter::default();
        center.report(&Error::business(BusinessRule::DuplicateReview, "Already reviewed"));
        let toast = &center.toasts()[0];
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "Already reviewed");
    }
}
