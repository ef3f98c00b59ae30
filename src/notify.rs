//! User-visible notifications raised at workflow boundaries.

use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl From<&Error> for Notification {
    fn from(err: &Error) -> Self {
        let level = match err {
            Error::Cancelled => Level::Info,
            Error::LocationUnavailable { .. }
            | Error::SubmissionFailed { .. }
            | Error::AnalysisFailed { .. }
            | Error::RequestFailed { .. } => Level::Error,
            _ => Level::Warning,
        };
        Self::new(level, err.to_string())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Shows notifications as log events.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            Level::Success | Level::Info => info!(level = ?n.level, "{}", n.message),
            Level::Warning => warn!("{}", n.message),
            Level::Error => error!("{}", n.message),
        }
    }
}

/// Keeps notifications for a UI to drain.
#[derive(Default)]
pub struct Inbox {
    items: Mutex<Vec<Notification>>,
}

impl Inbox {
    pub fn drain(&self) -> Vec<Notification> {
        self.items
            .lock()
            .map(|mut items| std::mem::take(&mut *items))
            .unwrap_or_default()
    }
}

impl Notifier for Inbox {
    fn notify(&self, notification: Notification) {
        if let Ok(mut items) = self.items.lock() {
            items.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_from_errors() {
        assert_eq!(Notification::from(&Error::MissingGeometry).level, Level::Warning);
        assert_eq!(Notification::from(&Error::Cancelled).level, Level::Info);
        let failed = Notification::from(&Error::AnalysisFailed {
            message: Some("quota exceeded".to_string()),
        });
        assert_eq!(failed, Notification::new(Level::Error, "quota exceeded"));
    }

    #[test]
    fn test_inbox_drains() {
        let inbox = Inbox::default();
        inbox.notify(Notification::new(Level::Info, "a"));
        inbox.notify(Notification::new(Level::Success, "b"));
        assert_eq!(inbox.drain().len(), 2);
        assert!(inbox.drain().is_empty());
    }
}
