//! Transient notices shown to the user.

use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the notice channel. Slow listeners miss old notices.
pub(crate) const NOTICE_CAPACITY: usize = 32;

/// How prominent a notice is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short message that disappears on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// How long the notice stays on screen.
    #[must_use]
    pub fn display_for(&self) -> Duration {
        match self.level {
            NoticeLevel::Info | NoticeLevel::Success => Duration::from_secs(3),
            NoticeLevel::Warning => Duration::from_secs(4),
            NoticeLevel::Error => Duration::from_secs(6),
        }
    }
}

/// Sends a notice to whoever is listening. Nobody listening is fine.
pub(crate) fn publish(sender: &broadcast::Sender<Notice>, notice: Notice) {
    let _ = sender.send(notice);
}
