//! Transient notices handed to the render sink.
//!
//! A notice reports something the user should know about a sync, such as a
//! rejected push. How it is shown, and for how long, is up to the sink;
//! the notice only carries a suggested lifetime.

use std::fmt;
use std::time::{Duration, Instant};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    /// Short tag for plain-text sinks
    pub fn tag(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notice {
    const DEFAULT_DURATION: Duration = Duration::from_secs(3);

    pub fn new(message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: Self::DEFAULT_DURATION,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        // Errors stay up longer
        Self::new(message, NoticeLevel::Error).with_duration(Duration::from_secs(5))
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.tag(), self.message)
    }
}
