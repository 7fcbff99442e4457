//! Logging levels and the `notifications/message` payload.

use serde::{Deserialize, Serialize};

/// Syslog-style severity, least to most severe.
///
/// The derived `Ord` follows declaration order, so
/// `LoggingLevel::Warning >= LoggingLevel::Info` holds and the per-session
/// minimum-level gate is a plain comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    /// Verbose diagnostics.
    Debug,
    /// Routine information.
    #[default]
    Info,
    /// Normal but significant events.
    Notice,
    /// Something surprising but recoverable.
    Warning,
    /// An operation failed.
    Error,
    /// A component is unusable.
    Critical,
    /// Action must be taken immediately.
    Alert,
    /// The system is unusable.
    Emergency,
}

/// Parameters of `logging/setLevel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelRequest {
    /// The new minimum level for the session.
    pub level: LoggingLevel,
}

/// Parameters of the `notifications/message` log notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingMessageNotification {
    /// Severity of the message.
    pub level: LoggingLevel,
    /// Optional logger name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// The message payload, arbitrary JSON.
    pub data: serde_json::Value,
}

impl LoggingMessageNotification {
    /// Create a log notification.
    #[must_use]
    pub fn new(level: LoggingLevel, data: serde_json::Value) -> Self {
        Self {
            level,
            logger: None,
            data,
        }
    }

    /// Set the logger name.
    #[must_use]
    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }
}
