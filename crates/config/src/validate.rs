//! Semantic checks on a loaded [`ChorusConfig`].

use std::fmt;

use crate::schema::{ChorusConfig, SERVER_IDLE_TIMEOUT_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "session.keepalive_interval_secs"
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    fn error(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path,
            message: message.into(),
        });
    }

    fn warning(&mut self, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            path,
            message: message.into(),
        });
    }
}

/// Validate a fully-resolved config (after env overrides).
#[must_use]
pub fn validate(config: &ChorusConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if !config.generation.has_api_key() {
        result.error(
            "generation.api_key",
            "no API key configured; set OPENROUTER_API_KEY",
        );
    }
    if config.generation.batch_size == 0 {
        result.error("generation.batch_size", "must be at least 1");
    }
    if config.supervisor.live_check_interval_secs == 0 {
        result.error("supervisor.live_check_interval_secs", "must be at least 1");
    }
    if config.session.message_collection_secs == 0 {
        result.error("session.message_collection_secs", "must be at least 1");
    }

    let keepalive = config.session.keepalive_interval_secs;
    if keepalive == 0 || keepalive >= SERVER_IDLE_TIMEOUT_SECS {
        result.error(
            "session.keepalive_interval_secs",
            format!("must be between 1 and {}", SERVER_IDLE_TIMEOUT_SECS - 1),
        );
    } else if keepalive > SERVER_IDLE_TIMEOUT_SECS - 5 {
        result.warning(
            "session.keepalive_interval_secs",
            format!("{keepalive}s leaves little margin before the {SERVER_IDLE_TIMEOUT_SECS}s idle disconnect"),
        );
    }

    if config.session.default_messages_per_minute == 0 {
        result.error("session.default_messages_per_minute", "must be at least 1");
    }
    if config.session.default_sender_count == 0 {
        result.error("session.default_sender_count", "must be at least 1");
    }
    if !config.kick.api_base.starts_with("http://") && !config.kick.api_base.starts_with("https://")
    {
        result.error("kick.api_base", "must be an http(s) URL");
    }
    if !config.kick.websocket_url.starts_with("ws://")
        && !config.kick.websocket_url.starts_with("wss://")
    {
        result.error("kick.websocket_url", "must be a ws(s) URL");
    }

    result
}
