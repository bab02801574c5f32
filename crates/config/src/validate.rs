//! Configuration validation.
//!
//! Checks value ranges and combinations that parse fine but cannot work at
//! runtime.

use std::fmt;

use crate::schema::CourierConfig;

/// Severity level for a diagnostic.
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

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "pacing.max_ms"
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Validate a loaded configuration.
pub fn validate(config: &CourierConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.prefix.trim().is_empty() {
        result.push(Severity::Error, "prefix", "prefix must not be empty");
    } else if config.prefix.chars().any(char::is_whitespace) {
        result.push(Severity::Error, "prefix", "prefix must not contain whitespace");
    }

    if config.pacing.min_ms > config.pacing.max_ms {
        result.push(
            Severity::Error,
            "pacing.max_ms",
            format!(
                "max_ms ({}) is below min_ms ({})",
                config.pacing.max_ms, config.pacing.min_ms
            ),
        );
    }

    if config.replies.timeout_secs == 0 {
        result.push(
            Severity::Error,
            "replies.timeout_secs",
            "reply timeout must be at least one second",
        );
    }
    if config.replies.sweep_interval_secs == 0 {
        result.push(
            Severity::Error,
            "replies.sweep_interval_secs",
            "sweep interval must be at least one second",
        );
    }

    if config.access.admin_only && config.access.admin_allowlist.is_empty() {
        result.push(
            Severity::Warning,
            "access.admin_allowlist",
            "admin-only mode is on but the allow-list is empty; every user will be refused",
        );
    }
    if config.access.admin_ids.is_empty() {
        result.push(
            Severity::Warning,
            "access.admin_ids",
            "no bot administrators configured; admin commands are unreachable",
        );
    }

    result
}
