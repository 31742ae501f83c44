//! Explicit diagnostics context.
//!
//! Each stage records what it did into a [`Diagnostics`] value that is passed
//! along and returned with the result. Every record is mirrored to `tracing`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Normalization,
    Parsing,
    Reconciliation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticEvent {
    pub stage: Stage,
    pub severity: Severity,
    pub page: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Diagnostics {
    events: Vec<DiagnosticEvent>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, severity: Severity, page: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => tracing::debug!(?stage, page, "{message}"),
            Severity::Warning => tracing::warn!(?stage, page, "{message}"),
            Severity::Error => tracing::error!(?stage, page, "{message}"),
        }
        self.events.push(DiagnosticEvent {
            stage,
            severity,
            page,
            message,
        });
    }

    pub fn info(&mut self, stage: Stage, page: Option<usize>, message: impl Into<String>) {
        self.record(stage, Severity::Info, page, message);
    }

    pub fn warn(&mut self, stage: Stage, page: Option<usize>, message: impl Into<String>) {
        self.record(stage, Severity::Warning, page, message);
    }

    pub fn error(&mut self, stage: Stage, page: Option<usize>, message: impl Into<String>) {
        self.record(stage, Severity::Error, page, message);
    }

    /// Append another context's events, keeping their order.
    pub fn merge(&mut self, other: Diagnostics) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }
}
