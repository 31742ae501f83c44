//! Document-level failures of a conversion request.
//!
//! Page-level problems never show up here: they are recovered where they
//! happen and recorded as [`PageFailure`](crate::PageFailure) and diagnostics.
//! Only exhaustion of the whole document escalates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::document::PageReport;

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Stable, serializable error discriminant for transport layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DocumentTooLarge,
    CorruptDocument,
    NoTextFound,
    NoTransactionsParsed,
    Cancelled,
    Io,
}

/// Diagnostics that travel with a fatal error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FailureReport {
    pub pages: Vec<PageReport>,
    pub normalized_text: Option<String>,
    pub strategy_counts: BTreeMap<String, usize>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: usize, limit: usize },

    #[error("corrupt document: {message}")]
    CorruptDocument {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("no text found on any of {} pages", .0.pages.len())]
    NoTextFound(Box<FailureReport>),

    #[error("no transactions parsed by any strategy")]
    NoTransactionsParsed(Box<FailureReport>),

    #[error("conversion cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptDocument {
            message: message.into(),
            source: None,
        }
    }

    pub fn corrupt_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CorruptDocument {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentTooLarge { .. } => ErrorKind::DocumentTooLarge,
            Self::CorruptDocument { .. } => ErrorKind::CorruptDocument,
            Self::NoTextFound(_) => ErrorKind::NoTextFound,
            Self::NoTransactionsParsed(_) => ErrorKind::NoTransactionsParsed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Accumulated diagnostics, for the errors that carry them.
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            Self::NoTextFound(report) | Self::NoTransactionsParsed(report) => Some(&**report),
            _ => None,
        }
    }

    pub fn report_mut(&mut self) -> Option<&mut FailureReport> {
        match self {
            Self::NoTextFound(report) | Self::NoTransactionsParsed(report) => Some(&mut **report),
            _ => None,
        }
    }
}
