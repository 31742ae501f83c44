//! ledgerlens-core: shared types for bank statement conversion

pub mod config;
pub mod dates;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod money;
pub mod text;
pub mod transaction;

pub use config::{ConfigError, ExtractionConfig, ParsingConfig, PipelineConfig, PreprocessConfig, TesseractConfig};
pub use diagnostics::{DiagnosticEvent, Diagnostics, Severity, Stage};
pub use document::{Document, ExtractionMethod, Page, PageFailure, PageReport};
pub use error::{ConversionError, ErrorKind, FailureReport, Result};
pub use money::{Direction, MoneyToken};
pub use text::{NormalizedText, TextLine, page_marker, parse_page_marker};
pub use transaction::{ParseResult, ReconciliationWarning, SourceSpan, StrategyAttempt, TransactionCandidate};
