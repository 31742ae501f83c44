//! Extracted document: one raw text per page plus how it was obtained.

use serde::{Deserialize, Serialize};

/// How a page's text was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExtractionMethod {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "ocr")]
    Ocr,
    #[serde(rename = "failed")]
    Failed,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Text => "text",
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Failed => "failed",
        }
    }
}

/// Why a page did not end up with usable text from a given path.
///
/// Recorded on the page; never escalated on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageFailure {
    /// The text layer could not be read at all.
    TextLayerUnreadable { message: String },
    /// Rasterizing the page failed.
    RenderFailed { message: String },
    /// The recognition service failed.
    OcrFailed { message: String },
    /// Recognition did not finish within the per-page budget.
    OcrTimeout { timeout_secs: u64 },
    /// OCR is switched off in configuration.
    OcrDisabled,
    /// Both paths produced text, but neither passed the sufficiency check.
    InsufficientText { alphanumeric_chars: usize },
    /// The page task stopped before reporting which path it reached.
    Aborted,
}

/// A single extracted page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// 0-based position in the document
    pub index: usize,
    pub method: ExtractionMethod,
    /// Raw text; empty when `method` is `Failed`
    pub text: String,
    /// Extraction confidence in [0, 1]
    pub confidence: f32,
    /// Last failure met on the way to `method`, if any
    pub failure: Option<PageFailure>,
}

impl Page {
    pub fn from_text_layer(index: usize, text: String) -> Self {
        Self {
            index,
            method: ExtractionMethod::Text,
            text,
            confidence: 1.0,
            failure: None,
        }
    }

    pub fn from_ocr(index: usize, text: String, confidence: f32, failure: Option<PageFailure>) -> Self {
        Self {
            index,
            method: ExtractionMethod::Ocr,
            text,
            confidence: confidence.clamp(0.0, 1.0),
            failure,
        }
    }

    pub fn failed(index: usize, failure: PageFailure) -> Self {
        Self {
            index,
            method: ExtractionMethod::Failed,
            text: String::new(),
            confidence: 0.0,
            failure: Some(failure),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.method == ExtractionMethod::Failed
    }

    /// Text-free summary for diagnostics payloads.
    pub fn report(&self) -> PageReport {
        PageReport {
            index: self.index,
            method: self.method,
            confidence: self.confidence,
            chars: self.text.chars().count(),
            failure: self.failure.clone(),
        }
    }
}

/// Per-page diagnostic summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageReport {
    pub index: usize,
    pub method: ExtractionMethod,
    pub confidence: f32,
    pub chars: usize,
    pub failure: Option<PageFailure>,
}

/// Ordered pages of one conversion request. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    /// Build from pages; they are stored in index order.
    pub fn new(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.index);
        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page produced text by either path.
    pub fn all_failed(&self) -> bool {
        self.pages.iter().all(Page::is_failed)
    }

    pub fn reports(&self) -> Vec<PageReport> {
        self.pages.iter().map(Page::report).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_orders_pages() {
        let doc = Document::new(vec![
            Page::failed(1, PageFailure::OcrDisabled),
            Page::from_text_layer(0, "hello".to_string()),
        ]);
        assert_eq!(doc.pages()[0].index, 0);
        assert_eq!(doc.pages()[1].method, ExtractionMethod::Failed);
        assert!(!doc.all_failed());
    }

    #[test]
    fn test_all_failed() {
        let doc = Document::new(vec![
            Page::failed(0, PageFailure::OcrTimeout { timeout_secs: 5 }),
            Page::failed(1, PageFailure::OcrDisabled),
        ]);
        assert!(doc.all_failed());
        assert_eq!(doc.reports()[0].confidence, 0.0);
    }

    #[test]
    fn test_page_failure_serializes_with_kind_tag() {
        let json = serde_json::to_string(&PageFailure::OcrTimeout { timeout_secs: 60 }).unwrap();
        assert_eq!(json, r#"{"kind":"ocr_timeout","timeout_secs":60}"#);
        let json = serde_json::to_string(&PageFailure::Aborted).unwrap();
        assert_eq!(json, r#"{"kind":"aborted"}"#);
        let json = serde_json::to_string(&ExtractionMethod::Ocr).unwrap();
        assert_eq!(json, r#""ocr""#);
    }

    #[test]
    fn test_ocr_confidence_clamped() {
        let page = Page::from_ocr(0, "x".into(), 1.7, None);
        assert_eq!(page.confidence, 1.0);
    }
}
