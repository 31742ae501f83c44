//! Bytes in, transactions out.

use serde::Serialize;

use ledgerlens_core::{ConversionError, NormalizedText, PageReport, ParseResult, PipelineConfig, Result, Stage};
use ledgerlens_ingest::{CancelSignal, Extractor};

use crate::engine::ParsingEngine;
use crate::normalizer::normalize;

/// Everything a caller needs to export or explain one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub pages: Vec<PageReport>,
    pub normalized: NormalizedText,
    pub result: ParseResult,
}

pub struct Converter {
    cfg: PipelineConfig,
    engine: ParsingEngine,
}

impl Converter {
    pub fn new(cfg: PipelineConfig) -> Self {
        let engine = ParsingEngine::new(cfg.parsing.clone());
        Self { cfg, engine }
    }

    pub fn with_engine(cfg: PipelineConfig, engine: ParsingEngine) -> Self {
        Self { cfg, engine }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Convert a PDF held in memory.
    pub async fn convert(&self, bytes: &[u8], cancel: &CancelSignal) -> Result<Conversion> {
        let limit = self.cfg.extraction.max_document_bytes;
        if bytes.len() > limit {
            return Err(ConversionError::DocumentTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        let extractor = Extractor::for_pdf(bytes, self.cfg.extraction.clone())?;
        self.convert_with(&extractor, cancel).await
    }

    /// Run the stages over an already-built extractor.
    pub async fn convert_with(&self, extractor: &Extractor, cancel: &CancelSignal) -> Result<Conversion> {
        let extraction = extractor.extract(cancel).await?;
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let pages = extraction.document.reports();
        let mut diagnostics = extraction.diagnostics;
        let normalized = normalize(&extraction.document);
        diagnostics.info(
            Stage::Normalization,
            None,
            format!(
                "{} pages normalized into {} lines",
                normalized.page_count(),
                normalized.lines().len()
            ),
        );
        tracing::info!(pages = pages.len(), "document normalized");

        match self.engine.parse_with(&normalized, diagnostics) {
            Ok(result) => {
                tracing::info!(
                    strategy = %result.strategy_used,
                    transactions = result.transactions.len(),
                    warnings = result.reconciliation_warnings.len(),
                    low_confidence = result.low_confidence,
                    "statement parsed"
                );
                Ok(Conversion {
                    pages,
                    normalized,
                    result,
                })
            }
            Err(mut err) => {
                if let Some(report) = err.report_mut() {
                    report.pages = pages;
                }
                Err(err)
            }
        }
    }
}
