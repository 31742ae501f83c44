//! Per-page choice between the text layer and OCR, fanned out over a bounded
//! set of workers.
//!
//! Every page first tries its text layer. Only an unreadable or insufficient
//! text layer sends the page to render + pre-process + OCR, which runs under
//! a per-page timeout. Page problems are recorded on the page and in its own
//! [`Diagnostics`]; the request only fails when every page failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use ledgerlens_core::{
    ConversionError, Diagnostics, Document, ExtractionConfig, FailureReport, Page, PageFailure, Stage,
};

use crate::cancel::CancelSignal;
use crate::error::IngestError;
use crate::ocr::{OcrEngine, OcrOutput, TesseractEngine};
use crate::preprocess::preprocess;
use crate::render::{PageRenderer, PdftoppmRenderer};
use crate::source::{LopdfSource, PageSource};
use crate::sufficiency;

/// Extracted pages plus what happened on the way, in page order.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: Document,
    pub diagnostics: Diagnostics,
}

struct PageOutcome {
    page: Page,
    diagnostics: Diagnostics,
}

#[derive(Clone)]
pub struct Extractor {
    source: Arc<dyn PageSource>,
    renderer: Arc<dyn PageRenderer>,
    ocr: Arc<dyn OcrEngine>,
    cfg: Arc<ExtractionConfig>,
}

impl Extractor {
    pub fn new(
        source: Arc<dyn PageSource>,
        renderer: Arc<dyn PageRenderer>,
        ocr: Arc<dyn OcrEngine>,
        cfg: ExtractionConfig,
    ) -> Self {
        Self {
            source,
            renderer,
            ocr,
            cfg: Arc::new(cfg),
        }
    }

    /// lopdf text layer, pdftoppm rendering and tesseract recognition.
    pub fn for_pdf(bytes: &[u8], cfg: ExtractionConfig) -> Result<Self, ConversionError> {
        let source = LopdfSource::load(bytes)?;
        let renderer = PdftoppmRenderer::new(bytes, cfg.pdftoppm_binary.clone()).map_err(|e| match e {
            IngestError::Io(io) => ConversionError::Io(io),
            other => ConversionError::corrupt(other.to_string()),
        })?;
        let ocr = TesseractEngine::new(cfg.tesseract.clone());
        Ok(Self::new(Arc::new(source), Arc::new(renderer), Arc::new(ocr), cfg))
    }

    pub async fn extract(&self, cancel: &CancelSignal) -> Result<Extraction, ConversionError> {
        let mut cancel = cancel.clone();
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let count = self.source.page_count();
        let workers = self.cfg.max_workers.max(1);
        tracing::info!(pages = count, workers, "extracting document");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut task_pages = HashMap::new();
        let mut slots: Vec<Option<PageOutcome>> = (0..count).map(|_| None).collect();

        for index in 0..count {
            // No new page work once cancelled.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    tracing::info!(issued = index, "extraction cancelled");
                    return Err(ConversionError::Cancelled);
                }
                permit = semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                return Err(ConversionError::Cancelled);
            };

            let this = self.clone();
            let handle = tasks.spawn(async move {
                let outcome = this.extract_page(index).await;
                drop(permit);
                (index, outcome)
            });
            task_pages.insert(handle.id(), index);
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    tracing::info!("extraction cancelled");
                    return Err(ConversionError::Cancelled);
                }
                joined = tasks.join_next_with_id() => joined,
            };
            match joined {
                Some(Ok((_, (index, outcome)))) => slots[index] = Some(outcome),
                Some(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Some(Err(err)) => {
                    tracing::warn!(page = ?task_pages.get(&err.id()), "page task ended without a result");
                }
                None => break,
            }
        }

        let (document, mut diagnostics) = merge_slots(slots);
        if document.all_failed() {
            diagnostics.error(
                Stage::Extraction,
                None,
                format!("no usable text on any of {} pages", document.page_count()),
            );
            return Err(ConversionError::NoTextFound(Box::new(FailureReport {
                pages: document.reports(),
                diagnostics,
                ..FailureReport::default()
            })));
        }

        let failed = document.pages().iter().filter(|p| p.is_failed()).count();
        tracing::info!(pages = count, failed, "extraction finished");
        Ok(Extraction { document, diagnostics })
    }

    async fn extract_page(&self, index: usize) -> PageOutcome {
        let mut diag = Diagnostics::new();
        let cfg = &self.cfg;

        let source = Arc::clone(&self.source);
        let layer = match tokio::task::spawn_blocking(move || source.text_layer(index)).await {
            Ok(result) => result,
            Err(join) => Err(IngestError::Join(join)),
        };

        let mut text_failure = None;
        let mut layer_chars = 0;
        match layer {
            Ok(text) => {
                let score = sufficiency::assess(&text);
                layer_chars = score.alphanumeric;
                if score.is_sufficient(cfg) {
                    diag.info(
                        Stage::Extraction,
                        Some(index),
                        format!("text layer used ({} alphanumeric chars)", score.alphanumeric),
                    );
                    return PageOutcome {
                        page: Page::from_text_layer(index, text),
                        diagnostics: diag,
                    };
                }
                diag.info(
                    Stage::Extraction,
                    Some(index),
                    format!(
                        "text layer insufficient ({} alphanumeric chars, printable ratio {:.2})",
                        score.alphanumeric, score.printable_ratio
                    ),
                );
            }
            Err(err) => {
                diag.warn(Stage::Extraction, Some(index), format!("text layer unreadable: {err}"));
                text_failure = Some(PageFailure::TextLayerUnreadable {
                    message: err.to_string(),
                });
            }
        }

        if !cfg.ocr_enabled {
            diag.warn(Stage::Extraction, Some(index), "page needs OCR but OCR is disabled");
            return PageOutcome {
                page: Page::failed(index, PageFailure::OcrDisabled),
                diagnostics: diag,
            };
        }

        let budget = Duration::from_secs(cfg.ocr_timeout_secs);
        let page = match tokio::time::timeout(budget, self.ocr_page(index)).await {
            Err(_) => {
                diag.warn(
                    Stage::Extraction,
                    Some(index),
                    format!("OCR timed out after {}s", cfg.ocr_timeout_secs),
                );
                Page::failed(
                    index,
                    PageFailure::OcrTimeout {
                        timeout_secs: cfg.ocr_timeout_secs,
                    },
                )
            }
            Ok(Err(failure)) => {
                diag.warn(Stage::Extraction, Some(index), format!("OCR path failed: {failure:?}"));
                Page::failed(index, failure)
            }
            Ok(Ok(output)) => {
                let score = sufficiency::assess(&output.text);
                if score.is_sufficient(cfg) {
                    let confidence = output.confidence.unwrap_or(cfg.ocr_confidence_fallback);
                    diag.info(
                        Stage::Extraction,
                        Some(index),
                        format!("OCR used (confidence {confidence:.2})"),
                    );
                    Page::from_ocr(index, output.text, confidence, text_failure)
                } else {
                    diag.warn(
                        Stage::Extraction,
                        Some(index),
                        format!("OCR text insufficient ({} alphanumeric chars)", score.alphanumeric),
                    );
                    Page::failed(
                        index,
                        PageFailure::InsufficientText {
                            alphanumeric_chars: score.alphanumeric.max(layer_chars),
                        },
                    )
                }
            }
        };

        PageOutcome { page, diagnostics: diag }
    }

    async fn ocr_page(&self, index: usize) -> Result<OcrOutput, PageFailure> {
        let image = self
            .renderer
            .render(index, self.cfg.dpi)
            .await
            .map_err(|e| PageFailure::RenderFailed { message: e.to_string() })?;

        let prep = self.cfg.preprocess.clone();
        let gray = tokio::task::spawn_blocking(move || preprocess(&image, &prep))
            .await
            .map_err(|e| PageFailure::RenderFailed { message: e.to_string() })?;

        self.ocr
            .recognize(&gray)
            .await
            .map_err(|e| PageFailure::OcrFailed { message: e.to_string() })
    }
}

/// Pages in order. A slot left empty belongs to a task that ended without a
/// result, so nothing is known about which path it reached.
fn merge_slots(slots: Vec<Option<PageOutcome>>) -> (Document, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut pages = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(outcome) => {
                diagnostics.merge(outcome.diagnostics);
                pages.push(outcome.page);
            }
            None => {
                diagnostics.error(Stage::Extraction, Some(index), "page task did not complete");
                pages.push(Page::failed(index, PageFailure::Aborted));
            }
        }
    }
    (Document::new(pages), diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlens_core::ExtractionMethod;

    #[test]
    fn test_unfinished_slot_is_aborted_not_ocr_failure() {
        let slots = vec![
            Some(PageOutcome {
                page: Page::from_text_layer(0, "05/06/2023 TESCO 12.50".into()),
                diagnostics: Diagnostics::new(),
            }),
            None,
        ];
        let (document, diagnostics) = merge_slots(slots);
        assert_eq!(document.pages()[0].method, ExtractionMethod::Text);
        let lost = &document.pages()[1];
        assert_eq!(lost.method, ExtractionMethod::Failed);
        assert_eq!(lost.failure, Some(PageFailure::Aborted));
        assert_eq!(diagnostics.events().len(), 1);
    }
}
