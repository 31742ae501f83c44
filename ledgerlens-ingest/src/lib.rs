//! ledgerlens-ingest: per-page text extraction with OCR fallback

pub mod cancel;
pub mod error;
pub mod extractor;
pub mod ocr;
pub mod preprocess;
pub mod render;
pub mod source;
pub mod sufficiency;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use error::IngestError;
pub use extractor::{Extraction, Extractor};
pub use ocr::{OcrEngine, OcrOutput, TesseractEngine};
pub use render::{PageRenderer, PdftoppmRenderer};
pub use source::{LopdfSource, PageSource};
