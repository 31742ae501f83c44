//! Tunable policy constants for extraction and parsing.
//!
//! Every field has a default, so a partial TOML file deserializes cleanly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("invalid config value for `{field}`: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub extraction: ExtractionConfig,
    pub parsing: ParsingConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extraction.validate()?;
        self.parsing.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Inputs above this size are rejected before opening
    pub max_document_bytes: usize,
    /// Sufficiency: minimum alphanumeric characters on a page
    pub min_alphanumeric_chars: usize,
    /// Sufficiency: minimum printable / total character ratio
    pub min_printable_ratio: f32,
    pub ocr_enabled: bool,
    /// Rasterization resolution for OCR
    pub dpi: u32,
    /// Per-page budget for render + OCR
    pub ocr_timeout_secs: u64,
    /// Page confidence when the OCR engine reports none
    pub ocr_confidence_fallback: f32,
    /// Concurrent page workers
    pub max_workers: usize,
    pub pdftoppm_binary: String,
    pub preprocess: PreprocessConfig,
    pub tesseract: TesseractConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 50 * 1024 * 1024,
            min_alphanumeric_chars: 20,
            min_printable_ratio: 0.9,
            ocr_enabled: true,
            dpi: 300,
            ocr_timeout_secs: 60,
            ocr_confidence_fallback: 0.5,
            max_workers: num_cpus::get().max(1),
            pdftoppm_binary: "pdftoppm".to_string(),
            preprocess: PreprocessConfig::default(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_printable_ratio) {
            return Err(invalid("extraction.min_printable_ratio", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.ocr_confidence_fallback) {
            return Err(invalid("extraction.ocr_confidence_fallback", "must be within [0, 1]"));
        }
        if self.dpi == 0 {
            return Err(invalid("extraction.dpi", "must be positive"));
        }
        if self.ocr_timeout_secs == 0 {
            return Err(invalid("extraction.ocr_timeout_secs", "must be positive"));
        }
        if self.max_workers == 0 {
            return Err(invalid("extraction.max_workers", "must be positive"));
        }
        if self.max_document_bytes == 0 {
            return Err(invalid("extraction.max_document_bytes", "must be positive"));
        }
        self.preprocess.validate()
    }
}

/// Image clean-up applied before recognition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Contrast adjustment in percent (image-crate semantics; 0 = none)
    pub contrast: f32,
    /// Unsharp-mask blur radius; 0 disables sharpening
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
    pub deskew: bool,
    /// Largest skew angle searched in either direction
    pub max_skew_degrees: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            contrast: 25.0,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
            deskew: false,
            max_skew_degrees: 5.0,
        }
    }
}

impl PreprocessConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sharpen_sigma < 0.0 {
            return Err(invalid("extraction.preprocess.sharpen_sigma", "must not be negative"));
        }
        if !(0.0..=45.0).contains(&self.max_skew_degrees) {
            return Err(invalid("extraction.preprocess.max_skew_degrees", "must be within [0, 45]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TesseractConfig {
    pub binary: String,
    pub language: String,
    /// Page segmentation mode (6 = single uniform block)
    pub psm: u8,
    /// OCR engine mode (3 = default)
    pub oem: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            psm: 6,
            oem: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParsingConfig {
    /// A strategy must produce at least this many candidates to be accepted
    pub min_candidates: usize,
    /// ... and reconcile at least this fraction of consecutive balance pairs
    pub min_reconciliation_rate: f64,
    /// Rounding tolerance when comparing balances
    pub balance_tolerance: Decimal,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            min_candidates: 1,
            min_reconciliation_rate: 0.5,
            balance_tolerance: Decimal::new(5, 3),
        }
    }
}

impl ParsingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_candidates == 0 {
            return Err(invalid("parsing.min_candidates", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_reconciliation_rate) {
            return Err(invalid("parsing.min_reconciliation_rate", "must be within [0, 1]"));
        }
        if self.balance_tolerance.is_sign_negative() {
            return Err(invalid("parsing.balance_tolerance", "must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.extraction.min_alphanumeric_chars, 20);
        assert_eq!(cfg.parsing.balance_tolerance.to_string(), "0.005");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
[extraction]
dpi = 200
ocr_enabled = false

[extraction.tesseract]
language = "eng+deu"
"#,
        )
        .unwrap();
        assert_eq!(cfg.extraction.dpi, 200);
        assert!(!cfg.extraction.ocr_enabled);
        assert_eq!(cfg.extraction.tesseract.language, "eng+deu");
        assert_eq!(cfg.extraction.tesseract.psm, 6);
        assert_eq!(cfg.parsing.min_reconciliation_rate, 0.5);
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let mut cfg = PipelineConfig::default();
        cfg.parsing.min_reconciliation_rate = 1.5;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.field, "parsing.min_reconciliation_rate");

        let mut cfg = PipelineConfig::default();
        cfg.extraction.max_workers = 0;
        assert!(cfg.validate().is_err());
    }
}
