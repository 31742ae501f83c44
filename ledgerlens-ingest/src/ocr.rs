//! Recognition adapter.
//!
//! [`TesseractEngine`] runs the `tesseract` CLI with TSV output and rebuilds
//! lines from word boxes, so column gaps can be kept as tabs.

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use std::io::Cursor;
use std::process::Stdio;
use tokio::process::Command;

use ledgerlens_core::TesseractConfig;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// Mean confidence in [0, 1], when the engine reports one
    pub confidence: Option<f32>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &GrayImage) -> Result<OcrOutput>;
}

pub struct TesseractEngine {
    cfg: TesseractConfig,
}

impl TesseractEngine {
    pub fn new(cfg: TesseractConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &GrayImage) -> Result<OcrOutput> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        let input = tempfile::Builder::new().prefix("ledgerlens-ocr-").suffix(".png").tempfile()?;
        tokio::fs::write(input.path(), &png).await?;

        let output = Command::new(&self.cfg.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("--oem")
            .arg(self.cfg.oem.to_string())
            .arg("--psm")
            .arg(self.cfg.psm.to_string())
            .arg("-l")
            .arg(&self.cfg.language)
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| IngestError::Spawn {
                tool: self.cfg.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(IngestError::tool_failed(&self.cfg.binary, output.status, &output.stderr));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

struct Word<'a> {
    line: (u32, u32, u32),
    left: i64,
    width: i64,
    conf: f32,
    text: &'a str,
}

fn parse_word(row: &str) -> Option<Word<'_>> {
    // level page block par line word left top width height conf text
    let cols: Vec<&str> = row.split('\t').collect();
    if cols.len() < 12 || cols[0] != "5" {
        return None;
    }
    let text = cols[11].trim();
    let conf: f32 = cols[10].trim().parse().ok()?;
    if text.is_empty() || conf < 0.0 {
        return None;
    }
    Some(Word {
        line: (cols[2].parse().ok()?, cols[3].parse().ok()?, cols[4].parse().ok()?),
        left: cols[6].parse().ok()?,
        width: cols[8].parse().ok()?,
        conf,
        text,
    })
}

/// Rebuild text from tesseract TSV.
///
/// Words sharing a (block, paragraph, line) key form a line. A gap wider
/// than about two and a half characters of the previous word becomes a tab.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut conf_sum = 0.0f32;
    let mut words = 0usize;
    let mut current: Option<(u32, u32, u32)> = None;
    let mut prev_end = 0i64;
    let mut prev_char_width = 0.0f32;

    for word in tsv.lines().skip(1).filter_map(parse_word) {
        if current != Some(word.line) {
            if current.is_some() {
                text.push('\n');
            }
            current = Some(word.line);
        } else {
            let gap = (word.left - prev_end) as f32;
            if gap > prev_char_width * 2.5 {
                text.push('\t');
            } else {
                text.push(' ');
            }
        }
        text.push_str(word.text);
        prev_end = word.left + word.width;
        prev_char_width = word.width as f32 / word.text.chars().count().max(1) as f32;
        conf_sum += word.conf;
        words += 1;
    }
    if !text.is_empty() {
        text.push('\n');
    }

    let confidence = (words > 0).then(|| (conf_sum / words as f32 / 100.0).clamp(0.0, 1.0));
    OcrOutput { text, confidence }
}
