//! Text-layer access to a page-addressable document.
//!
//! [`LopdfSource`] walks each page's content stream, places every text run
//! at its text-matrix position and rebuilds lines by baseline. Runs that are
//! far apart horizontally are joined with a tab so table columns survive.
//! When that layout comes out worse than lopdf's own `extract_text` (CID
//! fonts, odd encodings) the better-scoring text wins.

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use ledgerlens_core::ConversionError;

use crate::error::{IngestError, Result};
use crate::sufficiency;

/// Page-addressable document: a page count and per-page text layer.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Embedded text of page `index` (0-based); may be empty.
    fn text_layer(&self, index: usize) -> Result<String>;
}

pub struct LopdfSource {
    doc: Document,
    /// (1-based page number, object id) in page order
    pages: Vec<(u32, ObjectId)>,
}

impl LopdfSource {
    pub fn load(bytes: &[u8]) -> std::result::Result<Self, ConversionError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ConversionError::corrupt_with_source("cannot open document", e))?;
        let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
        if pages.is_empty() {
            return Err(ConversionError::corrupt("document has no pages"));
        }
        tracing::debug!(pages = pages.len(), "opened document");
        Ok(Self { doc, pages })
    }

    fn positioned_text(&self, page_id: ObjectId) -> Result<String> {
        let data = self.doc.get_page_content(page_id)?;
        let content = Content::decode(&data)?;
        let runs = collect_runs(&content);
        Ok(layout_lines(runs))
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn text_layer(&self, index: usize) -> Result<String> {
        let &(number, page_id) = self.pages.get(index).ok_or(IngestError::PageOutOfRange(index))?;

        let positioned = self.positioned_text(page_id);
        let flat = self.doc.extract_text(&[number]).map_err(IngestError::from);

        match (positioned, flat) {
            (Ok(p), Ok(f)) => {
                if sufficiency::assess(&f).score() > sufficiency::assess(&p).score() {
                    tracing::debug!(page = index, "plain text extraction scored higher than layout");
                    Ok(f)
                } else {
                    Ok(p)
                }
            }
            (Ok(p), Err(e)) => {
                tracing::debug!(page = index, error = %e, "plain text extraction failed");
                Ok(p)
            }
            (Err(e), Ok(f)) => {
                tracing::debug!(page = index, error = %e, "content stream layout failed");
                Ok(f)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }
}

/// A string shown at a position in text space.
#[derive(Debug, Clone, PartialEq)]
struct TextRun {
    x: f32,
    y: f32,
    /// Approximate advance of the run
    width: f32,
    size: f32,
    text: String,
}

/// Affine matrix [a b c d e f].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// translate(tx, ty) x self
    fn translated(self, tx: f32, ty: f32) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        Matrix([a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f])
    }

    fn scale(&self) -> f32 {
        let [a, b, ..] = self.0;
        (a * a + b * b).sqrt().max(f32::EPSILON)
    }
}

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    size: f32,
    leading: f32,
}

impl TextState {
    fn new() -> Self {
        Self {
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            size: 10.0,
            leading: 0.0,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = self.tlm.translated(tx, ty);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn effective_size(&self) -> f32 {
        (self.size * self.tm.scale()).abs().max(1.0)
    }

    /// Emit a run at the current position and advance past it.
    fn show(&mut self, bytes: &[u8], runs: &mut Vec<TextRun>) {
        let text = decode_bytes(bytes);
        let chars = text.chars().count();
        if chars == 0 {
            return;
        }
        // Widths are not available without font metrics; half an em per glyph
        let advance = chars as f32 * self.size * 0.5;
        let size = self.effective_size();
        let [.., e, f] = self.tm.0;
        runs.push(TextRun {
            x: e,
            y: f,
            width: advance * self.tm.scale(),
            size,
            text,
        });
        self.tm = self.tm.translated(advance, 0.0);
    }

    /// TJ spacing adjustment, in thousandths of an em.
    fn kern(&mut self, amount: f32) {
        self.tm = self.tm.translated(-amount / 1000.0 * self.size, 0.0);
    }
}

fn number(obj: Option<&Object>) -> Option<f32> {
    obj.and_then(|o| o.as_float().ok())
}

fn collect_runs(content: &Content) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut state = TextState::new();

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                state.tm = Matrix::IDENTITY;
                state.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = number(operands.get(1)) {
                    state.size = size;
                }
            }
            "TL" => {
                if let Some(leading) = number(operands.first()) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands.first()), number(operands.get(1))) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f32> = operands.iter().filter_map(|o| o.as_float().ok()).collect();
                if let Ok(m) = <[f32; 6]>::try_from(values.as_slice()) {
                    state.tm = Matrix(m);
                    state.tlm = state.tm;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(bytes, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(bytes, &mut runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    state.show(bytes, &mut runs);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => state.show(bytes, &mut runs),
                            other => {
                                if let Ok(amount) = other.as_float() {
                                    state.kern(amount);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    runs
}

/// Decode a PDF string without font information: UTF-16BE with BOM, else
/// Latin-1. Encodings this cannot handle show up as unprintable characters
/// and lose the score comparison against `extract_text`.
fn decode_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Group runs into lines top to bottom, then join each line left to right.
fn layout_lines(mut runs: Vec<TextRun>) -> String {
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= line[0].size.min(run.size) * 0.5 => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    let mut out = String::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut text = String::new();
        let mut cursor: Option<f32> = None;
        for run in &line {
            if let Some(end) = cursor {
                let gap = run.x - end;
                if gap > run.size * 1.5 {
                    text.push('\t');
                } else if gap > run.size * 0.15 && !text.ends_with(' ') && !run.text.starts_with(' ') {
                    text.push(' ');
                }
            }
            text.push_str(&run.text);
            cursor = Some(run.x + run.width);
        }
        let trimmed = text.trim_end();
        if !trimmed.trim().is_empty() {
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    out
}
