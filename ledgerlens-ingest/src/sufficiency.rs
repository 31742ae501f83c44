//! Is a page's text usable?

use ledgerlens_core::ExtractionConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sufficiency {
    pub alphanumeric: usize,
    /// Printable characters over all characters; 0 for empty text
    pub printable_ratio: f32,
}

impl Sufficiency {
    pub fn is_sufficient(&self, cfg: &ExtractionConfig) -> bool {
        self.alphanumeric >= cfg.min_alphanumeric_chars && self.printable_ratio >= cfg.min_printable_ratio
    }

    /// Single number for picking the better of two texts.
    pub fn score(&self) -> f32 {
        self.alphanumeric as f32 * self.printable_ratio
    }
}

fn is_printable(c: char) -> bool {
    match c {
        '\n' | '\r' | '\t' => true,
        '\u{FFFD}' => false,
        c => !c.is_control(),
    }
}

pub fn assess(text: &str) -> Sufficiency {
    let mut total = 0usize;
    let mut printable = 0usize;
    let mut alphanumeric = 0usize;
    for c in text.chars() {
        total += 1;
        if is_printable(c) {
            printable += 1;
        }
        if c.is_alphanumeric() {
            alphanumeric += 1;
        }
    }
    let printable_ratio = if total == 0 {
        0.0
    } else {
        printable as f32 / total as f32
    };
    Sufficiency {
        alphanumeric,
        printable_ratio,
    }
}
