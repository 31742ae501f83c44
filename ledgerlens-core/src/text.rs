//! Normalized document text with explicit page-break markers.

use serde::{Deserialize, Serialize};

const MARKER_OPEN: &str = "<<PAGE ";
const MARKER_CLOSE: &str = ">>";

/// Marker line placed before the text of page `index` (0-based).
///
/// Rendered 1-based for people reading dumps.
pub fn page_marker(index: usize) -> String {
    format!("{MARKER_OPEN}{}{MARKER_CLOSE}", index + 1)
}

/// 0-based page index if `line` is a page marker.
pub fn parse_page_marker(line: &str) -> Option<usize> {
    let number: usize = line
        .strip_prefix(MARKER_OPEN)?
        .strip_suffix(MARKER_CLOSE)?
        .parse()
        .ok()?;
    number.checked_sub(1)
}

/// One content line of normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine<'a> {
    /// 0-based line number in the full normalized text (markers included)
    pub number: usize,
    /// 0-based page the line came from
    pub page: usize,
    pub text: &'a str,
}

/// Output of normalization; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedText {
    text: String,
    page_confidence: Vec<f32>,
}

impl NormalizedText {
    /// `page_confidence[i]` is the extraction confidence of page `i`.
    pub fn new(text: String, page_confidence: Vec<f32>) -> Self {
        Self { text, page_confidence }
    }

    /// Text without page structure; everything is treated as page 0.
    pub fn from_plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_confidence: vec![1.0],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_confidence.len()
    }

    /// Extraction confidence of `page`; 1.0 for unknown pages.
    pub fn page_confidence(&self, page: usize) -> f32 {
        self.page_confidence.get(page).copied().unwrap_or(1.0)
    }

    /// Content lines in document order, markers consumed.
    pub fn lines(&self) -> Vec<TextLine<'_>> {
        let mut page = 0;
        let mut out = Vec::new();
        for (number, line) in self.text.lines().enumerate() {
            if let Some(index) = parse_page_marker(line) {
                page = index;
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            out.push(TextLine { number, page, text: line });
        }
        out
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trip() {
        assert_eq!(page_marker(0), "<<PAGE 1>>");
        assert_eq!(parse_page_marker("<<PAGE 3>>"), Some(2));
        assert_eq!(parse_page_marker("<<PAGE 0>>"), None);
        assert_eq!(parse_page_marker("PAGE 3"), None);
    }

    #[test]
    fn test_lines_track_pages() {
        let text = format!("{}\nfirst\n{}\nsecond\nthird", page_marker(0), page_marker(1));
        let nt = NormalizedText::new(text, vec![1.0, 0.5]);
        let lines = nt.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].page, 0);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].page, 1);
        assert_eq!(lines[2].text, "third");
        assert_eq!(nt.page_confidence(1), 0.5);
        assert_eq!(nt.page_confidence(9), 1.0);
    }
}
