//! Raw page text -> [`NormalizedText`].
//!
//! A pure, idempotent transform. Per line, in order:
//! 1. repair mis-encoded sequences and drop control characters
//! 2. collapse whitespace: a run of two or more blanks, or any run holding a
//!    tab, becomes one `\t` (column gap); a single blank stays a space
//! 3. re-join split amounts (`12 .50`, `£ 12.00`) and fix OCR confusions
//!    inside amount-like tokens (`O` -> `0`, `l` -> `1`), repeated until
//!    neither changes the line
//! 4. rewrite date tokens to `YYYY-MM-DD`
//!
//! Page markers from the document are kept as their own lines; blank lines
//! are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use ledgerlens_core::dates::rewrite_dates;
use ledgerlens_core::{Document, NormalizedText, page_marker, parse_page_marker};

/// UTF-8 read as Windows-1252, plus a few typographic stand-ins.
const MOJIBAKE: &[(&str, &str)] = &[
    ("â‚¬", "€"),
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€\u{201c}", "-"),
    ("â€\u{201d}", "-"),
    ("â€¢", "*"),
    ("Â£", "£"),
    ("Â\u{a0}", " "),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("\u{2212}", "-"),
    ("\u{2013}", "-"),
    ("\u{2014}", "-"),
    ("\u{fb01}", "fi"),
    ("\u{fb02}", "fl"),
];

static CURRENCY_GAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([£$€])[ \t]+(\d)").expect("currency gap regex is valid"));

static DECIMAL_GAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d) ([.,])(\d)").expect("decimal gap regex is valid"));

/// Amount-like token body once sign, currency and brackets are peeled off.
static AMOUNT_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\dOoIl|]+(?:[.,][\dOoIl|]+)+$").expect("amount-like regex is valid"));

/// Normalize every page and join them behind page markers.
pub fn normalize(document: &Document) -> NormalizedText {
    let mut text = String::new();
    let mut confidence = Vec::with_capacity(document.page_count());
    for page in document.pages() {
        text.push_str(&page_marker(page.index));
        text.push('\n');
        let body = normalize_text(&page.text);
        if !body.is_empty() {
            text.push_str(&body);
            text.push('\n');
        }
        confidence.push(page.confidence);
    }
    NormalizedText::new(text, confidence)
}

/// Normalize free text. `normalize_text(normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(raw: &str) -> String {
    let mut repaired = raw.replace("\r\n", "\n").replace('\r', "\n");
    for (bad, good) in MOJIBAKE {
        if repaired.contains(bad) {
            repaired = repaired.replace(bad, good);
        }
    }

    repaired
        .lines()
        .filter_map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if parse_page_marker(trimmed).is_some() {
        return Some(trimmed.to_string());
    }

    let collapsed = collapse_whitespace(line);
    if collapsed.is_empty() {
        return None;
    }
    Some(rewrite_dates(&repair_amounts(collapsed)))
}

/// Joining can make a token amount-like and fixing can expose a new gap,
/// so run both to a fixed point. Joins only shorten the line and fixes only
/// remove letters, so this terminates.
fn repair_amounts(mut line: String) -> String {
    loop {
        let joined = CURRENCY_GAP_RE.replace_all(&line, "$1$2");
        let joined = DECIMAL_GAP_RE.replace_all(&joined, "$1$2$3");
        let fixed = fix_ocr_confusions(&joined);
        if fixed == line {
            return line;
        }
        line = fixed;
    }
}

fn is_blank(c: char) -> bool {
    c == '\t' || (c.is_whitespace() && c != '\n')
}

/// Drop control characters, then squeeze blank runs into one separator.
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run_len = 0usize;
    let mut run_has_tab = false;

    let flush = |out: &mut String, run_len: usize, has_tab: bool| {
        if run_len == 0 || out.is_empty() {
            return;
        }
        out.push(if has_tab || run_len >= 2 { '\t' } else { ' ' });
    };

    for c in line.chars() {
        if is_blank(c) {
            run_len += 1;
            run_has_tab |= c == '\t';
            continue;
        }
        if c.is_control() || c == '\u{FEFF}' || c == '\u{200B}' {
            continue;
        }
        flush(&mut out, run_len, run_has_tab);
        run_len = 0;
        run_has_tab = false;
        out.push(c);
    }
    out
}

/// Map look-alike letters to digits, only inside tokens that already read as
/// an amount (digits with a decimal or thousands separator). Descriptions
/// are never touched and digits are never turned into letters.
fn fix_ocr_confusions(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while !rest.is_empty() {
        let split = rest.find([' ', '\t']).unwrap_or(rest.len());
        out.push_str(&fix_token(&rest[..split]));
        let gap_end = rest[split..]
            .find(|c: char| c != ' ' && c != '\t')
            .map_or(rest.len(), |i| split + i);
        out.push_str(&rest[split..gap_end]);
        rest = &rest[gap_end..];
    }
    out
}

fn fix_token(token: &str) -> String {
    let body_start = token
        .char_indices()
        .find(|&(_, c)| !matches!(c, '£' | '$' | '€' | '-' | '('))
        .map_or(token.len(), |(i, _)| i);
    let body_end = token
        .char_indices()
        .rev()
        .find(|&(_, c)| !matches!(c, ')' | '-'))
        .map_or(body_start, |(i, c)| i + c.len_utf8())
        .max(body_start);
    let body = &token[body_start..body_end];

    if !body.chars().any(|c| c.is_ascii_digit()) || !AMOUNT_LIKE_RE.is_match(body) {
        return token.to_string();
    }
    let fixed: String = body
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'I' | 'l' | '|' => '1',
            other => other,
        })
        .collect();
    format!("{}{}{}", &token[..body_start], fixed, &token[body_end..])
}
