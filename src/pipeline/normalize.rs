//! Page-text normalisation.
//!
//! PDF text readers return one line per rendered line of text, so words
//! hyphenated at the end of a line arrive split in two and paragraphs arrive
//! broken into short lines. Chat messages read better as one flowing block.
//!
//! ## Rule Order
//!
//! Line endings are normalised first (pdfium emits `\r\n`), hyphen joins run
//! before newlines become spaces, and the space collapse runs last.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HYPHEN_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\n(\w)").unwrap());
static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Normalise raw page text. Returns `None` when nothing is left.
pub fn normalize_page_text(raw: &str) -> Option<String> {
    let s = normalise_line_endings(raw);
    let s = join_hyphenated(&s);
    let s = s.replace('\n', " ");
    let s = RE_SPACE_RUN.replace_all(&s, " ");
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn join_hyphenated(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "$1$2").into_owned()
}
