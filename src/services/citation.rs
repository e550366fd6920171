//! Citation grammar shared by the prompt and the reply parser.
//!
//! The model is told to follow each recommended product name with a line
//!
//! ```text
//! Product ID: <1-6 ASCII digits>
//! ```
//!
//! Accepted: any run of spaces or tabs (including none) between the label and
//! the digits, and trailing punctuation after the digits. Rejected: a different
//! label casing (`product id:`), whitespace inside the label (`Product  ID:`,
//! `Product ID :`), a line break between label and digits, and digit runs
//! longer than six. Rejected runs after the label are still removed from the
//! user-facing text so no raw id leaks.

use regex::Regex;
use std::{collections::HashSet, fmt::Display, sync::LazyLock};

pub const CITATION_LABEL: &str = "Product ID:";

pub const MAX_CITATION_DIGITS: usize = 6;

/// Upper bound on products attached to a single reply.
pub const MAX_CITATIONS: usize = 4;

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{}[ \t]*([0-9]{{1,{}}})\b",
        regex::escape(CITATION_LABEL),
        MAX_CITATION_DIGITS
    ))
    .unwrap()
});

// Label, digits and the rest of the line, plus the line break before it.
static CITATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\n?[ \t]*{}[ \t]*[0-9]+[^\n]*",
        regex::escape(CITATION_LABEL)
    ))
    .unwrap()
});

/// Render the citation line for `id` exactly as the parser expects it.
pub fn citation_line(id: impl Display) -> String {
    format!("{} {}", CITATION_LABEL, id)
}

/// Every cited id, in order of appearance, duplicates included.
pub fn extract_ids(text: &str) -> Vec<u32> {
    CITATION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// The working set for a reply: the first [`MAX_CITATIONS`] raw citations,
/// then deduplicated keeping first occurrence.
pub fn select_citations(text: &str) -> Vec<u32> {
    let mut seen = HashSet::new();
    extract_ids(text)
        .into_iter()
        .take(MAX_CITATIONS)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Remove citation lines and trim. Idempotent.
pub fn strip_citations(text: &str) -> String {
    CITATION_LINE.replace_all(text, "").trim().to_string()
}
