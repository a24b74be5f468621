//! Geometry and typography filters.
//!
//! Stateless predicates shared by the weak labeler and inference: page
//! margin zones, alignment, table-of-contents lines, and heading numbering.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Alignment, AnnotatedSpan, Label, TextRun};

/// Fraction of the page height treated as header (top) or footer (bottom).
pub const MARGIN_ZONE: f32 = 0.07;

/// Left/right thresholds for alignment, as fractions of the page width.
const LEFT_LIMIT: f32 = 0.3;
const RIGHT_LIMIT: f32 = 0.7;

static TOC_LEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{4,}\s*\d+\s*$").expect("valid regex"));

static TOC_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{3,}|\s{3,}|(?:^|\D)\d{1,2}$").expect("valid regex"));

static NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s").expect("valid regex"));

/// How aggressively lines are treated as table-of-contents noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocStrictness {
    /// Dotted leader followed by a page number
    #[default]
    Standard,
    /// Also any run of 3+ dots or 3+ spaces, or a line ending in a number
    /// of at most two digits.
    /// Catches more TOC lines but also ordinary sentences ending in a number.
    Strict,
}

/// Whether a run sits in the top or bottom margin zone of its page.
pub fn is_header_footer(run: &TextRun) -> bool {
    let height = run.page_height;
    run.y0 < height * MARGIN_ZONE || run.y1 > height * (1.0 - MARGIN_ZONE)
}

/// Horizontal alignment from the left edge and page width.
pub fn alignment(x0: f32, page_width: f32) -> Alignment {
    if x0 < LEFT_LIMIT * page_width {
        Alignment::Left
    } else if x0 > RIGHT_LIMIT * page_width {
        Alignment::Right
    } else {
        Alignment::Center
    }
}

/// Whether a line's concatenated text looks like a table-of-contents entry.
pub fn is_toc_line(text: &str, strictness: TocStrictness) -> bool {
    let text = text.trim();
    if TOC_LEADER.is_match(text) {
        return true;
    }
    strictness == TocStrictness::Strict && TOC_STRICT.is_match(text)
}

/// Number of dots in a leading decimal numeral (`"1.2.3 Scope"` → 2).
///
/// `None` when the text does not start with a numeral followed by whitespace.
pub fn numbering_depth(text: &str) -> Option<usize> {
    NUMBERING
        .captures(text.trim_start())
        .map(|caps| caps[1].matches('.').count())
}

/// Whether the text starts with a decimal-dotted numeral and a space.
pub fn is_numbered(text: &str) -> bool {
    numbering_depth(text).is_some()
}

/// Heading level implied by a leading numeral: 0 dots → H1, 1 → H2, 2+ → H3.
pub fn numbered_level(text: &str) -> Option<Label> {
    numbering_depth(text).map(depth_level)
}

/// Heading level for a numbering depth.
pub fn depth_level(dots: usize) -> Label {
    match dots {
        0 => Label::H1,
        1 => Label::H2,
        _ => Label::H3,
    }
}

/// Numbering depth of the line a span belongs to. Every run of a numbered
/// line shares it, so a numeral set in its own run still numbers the words
/// that follow.
pub fn span_numbering_depth(span: &AnnotatedSpan) -> Option<usize> {
    numbering_depth(&span.line_text)
}
