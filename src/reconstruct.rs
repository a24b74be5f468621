//! Outline reconstruction from per-span predictions.
//!
//! Spans are scanned in reading order. Consecutive spans predicted as the
//! same heading level on the same page are merged into one entry; the title
//! is assembled from consecutive page-0 title spans of similar size.

use std::collections::HashSet;

use crate::model::{AnnotatedSpan, Label, OutlineDocument, OutlineEntry};

/// Options for outline reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Headings whose normalized text has at most this many characters are dropped
    pub min_heading_chars: usize,

    /// Maximum size difference (pt) between title spans that form one title
    pub title_size_tolerance: f32,

    /// Use the first line of page 0 when no title is predicted
    pub fallback_title: bool,

    /// Minimum vote share for a prediction to be kept
    pub min_confidence: f64,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            min_heading_chars: 3,
            title_size_tolerance: 0.5,
            fallback_title: false,
            min_confidence: 0.0,
        }
    }
}

impl ReconstructOptions {
    /// Create new reconstruct options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum heading length.
    pub fn with_min_heading_chars(mut self, chars: usize) -> Self {
        self.min_heading_chars = chars;
        self
    }

    /// Set the title size tolerance.
    pub fn with_title_size_tolerance(mut self, tolerance: f32) -> Self {
        self.title_size_tolerance = tolerance.max(0.0);
        self
    }

    /// Enable or disable the first-line title fallback.
    pub fn with_fallback_title(mut self, enabled: bool) -> Self {
        self.fallback_title = enabled;
        self
    }

    /// Set the minimum prediction confidence.
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// A heading being assembled from consecutive spans.
#[derive(Debug)]
struct Accumulation {
    level: Label,
    page: usize,
    last_index: usize,
    parts: Vec<String>,
}

#[derive(Debug, Default)]
struct TitleBuffer {
    parts: Vec<String>,
    size: f32,
    last_index: usize,
    sealed: bool,
}

impl TitleBuffer {
    fn started(&self) -> bool {
        !self.parts.is_empty()
    }

    fn text(&self) -> String {
        self.parts.join(" ").trim().to_string()
    }
}

/// Builds an [`OutlineDocument`] from labeled spans.
#[derive(Debug, Clone, Default)]
pub struct Reconstructor {
    options: ReconstructOptions,
}

impl Reconstructor {
    /// Create a reconstructor.
    pub fn new(options: ReconstructOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Reconstruct the outline of one document.
    ///
    /// `spans` must be in reading order and carry predicted labels. Spans
    /// labeled `body` only break up accumulations.
    pub fn reconstruct(&self, spans: &[AnnotatedSpan]) -> OutlineDocument {
        let mut title = TitleBuffer::default();
        let mut pending: Option<Accumulation> = None;
        let mut seen = HashSet::new();
        let mut outline = Vec::new();

        for (index, span) in spans.iter().enumerate() {
            if span.label == Label::Title {
                self.add_title(&mut title, index, span);
                continue;
            }
            if title.started() {
                title.sealed = true;
            }

            if !span.label.is_heading() {
                continue;
            }

            let page = span.page_index();
            match pending.as_mut() {
                Some(acc)
                    if acc.level == span.label && acc.page == page && acc.last_index + 1 == index =>
                {
                    acc.parts.push(span.text().to_string());
                    acc.last_index = index;
                }
                _ => {
                    if let Some(done) = pending.take() {
                        self.flush(done, &mut seen, &mut outline);
                    }
                    pending = Some(Accumulation {
                        level: span.label,
                        page,
                        last_index: index,
                        parts: vec![span.text().to_string()],
                    });
                }
            }
        }

        if let Some(done) = pending {
            self.flush(done, &mut seen, &mut outline);
        }

        let mut title_text = title.text();
        if title_text.is_empty() && self.options.fallback_title {
            if let Some(first) = spans.iter().find(|s| s.page_index() == 0) {
                title_text = first.line_text.trim().to_string();
            }
        }

        OutlineDocument {
            title: title_text,
            outline,
        }
    }

    fn add_title(&self, title: &mut TitleBuffer, index: usize, span: &AnnotatedSpan) {
        if title.sealed || span.page_index() != 0 {
            return;
        }
        if !title.started() {
            title.size = span.font_size();
        } else if title.last_index + 1 != index
            || (span.font_size() - title.size).abs() > self.options.title_size_tolerance
        {
            title.sealed = true;
            return;
        }
        title.parts.push(span.text().to_string());
        title.last_index = index;
    }

    fn flush(
        &self,
        acc: Accumulation,
        seen: &mut HashSet<String>,
        outline: &mut Vec<OutlineEntry>,
    ) {
        let text = normalize_whitespace(&acc.parts.join(" "));
        if text.chars().count() <= self.options.min_heading_chars {
            log::trace!("Dropping short heading {:?}", text);
            return;
        }
        if !seen.insert(text.to_lowercase()) {
            log::trace!("Dropping repeated heading {:?}", text);
            return;
        }
        outline.extend(OutlineEntry::new(acc.level, text, acc.page as u32 + 1));
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
