//! Weak labeling: provisional `title`/`H1`–`H3`/`body` classes from font
//! size ranking, boldness, alignment and heading numbering.

use std::collections::HashMap;

use crate::filters::{self, TocStrictness};
use crate::model::{Alignment, AnnotatedSpan, Label, Line};

/// Lines with this many words or more are never size-ranked headings.
pub const MAX_HEADING_WORDS: usize = 20;

/// Number of size ranks mapped to heading levels (H1–H3).
const RANKED_LEVELS: usize = 3;

/// Size used when a document has no text at all.
const DEFAULT_BODY_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SizeCount {
    spans: usize,
    chars: usize,
}

/// Font size statistics for heading detection.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common)
    pub body_size: f32,
    /// Font sizes larger than body, largest first
    pub heading_sizes: Vec<f32>,
    /// Observed sizes keyed by tenths of a point
    size_histogram: HashMap<i32, SizeCount>,
}

fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

impl FontStatistics {
    /// Collect and analyze the sizes of a set of spans.
    pub fn from_spans(spans: &[AnnotatedSpan]) -> Self {
        let mut stats = Self::default();
        for span in spans {
            stats.add_size(span.font_size(), span.run.char_count());
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32, chars: usize) {
        let entry = self.size_histogram.entry(size_key(size)).or_default();
        entry.spans += 1;
        entry.chars += chars;
    }

    /// Calculate body size and heading sizes.
    ///
    /// The body size is the most frequent size; ties go to the size with
    /// more characters, then to the smaller size.
    pub fn analyze(&mut self) {
        let body_key = self
            .size_histogram
            .iter()
            .max_by_key(|(key, count)| (count.spans, count.chars, -**key))
            .map(|(key, _)| *key);

        let Some(body_key) = body_key else {
            self.body_size = DEFAULT_BODY_SIZE;
            self.heading_sizes.clear();
            return;
        };
        self.body_size = body_key as f32 / 10.0;

        let mut larger: Vec<i32> = self
            .size_histogram
            .keys()
            .copied()
            .filter(|k| *k > body_key)
            .collect();
        larger.sort_unstable_by(|a, b| b.cmp(a));
        self.heading_sizes = larger.into_iter().map(|k| k as f32 / 10.0).collect();
    }

    /// One-based heading rank of a size (1 for the largest), limited to the
    /// first three ranks.
    pub fn heading_rank(&self, size: f32) -> Option<usize> {
        let key = size_key(size);
        self.heading_sizes
            .iter()
            .take(RANKED_LEVELS)
            .position(|s| size_key(*s) == key)
            .map(|i| i + 1)
    }

    /// Largest heading size, if any size exceeds the body size.
    pub fn largest_heading(&self) -> Option<f32> {
        self.heading_sizes.first().copied()
    }

    /// Whether a size is strictly larger than the body size.
    pub fn is_larger_than_body(&self, size: f32) -> bool {
        size_key(size) > size_key(self.body_size)
    }
}

/// Assigns weak labels to the spans of one document.
#[derive(Debug, Clone, Default)]
pub struct WeakLabeler {
    toc_strictness: TocStrictness,
}

impl WeakLabeler {
    /// Create a labeler with the given TOC strictness.
    pub fn new(toc_strictness: TocStrictness) -> Self {
        Self { toc_strictness }
    }

    /// Turn lines into annotated spans, dropping header/footer runs and
    /// whole TOC lines. Every span starts out labeled `body`.
    pub fn annotate(&self, lines: &[Line]) -> Vec<AnnotatedSpan> {
        let mut spans = Vec::new();
        let mut toc_lines = 0usize;

        for line in lines {
            let line_text = line.text();
            if filters::is_toc_line(&line_text, self.toc_strictness) {
                toc_lines += 1;
                continue;
            }

            for (i, run) in line.runs.iter().enumerate() {
                if filters::is_header_footer(run) {
                    continue;
                }
                spans.push(AnnotatedSpan {
                    run: run.clone(),
                    alignment: filters::alignment(run.x0, run.page_width),
                    line_text: line_text.clone(),
                    starts_line: i == 0,
                    label: Label::Body,
                });
            }
        }

        if toc_lines > 0 {
            log::debug!("Skipped {} table-of-contents lines", toc_lines);
        }
        spans
    }

    /// Label already-filtered spans in place and return the statistics used.
    pub fn label(&self, spans: &mut [AnnotatedSpan]) -> FontStatistics {
        let stats = FontStatistics::from_spans(spans);
        let largest = stats.largest_heading();
        let mut title_found = false;

        for span in spans.iter_mut() {
            span.label = Label::Body;

            if let Some(depth) = filters::span_numbering_depth(span) {
                span.label = filters::depth_level(depth);
                continue;
            }

            let size = span.font_size();
            if !title_found
                && span.page_index() == 0
                && largest.is_some_and(|l| size_key(l) == size_key(size))
                && span.run.bold
                && span.alignment == Alignment::Center
            {
                span.label = Label::Title;
                title_found = true;
                continue;
            }

            if let Some(rank) = stats.heading_rank(size) {
                if span.run.bold && span.line_word_count() < MAX_HEADING_WORDS {
                    span.label = Label::heading(rank).unwrap_or(Label::Body);
                }
            }
        }

        log::debug!(
            "Weak labels: body size {}, {} heading sizes, title {}",
            stats.body_size,
            stats.heading_sizes.len(),
            if title_found { "found" } else { "not found" }
        );
        stats
    }

    /// Annotate and label a whole document.
    pub fn label_document(&self, lines: &[Line]) -> Vec<AnnotatedSpan> {
        let mut spans = self.annotate(lines);
        self.label(&mut spans);
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextRun;

    fn run(text: &str, font: &str, size: f32, x0: f32, y0: f32) -> TextRun {
        TextRun::new(text, font, size)
            .with_bbox(x0, y0, x0 + 100.0, y0 + size)
            .on_page(0, 600.0, 800.0)
    }

    fn quarterly_report() -> Vec<Line> {
        vec![
            Line::new(vec![run("Quarterly Report", "Helvetica-Bold", 24.0, 200.0, 100.0)]),
            Line::new(vec![run("1 Introduction", "Helvetica-Bold", 14.0, 72.0, 160.0)]),
            Line::new(vec![run(
                "Revenue rose in every region this quarter, led by strong demand in services.",
                "Helvetica",
                12.0,
                72.0,
                190.0,
            )]),
        ]
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        for _ in 0..100 {
            stats.add_size(12.0, 60);
        }
        for _ in 0..5 {
            stats.add_size(18.0, 20);
        }
        for _ in 0..3 {
            stats.add_size(24.0, 15);
        }
        stats.add_size(10.0, 5);
        stats.analyze();

        assert_eq!(stats.body_size, 12.0);
        assert_eq!(stats.heading_sizes, vec![24.0, 18.0]);
        assert_eq!(stats.heading_rank(24.0), Some(1));
        assert_eq!(stats.heading_rank(18.0), Some(2));
        assert_eq!(stats.heading_rank(12.0), None);
        assert_eq!(stats.heading_rank(10.0), None);
    }

    #[test]
    fn test_body_size_tie_breaks() {
        let mut stats = FontStatistics::default();
        stats.add_size(24.0, 16);
        stats.add_size(14.0, 14);
        stats.add_size(12.0, 80);
        stats.analyze();
        assert_eq!(stats.body_size, 12.0);

        let mut stats = FontStatistics::default();
        stats.add_size(11.0, 40);
        stats.add_size(10.0, 40);
        stats.analyze();
        assert_eq!(stats.body_size, 10.0);
    }

    #[test]
    fn test_empty_statistics() {
        let mut stats = FontStatistics::default();
        stats.analyze();
        assert_eq!(stats.body_size, 12.0);
        assert_eq!(stats.largest_heading(), None);
    }

    #[test]
    fn test_ranks_beyond_third_collapse() {
        let mut stats = FontStatistics::default();
        for size in [30.0, 24.0, 18.0, 14.0] {
            stats.add_size(size, 10);
        }
        for _ in 0..10 {
            stats.add_size(11.0, 50);
        }
        stats.analyze();
        assert_eq!(stats.heading_rank(18.0), Some(3));
        assert_eq!(stats.heading_rank(14.0), None);
        assert!(stats.is_larger_than_body(14.0));
    }

    #[test]
    fn test_quarterly_report_labels() {
        let spans = WeakLabeler::default().label_document(&quarterly_report());
        let labels: Vec<Label> = spans.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Label::Title, Label::H1, Label::Body]);
        assert_eq!(spans[0].alignment, Alignment::Center);
    }

    #[test]
    fn test_numbering_overrides_size() {
        let lines = vec![
            Line::new(vec![run("1 Scope", "Times", 9.0, 72.0, 100.0)]),
            Line::new(vec![run("1.2 Terms", "Times", 30.0, 72.0, 130.0)]),
            Line::new(vec![run("1.2.3 Units", "Times", 12.0, 72.0, 160.0)]),
            Line::new(vec![run("plain body text here", "Times", 12.0, 72.0, 190.0)]),
            Line::new(vec![run("more plain body text", "Times", 12.0, 72.0, 220.0)]),
        ];
        let spans = WeakLabeler::default().label_document(&lines);
        assert_eq!(spans[0].label, Label::H1);
        assert_eq!(spans[1].label, Label::H2);
        assert_eq!(spans[2].label, Label::H3);
        assert_eq!(spans[3].label, Label::Body);
    }

    #[test]
    fn test_numeral_in_own_run_uses_line_text() {
        let lines = vec![Line::new(vec![
            run("2.1", "Arial-Bold", 12.0, 72.0, 100.0),
            run("Method", "Arial", 12.0, 100.0, 100.0),
        ])];
        let spans = WeakLabeler::default().label_document(&lines);
        assert_eq!(spans[0].label, Label::H2);
        assert!(!spans[1].starts_line);
        assert_eq!(spans[1].label, Label::H2);
    }

    #[test]
    fn test_only_one_title() {
        let lines = vec![
            Line::new(vec![run("Annual", "Arial-Bold", 24.0, 250.0, 100.0)]),
            Line::new(vec![run("Overview", "Arial-Bold", 24.0, 250.0, 130.0)]),
            Line::new(vec![run("body text one", "Arial", 12.0, 72.0, 200.0)]),
            Line::new(vec![run("body text two", "Arial", 12.0, 72.0, 220.0)]),
            Line::new(vec![run("body text three", "Arial", 12.0, 72.0, 240.0)]),
        ];
        let spans = WeakLabeler::default().label_document(&lines);
        assert_eq!(spans[0].label, Label::Title);
        // Second centered line falls back to size rank
        assert_eq!(spans[1].label, Label::H1);
    }

    #[test]
    fn test_long_bold_line_is_body() {
        let sentence = "this bold line runs on for far too many words to ever be taken for a \
                        heading by anyone reading the page";
        let lines = vec![
            Line::new(vec![run(sentence, "Arial-Bold", 14.0, 72.0, 100.0)]),
            Line::new(vec![run("short body", "Arial", 12.0, 72.0, 130.0)]),
            Line::new(vec![run("short body", "Arial", 12.0, 72.0, 150.0)]),
        ];
        let spans = WeakLabeler::default().label_document(&lines);
        assert_eq!(spans[0].label, Label::Body);
    }

    #[test]
    fn test_annotate_drops_margins_and_toc() {
        let lines = vec![
            Line::new(vec![run("Running header", "Arial", 10.0, 72.0, 20.0)]),
            Line::new(vec![run("Introduction ........ 3", "Arial", 12.0, 72.0, 100.0)]),
            Line::new(vec![run("Kept", "Arial", 12.0, 480.0, 130.0)]),
            Line::new(vec![run("Page 4", "Arial", 10.0, 72.0, 770.0)]),
        ];
        let spans = WeakLabeler::default().annotate(&lines);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text(), "Kept");
        assert_eq!(spans[0].alignment, Alignment::Right);
        assert_eq!(spans[0].label, Label::Body);
    }
}
