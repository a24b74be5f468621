//! Text run and span types.

use serde::{Deserialize, Serialize};

use super::Label;

/// A contiguous, uniformly styled piece of text on one line of a page.
///
/// Coordinates are top-down: the origin is the top-left corner of the page
/// and `y` grows towards the bottom edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Trimmed, normalized text
    pub text: String,

    /// Font name as reported by the document (e.g., "Helvetica-Bold")
    pub font_name: String,

    /// Font size in points, rounded to one decimal place
    pub font_size: f32,

    /// Whether the font name contains "bold"
    pub bold: bool,

    /// Whether the font name contains "italic"
    pub italic: bool,

    /// Left edge
    pub x0: f32,

    /// Right edge
    pub x1: f32,

    /// Top edge
    pub y0: f32,

    /// Bottom edge
    pub y1: f32,

    /// Zero-based page index
    pub page_index: usize,

    /// Width of the page the run sits on
    pub page_width: f32,

    /// Height of the page the run sits on
    pub page_height: f32,

    /// Document-global ordinal of the line the run belongs to
    pub line_index: usize,
}

impl TextRun {
    /// Create a run with style flags derived from the font name.
    pub fn new(text: impl Into<String>, font_name: impl Into<String>, font_size: f32) -> Self {
        let font_name = font_name.into();
        let (bold, italic) = style_from_font_name(&font_name);
        Self {
            text: text.into(),
            font_name,
            font_size: round_size(font_size),
            bold,
            italic,
            x0: 0.0,
            x1: 0.0,
            y0: 0.0,
            y1: 0.0,
            page_index: 0,
            page_width: 612.0,
            page_height: 792.0,
            line_index: 0,
        }
    }

    /// Set the bounding box.
    pub fn with_bbox(mut self, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        self.x0 = x0;
        self.y0 = y0;
        self.x1 = x1;
        self.y1 = y1;
        self
    }

    /// Set page index and page dimensions.
    pub fn on_page(mut self, page_index: usize, width: f32, height: f32) -> Self {
        self.page_index = page_index;
        self.page_width = width;
        self.page_height = height;
        self
    }

    /// Set the owning line ordinal.
    pub fn on_line(mut self, line_index: usize) -> Self {
        self.line_index = line_index;
        self
    }

    /// Number of characters in the run text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Derive bold/italic flags from a font name by case-insensitive token match.
pub fn style_from_font_name(font_name: &str) -> (bool, bool) {
    let lower = font_name.to_lowercase();
    (lower.contains("bold"), lower.contains("italic"))
}

/// Round a font size to one decimal place.
pub fn round_size(size: f32) -> f32 {
    (size * 10.0).round() / 10.0
}

/// An ordered sequence of runs sharing a geometric line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Runs sorted left to right
    pub runs: Vec<TextRun>,
}

impl Line {
    /// Create a line from runs.
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    /// Concatenated run text joined by single spaces.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the line has no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Zero-based page index of the line.
    pub fn page_index(&self) -> Option<usize> {
        self.runs.first().map(|r| r.page_index)
    }
}

/// Horizontal placement of a run relative to the page width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    /// All alignments in one-hot column order.
    pub const ALL: [Alignment; 3] = [Alignment::Left, Alignment::Center, Alignment::Right];

    /// Lowercase name used in the corpus file and feature column names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    /// Parse from the lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text run with its alignment, the text of its line, and a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSpan {
    /// The underlying run
    pub run: TextRun,

    /// Horizontal alignment
    pub alignment: Alignment,

    /// Concatenated text of the owning line
    pub line_text: String,

    /// Whether this run is the first run of its line
    pub starts_line: bool,

    /// Weak label, ground truth, or prediction
    pub label: Label,
}

impl AnnotatedSpan {
    /// Span text.
    pub fn text(&self) -> &str {
        &self.run.text
    }

    /// Zero-based page index.
    pub fn page_index(&self) -> usize {
        self.run.page_index
    }

    /// Font size in points.
    pub fn font_size(&self) -> f32 {
        self.run.font_size
    }

    /// Number of whitespace-separated words on the owning line.
    pub fn line_word_count(&self) -> usize {
        self.line_text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_font_name() {
        assert_eq!(style_from_font_name("Helvetica-Bold"), (true, false));
        assert_eq!(style_from_font_name("Times-BoldItalic"), (true, true));
        assert_eq!(style_from_font_name("ARIAL,ITALIC"), (false, true));
        // Oblique is not matched; detection is a name heuristic only
        assert_eq!(style_from_font_name("Helvetica-Oblique"), (false, false));
    }

    #[test]
    fn test_round_size() {
        assert_eq!(round_size(11.96), 12.0);
        assert_eq!(round_size(13.04), 13.0);
        assert_eq!(round_size(9.46), 9.5);
    }

    #[test]
    fn test_line_text_joins_runs() {
        let line = Line::new(vec![
            TextRun::new("1", "Arial-Bold", 14.0),
            TextRun::new("Introduction", "Arial-Bold", 14.0),
        ]);
        assert_eq!(line.text(), "1 Introduction");
        assert_eq!(line.page_index(), Some(0));
    }

    #[test]
    fn test_alignment_parse_round_trip() {
        for alignment in Alignment::ALL {
            assert_eq!(Alignment::parse(alignment.as_str()), Some(alignment));
        }
        assert_eq!(Alignment::parse("Justify"), None);
    }
}
