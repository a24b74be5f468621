//! Page → block → line → run records produced by the PDF parser.
//!
//! This is the contract between the parser and the span extractor. Bounding
//! boxes are `[x0, y0, x1, y1]` in top-down page coordinates.

use serde::{Deserialize, Serialize};

/// A styled run of text as reported by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    pub bbox: [f32; 4],
}

impl RawRun {
    /// Create a run.
    pub fn new(
        text: impl Into<String>,
        font_name: impl Into<String>,
        font_size: f32,
        bbox: [f32; 4],
    ) -> Self {
        Self {
            text: text.into(),
            font_name: font_name.into(),
            font_size,
            bbox,
        }
    }
}

/// Runs sharing a baseline, left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub runs: Vec<RawRun>,
}

impl RawLine {
    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Dominant font size weighted by text length.
    pub fn font_size(&self) -> f32 {
        let total: usize = self.runs.iter().map(|r| r.text.len()).sum();
        if total == 0 {
            return self.runs.first().map(|r| r.font_size).unwrap_or(0.0);
        }
        self.runs
            .iter()
            .map(|r| r.font_size * r.text.len() as f32)
            .sum::<f32>()
            / total as f32
    }

    /// Left edge of the line.
    pub fn x0(&self) -> f32 {
        self.runs.first().map(|r| r.bbox[0]).unwrap_or(0.0)
    }

    /// Bottom edge of the line.
    pub fn y1(&self) -> f32 {
        self.runs
            .iter()
            .map(|r| r.bbox[3])
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// A paragraph-like group of lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub lines: Vec<RawLine>,
}

impl RawBlock {
    /// Text of all lines joined by spaces.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(RawLine::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One page of parsed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Zero-based page index
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<RawBlock>,
}

impl RawPage {
    /// Create an empty page.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            blocks: Vec::new(),
        }
    }

    /// Iterate every line of the page in block order.
    pub fn lines(&self) -> impl Iterator<Item = &RawLine> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }
}
