//! Outline output types.

use serde::{Deserialize, Deserializer, Serialize};

use super::Label;

/// One heading of the inferred outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level (H1–H4)
    #[serde(deserialize_with = "heading_level")]
    pub level: Label,

    /// Heading text
    pub text: String,

    /// One-based page number
    pub page: u32,
}

impl OutlineEntry {
    /// Create a new outline entry. `None` unless `level` is H1–H4.
    pub fn new(level: Label, text: impl Into<String>, page: u32) -> Option<Self> {
        level.is_heading().then(|| Self {
            level,
            text: text.into(),
            page,
        })
    }
}

fn heading_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Label, D::Error> {
    let level = Label::deserialize(deserializer)?;
    if level.is_heading() {
        Ok(level)
    } else {
        Err(serde::de::Error::custom(format!(
            "outline level must be H1-H4, got {}",
            level
        )))
    }
}

/// The inferred structure of one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineDocument {
    /// Document title (empty when none was found)
    pub title: String,

    /// Headings in document order
    pub outline: Vec<OutlineEntry>,
}

impl OutlineDocument {
    /// Create an empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headings.
    pub fn len(&self) -> usize {
        self.outline.len()
    }

    /// Check if the outline has no headings.
    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }

    /// Count headings at the given level.
    pub fn count_level(&self, level: Label) -> usize {
        self.outline.iter().filter(|e| e.level == level).count()
    }
}

/// A layout block of text, the unit handed to retrieval indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// One-based page number
    pub page: u32,

    /// Block text, lines joined by spaces
    pub text: String,
}
