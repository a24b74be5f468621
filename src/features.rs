//! Feature vectorization and the persisted feature-column schema.
//!
//! Training and inference go through the same [`SpanFeatures`] →
//! [`FeatureFrame`] path. A frame only carries the alignment one-hot columns
//! it actually observed; [`FeatureFrame::conform`] lays it out in the exact
//! column order of a [`FeatureSchema`] before any prediction.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filters;
use crate::model::{Alignment, AnnotatedSpan};

/// Current schema format version.
pub const SCHEMA_VERSION: u32 = 1;

/// Numeric columns, in order, ahead of the alignment one-hot columns.
pub const BASE_COLUMNS: [&str; 8] = [
    "size",
    "bold",
    "italic",
    "underline",
    "x",
    "page",
    "length",
    "is_numbered",
];

/// Prefix of the alignment one-hot columns.
pub const ALIGN_PREFIX: &str = "align_";

/// One-hot column name for an alignment.
pub fn alignment_column(alignment: Alignment) -> String {
    format!("{}{}", ALIGN_PREFIX, alignment.as_str())
}

/// The ordered list of feature columns a classifier was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema format version
    pub version: u32,
    /// Column names in classifier input order
    pub columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from explicit column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    /// The full schema: base columns followed by every alignment column.
    pub fn canonical() -> Self {
        let columns = BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(Alignment::ALL.iter().map(|a| alignment_column(*a)))
            .collect();
        Self::new(columns)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Raw descriptor of one span before one-hot encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanFeatures {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub x: f32,
    pub page: usize,
    pub length: usize,
    pub is_numbered: bool,
    pub alignment: Alignment,
}

impl SpanFeatures {
    /// Describe an annotated span.
    pub fn from_span(span: &AnnotatedSpan) -> Self {
        Self {
            size: span.font_size(),
            bold: span.run.bold,
            italic: span.run.italic,
            x: round_x(span.run.x0),
            page: span.page_index(),
            length: span.run.char_count(),
            is_numbered: filters::span_numbering_depth(span).is_some(),
            alignment: span.alignment,
        }
    }

    /// Values of the base columns, in [`BASE_COLUMNS`] order.
    ///
    /// Underline is always 0: it cannot be recovered reliably from run
    /// geometry.
    fn base_values(&self) -> [f64; 8] {
        [
            self.size as f64,
            flag(self.bold),
            flag(self.italic),
            0.0,
            self.x as f64,
            self.page as f64,
            self.length as f64,
            flag(self.is_numbered),
        ]
    }
}

/// Round an x coordinate to two decimals, as stored in the corpus file.
pub fn round_x(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// A matrix of feature rows with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    /// Build a frame, emitting one-hot columns only for the alignments
    /// that occur in `features`.
    pub fn from_features(features: &[SpanFeatures]) -> Self {
        let observed: Vec<Alignment> = Alignment::ALL
            .into_iter()
            .filter(|a| features.iter().any(|f| f.alignment == *a))
            .collect();

        let columns = BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(observed.iter().map(|a| alignment_column(*a)))
            .collect();

        let rows = features
            .iter()
            .map(|f| {
                let mut row = f.base_values().to_vec();
                row.extend(observed.iter().map(|a| flag(f.alignment == *a)));
                row
            })
            .collect();

        Self { columns, rows }
    }

    /// Build a frame from annotated spans.
    pub fn from_spans(spans: &[AnnotatedSpan]) -> Self {
        let features: Vec<SpanFeatures> = spans.iter().map(SpanFeatures::from_span).collect();
        Self::from_features(&features)
    }

    /// Build a frame from explicit columns and rows.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(Error::SchemaMismatch(format!(
                "row has {} values for {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Feature rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lay the frame out in schema column order.
    ///
    /// Schema columns the frame lacks are zero-filled. A frame column the
    /// schema does not know is an error: it would otherwise shift every
    /// column after it.
    pub fn conform(&self, schema: &FeatureSchema) -> Result<Vec<Vec<f64>>> {
        if let Some(unknown) = self.columns.iter().find(|c| schema.index_of(c).is_none()) {
            return Err(Error::SchemaMismatch(format!(
                "column `{}` not in schema",
                unknown
            )));
        }

        let sources: Vec<Option<usize>> = schema
            .columns
            .iter()
            .map(|c| self.columns.iter().position(|own| own == c))
            .collect();

        Ok(self
            .rows
            .iter()
            .map(|row| {
                sources
                    .iter()
                    .map(|src| src.map_or(0.0, |i| row[i]))
                    .collect()
            })
            .collect())
    }
}
