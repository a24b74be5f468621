//! The weak-labeled training corpus file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::{round_x, SpanFeatures};
use crate::filters;
use crate::model::{Alignment, AnnotatedSpan, Label};

/// One weak-labeled span as stored in the corpus CSV.
///
/// Field order is the column order of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub text: String,
    pub size: f32,
    pub font: String,
    pub bold: u8,
    pub italic: u8,
    pub underline: u8,
    pub alignment: Alignment,
    pub x: f32,
    pub page: usize,
    pub length: usize,
    pub label: Label,
    pub is_numbered: u8,
}

impl CorpusRow {
    /// Record a labeled span.
    pub fn from_span(span: &AnnotatedSpan) -> Self {
        Self {
            text: span.text().to_string(),
            size: span.font_size(),
            font: span.run.font_name.clone(),
            bold: span.run.bold as u8,
            italic: span.run.italic as u8,
            underline: 0,
            alignment: span.alignment,
            x: round_x(span.run.x0),
            page: span.page_index(),
            length: span.run.char_count(),
            label: span.label,
            is_numbered: filters::span_numbering_depth(span).is_some() as u8,
        }
    }

    /// Feature descriptor of the row.
    pub fn features(&self) -> SpanFeatures {
        SpanFeatures {
            size: self.size,
            bold: self.bold != 0,
            italic: self.italic != 0,
            x: self.x,
            page: self.page,
            length: self.length,
            is_numbered: self.is_numbered != 0,
            alignment: self.alignment,
        }
    }
}

/// Write corpus rows as CSV with a header line.
pub fn write_csv<W: Write>(writer: W, rows: &[CorpusRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read corpus rows from CSV.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<CorpusRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    let rows = reader.deserialize().collect::<std::result::Result<Vec<CorpusRow>, _>>()?;
    Ok(rows)
}

/// Write a corpus file.
pub fn save<P: AsRef<Path>>(path: P, rows: &[CorpusRow]) -> Result<()> {
    write_csv(File::create(path)?, rows)
}

/// Read a corpus file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<CorpusRow>> {
    read_csv(File::open(path)?)
}
