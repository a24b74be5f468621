//! Error types for pdfoutline.

use std::io;
use thiserror::Error;

/// Result type alias for pdfoutline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, labeling, training or
/// reconstructing outlines.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not recognized as a PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error extracting text content from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error reading or writing the training corpus.
    #[error("Corpus error: {0}")]
    Corpus(#[from] csv::Error),

    /// Error (de)serializing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Not enough labeled data to fit a classifier.
    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    /// Runtime feature columns do not match the persisted schema.
    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The model artifact is corrupt or incompatible.
    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
