//! # pdfoutline
//!
//! Infer a document outline (title and H1–H3 headings with page numbers)
//! from the text runs of a PDF, without relying on its bookmarks.
//!
//! Training weak-labels text runs with font-size and numbering heuristics,
//! then fits a random forest on their features. Inference classifies the
//! runs of an unseen document and repairs the predictions into a clean
//! outline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfoutline::{build_corpus, train, extract_outline, TrainOptions};
//!
//! fn main() -> pdfoutline::Result<()> {
//!     // Weak-label a directory of PDFs and train a model
//!     let rows = build_corpus("pdfs/")?;
//!     let (bundle, report) = train(&rows, TrainOptions::default())?;
//!     println!("{}", report);
//!     bundle.save("model.json")?;
//!
//!     // Infer the outline of a new document
//!     let outline = extract_outline("model.json", "document.pdf")?;
//!     println!("{}", outline.title);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Weak labeling**: font-size ranking, boldness, centering and
//!   `1.2.3`-style numbering
//! - **Noise filters**: headers, footers and table-of-contents lines
//! - **Versioned feature schema**: persisted with the model, checked at
//!   inference
//! - **Parallel processing**: rayon for batches and forest training
//! - **Text blocks**: layout blocks for retrieval indexing

pub mod bundle;
pub mod corpus;
pub mod error;
pub mod features;
pub mod filters;
pub mod forest;
pub mod labeler;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod reconstruct;
pub mod render;
pub mod trainer;

// Re-export commonly used types
pub use bundle::{LabelEncoder, ModelBundle, Prediction, SpanClassifier};
pub use corpus::CorpusRow;
pub use error::{Error, Result};
pub use features::{FeatureFrame, FeatureSchema, SpanFeatures};
pub use filters::TocStrictness;
pub use forest::{ForestParams, ParamGrid, RandomForest};
pub use labeler::{FontStatistics, WeakLabeler};
pub use model::{
    Alignment, AnnotatedSpan, Label, Line, OutlineDocument, OutlineEntry, TextBlock, TextRun,
};
pub use parser::{ErrorMode, ExtractOptions, LopdfBackend, PdfBackend, SpanExtractor};
pub use pipeline::{BatchReport, CorpusBuilder, OutlineExtractor};
pub use reconstruct::{ReconstructOptions, Reconstructor};
pub use render::JsonFormat;
pub use trainer::{BodyPolicy, TrainOptions, TrainReport, Trainer};

use std::path::Path;
use std::sync::Arc;

/// Weak-label every PDF in a directory.
///
/// Files that cannot be read are logged and skipped.
///
/// # Example
///
/// ```no_run
/// let rows = pdfoutline::build_corpus("pdfs/").unwrap();
/// pdfoutline::corpus::save("corpus.csv", &rows).unwrap();
/// ```
pub fn build_corpus<P: AsRef<Path>>(dir: P) -> Result<Vec<CorpusRow>> {
    let inputs = pipeline::collect_pdfs(dir.as_ref())?;
    let report = CorpusBuilder::default().label_batch(&inputs, |_| {});
    Ok(report
        .succeeded
        .into_iter()
        .flat_map(|(_, rows)| rows)
        .collect())
}

/// Train a model bundle on corpus rows.
pub fn train(rows: &[CorpusRow], options: TrainOptions) -> Result<(ModelBundle, TrainReport)> {
    Trainer::new(options).train(rows)
}

/// Infer the outline of one PDF with a saved model.
///
/// # Example
///
/// ```no_run
/// use pdfoutline::{extract_outline, render, JsonFormat};
///
/// let outline = extract_outline("model.json", "document.pdf").unwrap();
/// println!("{}", render::to_json(&outline, JsonFormat::Pretty).unwrap());
/// ```
pub fn extract_outline<M: AsRef<Path>, P: AsRef<Path>>(model: M, pdf: P) -> Result<OutlineDocument> {
    let bundle = Arc::new(ModelBundle::load(model)?);
    OutlineExtractor::new(bundle).extract_file(pdf)
}

/// Text blocks of one PDF for retrieval indexing.
pub fn text_blocks<P: AsRef<Path>>(pdf: P) -> Result<Vec<TextBlock>> {
    let extractor = SpanExtractor::default();
    let pages = extractor.read_file(pdf)?;
    Ok(extractor.text_blocks(&pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_outline_missing_model() {
        let result = extract_outline("/nonexistent/model.json", "/nonexistent/doc.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_text_blocks_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"<!DOCTYPE html><html></html>").unwrap();
        assert!(matches!(text_blocks(&path), Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_build_corpus_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4 garbage").unwrap();
        let rows = build_corpus(dir.path()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_train_empty_corpus() {
        let result = train(&[], TrainOptions::default());
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }
}
