//! End-to-end processing: PDFs → weak-labeled corpus, and PDFs → outlines.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::bundle::{ModelBundle, Prediction, SpanClassifier};
use crate::corpus::CorpusRow;
use crate::error::{Error, Result};
use crate::filters;
use crate::labeler::{FontStatistics, WeakLabeler, MAX_HEADING_WORDS};
use crate::model::{AnnotatedSpan, Label, Line, OutlineDocument};
use crate::parser::{ExtractOptions, LopdfBackend, RawPage, SpanExtractor};
use crate::reconstruct::{ReconstructOptions, Reconstructor};
use crate::render::{self, DocumentBlocks};

/// List the PDF files of a directory (extension match is case-insensitive),
/// sorted by path.
pub fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Outcome of processing many files; one file failing never stops the rest.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Successful results, in input order
    pub succeeded: Vec<(PathBuf, T)>,
    /// Failed inputs, in input order
    pub failed: Vec<(PathBuf, Error)>,
}

impl<T> BatchReport<T> {
    /// Check if every input succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn from_results(results: Vec<(PathBuf, Result<T>)>) -> Self {
        let mut report = Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for (path, result) in results {
            match result {
                Ok(value) => report.succeeded.push((path, value)),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    report.failed.push((path, e));
                }
            }
        }
        report
    }
}

fn run_batch<T, F, P>(inputs: &[PathBuf], work: F, progress: P) -> BatchReport<T>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
    P: Fn(&Path) + Sync,
{
    let results: Vec<(PathBuf, Result<T>)> = inputs
        .par_iter()
        .map(|path| {
            let result = work(path);
            progress(path);
            (path.clone(), result)
        })
        .collect();
    BatchReport::from_results(results)
}

/// Builds the weak-labeled training corpus.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    extractor: SpanExtractor,
    labeler: WeakLabeler,
    body_rows: bool,
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl CorpusBuilder {
    /// Create a corpus builder; `body` rows are kept.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            labeler: WeakLabeler::new(options.toc_strictness),
            extractor: SpanExtractor::new(options),
            body_rows: true,
        }
    }

    /// Keep or drop `body` rows in the output.
    pub fn with_body_rows(mut self, keep: bool) -> Self {
        self.body_rows = keep;
        self
    }

    /// Weak-label the lines of one document.
    pub fn label_lines(&self, lines: &[Line]) -> Vec<CorpusRow> {
        self.labeler
            .label_document(lines)
            .iter()
            .filter(|s| self.body_rows || s.label != Label::Body)
            .map(CorpusRow::from_span)
            .collect()
    }

    /// Weak-label one PDF file.
    pub fn label_file(&self, path: &Path) -> Result<Vec<CorpusRow>> {
        let pages = self.extractor.read_file(path)?;
        let rows = self.label_lines(&self.extractor.lines(&pages));
        log::debug!("{}: {} corpus rows", path.display(), rows.len());
        Ok(rows)
    }

    /// Weak-label many files in parallel.
    pub fn label_batch<P>(&self, inputs: &[PathBuf], progress: P) -> BatchReport<Vec<CorpusRow>>
    where
        P: Fn(&Path) + Sync,
    {
        run_batch(inputs, |path| self.label_file(path), progress)
    }
}

/// Infers outlines with a shared classifier.
#[derive(Clone)]
pub struct OutlineExtractor {
    classifier: Arc<dyn SpanClassifier>,
    extractor: SpanExtractor,
    labeler: WeakLabeler,
    reconstructor: Reconstructor,
}

impl std::fmt::Debug for OutlineExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineExtractor")
            .field("extractor", &self.extractor)
            .field("reconstructor", &self.reconstructor)
            .finish_non_exhaustive()
    }
}

impl OutlineExtractor {
    /// Create an extractor around a loaded model bundle.
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self::with_classifier(bundle)
    }

    /// Create an extractor around any span classifier.
    pub fn with_classifier(classifier: Arc<dyn SpanClassifier>) -> Self {
        Self {
            classifier,
            extractor: SpanExtractor::default(),
            labeler: WeakLabeler::default(),
            reconstructor: Reconstructor::default(),
        }
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.labeler = WeakLabeler::new(options.toc_strictness);
        self.extractor = SpanExtractor::new(options);
        self
    }

    /// Set reconstruction options.
    pub fn with_reconstruct_options(mut self, options: ReconstructOptions) -> Self {
        self.reconstructor = Reconstructor::new(options);
        self
    }

    /// Infer the outline of a document given as lines.
    pub fn extract_lines(&self, lines: &[Line]) -> Result<OutlineDocument> {
        let mut spans = self.labeler.annotate(lines);
        let predictions = self.classifier.classify(&spans)?;
        if predictions.len() != spans.len() {
            return Err(Error::Other(format!(
                "classifier returned {} predictions for {} spans",
                predictions.len(),
                spans.len()
            )));
        }

        let stats = FontStatistics::from_spans(&spans);
        let gate = !self.classifier.predicts_body();
        for (span, prediction) in spans.iter_mut().zip(&predictions) {
            span.label = if self.accepts(span, prediction, &stats, gate) {
                prediction.label
            } else {
                Label::Body
            };
        }

        let doc = self.reconstructor.reconstruct(&spans);
        log::debug!(
            "{} spans → {} headings, title {:?}",
            spans.len(),
            doc.len(),
            doc.title
        );
        Ok(doc)
    }

    /// Keep a prediction only when it is confident enough and, for a model
    /// that cannot predict `body`, the span looks like a heading at all.
    fn accepts(
        &self,
        span: &AnnotatedSpan,
        prediction: &Prediction,
        stats: &FontStatistics,
        gate: bool,
    ) -> bool {
        if prediction.confidence < self.reconstructor.options().min_confidence {
            return false;
        }
        !gate || is_heading_like(span, stats)
    }

    /// Infer the outline of parsed pages.
    pub fn extract_pages(&self, pages: &[RawPage]) -> Result<OutlineDocument> {
        self.extract_lines(&self.extractor.lines(pages))
    }

    /// Infer the outline of a PDF file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<OutlineDocument> {
        let pages = self.extractor.read_file(path)?;
        self.extract_pages(&pages)
    }

    /// Infer the outline of an in-memory PDF.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<OutlineDocument> {
        let backend = LopdfBackend::load_bytes(data)?;
        let pages = self.extractor.read_pages(&backend)?;
        self.extract_pages(&pages)
    }

    /// Infer one file's outline and write it to `<output_dir>/<stem>.json`.
    ///
    /// Nothing is written when inference fails.
    pub fn extract_to_dir(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let doc = self.extract_file(input)?;
        let output = render::output_path(input, output_dir);
        render::write_outline(&doc, &output)?;
        log::info!(
            "{} → {} ({} headings)",
            input.display(),
            output.display(),
            doc.len()
        );
        Ok(output)
    }

    /// Process many files in parallel, writing one JSON file per input.
    pub fn extract_batch<P>(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        progress: P,
    ) -> Result<BatchReport<PathBuf>>
    where
        P: Fn(&Path) + Sync,
    {
        fs::create_dir_all(output_dir)?;
        Ok(run_batch(
            inputs,
            |path| self.extract_to_dir(path, output_dir),
            progress,
        ))
    }
}

/// Bold, numbered or larger than body text, on a line short enough to be a
/// heading.
pub fn is_heading_like(span: &AnnotatedSpan, stats: &FontStatistics) -> bool {
    let styled = span.run.bold
        || filters::span_numbering_depth(span).is_some()
        || stats.is_larger_than_body(span.font_size());
    styled && span.line_word_count() < MAX_HEADING_WORDS
}

/// Text blocks of one PDF file for retrieval indexing.
pub fn document_blocks(extractor: &SpanExtractor, path: &Path) -> Result<DocumentBlocks> {
    let pages = extractor.read_file(path)?;
    let document = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DocumentBlocks {
        document,
        blocks: extractor.text_blocks(&pages),
    })
}

/// Text blocks of many files, in parallel.
pub fn blocks_batch<P>(
    extractor: &SpanExtractor,
    inputs: &[PathBuf],
    progress: P,
) -> BatchReport<DocumentBlocks>
where
    P: Fn(&Path) + Sync,
{
    run_batch(inputs, |path| document_blocks(extractor, path), progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, TextRun};

    /// Predicts whatever the weak labeler would have assigned.
    struct WeakOracle {
        with_body: bool,
    }

    impl SpanClassifier for WeakOracle {
        fn classify(&self, spans: &[AnnotatedSpan]) -> Result<Vec<Prediction>> {
            let mut labeled = spans.to_vec();
            WeakLabeler::default().label(&mut labeled);
            Ok(labeled
                .iter()
                .map(|s| Prediction {
                    label: s.label,
                    confidence: 1.0,
                })
                .collect())
        }

        fn predicts_body(&self) -> bool {
            self.with_body
        }
    }

    /// Predicts H1 for every span.
    struct AlwaysHeading;

    impl SpanClassifier for AlwaysHeading {
        fn classify(&self, spans: &[AnnotatedSpan]) -> Result<Vec<Prediction>> {
            Ok(spans
                .iter()
                .map(|_| Prediction {
                    label: Label::H1,
                    confidence: 0.6,
                })
                .collect())
        }

        fn predicts_body(&self) -> bool {
            false
        }
    }

    fn line(text: &str, font: &str, size: f32, x0: f32, y0: f32) -> Line {
        Line::new(vec![TextRun::new(text, font, size)
            .with_bbox(x0, y0, x0 + 150.0, y0 + size)
            .on_page(0, 600.0, 800.0)])
    }

    fn body_line(y0: f32) -> Line {
        line(
            "A plain paragraph that describes the quarter in some detail",
            "Helvetica",
            12.0,
            72.0,
            y0,
        )
    }

    #[test]
    fn test_identity_oracle_quarterly_report() {
        let lines = vec![
            line("Quarterly Report", "Helvetica-Bold", 24.0, 220.0, 100.0),
            line("1 Introduction", "Helvetica-Bold", 14.0, 72.0, 160.0),
            body_line(190.0),
        ];
        let extractor = OutlineExtractor::with_classifier(Arc::new(WeakOracle { with_body: true }));
        let doc = extractor.extract_lines(&lines).unwrap();
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"title":"Quarterly Report","outline":[{"level":"H1","text":"1 Introduction","page":1}]}"#
        );
    }

    #[test]
    fn test_numeral_in_own_run_keeps_heading() {
        let numbered = Line::new(vec![
            TextRun::new("2.1", "Arial-Bold", 14.0)
                .with_bbox(72.0, 100.0, 92.0, 114.0)
                .on_page(0, 600.0, 800.0),
            TextRun::new("Method", "Arial", 14.0)
                .with_bbox(96.0, 100.0, 150.0, 114.0)
                .on_page(0, 600.0, 800.0),
        ]);
        let lines = vec![numbered, body_line(130.0), body_line(150.0)];
        let extractor =
            OutlineExtractor::with_classifier(Arc::new(WeakOracle { with_body: false }));
        let doc = extractor.extract_lines(&lines).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.outline[0].level, Label::H2);
        assert_eq!(doc.outline[0].text, "2.1 Method");
    }

    #[test]
    fn test_gate_rejects_plain_body_spans() {
        let lines = vec![
            line("Chapter Summary", "Helvetica-Bold", 12.0, 72.0, 100.0),
            body_line(130.0),
            body_line(150.0),
        ];
        let extractor = OutlineExtractor::with_classifier(Arc::new(AlwaysHeading));
        let doc = extractor.extract_lines(&lines).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.outline[0].text, "Chapter Summary");
    }

    #[test]
    fn test_min_confidence() {
        let lines = vec![line("Chapter Summary", "Helvetica-Bold", 12.0, 72.0, 100.0)];
        let extractor = OutlineExtractor::with_classifier(Arc::new(AlwaysHeading))
            .with_reconstruct_options(ReconstructOptions::new().with_min_confidence(0.7));
        assert!(extractor.extract_lines(&lines).unwrap().is_empty());
    }

    #[test]
    fn test_footer_never_in_outline() {
        let lines = vec![
            line("Results Overview", "Helvetica-Bold", 16.0, 72.0, 100.0),
            body_line(130.0),
            line("Confidential Draft", "Helvetica-Bold", 16.0, 72.0, 760.0),
        ];
        let extractor = OutlineExtractor::with_classifier(Arc::new(AlwaysHeading));
        let doc = extractor.extract_lines(&lines).unwrap();
        assert!(doc.outline.iter().all(|e| e.text != "Confidential Draft"));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_heading_like() {
        let span = AnnotatedSpan {
            run: TextRun::new("2.4 Limits", "Arial", 11.0),
            alignment: Alignment::Left,
            line_text: "2.4 Limits".to_string(),
            starts_line: true,
            label: Label::Body,
        };
        let mut stats = FontStatistics::default();
        stats.add_size(11.0, 100);
        stats.analyze();
        assert!(is_heading_like(&span, &stats));

        let plain = AnnotatedSpan {
            run: TextRun::new("Limits", "Arial", 11.0),
            line_text: "Limits".to_string(),
            ..span
        };
        assert!(!is_heading_like(&plain, &stats));
    }

    #[test]
    fn test_collect_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let pdfs = collect_pdfs(dir.path()).unwrap();
        let names: Vec<_> = pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_batch_continues_past_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pdf");
        fs::write(&bad, b"not a pdf").unwrap();
        let missing = dir.path().join("missing.pdf");
        let out = dir.path().join("out");

        let extractor = OutlineExtractor::with_classifier(Arc::new(AlwaysHeading));
        let report = extractor
            .extract_batch(&[bad, missing], &out, |_| {})
            .unwrap();
        assert_eq!(report.failed.len(), 2);
        assert!(!report.is_success());
        assert!(!out.join("bad.json").exists());
    }
}
