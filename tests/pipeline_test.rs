//! End-to-end tests: synthetic PDFs → corpus → model → outlines.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pdfoutline::pipeline::collect_pdfs;
use pdfoutline::{
    build_corpus, corpus, extract_outline, BodyPolicy, CorpusBuilder, ExtractOptions,
    ForestParams, Label, ModelBundle, OutlineDocument, OutlineEntry, OutlineExtractor, ParamGrid,
    ReconstructOptions, TrainOptions, Trainer,
};

const SECTIONS: (&str, &str, &str) = ("1 Introduction", "1.1 Background", "2 Results");

fn write_training_set(dir: &Path) {
    for quarter in 1..=4 {
        common::write_report(
            &dir.join(format!("report-q{}.pdf", quarter)),
            &format!("Quarterly Report Q{}", quarter),
            SECTIONS.0,
            SECTIONS.1,
            SECTIONS.2,
        );
    }
}

fn quick_options() -> TrainOptions {
    TrainOptions::new()
        .with_test_size(0.25)
        .with_folds(2)
        .with_seed(7)
        .with_params(ForestParams {
            n_estimators: 25,
            max_depth: None,
            min_samples_split: 2,
        })
}

fn expected_outline(title: &str) -> OutlineDocument {
    OutlineDocument {
        title: title.to_string(),
        outline: vec![
            OutlineEntry::new(Label::H1, SECTIONS.0, 1).unwrap(),
            OutlineEntry::new(Label::H2, SECTIONS.1, 1).unwrap(),
            OutlineEntry::new(Label::H1, SECTIONS.2, 2).unwrap(),
        ],
    }
}

#[test]
fn test_corpus_from_synthetic_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    common::write_report(&path, "Quarterly Report Q1", SECTIONS.0, SECTIONS.1, SECTIONS.2);

    let rows = CorpusBuilder::default().label_file(&path).unwrap();

    let headings: Vec<(&str, Label)> = rows
        .iter()
        .filter(|r| r.label != Label::Body)
        .map(|r| (r.text.as_str(), r.label))
        .collect();
    assert_eq!(
        headings,
        vec![
            ("Quarterly Report Q1", Label::Title),
            ("1 Introduction", Label::H1),
            ("1.1 Background", Label::H2),
            ("2 Results", Label::H1),
        ]
    );

    // Footers never reach the corpus
    assert!(rows.iter().all(|r| !r.text.starts_with("Page ")));
    assert_eq!(rows.iter().filter(|r| r.label == Label::Body).count(), 20);

    let title = &rows[0];
    assert_eq!(title.font, "Helvetica-Bold");
    assert_eq!(title.bold, 1);
    assert_eq!(title.size, 24.0);
    assert_eq!(title.page, 0);
}

#[test]
fn test_headings_only_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    common::write_report(&path, "Quarterly Report Q1", SECTIONS.0, SECTIONS.1, SECTIONS.2);

    let rows = CorpusBuilder::new(ExtractOptions::default())
        .with_body_rows(false)
        .label_file(&path)
        .unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_corpus_csv_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    assert_eq!(rows.len(), 4 * 24);

    let csv = dir.path().join("corpus.csv");
    corpus::save(&csv, &rows).unwrap();
    assert_eq!(corpus::load(&csv).unwrap(), rows);
}

#[test]
fn test_train_and_extract_excluding_body() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    let (bundle, report) = Trainer::new(quick_options()).train(&rows).unwrap();
    assert_eq!(report.used_rows, 16);
    assert_eq!(bundle.labels.classes(), &[Label::Title, Label::H1, Label::H2]);

    let model_path = dir.path().join("model.json");
    bundle.save(&model_path).unwrap();

    let unseen = dir.path().join("unseen").join("q5.pdf");
    fs::create_dir_all(unseen.parent().unwrap()).unwrap();
    common::write_report(&unseen, "Quarterly Report Q5", SECTIONS.0, SECTIONS.1, SECTIONS.2);

    let outline = extract_outline(&model_path, &unseen).unwrap();
    assert_eq!(outline, expected_outline("Quarterly Report Q5"));
}

#[test]
fn test_train_and_extract_retaining_body() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    let options = quick_options().with_body_policy(BodyPolicy::RetainBody);
    let (bundle, report) = Trainer::new(options).train(&rows).unwrap();
    assert_eq!(report.used_rows, rows.len());
    assert_eq!(bundle.body_policy, BodyPolicy::RetainBody);

    let extractor = OutlineExtractor::new(Arc::new(bundle));
    let data = common::report_pdf("Quarterly Report Q5", SECTIONS.0, SECTIONS.1, SECTIONS.2);
    let outline = extractor.extract_bytes(&data).unwrap();
    assert_eq!(outline, expected_outline("Quarterly Report Q5"));
}

#[test]
fn test_extract_batch_writes_json_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join("training");
    fs::create_dir_all(&training).unwrap();
    write_training_set(&training);

    let rows = build_corpus(&training).unwrap();
    let (bundle, _) = Trainer::new(quick_options()).train(&rows).unwrap();

    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    common::write_report(
        &input.join("good.pdf"),
        "Quarterly Report Q6",
        SECTIONS.0,
        SECTIONS.1,
        SECTIONS.2,
    );
    fs::write(input.join("bad.pdf"), b"not a pdf at all").unwrap();
    fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let inputs = collect_pdfs(&input).unwrap();
    assert_eq!(inputs.len(), 2);

    let output = dir.path().join("output");
    let extractor = OutlineExtractor::new(Arc::new(bundle));
    let report = extractor.extract_batch(&inputs, &output, |_| {}).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("bad.pdf"));
    assert!(!output.join("bad.json").exists());

    let written: OutlineDocument =
        serde_json::from_str(&fs::read_to_string(output.join("good.json")).unwrap()).unwrap();
    assert_eq!(written, expected_outline("Quarterly Report Q6"));
}

#[test]
fn test_min_confidence_can_drop_everything() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    let (bundle, _) = Trainer::new(quick_options()).train(&rows).unwrap();

    // No vote share can exceed 1.0, so only unanimous predictions survive.
    let strict = OutlineExtractor::new(Arc::new(bundle.clone()))
        .with_reconstruct_options(ReconstructOptions::new().with_min_confidence(1.0));
    let data = common::report_pdf("Quarterly Report Q5", SECTIONS.0, SECTIONS.1, SECTIONS.2);
    let outline = strict.extract_bytes(&data).unwrap();
    assert!(outline.len() <= 3);

    let lenient = OutlineExtractor::new(Arc::new(bundle));
    assert_eq!(lenient.extract_bytes(&data).unwrap().len(), 3);
}

#[test]
fn test_untitled_document_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    let (bundle, _) = Trainer::new(quick_options()).train(&rows).unwrap();

    // Only body text: nothing is heading-like, so the gate drops every span.
    let mut lines = common::body(10, 700);
    lines.insert(0, common::line("Memo to all staff members", false, 12, 72, 715));
    let data = common::build_pdf(vec![lines]);

    let plain = OutlineExtractor::new(Arc::new(bundle.clone()));
    let outline = plain.extract_bytes(&data).unwrap();
    assert_eq!(outline, OutlineDocument::default());

    let fallback = OutlineExtractor::new(Arc::new(bundle))
        .with_reconstruct_options(ReconstructOptions::new().with_fallback_title(true));
    let outline = fallback.extract_bytes(&data).unwrap();
    assert_eq!(outline.title, "Memo to all staff members");
    assert!(outline.outline.is_empty());
}

#[test]
fn test_grid_search_path() {
    let dir = tempfile::tempdir().unwrap();
    write_training_set(dir.path());

    let rows = build_corpus(dir.path()).unwrap();
    let grid = ParamGrid {
        n_estimators: vec![5, 10],
        max_depth: vec![None, Some(3)],
        min_samples_split: vec![2],
    };
    let options = TrainOptions::new()
        .with_test_size(0.25)
        .with_folds(2)
        .with_grid(grid.clone());
    let (bundle, report) = Trainer::new(options).train(&rows).unwrap();

    assert!(grid.candidates().contains(&report.best_params));
    assert_eq!(bundle.params, report.best_params);
    assert!(report.cv_weighted_f1 > 0.0);
    ModelBundle::from_slice(&serde_json::to_vec(&bundle).unwrap()).unwrap();
}
