//! pdfoutline CLI - heading outline inference for PDF batches

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfoutline::pipeline::{self, BatchReport};
use pdfoutline::render::{self, JsonFormat};
use pdfoutline::{
    corpus, BodyPolicy, CorpusBuilder, ExtractOptions, ForestParams, ModelBundle,
    OutlineExtractor, ParamGrid, ReconstructOptions, SpanExtractor, TocStrictness, TrainOptions,
    Trainer,
};

#[derive(Parser)]
#[command(name = "pdfoutline")]
#[command(version)]
#[command(about = "Infer title and H1-H3 outlines from PDF typography", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weak-label every PDF in a directory into a training corpus
    Label {
        /// Directory of PDF files
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Corpus CSV to write
        #[arg(short, long, value_name = "CSV")]
        output: PathBuf,

        /// Drop body rows from the corpus
        #[arg(long)]
        headings_only: bool,

        /// Also treat lines ending in a page number as table of contents
        #[arg(long)]
        strict_toc: bool,
    },

    /// Train a model bundle from a corpus
    Train {
        /// Corpus CSV
        #[arg(value_name = "CSV")]
        input: PathBuf,

        /// Model file to write
        #[arg(short, long, value_name = "MODEL")]
        output: PathBuf,

        /// Share of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Cross-validation folds for the grid search
        #[arg(long, default_value = "3")]
        folds: usize,

        /// Random seed
        #[arg(long, default_value = "42", env = "PDFOUTLINE_SEED")]
        seed: u64,

        /// Train on body rows too, so the model predicts body directly
        #[arg(long)]
        retain_body: bool,

        /// Skip the grid search and fit this many trees
        #[arg(long, value_name = "N")]
        trees: Option<usize>,
    },

    /// Infer outlines for every PDF in a directory
    Extract {
        /// Directory of PDF files
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Model file
        #[arg(short, long, value_name = "MODEL", env = "PDFOUTLINE_MODEL")]
        model: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "OUTPUT_DIR")]
        output: PathBuf,

        /// Minimum vote share for a heading prediction
        #[arg(long, default_value = "0.0")]
        min_confidence: f64,

        /// Use the first line as title when none is predicted
        #[arg(long)]
        fallback_title: bool,

        /// Also treat lines ending in a page number as table of contents
        #[arg(long)]
        strict_toc: bool,
    },

    /// Export text blocks for retrieval indexing
    Blocks {
        /// Directory of PDF files
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// JSON file to write
        #[arg(short, long, value_name = "JSON")]
        output: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Run one subcommand. `Ok(false)` means some inputs failed.
fn run(command: Commands) -> CmdResult {
    match command {
        Commands::Label {
            input,
            output,
            headings_only,
            strict_toc,
        } => cmd_label(&input, &output, headings_only, strict_toc),
        Commands::Train {
            input,
            output,
            test_size,
            folds,
            seed,
            retain_body,
            trees,
        } => {
            let mut options = TrainOptions::new()
                .with_test_size(test_size)
                .with_folds(folds)
                .with_seed(seed);
            if retain_body {
                options = options.with_body_policy(BodyPolicy::RetainBody);
            }
            if let Some(n_estimators) = trees {
                options = options.with_grid(ParamGrid::single(ForestParams {
                    n_estimators,
                    ..ForestParams::default()
                }));
            }
            cmd_train(&input, &output, options)
        }
        Commands::Extract {
            input,
            model,
            output,
            min_confidence,
            fallback_title,
            strict_toc,
        } => {
            let reconstruct = ReconstructOptions::new()
                .with_min_confidence(min_confidence)
                .with_fallback_title(fallback_title);
            cmd_extract(&input, &model, &output, reconstruct, strict_toc)
        }
        Commands::Blocks {
            input,
            output,
            compact,
        } => cmd_blocks(&input, &output, compact),
        Commands::Version => {
            cmd_version();
            Ok(true)
        }
    }
}

type CmdResult = Result<bool, Box<dyn std::error::Error>>;

fn extract_options(strict_toc: bool) -> ExtractOptions {
    let strictness = if strict_toc {
        TocStrictness::Strict
    } else {
        TocStrictness::Standard
    };
    ExtractOptions::new().lenient().with_toc_strictness(strictness)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

fn tick(pb: &ProgressBar, path: &Path) {
    if let Some(name) = path.file_name() {
        pb.set_message(name.to_string_lossy().into_owned());
    }
    pb.inc(1);
}

fn input_pdfs(input: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let inputs = pipeline::collect_pdfs(input)?;
    if inputs.is_empty() {
        println!("{} no PDF files in {}", "Warning:".yellow(), input.display());
    }
    Ok(inputs)
}

fn print_failures<T>(report: &BatchReport<T>) {
    if report.failed.is_empty() {
        return;
    }
    println!("\n{}", "Failed:".red().bold());
    for (path, err) in &report.failed {
        println!("  {} {}: {}", "└─".dimmed(), path.display(), err);
    }
}

fn cmd_label(input: &Path, output: &Path, headings_only: bool, strict_toc: bool) -> CmdResult {
    let inputs = input_pdfs(input)?;
    let builder = CorpusBuilder::new(extract_options(strict_toc)).with_body_rows(!headings_only);

    let pb = progress_bar(inputs.len());
    pb.set_message("Labeling...");
    let report = builder.label_batch(&inputs, |path| tick(&pb, path));
    pb.finish_with_message("Done!");

    let rows: Vec<_> = report
        .succeeded
        .iter()
        .flat_map(|(_, rows)| rows.iter().cloned())
        .collect();
    corpus::save(output, &rows)?;

    println!(
        "{} {} rows from {} files to {}",
        "Saved".green(),
        rows.len(),
        report.succeeded.len(),
        output.display()
    );
    print_failures(&report);
    Ok(true)
}

fn cmd_train(input: &Path, output: &Path, options: TrainOptions) -> CmdResult {
    let rows = corpus::load(input)?;
    println!("{} {} corpus rows", "Loaded".cyan(), rows.len());

    let pb = ProgressBar::new_spinner();
    pb.set_message("Training...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    let trained = Trainer::new(options).train(&rows);
    pb.finish_and_clear();

    let (bundle, report) = trained?;
    bundle.save(output)?;

    println!("{}", "Training Report".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    print!("{}", report);
    println!("\n{} {}", "Saved to".green(), output.display());
    Ok(true)
}

fn cmd_extract(
    input: &Path,
    model: &Path,
    output: &Path,
    reconstruct: ReconstructOptions,
    strict_toc: bool,
) -> CmdResult {
    let bundle = Arc::new(ModelBundle::load(model)?);
    let extractor = OutlineExtractor::new(bundle)
        .with_extract_options(extract_options(strict_toc))
        .with_reconstruct_options(reconstruct);
    let inputs = input_pdfs(input)?;

    let pb = progress_bar(inputs.len());
    pb.set_message("Extracting...");
    let report = extractor.extract_batch(&inputs, output, |path| tick(&pb, path))?;
    pb.finish_with_message("Done!");

    println!("\n{}", "Output files:".green().bold());
    let last = report.succeeded.len().saturating_sub(1);
    for (i, (_, written)) in report.succeeded.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), written.display());
    }
    print_failures(&report);

    if !report.is_success() {
        println!(
            "\n{} {} of {} files failed",
            "Warning:".yellow(),
            report.failed.len(),
            inputs.len()
        );
    }
    Ok(report.is_success())
}

fn cmd_blocks(input: &Path, output: &Path, compact: bool) -> CmdResult {
    let inputs = input_pdfs(input)?;
    let extractor = SpanExtractor::new(extract_options(false));

    let pb = progress_bar(inputs.len());
    pb.set_message("Reading...");
    let report = pipeline::blocks_batch(&extractor, &inputs, |path| tick(&pb, path));
    pb.finish_with_message("Done!");

    let documents: Vec<_> = report.succeeded.iter().map(|(_, doc)| doc).collect();
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&documents, format)?;
    fs::write(output, json)?;

    let blocks: usize = documents.iter().map(|d| d.blocks.len()).sum();
    println!(
        "{} {} blocks from {} files to {}",
        "Saved".green(),
        blocks,
        documents.len(),
        output.display()
    );
    print_failures(&report);
    Ok(true)
}

fn cmd_version() {
    println!("{} {}", "pdfoutline".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF heading outline inference");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "pdfoutline",
            "extract",
            "in",
            "-m",
            "model.json",
            "-o",
            "out",
            "--min-confidence",
            "0.6",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                model,
                min_confidence,
                fallback_title,
                ..
            } => {
                assert_eq!(model, PathBuf::from("model.json"));
                assert_eq!(min_confidence, 0.6);
                assert!(!fallback_title);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_version_succeeds() {
        let cli = Cli::try_parse_from(["pdfoutline", "version"]).unwrap();
        assert!(run(cli.command).unwrap());
    }

    #[test]
    fn test_train_requires_output() {
        assert!(Cli::try_parse_from(["pdfoutline", "train", "corpus.csv"]).is_err());
    }

    #[test]
    fn test_label_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("corpus.csv");
        assert!(cmd_label(dir.path(), &csv, false, false).unwrap());
        let rows = corpus::load(&csv).unwrap();
        assert!(rows.is_empty());
    }
}
