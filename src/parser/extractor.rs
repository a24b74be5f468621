//! Span extraction: PDF pages → normalized text runs grouped into lines.

use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::{Line, TextBlock, TextRun};

use super::backend::{LopdfBackend, PdfBackend};
use super::content::ContentInterpreter;
use super::layout::build_page;
use super::options::{ErrorMode, ExtractOptions};
use super::raw::{RawPage, RawRun};

/// Reads pages from a PDF backend and normalizes them into [`TextRun`]s.
#[derive(Debug, Clone, Default)]
pub struct SpanExtractor {
    options: ExtractOptions,
}

impl SpanExtractor {
    /// Create an extractor.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Load a PDF file and read all of its pages.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<RawPage>> {
        let backend = LopdfBackend::load_file(path.as_ref())?;
        self.read_pages(&backend)
    }

    /// Read every page of a loaded document in page order.
    pub fn read_pages(&self, backend: &dyn PdfBackend) -> Result<Vec<RawPage>> {
        let pages = backend.pages();
        let mut out = Vec::with_capacity(pages.len());

        for (index, (page_num, page_id)) in pages.into_iter().enumerate() {
            let page_box = backend.page_box(page_id);

            let fragments = backend.page_fonts(page_id).and_then(|fonts| {
                let operations = backend.page_operations(page_id)?;
                Ok(ContentInterpreter::new(backend, page_id, fonts).run(&operations))
            });

            let fragments = match fragments {
                Ok(fragments) => fragments,
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("Failed to read text from page {}: {}", page_num, e);
                    Vec::new()
                }
                Err(e) => {
                    return Err(Error::TextExtract(format!("Page {}: {}", page_num, e)));
                }
            };

            log::debug!("Page {}: {} text fragments", page_num, fragments.len());
            out.push(build_page(index, &page_box, fragments));
        }

        Ok(out)
    }

    /// Normalize parsed pages into lines of runs, in reading order.
    ///
    /// Run text is NFKC-normalized and trimmed; blank runs are dropped, and a
    /// line left without runs is dropped with them.
    pub fn lines(&self, pages: &[RawPage]) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut ordered: Vec<&RawPage> = pages.iter().collect();
        ordered.sort_by_key(|p| p.index);

        for page in ordered {
            for raw_line in page.lines() {
                let line_index = lines.len();
                let runs: Vec<TextRun> = raw_line
                    .runs
                    .iter()
                    .filter_map(|raw| normalize_run(raw, page, line_index))
                    .collect();
                if !runs.is_empty() {
                    lines.push(Line::new(runs));
                }
            }
        }

        lines
    }

    /// Layout blocks whose text is longer than `min_block_chars`.
    pub fn text_blocks(&self, pages: &[RawPage]) -> Vec<TextBlock> {
        pages
            .iter()
            .flat_map(|page| {
                page.blocks.iter().filter_map(move |block| {
                    let text = normalize_text(&block.text());
                    (text.chars().count() > self.options.min_block_chars).then(|| TextBlock {
                        page: page.index as u32 + 1,
                        text,
                    })
                })
            })
            .collect()
    }
}

fn normalize_text(text: &str) -> String {
    text.nfkc().collect::<String>().trim().to_string()
}

fn normalize_run(raw: &RawRun, page: &RawPage, line_index: usize) -> Option<TextRun> {
    let text = normalize_text(&raw.text);
    if text.is_empty() {
        return None;
    }
    let [x0, y0, x1, y1] = raw.bbox;
    Some(
        TextRun::new(text, raw.font_name.clone(), raw.font_size)
            .with_bbox(x0, y0, x1, y1)
            .on_page(page.index, page.width, page.height)
            .on_line(line_index),
    )
}
