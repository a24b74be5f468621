//! Extraction options and configuration.

use crate::filters::TocStrictness;

/// Options for reading text runs out of PDF documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Error handling mode for per-page failures
    pub error_mode: ErrorMode,

    /// How aggressively lines are treated as table-of-contents noise
    pub toc_strictness: TocStrictness,

    /// Minimum trimmed length for a layout block to count as a text block
    pub min_block_chars: usize,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Fail on the first page that cannot be read.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Skip unreadable pages and continue.
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set TOC detection strictness.
    pub fn with_toc_strictness(mut self, strictness: TocStrictness) -> Self {
        self.toc_strictness = strictness;
        self
    }

    /// Set the minimum text block length.
    pub fn with_min_block_chars(mut self, chars: usize) -> Self {
        self.min_block_chars = chars;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            toc_strictness: TocStrictness::Standard,
            min_block_chars: 30,
        }
    }
}

/// Error handling mode during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip invalid content and continue
    Lenient,
}
