//! PDF parsing module.
//!
//! The backend reads pages and content streams, the interpreter positions
//! shown text, layout groups it into blocks, lines and runs, and the
//! extractor normalizes the result into [`TextRun`](crate::model::TextRun)s.

mod backend;
mod content;
mod extractor;
mod layout;
mod options;
mod raw;

pub use backend::{decode_text_simple, ContentOp, LopdfBackend, PageBox, PageId, PdfBackend, PdfValue};
pub use content::{ContentInterpreter, PositionedText};
pub use extractor::SpanExtractor;
pub use layout::build_page;
pub use options::{ErrorMode, ExtractOptions};
pub use raw::{RawBlock, RawLine, RawPage, RawRun};
