//! Data model shared by the extraction, labeling, training and
//! reconstruction stages.
//!
//! Runs and lines come out of the parser; annotated spans carry a label
//! through labeling or prediction; outline types are the output artifact.

mod label;
mod outline;
mod span;

pub use label::Label;
pub use outline::{OutlineDocument, OutlineEntry, TextBlock};
pub use span::{round_size, style_from_font_name, Alignment, AnnotatedSpan, Line, TextRun};
