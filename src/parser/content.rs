//! Content stream interpretation.
//!
//! Walks the text operators of a page and emits positioned text fragments in
//! PDF user space (origin bottom-left, y up).

use std::collections::HashMap;

use super::backend::{ContentOp, PageId, PdfBackend, PdfValue};

/// Fallback average glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// TJ adjustment (thousandths of an em) treated as a word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A fragment of text shown by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedText {
    pub text: String,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Effective size after text and graphics scaling
    pub font_size: f32,
    /// Left edge of the text origin
    pub x: f32,
    /// Baseline y
    pub y: f32,
    /// Estimated advance width
    pub width: f32,
}

/// Affine transform `[a b c d e f]` using the PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_op(op: &ContentOp) -> Self {
        Self::new(
            op.number(0, 1.0),
            op.number(1, 0.0),
            op.number(2, 0.0),
            op.number(3, 1.0),
            op.number(4, 0.0),
            op.number(5, 0.0),
        )
    }

    /// `self × other`: apply `self` first, then `other`.
    pub(crate) fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn origin(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text state carried across operators within a content stream.
struct TextState {
    font_resource: Vec<u8>,
    font_name: String,
    font_size: f32,
    leading: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    in_text: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_resource: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
            leading: 0.0,
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            in_text: false,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = if self.leading != 0.0 {
            self.leading
        } else {
            self.font_size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translation(tx, 0.0).then(&self.text_matrix);
    }
}

/// Interpret the text operators of one page.
pub struct ContentInterpreter<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    fonts: HashMap<Vec<u8>, String>,
}

impl<'a> ContentInterpreter<'a> {
    /// Create an interpreter for one page.
    pub fn new(backend: &'a dyn PdfBackend, page: PageId, fonts: HashMap<Vec<u8>, String>) -> Self {
        Self {
            backend,
            page,
            fonts,
        }
    }

    /// Run the operations and collect every non-blank text fragment.
    pub fn run(&self, operations: &[ContentOp]) -> Vec<PositionedText> {
        let mut fragments = Vec::new();
        let mut state = TextState::default();
        let mut ctm = Matrix::IDENTITY;
        let mut ctm_stack: Vec<Matrix> = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(saved) = ctm_stack.pop() {
                        ctm = saved;
                    }
                }
                "cm" => ctm = Matrix::from_op(op).then(&ctm),
                "BT" => {
                    state.in_text = true;
                    state.text_matrix = Matrix::IDENTITY;
                    state.line_matrix = Matrix::IDENTITY;
                }
                "ET" => state.in_text = false,
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        state.font_name = self
                            .fonts
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| String::from_utf8_lossy(name).to_string());
                        state.font_resource = name.clone();
                    }
                    state.font_size = op.number(1, state.font_size);
                }
                "TL" => state.leading = op.number(0, 0.0),
                "Td" => state.move_line(op.number(0, 0.0), op.number(1, 0.0)),
                "TD" => {
                    let ty = op.number(1, 0.0);
                    state.leading = -ty;
                    state.move_line(op.number(0, 0.0), ty);
                }
                "Tm" => {
                    state.line_matrix = Matrix::from_op(op);
                    state.text_matrix = state.line_matrix;
                }
                "T*" => state.next_line(),
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        let text = self.decode(&state, bytes);
                        self.show(&mut state, &ctm, text, &mut fragments);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        let text = self.decode_array(&state, items);
                        self.show(&mut state, &ctm, text, &mut fragments);
                    }
                }
                "'" => {
                    state.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        let text = self.decode(&state, bytes);
                        self.show(&mut state, &ctm, text, &mut fragments);
                    }
                }
                "\"" => {
                    state.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                        let text = self.decode(&state, bytes);
                        self.show(&mut state, &ctm, text, &mut fragments);
                    }
                }
                _ => {}
            }
        }

        fragments
    }

    fn decode(&self, state: &TextState, bytes: &[u8]) -> String {
        self.backend
            .decode_text(self.page, &state.font_resource, bytes)
    }

    /// Decode a TJ array, turning large negative adjustments into spaces.
    fn decode_array(&self, state: &TextState, items: &[PdfValue]) -> String {
        let mut combined = String::new();
        for item in items {
            match item {
                PdfValue::Str(bytes) => combined.push_str(&self.decode(state, bytes)),
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = -item.as_number().unwrap_or(0.0);
                    if adjustment > TJ_SPACE_THRESHOLD && !combined.ends_with(' ') {
                        if let Some(last) = combined.chars().last() {
                            if !is_spaceless_script_char(last) {
                                combined.push(' ');
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        combined
    }

    fn show(
        &self,
        state: &mut TextState,
        ctm: &Matrix,
        text: String,
        fragments: &mut Vec<PositionedText>,
    ) {
        let advance = text.chars().count() as f32 * state.font_size * AVG_GLYPH_WIDTH;

        if state.in_text && !text.trim().is_empty() {
            let render = state.text_matrix.then(ctm);
            let (x, y) = render.origin();
            fragments.push(PositionedText {
                text,
                font_name: state.font_name.clone(),
                font_size: state.font_size * render.vertical_scale(),
                x,
                y,
                width: advance * render.horizontal_scale(),
            });
        }

        state.advance(advance);
    }
}

/// Check if a character is from a script that doesn't use word spaces.
///
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
