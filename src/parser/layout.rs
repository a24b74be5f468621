//! Layout grouping.
//!
//! Turns positioned fragments of one page into the block → line → run
//! hierarchy, in top-down page coordinates and natural reading order.

use std::cmp::Ordering;

use super::backend::PageBox;
use super::content::{is_spaceless_script_char, PositionedText};
use super::raw::{RawBlock, RawLine, RawPage, RawRun};

/// Ascender height as a fraction of the font size.
const ASCENT: f32 = 0.8;
/// Descender depth as a fraction of the font size.
const DESCENT: f32 = 0.2;

/// Characters that already separate words.
const WORD_BREAKS: &[char] = &[' ', '\u{00A0}'];

/// A fragment placed in top-down page space.
#[derive(Debug, Clone)]
struct Placed {
    text: String,
    font_name: String,
    font_size: f32,
    x0: f32,
    x1: f32,
    baseline: f32,
}

impl Placed {
    fn from_fragment(fragment: PositionedText, page: &PageBox) -> Self {
        let x0 = fragment.x - page.x0;
        Self {
            x0,
            x1: x0 + fragment.width,
            baseline: page.height - (fragment.y - page.y0),
            text: fragment.text,
            font_name: fragment.font_name,
            font_size: fragment.font_size,
        }
    }

    fn avg_char_width(&self) -> f32 {
        let chars = self.text.chars().count();
        if chars > 0 && self.x1 > self.x0 {
            (self.x1 - self.x0) / chars as f32
        } else {
            self.font_size * 0.5
        }
    }

    fn same_style(&self, other: &Placed) -> bool {
        self.font_name == other.font_name && (self.font_size - other.font_size).abs() < 0.05
    }

    fn into_run(self) -> RawRun {
        RawRun::new(
            self.text,
            self.font_name,
            self.font_size,
            [
                self.x0,
                self.baseline - self.font_size * ASCENT,
                self.x1,
                self.baseline + self.font_size * DESCENT,
            ],
        )
    }
}

/// Build a page from the fragments shown on it.
pub fn build_page(index: usize, page_box: &PageBox, fragments: Vec<PositionedText>) -> RawPage {
    let mut page = RawPage::new(index, page_box.width, page_box.height);
    let placed: Vec<Placed> = fragments
        .into_iter()
        .map(|f| Placed::from_fragment(f, page_box))
        .collect();

    let lines = group_into_lines(placed);
    page.blocks = group_lines_into_blocks(lines);
    page
}

/// Group fragments by baseline, then merge same-style neighbours into runs.
fn group_into_lines(mut placed: Vec<Placed>) -> Vec<RawLine> {
    if placed.is_empty() {
        return Vec::new();
    }

    placed.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<Placed> = Vec::new();
    let mut current_baseline: Option<f32> = None;

    for fragment in placed {
        // Allow 30% of font size variance
        let tolerance = fragment.font_size * 0.3;
        match current_baseline {
            Some(y) if (fragment.baseline - y).abs() <= tolerance => current.push(fragment),
            _ => {
                if !current.is_empty() {
                    lines.push(merge_line(std::mem::take(&mut current)));
                }
                current_baseline = Some(fragment.baseline);
                current.push(fragment);
            }
        }
    }

    if !current.is_empty() {
        lines.push(merge_line(current));
    }

    lines
}

/// Merge adjacent fragments of a line that share font name and size.
fn merge_line(mut fragments: Vec<Placed>) -> RawLine {
    fragments.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

    let mut runs: Vec<Placed> = Vec::new();
    for fragment in fragments {
        match runs.last_mut() {
            Some(prev) if prev.same_style(&fragment) => {
                if needs_space(prev, &fragment) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&fragment.text);
                prev.x1 = prev.x1.max(fragment.x1);
            }
            _ => runs.push(fragment),
        }
    }

    RawLine {
        runs: runs.into_iter().map(Placed::into_run).collect(),
    }
}

/// Whether a space belongs between two horizontally adjacent fragments.
fn needs_space(prev: &Placed, next: &Placed) -> bool {
    let gap = next.x0 - prev.x1;
    // More than 20% of an average character width
    if gap <= next.avg_char_width() * 0.2 {
        return false;
    }
    if prev.text.ends_with(WORD_BREAKS) || next.text.starts_with(WORD_BREAKS) {
        return false;
    }
    let prev_cjk = prev
        .text
        .chars()
        .last()
        .is_some_and(is_spaceless_script_char);
    let next_cjk = next
        .text
        .chars()
        .next()
        .is_some_and(is_spaceless_script_char);
    !(prev_cjk && next_cjk)
}

/// Group lines into blocks based on spacing, size, and indentation changes.
fn group_lines_into_blocks(lines: Vec<RawLine>) -> Vec<RawBlock> {
    if lines.is_empty() {
        return Vec::new();
    }

    let avg_spacing = average_line_spacing(&lines);
    let mut blocks = Vec::new();
    let mut current: Vec<RawLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(RawBlock {
                    lines: std::mem::take(&mut current),
                });
            }
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(RawBlock { lines: current });
    }

    blocks
}

fn average_line_spacing(lines: &[RawLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[1].y1() - w[0].y1()).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(prev: &RawLine, curr: &RawLine, avg_spacing: f32) -> bool {
    // Large spacing indicates a new paragraph
    if (curr.y1() - prev.y1()).abs() > avg_spacing * 1.5 {
        return true;
    }

    if (prev.font_size() - curr.font_size()).abs() > 1.0 {
        return true;
    }

    // Indentation change
    (prev.x0() - curr.x0()).abs() > 20.0
}
