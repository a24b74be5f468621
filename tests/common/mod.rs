//! Synthetic PDFs for integration tests.

#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// One line of text placed on a page.
pub struct TextLine {
    pub text: String,
    pub bold: bool,
    pub size: i64,
    pub x: i64,
    pub y: i64,
}

pub fn line(text: &str, bold: bool, size: i64, x: i64, y: i64) -> TextLine {
    TextLine {
        text: text.to_string(),
        bold,
        size,
        x,
        y,
    }
}

/// Body paragraph lines starting at `y`, 15pt apart.
pub fn body(lines: usize, y: i64) -> Vec<TextLine> {
    (0..lines)
        .map(|i| {
            line(
                "Revenue grew steadily across every region in this period.",
                false,
                12,
                72,
                y - 15 * i as i64,
            )
        })
        .collect()
}

/// Build a Letter-size PDF with Helvetica (F1) and Helvetica-Bold (F2).
pub fn build_pdf(pages: Vec<Vec<TextLine>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let kids: Vec<Object> = pages
        .into_iter()
        .map(|lines| add_page(&mut doc, pages_id, resources, lines).into())
        .collect();
    let count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn add_page(
    doc: &mut Document,
    parent: ObjectId,
    resources: ObjectId,
    lines: Vec<TextLine>,
) -> ObjectId {
    let mut operations = Vec::new();
    for l in lines {
        let font = if l.bold { "F2" } else { "F1" };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(l.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(l.x), Object::Integer(l.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(l.text.as_str())],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations };
    let stream = Stream::new(dictionary! {}, content.encode().unwrap());
    let content_id = doc.add_object(stream);
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
        "Resources" => resources,
    })
}

/// A two-page report: centered bold title, numbered sections, body text and
/// a footer on each page.
pub fn report_pdf(title: &str, first: &str, second: &str, third: &str) -> Vec<u8> {
    let mut page1 = vec![
        line(title, true, 24, 220, 700),
        line(first, true, 16, 72, 640),
    ];
    page1.extend(body(6, 615));
    page1.push(line(second, true, 14, 72, 510));
    page1.extend(body(6, 485));
    page1.push(line("Page 1", false, 10, 300, 30));

    let mut page2 = vec![line(third, true, 16, 72, 700)];
    page2.extend(body(8, 675));
    page2.push(line("Page 2", false, 10, 300, 30));

    build_pdf(vec![page1, page2])
}

pub fn write_report(path: &Path, title: &str, first: &str, second: &str, third: &str) {
    std::fs::write(path, report_pdf(title, first, second, third)).unwrap();
}
