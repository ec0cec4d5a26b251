use std::error::Error;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// One table row as `(x, text)` pairs, each placed on its own.
pub type PositionedRow<'a> = Vec<(i64, &'a str)>;

fn assemble_pdf(base_font: &str, pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Builds a text-only PDF in memory, one page per entry, one text line per
/// string. Lines flow with `T*` in a single text object and cells are
/// separated with two spaces.
pub fn build_invoice_pdf(pages: &[Vec<&str>]) -> Result<Vec<u8>, Box<dyn Error>> {
    let contents = pages
        .iter()
        .map(|lines| {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 11.into()]),
                Operation::new("TL", vec![14.into()]),
                Operation::new("Td", vec![40.into(), 790.into()]),
            ];
            for (index, line) in lines.iter().enumerate() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                if index + 1 < lines.len() {
                    operations.push(Operation::new("T*", vec![]));
                }
            }
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect();
    assemble_pdf("Courier", contents)
}

fn place_text(operations: &mut Vec<Operation>, x: i64, y: i64, text: &str) {
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]);
}

/// Builds a PDF that places every cell with its own `BT`/`Td`/`Tj`/`ET`
/// block in a proportional font, the way invoice generators lay out tables.
/// Each page gets a title above the rows and a footer below them.
pub fn build_positioned_pdf(pages: &[Vec<PositionedRow>]) -> Result<Vec<u8>, Box<dyn Error>> {
    let contents = pages
        .iter()
        .map(|rows| {
            let mut operations = Vec::new();
            place_text(&mut operations, 40, 800, "INVOICE");

            let mut y = 740;
            for row in rows {
                for (x, text) in row {
                    place_text(&mut operations, *x, y, text);
                }
                y -= 20;
            }
            place_text(&mut operations, 40, y - 20, "Thank you for your business.");
            operations
        })
        .collect();
    assemble_pdf("Helvetica", contents)
}

/// Two-column invoice page: a title, the line-item table, a footer.
pub fn invoice_page<'a>(rows: &[&'a str]) -> Vec<&'a str> {
    let mut lines = vec!["INVOICE", "Product  Total"];
    lines.extend_from_slice(rows);
    lines.push("Thank you for your business.");
    lines
}
