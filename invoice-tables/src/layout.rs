//! Positioned text from page content streams.
//!
//! Invoice generators usually place every cell with its own `BT … Td … Tj …
//! ET` block, so reading text in stream order loses the table. This module
//! follows the text and graphics matrices, records where each shown string
//! starts and ends on the page, and rebuilds lines by baseline and cells by
//! horizontal gaps.

use std::collections::BTreeMap;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::model::{Cell, TextLine};
use crate::table_parse::split_line_into_cells;

/// Average glyph advance, in ems, for fonts without a `Widths` array.
const DEFAULT_GLYPH_EM: f32 = 0.5;
const MONOSPACE_GLYPH_EM: f32 = 0.6;
/// Horizontal gap, in ems, that starts a new cell.
const CELL_GAP_EM: f32 = 1.0;
/// Gap, in ems, above which joined fragments get a separating space.
const WORD_GAP_EM: f32 = 0.15;
/// Fragments whose baselines differ by less than this many ems share a line.
const BASELINE_TOLERANCE_EM: f32 = 0.4;
/// A vertical jump of more than this many ems between lines starts a block.
const BLOCK_GAP_EM: f32 = 2.5;

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f32, ty: f32) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let values: Vec<f32> = operands.iter().filter_map(number).collect();
        let values: [f32; 6] = values.try_into().ok()?;
        Some(Self(values))
    }

    /// `self × other`: apply `self`, then `other`.
    fn then(self, other: Self) -> Self {
        let [a0, a1, a2, a3, a4, a5] = self.0;
        let [b0, b1, b2, b3, b4, b5] = other.0;
        Self([
            a0 * b0 + a1 * b2,
            a0 * b1 + a1 * b3,
            a2 * b0 + a3 * b2,
            a2 * b1 + a3 * b3,
            a4 * b0 + a5 * b2 + b4,
            a4 * b1 + a5 * b3 + b5,
        ])
    }

    fn origin(self) -> (f32, f32) {
        (self.0[4], self.0[5])
    }

    fn vertical_scale(self) -> f32 {
        self.0[2].hypot(self.0[3])
    }
}

fn number(object: &Object) -> Option<f32> {
    object.as_float().ok()
}

/// What the walk needs to know about a font: how to turn shown bytes into
/// text and how far they advance.
#[derive(Debug, Clone)]
struct FontMetrics<'a> {
    encoding: Option<&'a str>,
    two_byte: bool,
    first_char: u32,
    /// Glyph widths in thousandths of an em, starting at `first_char`.
    widths: Vec<f32>,
    fallback_em: f32,
}

impl Default for FontMetrics<'_> {
    fn default() -> Self {
        Self {
            encoding: None,
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            fallback_em: DEFAULT_GLYPH_EM,
        }
    }
}

impl<'a> FontMetrics<'a> {
    fn from_font(document: &'a Document, font: &'a Dictionary) -> Self {
        let name_is = |key: &[u8], wanted: &[u8]| {
            font.get(key)
                .and_then(Object::as_name)
                .is_ok_and(|name| name == wanted)
        };
        let base_font = font
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .unwrap_or_default();
        let monospace = base_font.windows(7).any(|window| window == b"Courier");

        let widths: Vec<f32> = font
            .get(b"Widths")
            .and_then(|object| document.dereference(object))
            .and_then(|(_, object)| object.as_array())
            .map(|array| array.iter().filter_map(number).collect())
            .unwrap_or_default();
        let first_char = font
            .get(b"FirstChar")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0);

        Self {
            encoding: Some(font.get_font_encoding()),
            two_byte: name_is(b"Subtype", b"Type0"),
            first_char,
            widths,
            fallback_em: if monospace {
                MONOSPACE_GLYPH_EM
            } else {
                DEFAULT_GLYPH_EM
            },
        }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
            return UTF_16BE.decode_without_bom_handling(rest).0.into_owned();
        }
        if self.two_byte {
            return UTF_16BE.decode_without_bom_handling(bytes).0.into_owned();
        }
        Document::decode_text(self.encoding, bytes)
    }

    /// Advance of `bytes` in ems.
    #[allow(clippy::cast_precision_loss)]
    fn advance_em(&self, bytes: &[u8]) -> f32 {
        if self.two_byte {
            return (bytes.len() / 2) as f32 * self.fallback_em;
        }
        bytes
            .iter()
            .map(|code| {
                u32::from(*code)
                    .checked_sub(self.first_char)
                    .and_then(|slot| self.widths.get(slot as usize))
                    .filter(|width| **width > 0.0)
                    .map_or(self.fallback_em, |width| width / 1000.0)
            })
            .sum()
    }
}

/// A shown string placed on the page.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    x0: f32,
    x1: f32,
    y: f32,
    size: f32,
    text: String,
}

struct TextWalk<'a> {
    fonts: &'a BTreeMap<Vec<u8>, FontMetrics<'a>>,
    fallback_font: FontMetrics<'a>,
    font: Option<&'a FontMetrics<'a>>,
    ctm: Matrix,
    saved: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_size: f32,
    leading: f32,
    horizontal_scale: f32,
    fragments: Vec<Fragment>,
}

impl<'a> TextWalk<'a> {
    fn new(fonts: &'a BTreeMap<Vec<u8>, FontMetrics<'a>>) -> Self {
        Self {
            fonts,
            fallback_font: FontMetrics::default(),
            font: None,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
            fragments: Vec::new(),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn shift(&mut self, tx: f32) {
        self.tm = Matrix::translation(tx, 0.0).then(self.tm);
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = self.font.unwrap_or(&self.fallback_font);
        let text = font.decode(bytes);
        let advance = font.advance_em(bytes) * self.font_size * self.horizontal_scale;

        let start = self.tm.then(self.ctm);
        self.shift(advance);
        let end = self.tm.then(self.ctm);

        let (x0, y) = start.origin();
        self.fragments.push(Fragment {
            x0,
            x1: end.origin().0,
            y,
            size: self.font_size * start.vertical_scale(),
            text,
        });
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let operand = |index: usize| operands.get(index).and_then(number);
        match operator {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.ctm = matrix.then(self.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                let fonts = self.fonts;
                let name = operands.first().and_then(|object| object.as_name().ok());
                self.font = name.and_then(|name| fonts.get(name));
                self.font_size = operand(1).unwrap_or(self.font_size);
            }
            "TL" => self.leading = operand(0).unwrap_or(self.leading),
            "Tz" => {
                self.horizontal_scale = operand(0).map_or(self.horizontal_scale, |v| v / 100.0);
            }
            "Td" | "TD" => {
                let (tx, ty) = (operand(0).unwrap_or(0.0), operand(1).unwrap_or(0.0));
                if operator == "TD" {
                    self.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(matrix) = Matrix::from_operands(operands) {
                    self.tlm = matrix;
                    self.tm = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                let Some(Object::Array(items)) = operands.first() else {
                    return;
                };
                for item in items {
                    match item {
                        Object::String(bytes, _) => self.show(bytes),
                        other => {
                            if let Some(adjust) = number(other) {
                                self.shift(
                                    -adjust / 1000.0 * self.font_size * self.horizontal_scale,
                                );
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Splits a fragment on its own double spaces, spreading its extent evenly
/// over its characters.
#[allow(clippy::cast_precision_loss)]
fn fragment_cells(fragment: &Fragment) -> Vec<Cell> {
    let char_count = fragment.text.chars().count().max(1) as f32;
    let char_width = (fragment.x1 - fragment.x0) / char_count;
    split_line_into_cells(&fragment.text)
        .into_iter()
        .map(|cell| Cell {
            x0: fragment.x0 + cell.x0 * char_width,
            x1: fragment.x0 + cell.x1 * char_width,
            text: cell.text,
        })
        .collect()
}

fn merge_into_cells(fragments: &[Fragment]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for fragment in fragments {
        let em = fragment.size.max(1.0);
        for (index, piece) in fragment_cells(fragment).into_iter().enumerate() {
            // Pieces of one fragment were split on its own double spaces and
            // stay apart; only its first piece may continue the previous cell.
            let joins = index == 0
                && cells
                    .last()
                    .is_some_and(|last| piece.x0 - last.x1 <= em * CELL_GAP_EM);
            match cells.last_mut() {
                Some(last) if joins => {
                    if piece.x0 - last.x1 > em * WORD_GAP_EM {
                        last.text.push(' ');
                    }
                    last.text.push_str(&piece.text);
                    last.x1 = last.x1.max(piece.x1);
                }
                _ => cells.push(piece),
            }
        }
    }
    cells
}

/// Groups fragments into lines, top of the page first.
fn assemble_lines(mut fragments: Vec<Fragment>) -> Vec<TextLine> {
    fragments.retain(|fragment| !fragment.text.trim().is_empty());
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x0.total_cmp(&b.x0)));

    let mut rows: Vec<Vec<Fragment>> = Vec::new();
    for fragment in fragments {
        let same_line = rows.last().is_some_and(|row| {
            (row[0].y - fragment.y).abs() <= row[0].size.max(1.0) * BASELINE_TOLERANCE_EM
        });
        match rows.last_mut() {
            Some(row) if same_line => row.push(fragment),
            _ => rows.push(vec![fragment]),
        }
    }

    let mut lines = Vec::with_capacity(rows.len());
    let mut previous_y: Option<f32> = None;
    for mut row in rows {
        row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        let y = row[0].y;
        let em = row.iter().map(|fragment| fragment.size).fold(1.0, f32::max);
        lines.push(TextLine {
            cells: merge_into_cells(&row),
            starts_block: previous_y.is_some_and(|above| above - y > em * BLOCK_GAP_EM),
        });
        previous_y = Some(y);
    }
    lines
}

/// Positioned lines of one page. Pages whose content cannot be decoded yield
/// no lines.
pub(crate) fn page_lines(document: &Document, page_id: ObjectId) -> Vec<TextLine> {
    let content = match document
        .get_page_content(page_id)
        .and_then(|data| Content::decode(&data))
    {
        Ok(content) => content,
        Err(error) => {
            debug!(?page_id, %error, "page content could not be decoded");
            return Vec::new();
        }
    };

    let fonts: BTreeMap<Vec<u8>, FontMetrics<'_>> = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, FontMetrics::from_font(document, font)))
        .collect();

    let mut walk = TextWalk::new(&fonts);
    for operation in &content.operations {
        walk.apply(&operation.operator, &operation.operands);
    }
    assemble_lines(walk.fragments)
}

/// Whether decoded text is mostly replacement or control characters, as
/// happens with two-byte fonts that lack a usable encoding.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn looks_garbled(lines: &[TextLine]) -> bool {
    let (mut total, mut bad) = (0_usize, 0_usize);
    for ch in lines
        .iter()
        .flat_map(|line| &line.cells)
        .flat_map(|cell| cell.text.chars())
    {
        total += 1;
        if ch == '\u{FFFD}' || (ch.is_control() && ch != '\t') {
            bad += 1;
        }
    }
    total > 0 && bad as f32 / total as f32 > 0.3
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use lopdf::Object;

    use super::{FontMetrics, Fragment, Matrix, TextWalk, assemble_lines, looks_garbled};
    use crate::model::{Cell, TextLine};

    fn fragment(x0: f32, y: f32, text: &str) -> Fragment {
        #[allow(clippy::cast_precision_loss)]
        let width = text.chars().count() as f32 * 5.0;
        Fragment {
            x0,
            x1: x0 + width,
            y,
            size: 10.0,
            text: text.to_string(),
        }
    }

    fn texts(line: &TextLine) -> Vec<&str> {
        line.cells.iter().map(|cell| cell.text.as_str()).collect()
    }

    #[test]
    fn matrices_compose_in_application_order() {
        let scaled = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let moved = Matrix::translation(10.0, 20.0).then(scaled);
        assert_eq!(moved.origin(), (20.0, 40.0));
        assert!((moved.vertical_scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn separately_placed_cells_share_a_line() {
        let lines = assemble_lines(vec![
            fragment(300.0, 740.0, "10.50"),
            fragment(40.0, 760.0, "Product"),
            fragment(40.0, 740.0, "Doodad"),
            fragment(300.0, 760.5, "Total"),
        ]);

        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[0]), vec!["Product", "Total"]);
        assert_eq!(texts(&lines[1]), vec!["Doodad", "10.50"]);
        assert_eq!(lines[1].cells[1].x0, 300.0);
    }

    #[test]
    fn close_fragments_join_into_one_cell() {
        let lines = assemble_lines(vec![
            fragment(40.0, 700.0, "Blue"),
            fragment(62.0, 700.0, "Widget"),
            fragment(92.0, 700.0, "s"),
        ]);
        assert_eq!(texts(&lines[0]), vec!["Blue Widgets"]);
    }

    #[test]
    fn wide_vertical_gaps_start_a_block() {
        let lines = assemble_lines(vec![
            fragment(40.0, 800.0, "INVOICE"),
            fragment(40.0, 740.0, "Product"),
            fragment(40.0, 726.0, "Doodad"),
        ]);
        assert!(!lines[0].starts_block);
        assert!(lines[1].starts_block);
        assert!(!lines[2].starts_block);
    }

    #[test]
    fn walk_tracks_td_positions_and_kerning() {
        let fonts = BTreeMap::new();
        let mut walk = TextWalk::new(&fonts);
        let ops: Vec<(&str, Vec<Object>)> = vec![
            ("BT", vec![]),
            ("Tf", vec!["F1".into(), 10.into()]),
            ("Td", vec![40.into(), 700.into()]),
            ("Tj", vec![Object::string_literal("Doodad")]),
            ("ET", vec![]),
            ("BT", vec![]),
            ("Td", vec![300.into(), 700.into()]),
            (
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("9."),
                    Object::Integer(-20),
                    Object::string_literal("00"),
                ])],
            ),
            ("ET", vec![]),
        ];
        for (operator, operands) in &ops {
            walk.apply(operator, operands);
        }

        let lines = assemble_lines(walk.fragments);
        assert_eq!(lines.len(), 1);
        assert_eq!(texts(&lines[0]), vec!["Doodad", "9.00"]);
        assert_eq!(lines[0].cells[0].x0, 40.0);
        assert_eq!(lines[0].cells[1].x0, 300.0);
    }

    #[test]
    fn leading_moves_to_the_next_line() {
        let fonts = BTreeMap::new();
        let mut walk = TextWalk::new(&fonts);
        walk.apply("BT", &[]);
        walk.apply("Tf", &["F1".into(), 10.into()]);
        walk.apply("TL", &[14.into()]);
        walk.apply("Td", &[40.into(), 700.into()]);
        walk.apply("Tj", &[Object::string_literal("first")]);
        walk.apply("T*", &[]);
        walk.apply("Tj", &[Object::string_literal("second")]);

        let ys: Vec<f32> = walk.fragments.iter().map(|fragment| fragment.y).collect();
        assert_eq!(ys, vec![700.0, 686.0]);
    }

    #[test]
    fn utf16_strings_decode_by_byte_order_mark() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Doodad".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let font = FontMetrics::default();
        assert_eq!(font.decode(&bytes), "Doodad");
        assert_eq!(font.decode(b"Widget"), "Widget");
    }

    #[test]
    fn widths_array_drives_the_advance() {
        let font = FontMetrics {
            first_char: 65,
            widths: vec![250.0, 0.0],
            ..FontMetrics::default()
        };
        // `A` has a width; `B` has none and `a` is outside the table.
        assert!((font.advance_em(b"ABa") - 1.25).abs() < f32::EPSILON);
    }

    #[test]
    fn replacement_characters_read_as_garbled() {
        let line = |text: &str| TextLine {
            cells: vec![Cell {
                x0: 0.0,
                x1: 1.0,
                text: text.to_string(),
            }],
            starts_block: false,
        };
        assert!(looks_garbled(&[line("\u{FFFD}\u{FFFD}\u{1}a")]));
        assert!(!looks_garbled(&[line("Doodad")]));
    }
}
