/// A run of text with its horizontal extent. Extents are in PDF user space for
/// content-stream text and in character offsets for plain-text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub x0: f32,
    pub x1: f32,
    pub text: String,
}

/// One visual line of a page, cells ordered left to right.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLine {
    pub cells: Vec<Cell>,
    /// Set when a blank line or a wide vertical gap precedes this line.
    pub starts_block: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLines {
    pub page_number: u32,
    pub lines: Vec<TextLine>,
}

/// A table as handed over by detection: the first row is the header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
    pub confidence: f32,
}

impl RawTable {
    #[must_use]
    pub fn new(page: u32, rows: Vec<Vec<String>>) -> Self {
        Self {
            page,
            rows,
            confidence: 1.0,
        }
    }

    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    #[must_use]
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }
}

/// All tables detected on one page, in extraction order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTables {
    pub page_number: u32,
    pub tables: Vec<RawTable>,
}
