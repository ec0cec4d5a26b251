use std::collections::HashMap;

/// Column name to positions, built once from a table's header row. A name that
/// appears more than once does not resolve to a single cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    columns: HashMap<String, Vec<usize>>,
}

impl HeaderIndex {
    #[must_use]
    pub fn from_header(header: &[String]) -> Self {
        let mut columns: HashMap<String, Vec<usize>> = HashMap::with_capacity(header.len());
        for (index, name) in header.iter().enumerate() {
            columns.entry(name.clone()).or_default().push(index);
        }
        Self { columns }
    }

    /// Every column carrying `name`, left to right.
    #[must_use]
    pub fn positions(&self, name: &str) -> &[usize] {
        self.columns.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The column carrying `name`, when exactly one does.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        match self.positions(name) {
            [position] => Some(*position),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    #[must_use]
    pub fn is_duplicated(&self, name: &str) -> bool {
        self.positions(name).len() > 1
    }

    /// Pairs a data row with the header names.
    #[must_use]
    pub fn name_row<'a>(&'a self, cells: &'a [String]) -> NamedRow<'a> {
        NamedRow {
            index: self,
            cells,
        }
    }
}

/// A data row looked up by header name.
#[derive(Debug, Clone, Copy)]
pub struct NamedRow<'a> {
    index: &'a HeaderIndex,
    cells: &'a [String],
}

impl<'a> NamedRow<'a> {
    /// The cell under `column`, or `None` when the header has no such column,
    /// has it more than once, or the row is shorter than the header.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let position = self.index.position(column)?;
        self.cells.get(position).map(String::as_str)
    }
}
