use std::io::Write;

use csv::WriterBuilder;

use crate::error::ExtractError;
use crate::model::PageTables;

/// Writes every detected table as `page,table_id,row,cells...` records.
/// Row 0 of each table is its header row.
pub(crate) fn write_tables_csv<W: Write>(
    target: W,
    pages: &[PageTables],
    delimiter: u8,
) -> Result<usize, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(target);

    let mut written = 0;
    for page in pages {
        for (index, table) in page.tables.iter().enumerate() {
            for (row_number, row) in table.rows.iter().enumerate() {
                let mut record = Vec::with_capacity(row.len() + 3);
                record.push(page.page_number.to_string());
                record.push((index + 1).to_string());
                record.push(row_number.to_string());
                record.extend(row.iter().cloned());
                writer.write_record(&record)?;
                written += 1;
            }
        }
    }
    writer.flush()?;
    Ok(written)
}
