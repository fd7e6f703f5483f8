//! Excel workbooks (`.xlsx` and legacy `.xls`) via calamine.
//!
//! The first worksheet is read; its first row is the header.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls, Xlsx};

use super::{CellValue, LoadError, RawTable};

pub fn read_xlsx(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    Ok(range_to_table(&range))
}

pub fn read_xls(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    Ok(range_to_table(&range))
}

fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(header_text).collect(),
        None => return RawTable::default(),
    };
    let mut table = RawTable::new(headers);
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    table
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        other => cell_value(other).as_text().unwrap_or_default(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => CellValue::from_text(s),
        Data::Empty => CellValue::Missing,
        // Dates, durations and #N/A style errors carry nothing the audit reads.
        _ => CellValue::Missing,
    }
}
