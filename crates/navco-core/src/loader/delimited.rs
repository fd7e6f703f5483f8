//! Comma separated text with a header row.

use super::{CellValue, LoadError, RawTable};

/// Parse delimited text. Ragged rows are padded; fields that are not valid
/// UTF-8 are decoded as Latin-1 (older exports of the NAVCO lists use it).
pub fn read_delimited(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .byte_headers()?
        .iter()
        .map(decode_field)
        .collect::<Vec<_>>();
    let mut table = RawTable::new(headers);

    for record in reader.byte_records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| CellValue::from_text(&decode_field(field)))
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

fn decode_field(field: &[u8]) -> String {
    match std::str::from_utf8(field) {
        Ok(s) => s.to_string(),
        Err(_) => field.iter().map(|&b| b as char).collect(),
    }
}
