//! Format loaders: turn the bytes of a resolved candidate into a raw table.
//!
//! Dispatch is purely by the declared [`FileFormat`]; content is never
//! sniffed. Column names come back exactly as stored; normalization happens
//! in [`crate::schema`].

pub mod delimited;
pub mod dta;
pub mod spreadsheet;

use serde::{Deserialize, Serialize};

use crate::versions::FileFormat;

pub use dta::DtaError;

/// A single cell as read from any supported format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Missing,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Build a cell from free text: blank is missing, numeric text is a number.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Numeric view. Text is parsed leniently; NaN and infinities count as
    /// missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) | Self::Missing => None,
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Integer view, only for whole numbers.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
    }

    /// Text view. Whole numbers render without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(n) if n.is_nan() => None,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
        }
    }
}

/// Rows plus column names exactly as stored in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Missing);
        self.rows.push(row);
    }
}

/// Errors raised while parsing a dataset file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("stata file: {0}")]
    Dta(#[from] DtaError),

    #[error("spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("delimited text: {0}")]
    Delimited(#[from] csv::Error),

    #[error("no header row")]
    EmptyTable,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse `bytes` according to `format`.
pub fn load_table(bytes: &[u8], format: FileFormat) -> Result<RawTable, LoadError> {
    let table = match format {
        FileFormat::StataDta => dta::read_dta(bytes)?,
        FileFormat::Xlsx => spreadsheet::read_xlsx(bytes)?,
        FileFormat::Xls => spreadsheet::read_xls(bytes)?,
        FileFormat::Delimited => delimited::read_delimited(bytes)?,
    };
    if table.headers.is_empty() {
        return Err(LoadError::EmptyTable);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_from_text_classifies() {
        assert_eq!(CellValue::from_text("  "), CellValue::Missing);
        assert_eq!(CellValue::from_text("3.5"), CellValue::Number(3.5));
        assert_eq!(CellValue::from_text(" 12 "), CellValue::Number(12.0));
        assert_eq!(
            CellValue::from_text("Hong Kong"),
            CellValue::Text("Hong Kong".to_string())
        );
        assert_eq!(CellValue::from_text("NaN"), CellValue::Text("NaN".to_string()));
    }

    #[test]
    fn cell_views() {
        assert_eq!(CellValue::Number(1999.0).as_i64(), Some(1999));
        assert_eq!(CellValue::Number(1999.5).as_i64(), None);
        assert_eq!(CellValue::Number(2011.0).as_text().as_deref(), Some("2011"));
        assert_eq!(CellValue::Text(" 0.2 ".into()).as_f64(), Some(0.2));
        assert_eq!(CellValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Number(f64::INFINITY).as_f64(), None);
        assert_eq!(CellValue::Text("   ".into()).as_f64(), None);
    }

    #[test]
    fn non_finite_text_is_not_numeric() {
        for raw in ["inf", "-Infinity", "1e400", "NaN"] {
            let cell = CellValue::from_text(raw);
            assert_eq!(cell, CellValue::Text(raw.to_string()));
            assert_eq!(cell.as_f64(), None, "{raw}");
            assert_eq!(cell.as_i64(), None, "{raw}");
        }
    }

    #[test]
    fn push_row_pads_to_header_width() {
        let mut table = RawTable::new(vec!["A".into(), "B".into(), "C".into()]);
        table.push_row(vec![CellValue::Number(1.0)]);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[0][2], CellValue::Missing);
    }

    #[test]
    fn empty_delimited_is_empty_table() {
        let err = load_table(b"", FileFormat::Delimited).unwrap_err();
        assert!(matches!(err, LoadError::EmptyTable));
    }

    #[test]
    fn garbage_xlsx_is_spreadsheet_error() {
        let err = load_table(b"definitely not a zip", FileFormat::Xlsx).unwrap_err();
        assert!(matches!(err, LoadError::Spreadsheet(_)));
    }
}
