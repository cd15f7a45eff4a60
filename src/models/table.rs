use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use std::io::Read;

/// One cell of a decoded upload.
///
/// Uploads reach the core already decoded from their binary container; a cell
/// is either plain text, a number, or a native date-time value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Render the cell the way it would appear in a text export.
    ///
    /// Whole numbers print without a fractional part, so a numeric
    /// `20240101` cell stays parseable as a compact date.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format!("{}", n),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// A single decoded sheet: a header row plus data rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Decode a CSV stream into a table. The first record is the header;
    /// every cell arrives as text.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(columns);
        for record in csv_reader.records() {
            let record = record?;
            table.rows.push(
                record
                    .iter()
                    .map(|cell| CellValue::Text(cell.to_string()))
                    .collect(),
            );
        }

        Ok(table)
    }

    /// Position of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Which of `required` are absent from this table.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Cell at (row, column name). Rows shorter than the header yield `None`.
    pub fn cell<'a>(&'a self, row: &'a [CellValue], column: &str) -> Option<&'a CellValue> {
        self.column_index(column).and_then(|idx| row.get(idx))
    }

    /// Cell lookup that fails with an invalid-input error when absent.
    pub fn require_cell<'a>(&'a self, row: &'a [CellValue], column: &str) -> Result<&'a CellValue> {
        self.cell(row, column)
            .ok_or_else(|| Error::InvalidInput(format!("row is missing a value for '{}'", column)))
    }
}

/// A decoded multi-sheet upload: one named sheet per ticker, in upload order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<(String, Table)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, table: Table) {
        self.sheets.push((name.into(), table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_header_and_rows() {
        let csv = "date,ticker,volume,price\n2024-01-01,AI95,100,50.0\n";
        let table = Table::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["date", "ticker", "volume", "price"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], CellValue::Text("AI95".to_string()));
    }

    #[test]
    fn test_missing_columns() {
        let table = Table::new(vec!["date".to_string(), "price".to_string()]);
        let missing = table.missing_columns(&["date", "ticker", "volume", "price"]);
        assert_eq!(missing, vec!["ticker".to_string(), "volume".to_string()]);
    }

    #[test]
    fn test_number_cell_renders_without_fraction() {
        assert_eq!(CellValue::Number(20240101.0).to_text(), "20240101");
        assert_eq!(CellValue::Number(50.5).to_text(), "50.5");
    }

    #[test]
    fn test_cell_lookup_on_short_row() {
        let table = Table::new(vec!["date".to_string(), "price".to_string()]);
        let row = vec![CellValue::Text("2024-01-01".to_string())];
        assert!(table.cell(&row, "price").is_none());
        assert!(table.require_cell(&row, "price").is_err());
    }
}
