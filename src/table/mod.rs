//! Tabular input handling
//!
//! Loads a CSV or XLSX file into an ordered in-memory table. Row order is
//! stable and defines both processing order and output row indexing.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod export;

/// An input table: header row plus ordered data rows.
///
/// Cells are kept as strings; numeric and empty spreadsheet cells are
/// stringified on load so the rest of the pipeline never sees cell types.
#[derive(Debug, Clone)]
pub struct InputTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    source: PathBuf,
}

impl InputTable {
    /// Load a table from a file, dispatching on the extension.
    ///
    /// Supported: `.csv` and `.xlsx`. Anything else is an input error
    /// before any processing begins.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Input(format!(
                "Input file does not exist: {}",
                path.display()
            )));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let table = match ext.as_str() {
            "csv" => Self::from_csv(path)?,
            "xlsx" => Self::from_xlsx(path)?,
            other => {
                return Err(Error::Input(format!(
                    "Unsupported file type '.{}' (expected .csv or .xlsx): {}",
                    other,
                    path.display()
                )))
            }
        };

        info!(
            "Loaded {} rows x {} columns from {}",
            table.rows.len(),
            table.headers.len(),
            path.display()
        );

        Ok(table)
    }

    fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| Error::Input(format!("Failed to read CSV file: {}", e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::Input(format!("Failed to read CSV header row: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record =
                result.map_err(|e| Error::Input(format!("Failed to read CSV record: {}", e)))?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self {
            headers,
            rows,
            source: path.to_path_buf(),
        })
    }

    fn from_xlsx(path: &Path) -> Result<Self> {
        use calamine::{open_workbook, Reader, Xlsx};

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| Error::Input(format!("Failed to open Excel file: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Input("No worksheet found in Excel file".to_string()))?
            .map_err(|e| Error::Input(format!("Failed to read Excel range: {}", e)))?;

        let mut row_iter = range.rows();
        let headers: Vec<String> = match row_iter.next() {
            Some(header_row) => header_row.iter().map(stringify_cell).collect(),
            None => {
                return Err(Error::Input(
                    "Excel worksheet has no header row".to_string(),
                ))
            }
        };

        let rows: Vec<Vec<String>> = row_iter
            .map(|row| row.iter().map(stringify_cell).collect())
            .collect();

        debug!("Parsed Excel worksheet with {} data rows", rows.len());

        Ok(Self {
            headers,
            rows,
            source: path.to_path_buf(),
        })
    }

    /// Build a table directly from parts. Used by tests and the exporter.
    pub fn from_parts(headers: Vec<String>, rows: Vec<Vec<String>>, source: PathBuf) -> Self {
        Self {
            headers,
            rows,
            source,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// File stem of the source, used to derive artifact names.
    pub fn source_stem(&self) -> String {
        self.source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
            .to_string()
    }

    /// Resolve the index of the designated target column.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers.iter().position(|h| h == name).ok_or_else(|| {
            Error::Input(format!(
                "Column '{}' not found (available: {})",
                name,
                self.headers.join(", ")
            ))
        })
    }

    /// Cell value at (row, column), empty string for short rows.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

fn stringify_cell(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        _ => format!("{}", cell),
    }
}
