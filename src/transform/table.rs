use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, warn};

/// Header-keyed rows, stored positionally.
///
/// Every row has exactly `headers.len()` cells, so renaming a header renames
/// that key in every record at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    /// Cell of `row` under column `name`, first match wins.
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no header row")]
    MissingHeader,

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Rows read from a CSV body. `row_error` is set when reading stopped early;
/// `table` then holds every row read before the failure.
#[derive(Debug)]
pub struct ParsedTable {
    pub table: RowSet,
    pub row_error: Option<TableError>,
}

/// Unique header names in first-seen order, plus the output slot of every
/// raw column.
fn collapse_headers<'a>(raw: impl Iterator<Item = &'a str>) -> (Vec<String>, Vec<usize>) {
    let mut headers: Vec<String> = Vec::new();
    let slots = raw
        .map(|name| match headers.iter().position(|h| h == name) {
            Some(slot) => {
                debug!(column = name, "repeated header collapsed");
                slot
            }
            None => {
                headers.push(name.to_string());
                headers.len() - 1
            }
        })
        .collect();
    (headers, slots)
}

/// Parse `text` as CSV with a header line. Blank lines are skipped.
///
/// A header name that repeats is one column: it keeps its first position and
/// takes the value of its last occurrence in each row.
///
/// A bad or missing header is an error. A malformed or ragged data row stops
/// reading and is reported through [`ParsedTable::row_error`].
pub fn parse_csv(text: &str) -> Result<ParsedTable, TableError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let (headers, slots) = collapse_headers(rdr.headers()?.iter());
    if headers.is_empty() {
        return Err(TableError::MissingHeader);
    }

    let mut table = RowSet {
        headers,
        rows: Vec::new(),
    };
    let mut row_error = None;

    for (idx, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => {
                let mut cells = vec![String::new(); table.headers.len()];
                for (&slot, value) in slots.iter().zip(record.iter()) {
                    cells[slot] = value.to_string();
                }
                table.rows.push(cells);
            }
            Err(e) => {
                warn!(record = idx, error = %e, "stopping CSV read");
                row_error = Some(TableError::Csv(e));
                break;
            }
        }
    }

    debug!(
        columns = table.num_columns(),
        rows = table.num_rows(),
        "parsed CSV"
    );
    Ok(ParsedTable { table, row_error })
}
