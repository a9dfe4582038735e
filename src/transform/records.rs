use serde_json::{Map, Value};
use std::{collections::HashSet, io::Write};
use thiserror::Error;

use super::table::RowSet;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("columns must be unique, duplicated: {0:?}")]
    DuplicateColumns(Vec<String>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write one JSON object per row, keys in header order, values as strings.
/// Non-ASCII text is written as UTF-8, not escaped. Returns the row count.
pub fn write_json_lines<W: Write>(table: &RowSet, mut out: W) -> Result<usize, SerializeError> {
    let mut seen = HashSet::with_capacity(table.headers.len());
    let dups: Vec<String> = table
        .headers
        .iter()
        .filter(|h| !seen.insert(h.as_str()))
        .cloned()
        .collect();
    if !dups.is_empty() {
        return Err(SerializeError::DuplicateColumns(dups));
    }

    for row in &table.rows {
        let obj: Map<String, Value> = table
            .headers
            .iter()
            .zip(row)
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        serde_json::to_writer(&mut out, &obj)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(table.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn sample(rows: usize) -> RowSet {
        RowSet {
            headers: vec!["hiduke ".into(), "amount".into(), "memo".into()],
            rows: (0..rows)
                .map(|i| vec![format!("2024/01/{:02}", i + 1), (i * 100).to_string(), "山田".into()])
                .collect(),
        }
    }

    #[test]
    fn test_n_rows_m_keys() -> Result<()> {
        let table = sample(4);
        let mut buf = Vec::new();
        let n = write_json_lines(&table, &mut buf)?;
        assert_eq!(n, 4);

        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        for line in lines {
            let obj: Map<String, Value> = serde_json::from_str(line)?;
            let keys: Vec<&String> = obj.keys().collect();
            assert_eq!(keys, vec!["hiduke ", "amount", "memo"]);
        }
        Ok(())
    }

    #[test]
    fn test_non_ascii_unescaped() -> Result<()> {
        let mut buf = Vec::new();
        write_json_lines(&sample(1), &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert_eq!(
            text,
            "{\"hiduke \":\"2024/01/01\",\"amount\":\"0\",\"memo\":\"山田\"}\n"
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let table = RowSet {
            headers: vec!["a".into(), "b".into(), "a".into()],
            rows: vec![vec!["1".into(), "2".into(), "3".into()]],
        };
        let err = write_json_lines(&table, Vec::new()).unwrap_err();
        assert!(matches!(err, SerializeError::DuplicateColumns(ref d) if d == &vec!["a".to_string()]));
    }

    #[test]
    fn test_empty_table_writes_nothing() -> Result<()> {
        let mut buf = Vec::new();
        let n = write_json_lines(&sample(0), &mut buf)?;
        assert_eq!(n, 0);
        assert!(buf.is_empty());
        Ok(())
    }
}
