//! `CREATE VIEW` generation over the shared `autoload_table`.
//!
//! View name and partition-path key are interpolated verbatim. Both come from
//! the object key, so they are not escaped or validated here.

use crate::event::ObjectRef;

/// External table every ingested file lands in.
pub const SOURCE_TABLE: &str = "autoload_table";

/// Names the generated views are parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTarget {
    pub view_name: String,
    pub partition_key: String,
}

impl ViewTarget {
    pub fn for_object(obj: &ObjectRef) -> Self {
        Self {
            view_name: view_name(obj.file_name()),
            partition_key: partition_key(obj.dir()),
        }
    }
}

/// File name up to the first underscore; the file stem when there is none.
pub fn view_name(file_name: &str) -> String {
    match file_name.split_once('_') {
        Some((prefix, _)) => prefix.to_string(),
        None => match file_name.rfind('.') {
            Some(idx) if idx > 0 => file_name[..idx].to_string(),
            _ => file_name.to_string(),
        },
    }
}

/// Directory path with separators removed.
pub fn partition_key(dir: &str) -> String {
    dir.replace('/', "")
}

fn select_list(columns: &[String]) -> String {
    let mut s = String::from("SELECT\n");
    for col in columns {
        s.push_str(&format!("  VALUE:\"{col}\"::string AS \"{col}\",\n"));
    }
    // drop the separator after the last column
    if !columns.is_empty() {
        s.truncate(s.len() - ",\n".len());
        s.push('\n');
    }
    s
}

/// View over the most recently ingested file within the partition.
pub fn snapshot_view(target: &ViewTarget, columns: &[String]) -> String {
    let ViewTarget {
        view_name,
        partition_key,
    } = target;
    let mut s = format!("CREATE VIEW {view_name} AS\n");
    s.push_str(&select_list(columns));
    s.push_str(&format!("FROM {SOURCE_TABLE}\n"));
    s.push_str(&format!(
        "INNER JOIN (SELECT DISTINCT(FILENAME) as FILENAME FROM {SOURCE_TABLE} WHERE PARTPATH='{partition_key}' ORDER BY FILENAME DESC LIMIT 1) as LAST_FILENAME\n"
    ));
    s.push_str(&format!(
        "ON {SOURCE_TABLE}.FILENAME = LAST_FILENAME.FILENAME\n"
    ));
    s.push_str(&format!("WHERE PARTPATH = '{partition_key}';\n"));
    s
}

/// View over every ingested file within the partition.
pub fn history_view(target: &ViewTarget, columns: &[String]) -> String {
    let ViewTarget {
        view_name,
        partition_key,
    } = target;
    let mut s = format!("CREATE VIEW {view_name}_HISTORY AS\n");
    s.push_str(&select_list(columns));
    s.push_str(&format!("FROM {SOURCE_TABLE}\n"));
    s.push_str(&format!("WHERE PARTPATH = '{partition_key}';\n"));
    s
}

/// Snapshot view, blank line, history view.
pub fn view_file(target: &ViewTarget, columns: &[String]) -> String {
    format!(
        "{}\n{}",
        snapshot_view(target, columns),
        history_view(target, columns)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_target_from_key() {
        let t = ViewTarget::for_object(&ObjectRef::new("b", "sales/orders_20240101.csv"));
        assert_eq!(t.view_name, "orders");
        assert_eq!(t.partition_key, "sales");
    }

    #[test]
    fn test_nested_dir_and_no_underscore() {
        let t = ViewTarget::for_object(&ObjectRef::new("b", "jp/tokyo/shops.csv"));
        assert_eq!(t.view_name, "shops");
        assert_eq!(t.partition_key, "jptokyo");

        assert_eq!(view_name("a_b_c.csv"), "a");
        assert_eq!(partition_key(""), "");
    }

    #[test]
    fn test_snapshot_view() {
        let target = ViewTarget {
            view_name: "orders".into(),
            partition_key: "sales".into(),
        };
        let sql = snapshot_view(&target, &cols(&["hiduke ", "amount"]));
        let expected = "CREATE VIEW orders AS\n\
SELECT\n\
\x20 VALUE:\"hiduke \"::string AS \"hiduke \",\n\
\x20 VALUE:\"amount\"::string AS \"amount\"\n\
FROM autoload_table\n\
INNER JOIN (SELECT DISTINCT(FILENAME) as FILENAME FROM autoload_table WHERE PARTPATH='sales' ORDER BY FILENAME DESC LIMIT 1) as LAST_FILENAME\n\
ON autoload_table.FILENAME = LAST_FILENAME.FILENAME\n\
WHERE PARTPATH = 'sales';\n";
        assert_eq!(sql, expected);

        let first = sql.find("VALUE:\"hiduke \"::string AS \"hiduke \"").unwrap();
        let second = sql.find("VALUE:\"amount\"::string AS \"amount\"").unwrap();
        assert!(first < second);
        assert!(!sql.contains("\"amount\",\n"));
    }

    #[test]
    fn test_history_view() {
        let target = ViewTarget {
            view_name: "orders".into(),
            partition_key: "sales".into(),
        };
        let sql = history_view(&target, &cols(&["id"]));
        assert_eq!(
            sql,
            "CREATE VIEW orders_HISTORY AS\nSELECT\n  VALUE:\"id\"::string AS \"id\"\nFROM autoload_table\nWHERE PARTPATH = 'sales';\n"
        );
    }

    #[test]
    fn test_view_file_joins_with_blank_line() {
        let target = ViewTarget {
            view_name: "v".into(),
            partition_key: "p".into(),
        };
        let c = cols(&["id"]);
        let file = view_file(&target, &c);
        assert!(file.starts_with(&snapshot_view(&target, &c)));
        assert!(file.contains(";\n\nCREATE VIEW v_HISTORY AS\n"));
        assert!(file.ends_with(&history_view(&target, &c)));
    }
}
