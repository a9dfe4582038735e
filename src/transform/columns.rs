use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use super::table::RowSet;

static IDENTIFIER_SAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("identifier pattern should compile"));

/// True if `name` can be used as a quoted identifier in the generated views as-is.
pub fn is_identifier_safe(name: &str) -> bool {
    IDENTIFIER_SAFE.is_match(name)
}

#[derive(Debug, Error)]
pub enum TransliterationError {
    #[error("transliteration of {0:?} produced no text")]
    Empty(String),
}

/// Phonetic conversion of Japanese text to Latin letters.
pub trait Transliterator: Send + Sync {
    fn transliterate(&self, text: &str) -> Result<String, TransliterationError>;
}

/// Hepburn romanization backed by the kakasi dictionary: kanji, hiragana and
/// katakana become lowercase romaji, words separated by spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct KakasiTransliterator;

impl Transliterator for KakasiTransliterator {
    fn transliterate(&self, text: &str) -> Result<String, TransliterationError> {
        let romaji = kakasi::convert(text).romaji;
        if romaji.trim().is_empty() && !text.trim().is_empty() {
            return Err(TransliterationError::Empty(text.to_string()));
        }
        Ok(romaji)
    }
}

/// A column that was rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Result of normalizing every column of a table.
#[derive(Debug, Default)]
pub struct Normalization {
    pub renamed: Vec<Rename>,
    /// Columns left unchanged because transliteration failed.
    pub failed: Vec<(String, TransliterationError)>,
}

/// Rewrite every header that is not identifier-safe via `translit`.
///
/// A failure on one column leaves it unchanged and moves on to the next.
/// The transliterated name is not checked again.
pub fn normalize_columns(table: &mut RowSet, translit: &dyn Transliterator) -> Normalization {
    let mut out = Normalization::default();

    for header in table.headers.iter_mut() {
        if is_identifier_safe(header) {
            continue;
        }
        match translit.transliterate(header) {
            Ok(romaji) => {
                info!(from = %header, to = %romaji, "renaming column");
                let from = std::mem::replace(header, romaji.clone());
                out.renamed.push(Rename { from, to: romaji });
            }
            Err(e) => {
                debug!(column = %header, error = %e, "column left as is");
                out.failed.push((header.clone(), e));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fixed lookup table so tests do not depend on dictionary output.
    struct TableTransliterator(HashMap<&'static str, &'static str>);

    impl Transliterator for TableTransliterator {
        fn transliterate(&self, text: &str) -> Result<String, TransliterationError> {
            self.0
                .get(text)
                .map(|s| s.to_string())
                .ok_or_else(|| TransliterationError::Empty(text.to_string()))
        }
    }

    #[test]
    fn test_identifier_safe() {
        assert!(is_identifier_safe("amount"));
        assert!(is_identifier_safe("order_id-2"));
        assert!(is_identifier_safe("ABC123"));
        assert!(!is_identifier_safe("日付"));
        assert!(!is_identifier_safe("unit price"));
        assert!(!is_identifier_safe("a.b"));
        assert!(!is_identifier_safe(""));
    }

    #[test]
    fn test_unsafe_columns_are_renamed() {
        let mut table = RowSet {
            headers: vec!["日付".into(), "amount".into(), "顧客名".into()],
            rows: vec![vec!["2024/01/01".into(), "100".into(), "山田".into()]],
        };
        let translit =
            TableTransliterator(HashMap::from([("日付", "hiduke "), ("顧客名", "kokyakumei ")]));

        let n = normalize_columns(&mut table, &translit);

        assert_eq!(table.headers, vec!["hiduke ", "amount", "kokyakumei "]);
        assert_eq!(n.renamed.len(), 2);
        assert!(n.failed.is_empty());
        assert_eq!(table.get(0, "hiduke "), Some("2024/01/01"));
        assert!(!table.headers.iter().any(|h| h == "日付" || h == "顧客名"));
    }

    #[test]
    fn test_failure_does_not_stop_other_columns() {
        let mut table = RowSet {
            headers: vec!["謎".into(), "日付".into()],
            rows: vec![],
        };
        let translit = TableTransliterator(HashMap::from([("日付", "hiduke ")]));

        let n = normalize_columns(&mut table, &translit);

        assert_eq!(table.headers, vec!["謎", "hiduke "]);
        assert_eq!(n.failed.len(), 1);
        assert_eq!(n.failed[0].0, "謎");
        assert_eq!(n.renamed, vec![Rename { from: "日付".into(), to: "hiduke ".into() }]);
    }

    #[test]
    fn test_kakasi_output_is_latin() {
        let out = KakasiTransliterator.transliterate("カラム").unwrap();
        assert!(out.is_ascii());
        assert!(!out.trim().is_empty());
    }
}
