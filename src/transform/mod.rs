// src/transform/mod.rs
pub mod columns;
pub mod decode;
pub mod records;
pub mod table;
pub mod views;

pub use columns::{is_identifier_safe, normalize_columns, KakasiTransliterator, Transliterator};
pub use decode::{decode_with_fallback, Decoded, TextEncoding};
pub use records::write_json_lines;
pub use table::{parse_csv, ParsedTable, RowSet};
pub use views::{view_file, ViewTarget};
