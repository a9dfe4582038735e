use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where in the per-object transform a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Decode,
    Parse,
    Normalize,
    Serialize,
    Upload,
}

impl Stage {
    /// Leading text of the notification for this stage.
    fn prefix(&self) -> &'static str {
        match self {
            Stage::Fetch | Stage::Decode => "S3 GetObject:",
            Stage::Parse => "csv read error:",
            Stage::Normalize => "Column Check. S3 GetObject:",
            Stage::Serialize => "CSV to Json Convert:",
            Stage::Upload => "S3 Upload Error:",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fetch => "fetch",
            Stage::Decode => "decode",
            Stage::Parse => "parse",
            Stage::Normalize => "normalize",
            Stage::Serialize => "serialize",
            Stage::Upload => "upload",
        };
        f.write_str(s)
    }
}

/// A tagged stage failure. Its `Display` is the notification text.
///
/// `key` is the source object key, or the target key for uploads.
#[derive(Debug, Error)]
#[error("{}{}, Exception:{}", .stage.prefix(), .key, .cause)]
pub struct StageError {
    pub stage: Stage,
    pub key: String,
    pub cause: String,
}

impl StageError {
    pub fn new(stage: Stage, key: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            stage,
            key: key.into(),
            cause: cause.to_string(),
        }
    }

    /// Same as `new`, rendering an `anyhow` chain on one line.
    pub fn from_anyhow(stage: Stage, key: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::new(stage, key, format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let key = "sales/orders_20240101.csv";
        assert_eq!(
            StageError::new(Stage::Fetch, key, "NoSuchKey").to_string(),
            "S3 GetObject:sales/orders_20240101.csv, Exception:NoSuchKey"
        );
        assert_eq!(
            StageError::new(Stage::Parse, key, "bad row").to_string(),
            "csv read error:sales/orders_20240101.csv, Exception:bad row"
        );
        assert_eq!(
            StageError::new(Stage::Normalize, key, "x").to_string(),
            "Column Check. S3 GetObject:sales/orders_20240101.csv, Exception:x"
        );
        assert_eq!(
            StageError::new(Stage::Upload, "sales/orders_20240101.json", "denied").to_string(),
            "S3 Upload Error:sales/orders_20240101.json, Exception:denied"
        );
    }

    #[test]
    fn test_anyhow_chain_is_flattened() {
        let err = anyhow::anyhow!("AccessDenied").context("PutObject s3://b/k");
        let stage = StageError::from_anyhow(Stage::Upload, "k", &err);
        assert_eq!(stage.cause, "PutObject s3://b/k: AccessDenied");
    }
}
