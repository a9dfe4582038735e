// src/event/mod.rs

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Bucket notification payload, as delivered by the object store.
///
/// Only the fields the transform needs are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    /// Form-urlencoded, exactly as the notification carries it.
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl S3Event {
    /// Object references in delivery order, with keys decoded.
    pub fn objects(&self) -> Vec<ObjectRef> {
        self.records
            .iter()
            .map(|r| ObjectRef::new(&r.s3.bucket.name, decode_key(&r.s3.object.key)))
            .collect()
    }
}

/// A single object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Directory part of the key, without the trailing slash ("" at bucket root).
    pub fn dir(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[..idx],
            None => "",
        }
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[idx + 1..],
            None => &self.key,
        }
    }

    /// Sibling key with the file extension replaced by `ext` (no leading dot).
    /// A key without an extension gets `ext` appended.
    pub fn sibling_key(&self, ext: &str) -> String {
        let name = self.file_name();
        let stem_len = match name.rfind('.') {
            Some(idx) if idx > 0 => idx,
            _ => name.len(),
        };
        let prefix_len = self.key.len() - name.len();
        format!("{}.{}", &self.key[..prefix_len + stem_len], ext)
    }
}

/// Notification keys are form-urlencoded: `+` for space, `%XX` for
/// everything outside the unreserved set.
pub fn decode_key(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}
