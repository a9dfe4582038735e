// src/pipeline/mod.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::Arc,
    time::Instant,
};
use tempfile::TempDir;
use tracing::{error, info, warn};

use crate::{
    config::SIZE_WARNING_BYTES,
    event::{ObjectRef, S3Event},
    notify::Notifier,
    storage::ObjectStorage,
    transform::{
        columns::{normalize_columns, KakasiTransliterator, Transliterator},
        decode::decode_with_fallback,
        records::write_json_lines,
        table::{parse_csv, RowSet},
        views::{view_file, ViewTarget},
    },
};

pub mod stage;

pub use stage::{Stage, StageError};

pub const RECORD_EXTENSION: &str = "json";
pub const VIEW_EXTENSION: &str = "table";

/// What happened to one object.
#[derive(Debug, Default, Serialize)]
pub struct ObjectOutcome {
    pub bucket: String,
    pub key: String,
    pub content_length: u64,
    pub size_warning: bool,
    pub encoding: Option<&'static str>,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Uploaded record file key.
    pub record_key: Option<String>,
    /// Uploaded view file key.
    pub view_key: Option<String>,
    /// Set when processing of this object stopped early.
    pub aborted_at: Option<Stage>,
    /// Every notification sent for this object, in order.
    pub notifications: Vec<String>,
}

/// Result of one triggering event.
#[derive(Debug, Serialize)]
pub struct InvocationReport {
    pub started_at: DateTime<Utc>,
    pub objects: Vec<ObjectOutcome>,
    /// A fetch failure stops the invocation; later records are skipped.
    pub halted: bool,
    pub skipped: usize,
}

impl InvocationReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            objects: Vec::new(),
            halted: false,
            skipped: 0,
        }
    }
}

impl Default for InvocationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch → decode → parse → normalize → serialize → upload, one object at a time.
pub struct Pipeline {
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<dyn Notifier>,
    translit: Arc<dyn Transliterator>,
}

impl Pipeline {
    pub fn new(storage: Arc<dyn ObjectStorage>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            translit: Arc::new(KakasiTransliterator),
        }
    }

    pub fn with_transliterator(mut self, translit: Arc<dyn Transliterator>) -> Self {
        self.translit = translit;
        self
    }

    /// Process every record of `event` in order. A fetch failure halts the
    /// invocation; every other failure is contained to its object.
    pub async fn handle_event(&self, event: &S3Event) -> InvocationReport {
        let objects = event.objects();
        let mut report = InvocationReport::new();

        for (idx, obj) in objects.iter().enumerate() {
            info!(file_key = %obj.key, bucket = %obj.bucket, "processing");
            let outcome = self.process_object(obj).await;
            let fetch_failed = outcome.aborted_at == Some(Stage::Fetch);
            report.objects.push(outcome);
            if fetch_failed {
                report.halted = true;
                report.skipped = objects.len() - idx - 1;
                error!(skipped = report.skipped, "fetch failed; halting invocation");
                break;
            }
        }

        report
    }

    /// Transform a single object. Every failure is notified and recorded in
    /// the outcome; `aborted_at` names the stage that stopped it, if any.
    #[tracing::instrument(level = "info", skip(self, obj), fields(bucket = %obj.bucket, key = %obj.key))]
    pub async fn process_object(&self, obj: &ObjectRef) -> ObjectOutcome {
        let start = Instant::now();
        let mut outcome = ObjectOutcome {
            bucket: obj.bucket.clone(),
            key: obj.key.clone(),
            ..Default::default()
        };

        // ─── fetch ───────────────────────────────────────────────────
        let fetched = match self.storage.get_object(&obj.bucket, &obj.key).await {
            Ok(f) => f,
            Err(e) => {
                self.report(&mut outcome, StageError::from_anyhow(Stage::Fetch, &obj.key, &e))
                    .await;
                outcome.aborted_at = Some(Stage::Fetch);
                return outcome;
            }
        };
        outcome.content_length = fetched.content_length;

        if fetched.content_length >= SIZE_WARNING_BYTES {
            let msg = format!(
                "S3 Object:{} is 100MB Over. size:{:.1}MB.",
                obj.key,
                fetched.content_length as f64 / 1_000_000.0
            );
            self.send(&mut outcome, msg).await;
            outcome.size_warning = true;
        }

        // ─── decode ──────────────────────────────────────────────────
        let decoded = match decode_with_fallback(&fetched.bytes) {
            Ok(d) => d,
            Err(e) => {
                self.report(&mut outcome, StageError::new(Stage::Decode, &obj.key, e))
                    .await;
                outcome.aborted_at = Some(Stage::Decode);
                return outcome;
            }
        };
        drop(fetched);
        info!("file format:{}", decoded.encoding);
        outcome.encoding = Some(decoded.encoding.as_str());

        // ─── parse ───────────────────────────────────────────────────
        let mut table = match parse_csv(&decoded.text) {
            Ok(parsed) => {
                if let Some(e) = parsed.row_error {
                    self.report(&mut outcome, StageError::new(Stage::Parse, &obj.key, e))
                        .await;
                }
                parsed.table
            }
            Err(e) => {
                self.report(&mut outcome, StageError::new(Stage::Parse, &obj.key, e))
                    .await;
                outcome.aborted_at = Some(Stage::Parse);
                return outcome;
            }
        };
        drop(decoded);

        // ─── normalize ───────────────────────────────────────────────
        let normalization = normalize_columns(&mut table, self.translit.as_ref());
        for (_, e) in normalization.failed {
            self.report(&mut outcome, StageError::new(Stage::Normalize, &obj.key, e))
                .await;
        }
        outcome.rows = table.num_rows();
        outcome.columns = table.headers.clone();

        let target = ViewTarget::for_object(obj);
        let views = view_file(&target, &table.headers);

        // ─── serialize + upload ──────────────────────────────────────
        // one scratch directory per object, removed on drop
        let scratch = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                let err = StageError::new(Stage::Serialize, &obj.key, e);
                self.report(&mut outcome, err).await;
                outcome.aborted_at = Some(Stage::Serialize);
                return outcome;
            }
        };

        let record_key = obj.sibling_key(RECORD_EXTENSION);
        let record_path = scratch.path().join("records.json");
        match write_records(&table, &record_path) {
            Ok(rows) => {
                info!(rows, path = %record_path.display(), "wrote records");
                if self.upload(&mut outcome, &record_path, &obj.bucket, &record_key).await {
                    outcome.record_key = Some(record_key);
                }
            }
            Err(e) => {
                let err = StageError::from_anyhow(Stage::Serialize, &obj.key, &e);
                self.report(&mut outcome, err).await;
            }
        }

        let view_key = obj.sibling_key(VIEW_EXTENSION);
        let view_path = scratch.path().join("views.table");
        match fs::write(&view_path, views.as_bytes()) {
            Ok(()) => {
                if self.upload(&mut outcome, &view_path, &obj.bucket, &view_key).await {
                    outcome.view_key = Some(view_key);
                }
            }
            Err(e) => {
                self.report(&mut outcome, StageError::new(Stage::Upload, &view_key, e))
                    .await;
            }
        }

        info!(
            rows = outcome.rows,
            columns = outcome.columns.len(),
            elapsed = ?start.elapsed(),
            "object done"
        );
        outcome
    }

    async fn upload(
        &self,
        outcome: &mut ObjectOutcome,
        path: &Path,
        bucket: &str,
        key: &str,
    ) -> bool {
        match self.storage.upload_file(path, bucket, key).await {
            Ok(()) => true,
            Err(e) => {
                self.report(outcome, StageError::from_anyhow(Stage::Upload, key, &e))
                    .await;
                false
            }
        }
    }

    async fn report(&self, outcome: &mut ObjectOutcome, err: StageError) {
        warn!(stage = %err.stage, error = %err, "stage failed");
        self.send(outcome, err.to_string()).await;
    }

    async fn send(&self, outcome: &mut ObjectOutcome, message: String) {
        if let Err(e) = self.notifier.notify(&message).await {
            error!(error = %e, message = %message, "notification failed");
        }
        outcome.notifications.push(message);
    }
}

fn write_records(table: &RowSet, path: &Path) -> anyhow::Result<usize> {
    let file = File::create(path)?;
    Ok(write_json_lines(table, BufWriter::new(file))?)
}
