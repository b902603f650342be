//! # Batch generation
//!
//! Drives a batch through `Uploaded -> Mapped -> Generated | Completed`.
//!
//! A generation run:
//!
//! 1.  Loads the batch and requires a stored field mapping.
//! 2.  Takes its rows from freshly supplied file bytes or, failing that, from
//!     the rows cached at upload.
//! 3.  Optionally deletes contacts left by earlier runs of the same batch.
//! 4.  Turns every row into a contact with [`build_contact`] (normalize, key,
//!     QR, vCard) and persists it. Rows are independent: a failing row is
//!     recorded and, under [`RowFailurePolicy::Continue`], the run goes on.
//! 5.  Writes the batch once at the end with its terminal status and the
//!     number of contacts actually persisted.
//!
//! With more than one worker the per-row unit runs on a bounded rayon pool;
//! the single terminal write and the exact count are preserved.

use crate::error::{AppError, AppResult};
use crate::pipeline::normalize::normalize;
use crate::pipeline::parse::parse;
use crate::pipeline::qr::{contact_url, encode_data_url, QrError, QrOptions};
use crate::pipeline::vcard;
use crate::storage::{ContactStore, StorageError};
use common::model::batch::{Batch, BatchStatus, BatchUpdate};
use common::model::contact::NewContact;
use common::model::mapping::FieldMapping;
use common::model::row::Row;
use common::requests::{GenerationResponse, RowFailure};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Process-wide inputs of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub public_base_url: String,
    pub qr: QrOptions,
    /// 1 runs rows strictly one after another.
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFailurePolicy {
    #[default]
    Continue,
    AbortOnFirst,
}

/// Per-call inputs of a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// The source file again. `None` uses the rows cached at upload.
    pub file_data: Option<Vec<u8>>,
    pub replace_existing: bool,
    pub policy: RowFailurePolicy,
    /// Status written when every row has been attempted.
    pub final_status: BatchStatus,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            file_data: None,
            replace_existing: false,
            policy: RowFailurePolicy::Continue,
            final_status: BatchStatus::Generated,
        }
    }
}

#[derive(Debug, Error)]
pub enum RowErrorKind {
    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("could not store contact: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
#[error("Row {}: {}", .row + 1, .kind)]
pub struct RowError {
    /// 0-based data row index in file order.
    pub row: usize,
    pub kind: RowErrorKind,
}

#[derive(Debug)]
pub struct GenerationReport {
    pub batch_id: String,
    pub status: BatchStatus,
    /// Rows that produced a persisted contact.
    pub processed: u32,
    /// Rows available to this run.
    pub total: u32,
    pub failures: Vec<RowError>,
    /// Stopped early by the cancellation token.
    pub cancelled: bool,
    /// Stopped early by [`RowFailurePolicy::AbortOnFirst`].
    pub aborted: bool,
}

impl GenerationReport {
    pub fn to_response(&self) -> GenerationResponse {
        let message = if self.cancelled {
            format!(
                "Generation cancelled after {} of {} contacts",
                self.processed, self.total
            )
        } else if self.failures.is_empty() {
            format!("Generated {} QR codes successfully", self.processed)
        } else {
            format!(
                "Generated {} of {} contacts; {} rows failed",
                self.processed,
                self.total,
                self.failures.len()
            )
        };
        GenerationResponse {
            success: !self.cancelled && self.failures.is_empty(),
            processed_contacts: self.processed,
            total_contacts: self.total,
            failures: self
                .failures
                .iter()
                .map(|f| RowFailure {
                    row: f.row,
                    error: f.kind.to_string(),
                })
                .collect(),
            cancelled: self.cancelled,
            message,
        }
    }
}

/// Everything a single row needs besides the row itself.
struct RowContext<'a> {
    batch_id: &'a str,
    mapping: &'a FieldMapping,
    settings: &'a GenerationSettings,
}

/// Attaches (or replaces) the field mapping of a batch.
///
/// An uploaded batch becomes `Mapped`; a batch that already reached a terminal
/// status keeps it, since a status never moves back.
pub fn submit_mapping(
    store: &dyn ContactStore,
    batch_id: &str,
    mapping: FieldMapping,
) -> AppResult<Batch> {
    let batch = store
        .get_batch(batch_id)?
        .ok_or(AppError::NotFound("Batch"))?;
    let update = BatchUpdate {
        status: Some(batch.status.after_mapping()),
        field_mapping: Some(mapping),
        ..BatchUpdate::default()
    };
    let batch = store
        .update_batch(batch_id, update)?
        .ok_or(AppError::NotFound("Batch"))?;
    info!("Batch {} mapped (status {})", batch_id, batch.status.as_str());
    Ok(batch)
}

/// Builds the contact for one row without touching storage.
fn build_contact(index: usize, row: &Row, ctx: &RowContext<'_>) -> Result<NewContact, RowError> {
    let fields = normalize(row, ctx.mapping);
    let id = Uuid::new_v4().to_string();
    let target = contact_url(&ctx.settings.public_base_url, &id);
    let qr_code_url = encode_data_url(&target, &ctx.settings.qr).map_err(|e| RowError {
        row: index,
        kind: e.into(),
    })?;
    let vcard_data = vcard::encode(&fields);
    Ok(NewContact {
        id,
        batch_id: ctx.batch_id.to_string(),
        fields,
        vcard_data,
        qr_code_url,
    })
}

/// One row end to end: build, then persist. Returns the new contact key.
fn process_row(
    store: &dyn ContactStore,
    index: usize,
    row: &Row,
    ctx: &RowContext<'_>,
) -> Result<String, RowError> {
    let contact = build_contact(index, row, ctx)?;
    let stored = store.create_contact(contact).map_err(|e| RowError {
        row: index,
        kind: e.into(),
    })?;
    debug!("Row {} -> contact {}", index + 1, stored.id);
    Ok(stored.id)
}

struct RunOutcome {
    results: Vec<Result<String, RowError>>,
    cancelled: bool,
    aborted: bool,
}

fn run_sequential<P>(
    store: &dyn ContactStore,
    rows: &[Row],
    ctx: &RowContext<'_>,
    policy: RowFailurePolicy,
    cancel: &CancellationToken,
    progress: &P,
) -> RunOutcome
where
    P: Fn(usize, usize) + Sync,
{
    let mut results = Vec::with_capacity(rows.len());
    let mut cancelled = false;
    let mut aborted = false;
    for (index, row) in rows.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        let result = process_row(store, index, row, ctx);
        let failed = result.is_err();
        results.push(result);
        progress(index + 1, rows.len());
        if failed && policy == RowFailurePolicy::AbortOnFirst {
            aborted = true;
            break;
        }
    }
    RunOutcome {
        results,
        cancelled,
        aborted,
    }
}

fn run_parallel<P>(
    store: &dyn ContactStore,
    rows: &[Row],
    ctx: &RowContext<'_>,
    policy: RowFailurePolicy,
    cancel: &CancellationToken,
    progress: &P,
) -> AppResult<RunOutcome>
where
    P: Fn(usize, usize) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.settings.workers)
        .build()
        .map_err(|e| AppError::Internal(format!("worker pool: {}", e)))?;
    let stop = AtomicBool::new(false);
    let attempted = AtomicUsize::new(0);

    let attempts: Vec<Option<Result<String, RowError>>> = pool.install(|| {
        rows.par_iter()
            .enumerate()
            .map(|(index, row)| {
                if stop.load(Ordering::SeqCst) || cancel.is_cancelled() {
                    return None;
                }
                let result = process_row(store, index, row, ctx);
                if result.is_err() && policy == RowFailurePolicy::AbortOnFirst {
                    stop.store(true, Ordering::SeqCst);
                }
                let done = attempted.fetch_add(1, Ordering::SeqCst) + 1;
                progress(done, rows.len());
                Some(result)
            })
            .collect()
    });

    let skipped = attempts.iter().any(Option::is_none);
    let aborted = stop.load(Ordering::SeqCst);
    Ok(RunOutcome {
        results: attempts.into_iter().flatten().collect(),
        cancelled: skipped && !aborted,
        aborted,
    })
}

fn load_rows(batch: &Batch, file_data: Option<Vec<u8>>) -> AppResult<Vec<Row>> {
    if let Some(bytes) = file_data {
        let digest = format!("{:x}", md5::compute(&bytes));
        if batch.checksum.as_deref().is_some_and(|stored| stored != digest) {
            warn!(
                "Batch {}: supplied file differs from the uploaded one",
                batch.batch_id
            );
        }
        let parsed = parse(&bytes, batch.format);
        if !parsed.errors.is_empty() {
            return Err(AppError::ParseFailed(parsed.errors));
        }
        return Ok(parsed.rows);
    }
    match &batch.raw_data {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::Internal(format!("cached rows unreadable: {}", e))),
        None => Err(AppError::bad_request("File data not provided")),
    }
}

/// Runs generation for a batch. See the module documentation for the steps.
///
/// `progress(attempted, total)` is called after every attempted row.
/// Rows persisted before a cancellation or abort stay persisted; in that case
/// only the processed count is written and the status is left as it was.
pub fn generate<P>(
    store: &dyn ContactStore,
    settings: &GenerationSettings,
    batch_id: &str,
    options: GenerateOptions,
    cancel: &CancellationToken,
    progress: P,
) -> AppResult<GenerationReport>
where
    P: Fn(usize, usize) + Sync,
{
    let batch = store
        .get_batch(batch_id)?
        .ok_or(AppError::NotFound("Batch"))?;
    let mapping = batch
        .field_mapping
        .clone()
        .ok_or_else(|| AppError::bad_request("Field mapping not set"))?;
    let rows = load_rows(&batch, options.file_data)?;

    if options.replace_existing {
        let removed = store.delete_contacts_by_batch(batch_id)?;
        info!("Batch {}: removed {} contacts from earlier runs", batch_id, removed);
    }

    info!(
        "Generating {} contacts for batch {} ({} worker(s), {} store)",
        rows.len(),
        batch_id,
        settings.workers,
        store.backend_name()
    );
    let ctx = RowContext {
        batch_id,
        mapping: &mapping,
        settings,
    };
    let outcome = if settings.workers <= 1 {
        run_sequential(store, &rows, &ctx, options.policy, cancel, &progress)
    } else {
        run_parallel(store, &rows, &ctx, options.policy, cancel, &progress)?
    };

    let mut processed = 0u32;
    let mut failures = Vec::new();
    for result in outcome.results {
        match result {
            Ok(_) => processed += 1,
            Err(e) => {
                warn!("Batch {}: {}", batch_id, e);
                failures.push(e);
            }
        }
    }
    failures.sort_by_key(|f| f.row);

    let finished = !outcome.cancelled && !outcome.aborted;
    let update = BatchUpdate {
        status: finished.then_some(options.final_status),
        total_contacts: Some(rows.len() as u32),
        processed_contacts: Some(processed),
        ..BatchUpdate::default()
    };
    let batch = store
        .update_batch(batch_id, update)?
        .ok_or(AppError::NotFound("Batch"))?;

    if outcome.cancelled {
        warn!(
            "Batch {}: generation cancelled after {} contacts",
            batch_id, processed
        );
    }
    info!(
        "Batch {} {}: {} of {} contacts, {} failed",
        batch_id,
        batch.status.as_str(),
        processed,
        rows.len(),
        failures.len()
    );

    Ok(GenerationReport {
        batch_id: batch_id.to_string(),
        status: batch.status,
        processed,
        total: rows.len() as u32,
        failures,
        cancelled: outcome.cancelled,
        aborted: outcome.aborted,
    })
}

/// Maps and generates in one call from the rows cached at upload; the batch
/// ends `Completed` unless it had already finished, in which case its status
/// is kept.
pub fn process(
    store: &dyn ContactStore,
    settings: &GenerationSettings,
    batch_id: &str,
    mapping: FieldMapping,
    cancel: &CancellationToken,
) -> AppResult<GenerationReport> {
    let batch = submit_mapping(store, batch_id, mapping)?;
    let final_status = if batch.status.is_terminal() {
        batch.status
    } else {
        BatchStatus::Completed
    };
    let options = GenerateOptions {
        final_status,
        ..GenerateOptions::default()
    };
    generate(store, settings, batch_id, options, cancel, |_, _| {})
}
