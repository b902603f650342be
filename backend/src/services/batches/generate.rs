//! # Generation Endpoints
//!
//! `POST /api/batches/{batch_id}/generate` runs the batch pipeline and answers
//! with the generation report once every row has been attempted.
//!
//! `POST /api/batches/{batch_id}/generate/async` registers a job, answers with
//! its `job_id` straight away and runs the same work in the background:
//!
//! 1.  The job is registered as `Pending` with its own cancellation token.
//! 2.  The pipeline runs inside `spawn_blocking`. Its progress callback turns
//!     attempted rows into `InProgress(percent)` updates on the job channel.
//! 3.  The outcome becomes `Completed`, `Cancelled` or `Failed` on the same
//!     channel; `start_job_updater` applies it.

use crate::error::{AppError, AppResult};
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::pipeline::generate::{
    generate, GenerateOptions, GenerationReport, GenerationSettings, RowFailurePolicy,
};
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::jobs::JobStatus;
use common::requests::{GenerateRequest, JobStarted};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) async fn process(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
    settings: web::Data<GenerationSettings>,
    body: web::Bytes,
) -> impl Responder {
    let result = match request_from(&body) {
        Ok(request) => {
            generate_now(
                batch_id.into_inner(),
                store.into_inner(),
                settings.into_inner(),
                request,
            )
            .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(report) => HttpResponse::Ok().json(report.to_response()),
        Err(e) => e.error_response(),
    }
}

pub(crate) async fn process_async(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
    settings: web::Data<GenerationSettings>,
    jobs: web::Data<JobsState>,
    body: web::Bytes,
) -> impl Responder {
    let request = match request_from(&body) {
        Ok(request) => request,
        Err(e) => return e.error_response(),
    };
    match schedule_generation_job(
        batch_id.into_inner(),
        store.into_inner(),
        settings.into_inner(),
        jobs.get_ref().clone(),
        request,
    )
    .await
    {
        Ok(job_id) => HttpResponse::Accepted().json(JobStarted { job_id }),
        Err(e) => e.error_response(),
    }
}

/// An empty body means all defaults; anything else must be a valid request.
fn request_from(body: &[u8]) -> AppResult<GenerateRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e)))
}

fn options_from(request: GenerateRequest) -> AppResult<GenerateOptions> {
    let file_data = match request.file_data.filter(|d| !d.is_empty()) {
        Some(encoded) => Some(
            BASE64
                .decode(encoded.trim())
                .map_err(|_| AppError::bad_request("Invalid file data"))?,
        ),
        None => None,
    };
    Ok(GenerateOptions {
        file_data,
        replace_existing: request.replace_existing,
        policy: if request.abort_on_error {
            RowFailurePolicy::AbortOnFirst
        } else {
            RowFailurePolicy::Continue
        },
        ..GenerateOptions::default()
    })
}

async fn generate_now(
    batch_id: String,
    store: Arc<dyn ContactStore>,
    settings: Arc<GenerationSettings>,
    request: GenerateRequest,
) -> AppResult<GenerationReport> {
    let options = options_from(request)?;
    run_generation(batch_id, store, settings, options, CancellationToken::new(), None).await
}

async fn run_generation(
    batch_id: String,
    store: Arc<dyn ContactStore>,
    settings: Arc<GenerationSettings>,
    options: GenerateOptions,
    cancel: CancellationToken,
    progress: Option<(String, mpsc::Sender<JobUpdate>)>,
) -> AppResult<GenerationReport> {
    blocking(move || {
        generate(
            store.as_ref(),
            &settings,
            &batch_id,
            options,
            &cancel,
            |done, total| {
                if let Some((job_id, tx)) = &progress {
                    let percent = if total > 0 {
                        (done * 100 / total) as u32
                    } else {
                        100
                    };
                    // A full channel only drops an intermediate percentage.
                    let _ = tx.try_send(JobUpdate {
                        job_id: job_id.clone(),
                        status: JobStatus::InProgress(percent),
                    });
                }
            },
        )
    })
    .await
}

/// Registers the job and spawns its worker. A malformed `file_data` is
/// rejected here; every other error surfaces as a `Failed` job status.
async fn schedule_generation_job(
    batch_id: String,
    store: Arc<dyn ContactStore>,
    settings: Arc<GenerationSettings>,
    jobs: JobsState,
    request: GenerateRequest,
) -> AppResult<String> {
    let options = options_from(request)?;
    let (job_id, cancel) = jobs.register().await;
    info!("Job {} scheduled for batch {}", job_id, batch_id);

    let tx = jobs.tx.clone();
    let job_id_for_task = job_id.clone();
    tokio::spawn(async move {
        let result = run_generation(
            batch_id,
            store,
            settings,
            options,
            cancel,
            Some((job_id_for_task.clone(), tx.clone())),
        )
        .await;
        let status = match result {
            Ok(report) if report.cancelled => JobStatus::Cancelled(report.to_response().message),
            Ok(report) => JobStatus::Completed(report.to_response().message),
            Err(e) => {
                warn!("Job {} failed: {}", job_id_for_task, e);
                JobStatus::Failed(e.to_string())
            }
        };
        let _ = tx
            .send(JobUpdate {
                job_id: job_id_for_task,
                status,
            })
            .await;
    });

    Ok(job_id)
}
