//! HTTP surface. Each sub-module owns one scope and exposes `configure_routes`.
//!
//! Handlers receive the store as `web::Data<dyn ContactStore>`, the generation
//! settings as `web::Data<GenerationSettings>` and the job registry as
//! `web::Data<JobsState>`. Storage, parsing and QR work run on the blocking
//! pool through [`blocking`].

pub mod batches;
pub mod contacts;
pub mod jobs;
pub mod qr;
pub mod upload;

use crate::error::{AppError, AppResult};
use actix_web::web;

/// Registers every scope on the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload::configure_routes())
        .service(batches::configure_routes())
        .service(contacts::configure_routes())
        .service(qr::configure_routes())
        .service(jobs::configure_routes());
}

/// JSON extractor settings: `{"error"}` bodies for bad payloads and room for a
/// base64 copy of the largest accepted upload.
pub fn json_config(max_upload_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_upload_bytes.saturating_mul(2))
        .error_handler(|err, _req| AppError::bad_request(format!("Invalid request body: {}", err)).into())
}

/// Raw body limit for handlers that read `web::Bytes`; matches [`json_config`].
pub fn payload_config(max_upload_bytes: usize) -> web::PayloadConfig {
    web::PayloadConfig::new(max_upload_bytes.saturating_mul(2))
}

/// Runs `work` on tokio's blocking pool and flattens the join error.
pub(crate) async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `attachment; filename="<stem>.<ext>"`, using `fallback` for an empty name.
pub(crate) fn attachment(name: &str, fallback: &str, prefix: &str, ext: &str) -> String {
    let stem = if name.trim().is_empty() {
        sanitize_file_name(fallback)
    } else {
        sanitize_file_name(name)
    };
    format!("attachment; filename=\"{}{}.{}\"", prefix, stem, ext)
}
