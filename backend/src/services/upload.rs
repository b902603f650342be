//! # Upload Service
//!
//! `POST /api/upload` takes a multipart form with a single `file` part holding
//! a `.csv`, `.xlsx` or `.xls` document.
//!
//! 1.  The part is read in chunks, bounded by `MAX_UPLOAD_BYTES`, while its MD5
//!     is computed.
//! 2.  The declared extension selects the parser; anything else is rejected
//!     before any state is created.
//! 3.  The file is parsed on the blocking pool. Parse diagnostics and files
//!     with no data row are rejected, again without creating a batch.
//! 4.  A batch is stored as `uploaded` with the parsed rows cached, so a later
//!     generation can run without the file being sent again.
//!
//! The response carries the batch key, the headers, the first five rows and
//! the row count.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::pipeline::parse::parse;
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_multipart::Multipart;
use actix_web::web::{post, scope};
use actix_web::{web, HttpResponse, Responder, ResponseError, Scope};
use common::model::batch::NewBatch;
use common::model::format::TabularFormat;
use common::requests::UploadResponse;
use futures_util::StreamExt;
use log::info;
use md5::Context;
use std::sync::Arc;
use uuid::Uuid;

const API_PATH: &str = "/api/upload";
const PREVIEW_ROWS: usize = 5;

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", post().to(process))
}

pub(crate) async fn process(
    payload: Multipart,
    store: web::Data<dyn ContactStore>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    match upload_file(payload, store.into_inner(), config.max_upload_bytes).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.error_response(),
    }
}

struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
    checksum: String,
}

/// Reads the `file` part; other parts are drained and ignored.
async fn read_file_part(mut payload: Multipart, max_bytes: usize) -> AppResult<Option<UploadedFile>> {
    let mut uploaded = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::bad_request(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();

        let mut bytes = Vec::new();
        let mut hasher = Context::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::bad_request(e.to_string()))?;
            if name.as_deref() != Some("file") {
                continue;
            }
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::bad_request("File too large"));
            }
            hasher.consume(&chunk);
            bytes.extend_from_slice(&chunk);
        }

        if name.as_deref() == Some("file") {
            uploaded = Some(UploadedFile {
                file_name,
                bytes,
                checksum: format!("{:x}", hasher.finalize()),
            });
        }
    }

    Ok(uploaded)
}

async fn upload_file(
    payload: Multipart,
    store: Arc<dyn ContactStore>,
    max_bytes: usize,
) -> AppResult<UploadResponse> {
    let file = read_file_part(payload, max_bytes)
        .await?
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let format = TabularFormat::from_file_name(&file.file_name)
        .ok_or_else(|| AppError::bad_request("Unsupported file format"))?;

    blocking(move || {
        let parsed = parse(&file.bytes, format);
        if !parsed.errors.is_empty() {
            return Err(AppError::ParseFailed(parsed.errors));
        }
        if parsed.rows.is_empty() {
            return Err(AppError::bad_request("No valid data found in file"));
        }

        let total_contacts = parsed.rows.len() as u32;
        let batch = store.create_batch(NewBatch {
            batch_id: Uuid::new_v4().to_string(),
            file_name: file.file_name,
            format,
            total_contacts,
            raw_data: Some(serde_json::to_string(&parsed.rows).map_err(|e| {
                AppError::Internal(format!("could not cache rows: {}", e))
            })?),
            checksum: Some(file.checksum),
        })?;
        info!(
            "Batch {} created from {} ({} rows, {})",
            batch.batch_id,
            batch.file_name,
            total_contacts,
            format.as_str()
        );

        let mut rows = parsed.rows;
        rows.truncate(PREVIEW_ROWS);
        Ok(UploadResponse {
            batch_id: batch.batch_id,
            headers: parsed.headers,
            preview: rows,
            total_contacts,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use crate::services::testing::{multipart, state, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::model::batch::BatchStatus;
    use common::requests::UploadResponse;
    use serde_json::Value;

    async fn post_file(
        s: &crate::services::testing::TestState,
        file_name: &str,
        content: &[u8],
    ) -> actix_web::dev::ServiceResponse {
        let app = test_app!(s).await;
        let (content_type, body) = multipart(file_name, content);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn csv_upload_creates_an_uploaded_batch() {
        let s = state();
        let csv = "Name,Phone\nAda,1\nGrace,2\nLinus,3\nKen,4\nDennis,5\nBjarne,6\n";
        let resp = post_file(&s, "people.csv", csv.as_bytes()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: UploadResponse = test::read_body_json(resp).await;
        assert_eq!(body.headers, vec!["Name", "Phone"]);
        assert_eq!(body.total_contacts, 6);
        assert_eq!(body.preview.len(), 5);
        assert_eq!(body.preview[0]["Name"], "Ada");

        let batch = s.store.get_batch(&body.batch_id).unwrap().unwrap();
        assert_eq!(s.memory.batch_count(), 1);
        assert_eq!(batch.status, BatchStatus::Uploaded);
        assert_eq!(batch.total_contacts, 6);
        assert_eq!(batch.processed_contacts, 0);
        assert!(batch.raw_data.is_some());
        assert_eq!(
            batch.checksum.as_deref(),
            Some(format!("{:x}", md5::compute(csv.as_bytes())).as_str())
        );
    }

    #[actix_web::test]
    async fn unsupported_extension_creates_nothing() {
        let s = state();
        let resp = post_file(&s, "people.txt", b"Name\nAda\n").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unsupported file format");
        assert!(s.store.get_all_contacts().unwrap().is_empty());
        assert_eq!(s.memory.batch_count(), 0);
    }

    #[actix_web::test]
    async fn header_only_file_is_rejected() {
        let s = state();
        let resp = post_file(&s, "people.csv", b"Name,Phone\n").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No valid data found in file");
    }

    #[actix_web::test]
    async fn ragged_rows_report_details() {
        let s = state();
        let resp = post_file(&s, "people.csv", b"Name,Phone\nAda,1,extra\n").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "File parsing failed");
        assert_eq!(body["details"].as_array().map(Vec::len), Some(1));
    }

    #[actix_web::test]
    async fn oversized_file_is_rejected() {
        let mut s = state();
        s.config = actix_web::web::Data::new(crate::config::AppConfig {
            max_upload_bytes: 8,
            ..crate::config::AppConfig::default()
        });
        let resp = post_file(&s, "people.csv", b"Name,Phone\nAda,1\n").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "File too large");
    }
}
