//! `POST /api/batches/{batch_id}/process`: body `{"field_mapping": {...}}`.
//!
//! Stores the mapping and generates from the rows cached at upload in a
//! single call. The batch ends `completed`.

use crate::error::AppResult;
use crate::pipeline::generate::{self, GenerationReport, GenerationSettings};
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::requests::ProcessRequest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) async fn process(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
    settings: web::Data<GenerationSettings>,
    payload: web::Json<ProcessRequest>,
) -> impl Responder {
    match process_batch(
        batch_id.into_inner(),
        store.into_inner(),
        settings.into_inner(),
        payload.into_inner(),
    )
    .await
    {
        Ok(report) => HttpResponse::Ok().json(report.to_response()),
        Err(e) => e.error_response(),
    }
}

async fn process_batch(
    batch_id: String,
    store: Arc<dyn ContactStore>,
    settings: Arc<GenerationSettings>,
    request: ProcessRequest,
) -> AppResult<GenerationReport> {
    blocking(move || {
        generate::process(
            store.as_ref(),
            &settings,
            &batch_id,
            request.field_mapping,
            &CancellationToken::new(),
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use crate::services::testing::{multipart, state, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::model::batch::BatchStatus;
    use common::requests::{GenerationResponse, UploadResponse};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn process_completes_the_batch() {
        let s = state();
        let app = test_app!(s).await;
        let (content_type, body) = multipart(
            "people.csv",
            b"Full Name;Mobile;Mail\nAda Lovelace;5551234;ada@example.com\n",
        );
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();
        let upload: UploadResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/batches/{}/process", upload.batch_id))
            .set_json(json!({ "field_mapping": {
                "name": "Full Name", "phone": "Mobile", "email": "Mail"
            } }))
            .to_request();
        let report: GenerationResponse = test::call_and_read_body_json(&app, req).await;
        assert!(report.success);
        assert_eq!(report.processed_contacts, 1);

        let batch = s.store.get_batch(&upload.batch_id).unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        let contacts = s.store.get_contacts_by_batch(&upload.batch_id).unwrap();
        assert_eq!(contacts[0].fields.email, "ada@example.com");
        assert_eq!(contacts[0].fields.phone, "05551234");
    }

    #[actix_web::test]
    async fn missing_mapping_body_is_a_bad_request() {
        let s = state();
        let app = test_app!(s).await;
        let req = test::TestRequest::post()
            .uri("/api/batches/any/process")
            .set_json(json!({ "mapping": {} }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().is_some_and(|e| e.starts_with("Invalid request body")));
    }
}
