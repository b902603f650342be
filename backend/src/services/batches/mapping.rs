//! `POST /api/batches/{batch_id}/mapping`: body `{"mapping": {...}}`.
//!
//! Every mapping field is optional; an unmapped canonical field ends up empty
//! on each contact.

use crate::error::AppResult;
use crate::pipeline::generate::submit_mapping;
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::model::batch::Batch;
use common::requests::MappingRequest;
use serde_json::json;
use std::sync::Arc;

pub(crate) async fn process(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
    payload: web::Json<MappingRequest>,
) -> impl Responder {
    match save_mapping(batch_id.into_inner(), store.into_inner(), payload.into_inner()).await {
        Ok(batch) => HttpResponse::Ok().json(json!({
            "success": true,
            "status": batch.status,
        })),
        Err(e) => e.error_response(),
    }
}

async fn save_mapping(
    batch_id: String,
    store: Arc<dyn ContactStore>,
    request: MappingRequest,
) -> AppResult<Batch> {
    blocking(move || submit_mapping(store.as_ref(), &batch_id, request.mapping)).await
}
