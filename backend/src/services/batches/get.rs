use crate::error::{AppError, AppResult};
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::requests::BatchDetails;
use std::sync::Arc;

pub(crate) async fn process(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match get_batch_details(batch_id.into_inner(), store.into_inner()).await {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(e) => e.error_response(),
    }
}

async fn get_batch_details(batch_id: String, store: Arc<dyn ContactStore>) -> AppResult<BatchDetails> {
    blocking(move || {
        let batch = store
            .get_batch(&batch_id)?
            .ok_or(AppError::NotFound("Batch"))?;
        let contacts = store.get_contacts_by_batch(&batch_id)?;
        Ok(BatchDetails { batch, contacts })
    })
    .await
}
