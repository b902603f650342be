use crate::error::{AppError, AppResult};
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::model::contact::Contact;
use std::sync::Arc;

pub(crate) async fn process(
    contact_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match get_contact(contact_id.into_inner(), store.into_inner()).await {
        Ok(contact) => HttpResponse::Ok().json(contact),
        Err(e) => e.error_response(),
    }
}

/// Loads a contact or fails with `Contact not found`.
pub(crate) async fn get_contact(contact_id: String, store: Arc<dyn ContactStore>) -> AppResult<Contact> {
    blocking(move || {
        store
            .get_contact_by_id(&contact_id)?
            .ok_or(AppError::NotFound("Contact"))
    })
    .await
}
