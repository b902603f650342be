use crate::error::{AppError, AppResult};
use crate::pipeline::normalize::normalize_phone;
use crate::pipeline::vcard;
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use chrono::Utc;
use common::model::contact::{Contact, ContactUpdate};
use log::debug;
use std::sync::Arc;

pub(crate) async fn process(
    contact_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
    payload: web::Json<ContactUpdate>,
) -> impl Responder {
    match update_contact(contact_id.into_inner(), store.into_inner(), payload.into_inner()).await {
        Ok(contact) => HttpResponse::Ok().json(contact),
        Err(e) => e.error_response(),
    }
}

async fn update_contact(
    contact_id: String,
    store: Arc<dyn ContactStore>,
    mut update: ContactUpdate,
) -> AppResult<Contact> {
    update.phone = update.phone.as_deref().map(normalize_phone);
    update.phone2 = update.phone2.as_deref().map(normalize_phone);

    blocking(move || {
        let mut merged = store
            .get_contact_by_id(&contact_id)?
            .ok_or(AppError::NotFound("Contact"))?;
        if update.touches_fields() && update.vcard_data.is_none() {
            merged.apply(&update, Utc::now());
            update.vcard_data = Some(vcard::encode(&merged.fields));
            debug!("Contact {}: vCard rebuilt", contact_id);
        }
        store
            .update_contact(&contact_id, update)?
            .ok_or(AppError::NotFound("Contact"))
    })
    .await
}
