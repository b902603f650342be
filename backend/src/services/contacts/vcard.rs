//! `GET /api/contacts/{contact_id}/vcard`: the stored vCard as
//! `<sanitized-name>.vcf`, or `contact.vcf` for a nameless contact.

use crate::pipeline::vcard;
use crate::services::attachment;
use crate::services::contacts::get::get_contact;
use crate::storage::ContactStore;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION};
use actix_web::{web, HttpResponse, Responder, ResponseError};

pub(crate) async fn process(
    contact_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match get_contact(contact_id.into_inner(), store.into_inner()).await {
        Ok(contact) => {
            let body = if contact.vcard_data.is_empty() {
                vcard::encode(&contact.fields)
            } else {
                contact.vcard_data
            };
            HttpResponse::Ok()
                .content_type("text/vcard; charset=utf-8")
                .insert_header((
                    CONTENT_DISPOSITION,
                    attachment(&contact.fields.name, "contact", "", "vcf"),
                ))
                .insert_header((CACHE_CONTROL, "no-cache"))
                .body(body)
        }
        Err(e) => e.error_response(),
    }
}
