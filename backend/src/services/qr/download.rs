use crate::error::{AppError, AppResult};
use crate::pipeline::qr::decode_data_url;
use crate::services::{attachment, blocking};
use crate::storage::ContactStore;
use actix_web::http::header::CONTENT_DISPOSITION;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use std::sync::Arc;

pub(crate) async fn process(
    contact_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match load_qr_png(contact_id.into_inner(), store.into_inner()).await {
        Ok((file_name, png)) => HttpResponse::Ok()
            .content_type("image/png")
            .insert_header((CONTENT_DISPOSITION, file_name))
            .body(png),
        Err(e) => e.error_response(),
    }
}

/// PNG bytes of the contact's QR code with the `Content-Disposition` value.
async fn load_qr_png(contact_id: String, store: Arc<dyn ContactStore>) -> AppResult<(String, Vec<u8>)> {
    blocking(move || {
        let contact = store
            .get_contact_by_id(&contact_id)?
            .ok_or(AppError::NotFound("Contact"))?;
        let png = decode_data_url(&contact.qr_code_url).ok_or(AppError::NotFound("QR code"))?;
        Ok((attachment(&contact.fields.name, &contact_id, "qr-", "png"), png))
    })
    .await
}

#[cfg(test)]
mod tests {
    use crate::pipeline::qr::{encode_data_url, QrOptions};
    use crate::services::testing::{state, test_app, TestState};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::model::contact::{ContactFields, NewContact};
    use serde_json::Value;

    fn seed(s: &TestState, id: &str, name: &str, qr_code_url: String) {
        s.store
            .create_contact(NewContact {
                id: id.into(),
                batch_id: "b-1".into(),
                fields: ContactFields {
                    name: name.into(),
                    ..ContactFields::default()
                },
                vcard_data: String::new(),
                qr_code_url,
            })
            .unwrap();
    }

    #[actix_web::test]
    async fn both_routes_serve_the_png() {
        let s = state();
        let options = QrOptions {
            width: 60,
            ..QrOptions::default()
        };
        seed(&s, "c-1", "Ada Lovelace", encode_data_url("https://x/c-1", &options).unwrap());
        seed(&s, "c-2", "", encode_data_url("https://x/c-2", &options).unwrap());
        let app = test_app!(s).await;

        for (uri, expected) in [
            ("/api/qr/c-1", "attachment; filename=\"qr-Ada_Lovelace.png\""),
            ("/api/qr/c-1/download", "attachment; filename=\"qr-Ada_Lovelace.png\""),
            ("/api/qr/c-2/download", "attachment; filename=\"qr-c_2.png\""),
        ] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
            assert_eq!(resp.headers().get("content-disposition").unwrap(), expected);
            let body = test::read_body(resp).await;
            assert!(body.starts_with(&[0x89, b'P', b'N', b'G']));
        }
    }

    #[actix_web::test]
    async fn missing_contact_or_qr_is_404() {
        let s = state();
        seed(&s, "c-1", "Ada", String::new());
        let app = test_app!(s).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/qr/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/qr/c-1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "QR code not found");
    }
}
