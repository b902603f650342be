use crate::error::AppResult;
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::model::contact::Contact;
use std::sync::Arc;

pub(crate) async fn process(store: web::Data<dyn ContactStore>) -> impl Responder {
    match list_all(store.into_inner()).await {
        Ok(contacts) => HttpResponse::Ok().json(contacts),
        Err(e) => e.error_response(),
    }
}

async fn list_all(store: Arc<dyn ContactStore>) -> AppResult<Vec<Contact>> {
    blocking(move || Ok(store.get_all_contacts()?)).await
}

#[cfg(test)]
mod tests {
    use crate::services::testing::{state, test_app};
    use actix_web::test;
    use common::model::contact::{Contact, ContactFields, NewContact};

    #[actix_web::test]
    async fn lists_contacts_across_batches() {
        let s = state();
        for (id, batch) in [("c-1", "b-1"), ("c-2", "b-2")] {
            s.store
                .create_contact(NewContact {
                    id: id.into(),
                    batch_id: batch.into(),
                    fields: ContactFields::default(),
                    vcard_data: String::new(),
                    qr_code_url: String::new(),
                })
                .unwrap();
        }
        let app = test_app!(s).await;
        let req = test::TestRequest::get().uri("/api/contacts").to_request();
        let contacts: Vec<Contact> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c-1", "c-2"]);
    }
}
