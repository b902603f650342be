//! Contacts of one batch: `GET` lists them in creation order, `DELETE` removes
//! them and resets the batch's processed count. An unknown batch simply has
//! no contacts.

use crate::error::AppResult;
use crate::services::blocking;
use crate::storage::ContactStore;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use common::model::batch::BatchUpdate;
use common::model::contact::Contact;
use log::info;
use serde_json::json;
use std::sync::Arc;

pub(crate) async fn list(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match list_contacts(batch_id.into_inner(), store.into_inner()).await {
        Ok(contacts) => HttpResponse::Ok().json(contacts),
        Err(e) => e.error_response(),
    }
}

pub(crate) async fn delete(
    batch_id: web::Path<String>,
    store: web::Data<dyn ContactStore>,
) -> impl Responder {
    match delete_contacts(batch_id.into_inner(), store.into_inner()).await {
        Ok(deleted) => HttpResponse::Ok().json(json!({ "deleted": deleted })),
        Err(e) => e.error_response(),
    }
}

async fn list_contacts(batch_id: String, store: Arc<dyn ContactStore>) -> AppResult<Vec<Contact>> {
    blocking(move || Ok(store.get_contacts_by_batch(&batch_id)?)).await
}

async fn delete_contacts(batch_id: String, store: Arc<dyn ContactStore>) -> AppResult<usize> {
    blocking(move || {
        let deleted = store.delete_contacts_by_batch(&batch_id)?;
        let update = BatchUpdate {
            processed_contacts: Some(0),
            ..BatchUpdate::default()
        };
        if store.update_batch(&batch_id, update)?.is_some() {
            info!("Batch {}: deleted {} contacts", batch_id, deleted);
        }
        Ok(deleted)
    })
    .await
}

#[cfg(test)]
mod tests {
    use crate::pipeline::generate::{generate, submit_mapping, GenerateOptions};
    use crate::services::testing::{state, test_app, TestState};
    use actix_web::test;
    use common::model::batch::NewBatch;
    use common::model::contact::Contact;
    use common::model::format::TabularFormat;
    use common::model::mapping::FieldMapping;
    use serde_json::Value;
    use tokio_util::sync::CancellationToken;

    fn seed(s: &TestState) {
        let rows = r#"[{"Name":"Ada"},{"Name":"Grace"}]"#;
        s.store
            .create_batch(NewBatch {
                batch_id: "b-1".into(),
                file_name: "people.csv".into(),
                format: TabularFormat::Csv,
                total_contacts: 2,
                raw_data: Some(rows.into()),
                checksum: None,
            })
            .unwrap();
        let mapping = FieldMapping {
            name: Some("Name".into()),
            ..FieldMapping::default()
        };
        submit_mapping(s.store.get_ref(), "b-1", mapping).unwrap();
        generate(
            s.store.get_ref(),
            &s.settings,
            "b-1",
            GenerateOptions::default(),
            &CancellationToken::new(),
            |_, _| {},
        )
        .unwrap();
    }

    #[actix_web::test]
    async fn list_then_delete() {
        let s = state();
        seed(&s);
        let app = test_app!(s).await;

        let req = test::TestRequest::get().uri("/api/batches/b-1/contacts").to_request();
        let contacts: Vec<Contact> = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = contacts.iter().map(|c| c.fields.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);

        let req = test::TestRequest::delete().uri("/api/batches/b-1/contacts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deleted"], 2);
        assert!(s.store.get_contacts_by_batch("b-1").unwrap().is_empty());
        assert_eq!(s.store.get_batch("b-1").unwrap().unwrap().processed_contacts, 0);
    }

    #[actix_web::test]
    async fn unknown_batch_lists_nothing() {
        let s = state();
        let app = test_app!(s).await;
        let req = test::TestRequest::get().uri("/api/batches/nope/contacts").to_request();
        let contacts: Vec<Contact> = test::call_and_read_body_json(&app, req).await;
        assert!(contacts.is_empty());
    }
}
