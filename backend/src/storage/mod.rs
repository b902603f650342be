//! Keyed storage for batches and contacts.
//!
//! [`ContactStore`] is implemented by a durable SQLite backend and by an
//! in-process fallback. [`connect_store`] picks one exactly once at startup and
//! the result is passed down to every service as [`SharedStore`].

mod factory;
mod memory;
mod sqlite;

pub use factory::connect_store;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use common::model::batch::{Batch, BatchUpdate, NewBatch};
use common::model::contact::{Contact, ContactUpdate, NewContact};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Store/fetch/update operations the pipeline and services rely on.
///
/// Absent keys are `Ok(None)`, never an error. Updates merge the supplied
/// fields into the stored record and refresh its `updated_at`.
pub trait ContactStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Whether data survives a process restart.
    fn is_durable(&self) -> bool;

    fn create_batch(&self, batch: NewBatch) -> StorageResult<Batch>;

    fn get_batch(&self, batch_id: &str) -> StorageResult<Option<Batch>>;

    fn update_batch(&self, batch_id: &str, update: BatchUpdate) -> StorageResult<Option<Batch>>;

    fn create_contact(&self, contact: NewContact) -> StorageResult<Contact>;

    /// Contacts of a batch in creation order.
    fn get_contacts_by_batch(&self, batch_id: &str) -> StorageResult<Vec<Contact>>;

    fn get_contact_by_id(&self, contact_id: &str) -> StorageResult<Option<Contact>>;

    fn update_contact(
        &self,
        contact_id: &str,
        update: ContactUpdate,
    ) -> StorageResult<Option<Contact>>;

    /// Removes every contact of the batch, returning how many were removed.
    fn delete_contacts_by_batch(&self, batch_id: &str) -> StorageResult<usize>;

    fn get_all_contacts(&self) -> StorageResult<Vec<Contact>>;
}

pub type SharedStore = Arc<dyn ContactStore>;

/// Behavioural checks every backend must pass; run against both implementations.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use common::model::batch::BatchStatus;
    use common::model::contact::ContactFields;
    use common::model::format::TabularFormat;
    use common::model::mapping::FieldMapping;

    fn new_batch(id: &str) -> NewBatch {
        NewBatch {
            batch_id: id.to_string(),
            file_name: "people.csv".to_string(),
            format: TabularFormat::Csv,
            total_contacts: 2,
            raw_data: Some(r#"[{"Name":"Ada"}]"#.to_string()),
            checksum: Some("abc".to_string()),
        }
    }

    fn new_contact(id: &str, batch_id: &str, name: &str) -> NewContact {
        NewContact {
            id: id.to_string(),
            batch_id: batch_id.to_string(),
            fields: ContactFields {
                name: name.to_string(),
                phone: "0555".to_string(),
                ..ContactFields::default()
            },
            vcard_data: "BEGIN:VCARD\r\nEND:VCARD\r\n".to_string(),
            qr_code_url: "data:image/png;base64,AAAA".to_string(),
        }
    }

    pub fn batch_lifecycle(store: &dyn ContactStore) {
        let created = store.create_batch(new_batch("b-1")).unwrap();
        assert_eq!(created.status, BatchStatus::Uploaded);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get_batch("b-1").unwrap().unwrap();
        assert_eq!(fetched.raw_data.as_deref(), Some(r#"[{"Name":"Ada"}]"#));
        assert_eq!(fetched.checksum.as_deref(), Some("abc"));

        let mapping = FieldMapping {
            name: Some("Name".to_string()),
            ..FieldMapping::default()
        };
        let updated = store
            .update_batch(
                "b-1",
                BatchUpdate {
                    status: Some(BatchStatus::Mapped),
                    field_mapping: Some(mapping.clone()),
                    ..BatchUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, BatchStatus::Mapped);
        assert_eq!(updated.field_mapping, Some(mapping.clone()));
        assert_eq!(updated.file_name, "people.csv");
        assert!(updated.updated_at >= created.updated_at);

        let reread = store.get_batch("b-1").unwrap().unwrap();
        assert_eq!(reread.field_mapping, Some(mapping));

        assert!(store.get_batch("missing").unwrap().is_none());
        assert!(store
            .update_batch("missing", BatchUpdate::default())
            .unwrap()
            .is_none());
    }

    pub fn contact_lifecycle(store: &dyn ContactStore) {
        store.create_batch(new_batch("b-1")).unwrap();
        store.create_batch(new_batch("b-2")).unwrap();
        store.create_contact(new_contact("c-1", "b-1", "Ada")).unwrap();
        store.create_contact(new_contact("c-2", "b-1", "Grace")).unwrap();
        store.create_contact(new_contact("c-3", "b-2", "Linus")).unwrap();

        let names: Vec<String> = store
            .get_contacts_by_batch("b-1")
            .unwrap()
            .into_iter()
            .map(|c| c.fields.name)
            .collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
        assert_eq!(store.get_all_contacts().unwrap().len(), 3);

        let contact = store.get_contact_by_id("c-2").unwrap().unwrap();
        assert_eq!(contact.batch_id, "b-1");
        assert_eq!(contact.fields.phone, "0555");

        let updated = store
            .update_contact(
                "c-2",
                ContactUpdate {
                    company: Some("Navy".to_string()),
                    ..ContactUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.fields.company, "Navy");
        assert_eq!(updated.fields.name, "Grace");
        assert_eq!(
            store.get_contact_by_id("c-2").unwrap().unwrap().fields.company,
            "Navy"
        );
        assert!(store
            .update_contact("missing", ContactUpdate::default())
            .unwrap()
            .is_none());

        assert_eq!(store.delete_contacts_by_batch("b-1").unwrap(), 2);
        assert!(store.get_contacts_by_batch("b-1").unwrap().is_empty());
        assert!(store.get_contact_by_id("c-1").unwrap().is_none());
        assert_eq!(store.get_contacts_by_batch("b-2").unwrap().len(), 1);
        assert_eq!(store.delete_contacts_by_batch("b-1").unwrap(), 0);
    }
}
