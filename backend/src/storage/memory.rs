use super::{ContactStore, StorageError, StorageResult};
use chrono::Utc;
use common::model::batch::{Batch, BatchUpdate, NewBatch};
use common::model::contact::{Contact, ContactUpdate, NewContact};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process fallback store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    batches: HashMap<String, Batch>,
    /// Contact id -> (insertion sequence, contact).
    contacts: HashMap<String, (u64, Contact)>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StorageError::Poisoned)
    }

    #[cfg(test)]
    pub fn batch_count(&self) -> usize {
        self.read().map(|inner| inner.batches.len()).unwrap_or(0)
    }
}

fn in_creation_order(mut entries: Vec<(u64, Contact)>) -> Vec<Contact> {
    entries.sort_by_key(|(seq, _)| *seq);
    entries.into_iter().map(|(_, c)| c).collect()
}

impl ContactStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn create_batch(&self, batch: NewBatch) -> StorageResult<Batch> {
        let batch = Batch::from_new(batch, Utc::now());
        self.write()?
            .batches
            .insert(batch.batch_id.clone(), batch.clone());
        Ok(batch)
    }

    fn get_batch(&self, batch_id: &str) -> StorageResult<Option<Batch>> {
        Ok(self.read()?.batches.get(batch_id).cloned())
    }

    fn update_batch(&self, batch_id: &str, update: BatchUpdate) -> StorageResult<Option<Batch>> {
        let mut inner = self.write()?;
        Ok(inner.batches.get_mut(batch_id).map(|batch| {
            batch.apply(&update, Utc::now());
            batch.clone()
        }))
    }

    fn create_contact(&self, contact: NewContact) -> StorageResult<Contact> {
        let contact = Contact::from_new(contact, Utc::now());
        let mut inner = self.write()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .contacts
            .insert(contact.id.clone(), (seq, contact.clone()));
        Ok(contact)
    }

    fn get_contacts_by_batch(&self, batch_id: &str) -> StorageResult<Vec<Contact>> {
        let inner = self.read()?;
        let entries = inner
            .contacts
            .values()
            .filter(|(_, c)| c.batch_id == batch_id)
            .cloned()
            .collect();
        Ok(in_creation_order(entries))
    }

    fn get_contact_by_id(&self, contact_id: &str) -> StorageResult<Option<Contact>> {
        Ok(self.read()?.contacts.get(contact_id).map(|(_, c)| c.clone()))
    }

    fn update_contact(
        &self,
        contact_id: &str,
        update: ContactUpdate,
    ) -> StorageResult<Option<Contact>> {
        let mut inner = self.write()?;
        Ok(inner.contacts.get_mut(contact_id).map(|(_, contact)| {
            contact.apply(&update, Utc::now());
            contact.clone()
        }))
    }

    fn delete_contacts_by_batch(&self, batch_id: &str) -> StorageResult<usize> {
        let mut inner = self.write()?;
        let before = inner.contacts.len();
        inner.contacts.retain(|_, (_, c)| c.batch_id != batch_id);
        Ok(before - inner.contacts.len())
    }

    fn get_all_contacts(&self) -> StorageResult<Vec<Contact>> {
        let entries = self.read()?.contacts.values().cloned().collect();
        Ok(in_creation_order(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    #[test]
    fn batch_lifecycle() {
        contract::batch_lifecycle(&MemoryStore::new());
    }

    #[test]
    fn contact_lifecycle() {
        contract::contact_lifecycle(&MemoryStore::new());
    }
}
