//! Durable store on a single SQLite file.
//!
//! One connection guarded by a mutex; every read-merge-write update runs
//! while the lock is held, so concurrent updates never interleave.

use super::{ContactStore, StorageError, StorageResult};
use chrono::Utc;
use common::model::batch::{Batch, BatchStatus, BatchUpdate, NewBatch};
use common::model::contact::{Contact, ContactFields, ContactUpdate, NewContact};
use common::model::format::TabularFormat;
use common::model::mapping::FieldMapping;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS batches (
    batch_id           TEXT PRIMARY KEY,
    file_name          TEXT NOT NULL,
    format             TEXT NOT NULL,
    total_contacts     INTEGER NOT NULL,
    processed_contacts INTEGER NOT NULL DEFAULT 0,
    status             TEXT NOT NULL,
    field_mapping      TEXT,
    raw_data           TEXT,
    checksum           TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS contacts (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    batch_id    TEXT NOT NULL,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    phone       TEXT NOT NULL,
    phone2      TEXT NOT NULL,
    company     TEXT NOT NULL,
    position    TEXT NOT NULL,
    website     TEXT NOT NULL,
    vcard_data  TEXT NOT NULL,
    qr_code_url TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_contacts_batch_id ON contacts (batch_id);
";

const BATCH_COLUMNS: &str = "batch_id, file_name, format, total_contacts, processed_contacts, \
     status, field_mapping, raw_data, checksum, created_at, updated_at";

const CONTACT_COLUMNS: &str = "id, batch_id, name, email, phone, phone2, company, position, \
     website, vcard_data, qr_code_url, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// A private in-memory database, mostly useful in tests.
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value {value:?}")]
struct UnknownValue {
    kind: &'static str,
    value: String,
}

fn batch_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Batch> {
    let format: String = row.get(2)?;
    let format = TabularFormat::parse(&format).ok_or_else(|| {
        conversion_error(2, UnknownValue { kind: "format", value: format.clone() })
    })?;
    let status: String = row.get(5)?;
    let status = BatchStatus::parse(&status).ok_or_else(|| {
        conversion_error(5, UnknownValue { kind: "status", value: status.clone() })
    })?;
    let field_mapping = match row.get::<_, Option<String>>(6)? {
        Some(json) => Some(
            serde_json::from_str::<FieldMapping>(&json).map_err(|e| conversion_error(6, e))?,
        ),
        None => None,
    };

    Ok(Batch {
        batch_id: row.get(0)?,
        file_name: row.get(1)?,
        format,
        total_contacts: row.get(3)?,
        processed_contacts: row.get(4)?,
        status,
        field_mapping,
        raw_data: row.get(7)?,
        checksum: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        fields: ContactFields {
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            phone2: row.get(5)?,
            company: row.get(6)?,
            position: row.get(7)?,
            website: row.get(8)?,
        },
        vcard_data: row.get(9)?,
        qr_code_url: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn select_batch(conn: &Connection, batch_id: &str) -> StorageResult<Option<Batch>> {
    let sql = format!("SELECT {} FROM batches WHERE batch_id = ?1", BATCH_COLUMNS);
    Ok(conn
        .query_row(&sql, params![batch_id], batch_from_row)
        .optional()?)
}

fn select_contact(conn: &Connection, contact_id: &str) -> StorageResult<Option<Contact>> {
    let sql = format!("SELECT {} FROM contacts WHERE id = ?1", CONTACT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![contact_id], contact_from_row)
        .optional()?)
}

fn query_contacts(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> StorageResult<Vec<Contact>> {
    let sql = format!(
        "SELECT {} FROM contacts {} ORDER BY seq",
        CONTACT_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let contacts = stmt
        .query_map(args, contact_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(contacts)
}

impl ContactStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn create_batch(&self, batch: NewBatch) -> StorageResult<Batch> {
        let batch = Batch::from_new(batch, Utc::now());
        let mapping = batch
            .field_mapping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let sql = format!(
            "INSERT INTO batches ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            BATCH_COLUMNS
        );
        self.conn()?.execute(
            &sql,
            params![
                batch.batch_id,
                batch.file_name,
                batch.format.as_str(),
                batch.total_contacts,
                batch.processed_contacts,
                batch.status.as_str(),
                mapping,
                batch.raw_data,
                batch.checksum,
                batch.created_at,
                batch.updated_at,
            ],
        )?;
        Ok(batch)
    }

    fn get_batch(&self, batch_id: &str) -> StorageResult<Option<Batch>> {
        select_batch(&*self.conn()?, batch_id)
    }

    fn update_batch(&self, batch_id: &str, update: BatchUpdate) -> StorageResult<Option<Batch>> {
        let conn = self.conn()?;
        let Some(mut batch) = select_batch(&conn, batch_id)? else {
            return Ok(None);
        };
        batch.apply(&update, Utc::now());
        let mapping = batch
            .field_mapping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            "UPDATE batches SET total_contacts = ?1, processed_contacts = ?2, status = ?3, \
             field_mapping = ?4, raw_data = ?5, updated_at = ?6 WHERE batch_id = ?7",
            params![
                batch.total_contacts,
                batch.processed_contacts,
                batch.status.as_str(),
                mapping,
                batch.raw_data,
                batch.updated_at,
                batch.batch_id,
            ],
        )?;
        Ok(Some(batch))
    }

    fn create_contact(&self, contact: NewContact) -> StorageResult<Contact> {
        let contact = Contact::from_new(contact, Utc::now());
        let f = &contact.fields;
        let sql = format!(
            "INSERT INTO contacts ({}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            CONTACT_COLUMNS
        );
        self.conn()?.execute(
            &sql,
            params![
                contact.id,
                contact.batch_id,
                f.name,
                f.email,
                f.phone,
                f.phone2,
                f.company,
                f.position,
                f.website,
                contact.vcard_data,
                contact.qr_code_url,
                contact.created_at,
                contact.updated_at,
            ],
        )?;
        Ok(contact)
    }

    fn get_contacts_by_batch(&self, batch_id: &str) -> StorageResult<Vec<Contact>> {
        query_contacts(&*self.conn()?, "WHERE batch_id = ?1", &[&batch_id])
    }

    fn get_contact_by_id(&self, contact_id: &str) -> StorageResult<Option<Contact>> {
        select_contact(&*self.conn()?, contact_id)
    }

    fn update_contact(
        &self,
        contact_id: &str,
        update: ContactUpdate,
    ) -> StorageResult<Option<Contact>> {
        let conn = self.conn()?;
        let Some(mut contact) = select_contact(&conn, contact_id)? else {
            return Ok(None);
        };
        contact.apply(&update, Utc::now());
        let f = &contact.fields;
        conn.execute(
            "UPDATE contacts SET name = ?1, email = ?2, phone = ?3, phone2 = ?4, company = ?5, \
             position = ?6, website = ?7, vcard_data = ?8, qr_code_url = ?9, updated_at = ?10 \
             WHERE id = ?11",
            params![
                f.name,
                f.email,
                f.phone,
                f.phone2,
                f.company,
                f.position,
                f.website,
                contact.vcard_data,
                contact.qr_code_url,
                contact.updated_at,
                contact.id,
            ],
        )?;
        Ok(Some(contact))
    }

    fn delete_contacts_by_batch(&self, batch_id: &str) -> StorageResult<usize> {
        Ok(self
            .conn()?
            .execute("DELETE FROM contacts WHERE batch_id = ?1", params![batch_id])?)
    }

    fn get_all_contacts(&self) -> StorageResult<Vec<Contact>> {
        query_contacts(&*self.conn()?, "", &[])
    }
}
