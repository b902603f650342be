use crate::model::format::TabularFormat;
use crate::model::mapping::FieldMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a batch: `Uploaded -> Mapped -> Generated | Completed`.
///
/// `Generated` is reached through the generate operation, `Completed` through
/// the process operation (mapping and generation in one call). Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Uploaded,
    Mapped,
    Generated,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Uploaded => "uploaded",
            BatchStatus::Mapped => "mapped",
            BatchStatus::Generated => "generated",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(BatchStatus::Uploaded),
            "mapped" => Some(BatchStatus::Mapped),
            "generated" => Some(BatchStatus::Generated),
            "completed" => Some(BatchStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Generated | BatchStatus::Completed)
    }

    /// Status after a mapping submission. Terminal batches stay terminal.
    pub fn after_mapping(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            BatchStatus::Mapped
        }
    }
}

/// One uploaded file's worth of contact rows and its processing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub file_name: String,
    pub format: TabularFormat,
    pub total_contacts: u32,
    pub processed_contacts: u32,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_mapping: Option<FieldMapping>,
    /// Parsed rows as JSON, cached at upload. Not sent to API clients.
    #[serde(default, skip_serializing)]
    pub raw_data: Option<String>,
    /// MD5 hex digest of the uploaded bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a batch is created at upload time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBatch {
    pub batch_id: String,
    pub file_name: String,
    pub format: TabularFormat,
    pub total_contacts: u32,
    pub raw_data: Option<String>,
    pub checksum: Option<String>,
}

/// Partial batch update with merge semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUpdate {
    pub status: Option<BatchStatus>,
    pub total_contacts: Option<u32>,
    pub processed_contacts: Option<u32>,
    pub field_mapping: Option<FieldMapping>,
    pub raw_data: Option<String>,
}

impl Batch {
    /// A fresh batch: status `Uploaded`, nothing processed, no mapping.
    pub fn from_new(new: NewBatch, now: DateTime<Utc>) -> Self {
        Batch {
            batch_id: new.batch_id,
            file_name: new.file_name,
            format: new.format,
            total_contacts: new.total_contacts,
            processed_contacts: 0,
            status: BatchStatus::Uploaded,
            field_mapping: None,
            raw_data: new.raw_data,
            checksum: new.checksum,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `update` into this batch and stamps `updated_at`.
    pub fn apply(&mut self, update: &BatchUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(total) = update.total_contacts {
            self.total_contacts = total;
        }
        if let Some(processed) = update.processed_contacts {
            self.processed_contacts = processed;
        }
        if let Some(mapping) = &update.field_mapping {
            self.field_mapping = Some(mapping.clone());
        }
        if let Some(raw) = &update.raw_data {
            self.raw_data = Some(raw.clone());
        }
        // processed never exceeds total
        self.processed_contacts = self.processed_contacts.min(self.total_contacts);
        self.updated_at = now;
    }
}
