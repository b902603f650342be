use crate::model::batch::Batch;
use crate::model::contact::Contact;
use crate::model::mapping::FieldMapping;
use crate::model::row::Row;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/batches/{batch_id}/mapping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRequest {
    pub mapping: FieldMapping,
}

/// Body of `POST /api/batches/{batch_id}/generate` (and `/generate/async`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The uploaded file again, base64 encoded. Falls back to the rows cached at upload.
    #[serde(default)]
    pub file_data: Option<String>,
    /// Delete contacts from earlier runs of this batch before generating.
    #[serde(default)]
    pub replace_existing: bool,
    /// Stop at the first row that fails instead of continuing.
    #[serde(default)]
    pub abort_on_error: bool,
}

/// Body of `POST /api/batches/{batch_id}/process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub field_mapping: FieldMapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub batch_id: String,
    pub headers: Vec<String>,
    pub preview: Vec<Row>,
    pub total_contacts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 0-based data row index in file order.
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    pub processed_contacts: u32,
    pub total_contacts: u32,
    pub failures: Vec<RowFailure>,
    pub cancelled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetails {
    pub batch: Batch,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStarted {
    pub job_id: String,
}
